//! Descriptive statistics over attribute values.

use serde::{Deserialize, Serialize};

/// Count, sum, mean and median of a sequence of values.
///
/// Values are kept at full precision; use [`Summary::rounded`] at the
/// output boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub median: f64,
}

impl Summary {
    /// Copy with sum, mean and median rounded to two decimals.
    pub fn rounded(&self) -> Self {
        Self {
            count: self.count,
            sum: round2(self.sum),
            mean: round2(self.mean),
            median: round2(self.median),
        }
    }
}

/// Summarize `values`. An empty slice yields all zeros.
pub fn summarize(values: &[f64]) -> Summary {
    if values.is_empty() {
        return Summary::default();
    }

    let count = values.len();
    let sum: f64 = values.iter().sum();

    Summary {
        count,
        sum,
        mean: sum / count as f64,
        median: median(values),
    }
}

/// Median of a sorted copy of `values`, or `0` when empty.
pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    match sorted.len() {
        0 => 0.0,
        n if n % 2 == 1 => sorted[mid],
        _ => (sorted[mid - 1] + sorted[mid]) / 2.0,
    }
}

/// Round half away from zero to two decimal places.
///
/// Values too large to carry a fractional part are returned unchanged, so a
/// finite input never rounds to infinity.
pub fn round2(value: f64) -> f64 {
    let scaled = value * 100.0;
    if !scaled.is_finite() || value.abs() >= MAX_EXACT_CENTS {
        return value;
    }
    scaled.round() / 100.0
}

/// Above this magnitude an `f64` has no bits left below the hundredths.
const MAX_EXACT_CENTS: f64 = 4_503_599_627_370_496.0 / 100.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_summary_is_zero() {
        let summary = summarize(&[]);
        assert_eq!(summary, Summary::default());
        assert_eq!(summary.mean, 0.0);
        assert_eq!(summary.median, 0.0);
    }

    #[test]
    fn test_odd_count_median() {
        let summary = summarize(&[15.0, 5.0, 5.0]);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.sum, 25.0);
        assert_eq!(summary.median, 5.0);
    }

    #[test]
    fn test_even_count_median_averages_middle_pair() {
        assert_eq!(median(&[8.0, 12.0]), 10.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_median_is_order_independent() {
        let values = [3.5, -1.0, 9.25, 0.0, 7.0, 2.0];
        let expected = median(&values);

        let mut reversed = values;
        reversed.reverse();
        assert_eq!(median(&reversed), expected);

        let mut rotated = values;
        rotated.rotate_left(2);
        assert_eq!(median(&rotated), expected);
    }

    #[test]
    fn test_mean_times_count_matches_sum() {
        let values: Vec<f64> = (1..=1000).map(|n| f64::from(n) * 0.37).collect();
        let summary = summarize(&values);
        let reconstructed = summary.mean * summary.count as f64;
        assert!((reconstructed - summary.sum).abs() < 1e-6);
    }

    #[test]
    fn test_summarize_does_not_reorder_input() {
        let values = vec![3.0, 1.0, 2.0];
        let _ = summarize(&values);
        assert_eq!(values, vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_rounding_only_on_output() {
        let summary = summarize(&[1.0, 1.0, 1.005]);
        assert!(summary.sum > 3.004 && summary.sum < 3.006);

        let rounded = Summary {
            count: 1,
            sum: 3.14159,
            mean: 2.71828,
            median: -1.234,
        }
        .rounded();
        assert_eq!(rounded.sum, 3.14);
        assert_eq!(rounded.mean, 2.72);
        assert_eq!(rounded.median, -1.23);
    }

    #[test]
    fn test_rounding_keeps_huge_values_finite() {
        let rounded = summarize(&[1.0e307, 1.0e307]).rounded();
        assert_eq!(rounded.sum, 2.0e307);
        assert_eq!(rounded.mean, 1.0e307);
        assert_eq!(rounded.median, 1.0e307);

        let json = serde_json::to_value(rounded).unwrap();
        assert_eq!(json["sum"], 2.0e307);

        assert_eq!(round2(f64::MAX), f64::MAX);
        assert_eq!(round2(-f64::MAX), -f64::MAX);
        assert!(round2(f64::NAN).is_nan());
    }
}
