//! Paged listing of loaded points.

use serde::Serialize;

use crate::analysis::extract_value;
use crate::models::{Point, ValueField};

/// One page of points.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointPage<'a> {
    pub items: Vec<&'a Point>,
    /// Number of points across all pages.
    pub total: usize,
    /// 1-based page number.
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
}

/// Slice out page `page` (1-based) of `limit` points.
///
/// A page past the end is empty; `page == 0` is treated as the first page
/// and `limit == 0` yields an empty page.
pub fn paginate<'a>(points: &[&'a Point], page: usize, limit: usize) -> PointPage<'a> {
    let page = page.max(1);
    let total = points.len();
    let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };

    let start = (page - 1).saturating_mul(limit).min(total);
    let end = start.saturating_add(limit).min(total);

    PointPage {
        items: points[start..end].to_vec(),
        total,
        page,
        limit,
        total_pages,
    }
}

/// Filter on the designated value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointFilter {
    /// Drop points whose value is below this threshold.
    pub min_value: Option<f64>,
}

impl PointFilter {
    /// Points without a readable value are always kept.
    pub fn matches(&self, point: &Point, field: &ValueField) -> bool {
        match (self.min_value, extract_value(&point.attributes, field)) {
            (Some(min), Some(value)) => value >= min,
            _ => true,
        }
    }

    pub fn apply<'a>(&self, points: &'a [Point], field: &ValueField) -> Vec<&'a Point> {
        points.iter().filter(|p| self.matches(p, field)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PointId;

    fn points(n: i64) -> Vec<Point> {
        (1..=n)
            .map(|i| Point::new(i, 0.0, 0.0).with_attribute("value", i))
            .collect()
    }

    fn ids(page: &PointPage<'_>) -> Vec<PointId> {
        page.items.iter().map(|p| p.id.clone()).collect()
    }

    #[test]
    fn test_paginate_pages() {
        let all = points(5);
        let refs: Vec<&Point> = all.iter().collect();

        let first = paginate(&refs, 1, 2);
        assert_eq!(ids(&first), vec![PointId::from(1), PointId::from(2)]);
        assert_eq!(first.total, 5);
        assert_eq!(first.total_pages, 3);

        let last = paginate(&refs, 3, 2);
        assert_eq!(ids(&last), vec![PointId::from(5)]);
    }

    #[test]
    fn test_paginate_past_end_is_empty() {
        let all = points(3);
        let refs: Vec<&Point> = all.iter().collect();

        let page = paginate(&refs, 10, 2000);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_paginate_degenerate_arguments() {
        let all = points(3);
        let refs: Vec<&Point> = all.iter().collect();

        assert_eq!(paginate(&refs, 0, 2).page, 1);
        let empty = paginate(&refs, 1, 0);
        assert!(empty.items.is_empty());
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn test_min_value_filter() {
        let mut all = points(4);
        all.push(Point::new(99, 0.0, 0.0));
        let field = ValueField::default();

        let filter = PointFilter {
            min_value: Some(3.0),
        };
        let kept: Vec<PointId> = filter
            .apply(&all, &field)
            .iter()
            .map(|p| p.id.clone())
            .collect();

        assert_eq!(
            kept,
            vec![PointId::from(3), PointId::from(4), PointId::from(99)]
        );
        assert_eq!(PointFilter::default().apply(&all, &field).len(), 5);
    }
}
