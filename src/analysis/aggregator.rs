//! Spatial aggregation of point attributes inside a polygon.
//!
//! Two lists come out of the filtering step: the identifiers of every point
//! that lies inside the ring, and the values that could be read as numbers.
//! A point with a missing or non-numeric value is still reported as inside;
//! it only drops out of the statistics. Points with non-finite coordinates
//! are skipped and counted.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

use super::stats::{round2, summarize};
use crate::error::AggregateError;
use crate::geometry::Ring;
use crate::models::{AggregationResult, Coordinate, Point, PointId, PolygonAnalysis, ValueField};

/// Points inside a ring, split into identifiers and usable values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection<'a> {
    /// Interior points in input order.
    pub inside: Vec<&'a Point>,
    /// Designated values of the interior points that passed coercion.
    pub values: Vec<f64>,
    /// Points skipped for non-finite coordinates.
    pub skipped: usize,
}

impl Selection<'_> {
    pub fn inside_ids(&self) -> Vec<PointId> {
        self.inside.iter().map(|p| p.id.clone()).collect()
    }
}

/// Aggregate the designated attribute of the points inside `boundary`.
///
/// Fails only when the boundary itself is invalid.
pub fn aggregate(
    boundary: &[Coordinate],
    points: &[Point],
    field: &ValueField,
) -> Result<AggregationResult, AggregateError> {
    let ring = Ring::new(boundary)?;
    Ok(analyze(&ring, points, field, None).result)
}

/// Aggregate against an already validated ring, with bookkeeping.
///
/// `id_field` names the attribute that holds the identifier; it is left
/// out of the property totals.
pub fn analyze(
    ring: &Ring,
    points: &[Point],
    field: &ValueField,
    id_field: Option<&str>,
) -> PolygonAnalysis {
    let selection = select(ring, points, field);
    let summary = summarize(&selection.values).rounded();

    let result = AggregationResult {
        inside_ids: selection.inside_ids(),
        total_points: selection.inside.len(),
        sum: summary.sum,
        mean: summary.mean,
        median: summary.median,
    };

    debug!(
        "{} of {} points inside ({} with values, {} skipped)",
        result.total_points,
        points.len(),
        summary.count,
        selection.skipped
    );

    PolygonAnalysis {
        result,
        valued_points: summary.count,
        skipped_points: selection.skipped,
        property_totals: property_totals(&selection.inside, id_field),
    }
}

/// Filter `points` to those inside `ring`, preserving input order.
pub fn select<'a>(ring: &Ring, points: &'a [Point], field: &ValueField) -> Selection<'a> {
    let mut selection = Selection::default();

    for point in points {
        let coordinate = match point.checked_coordinate() {
            Ok(c) => c,
            Err(e) => {
                debug!("Skipping point: {}", e);
                selection.skipped += 1;
                continue;
            }
        };

        if !ring.contains(coordinate) {
            continue;
        }

        selection.inside.push(point);
        if let Some(value) = extract_value(&point.attributes, field) {
            selection.values.push(value);
        }
    }

    selection
}

/// Read the designated value, trying the primary field then the fallbacks.
///
/// The first field that is present decides: a present but non-numeric
/// primary field does not fall through to a fallback.
pub fn extract_value(attributes: &Map<String, Value>, field: &ValueField) -> Option<f64> {
    field
        .candidates()
        .find_map(|name| attributes.get(name))
        .and_then(coerce_number)
}

/// Numeric coercion of a JSON value. Strings are trimmed and parsed.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    number.is_finite().then_some(number)
}

/// Sum every numeric attribute across `points`, rounded to two decimals.
///
/// Only JSON numbers count here; numeric text is not coerced.
pub fn property_totals(points: &[&Point], id_field: Option<&str>) -> BTreeMap<String, f64> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();

    for point in points {
        for (key, value) in &point.attributes {
            if Some(key.as_str()) == id_field {
                continue;
            }
            if let Some(n) = value.as_f64().filter(|n| n.is_finite()) {
                *totals.entry(key.clone()).or_insert(0.0) += n;
            }
        }
    }

    for total in totals.values_mut() {
        *total = round2(*total);
    }

    totals
}
