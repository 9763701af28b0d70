//! Data models for the spatial aggregator.
//!
//! This module contains the core data structures shared by the loader,
//! the aggregator and the report generator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::AggregateError;

/// Opaque, caller-supplied point identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    Number(i64),
    Text(String),
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointId::Number(n) => write!(f, "{}", n),
            PointId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for PointId {
    fn from(n: i64) -> Self {
        PointId::Number(n)
    }
}

impl From<i32> for PointId {
    fn from(n: i32) -> Self {
        PointId::Number(i64::from(n))
    }
}

impl From<&str> for PointId {
    fn from(s: &str) -> Self {
        PointId::Text(s.to_string())
    }
}

/// A planar `(longitude, latitude)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Both components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lon, lat): (f64, f64)) -> Self {
        Self { lon, lat }
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self { lon, lat }
    }
}

/// A geographic point with free-form attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Identifier reported back in `insideIds`.
    pub id: PointId,
    /// Position of the point.
    pub coordinate: Coordinate,
    /// Attributes carried from the source record.
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl Point {
    pub fn new(id: impl Into<PointId>, lon: f64, lat: f64) -> Self {
        Self {
            id: id.into(),
            coordinate: Coordinate::new(lon, lat),
            attributes: Map::new(),
        }
    }

    /// Builder helper that sets one attribute.
    pub fn with_attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    /// Returns the coordinate, or `InvalidPoint` if it is not finite.
    pub fn checked_coordinate(&self) -> Result<Coordinate, AggregateError> {
        if self.coordinate.is_finite() {
            Ok(self.coordinate)
        } else {
            Err(AggregateError::InvalidPoint {
                id: self.id.to_string(),
            })
        }
    }
}

/// Which attribute the aggregator reads as the point's value.
///
/// The primary name is tried first, then each fallback in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueField {
    pub name: String,
    #[serde(default)]
    pub fallbacks: Vec<String>,
}

impl ValueField {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fallbacks: Vec::new(),
        }
    }

    pub fn with_fallbacks(mut self, fallbacks: &[String]) -> Self {
        self.fallbacks = fallbacks.to_vec();
        self
    }

    /// Field names in lookup order.
    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.fallbacks.iter().map(String::as_str))
    }
}

impl Default for ValueField {
    fn default() -> Self {
        Self::new("value")
    }
}

/// Statistics over the interior points of one polygon.
///
/// Numeric fields are rounded to two decimals. An empty interior yields
/// all zeros and no identifiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    pub inside_ids: Vec<PointId>,
    pub total_points: usize,
    pub sum: f64,
    pub mean: f64,
    pub median: f64,
}

/// Aggregation result plus bookkeeping about excluded data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolygonAnalysis {
    #[serde(flatten)]
    pub result: AggregationResult,
    /// Interior points whose value took part in the statistics.
    pub valued_points: usize,
    /// Points skipped because their coordinates were not finite.
    pub skipped_points: usize,
    /// Sum of every numeric attribute across interior points.
    pub property_totals: BTreeMap<String, f64>,
}

/// A polygon boundary as read from input, not yet validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedPolygon {
    pub name: String,
    pub boundary: Vec<Coordinate>,
}

/// Outcome for a single polygon in a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolygonReport {
    /// Polygon name.
    pub name: String,
    /// Number of vertices as supplied.
    pub vertex_count: usize,
    /// Analysis, present when the polygon was valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<PolygonAnalysis>,
    /// Error message if the polygon was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PolygonReport {
    pub fn analyzed(polygon: &NamedPolygon, analysis: PolygonAnalysis) -> Self {
        Self {
            name: polygon.name.clone(),
            vertex_count: polygon.boundary.len(),
            analysis: Some(analysis),
            error: None,
        }
    }

    pub fn failed(polygon: &NamedPolygon, error: String) -> Self {
        Self {
            name: polygon.name.clone(),
            vertex_count: polygon.boundary.len(),
            analysis: None,
            error: Some(error),
        }
    }

    /// True when the polygon was valid but contains no points.
    pub fn is_empty(&self) -> bool {
        self.analysis
            .as_ref()
            .is_some_and(|a| a.result.total_points == 0)
    }
}

/// Counts over all polygons in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub polygons: usize,
    pub failed: usize,
    pub empty: usize,
    pub inside_points: usize,
}

impl ReportSummary {
    pub fn from_polygons(polygons: &[PolygonReport]) -> Self {
        let mut summary = Self {
            polygons: polygons.len(),
            ..Self::default()
        };

        for polygon in polygons {
            match &polygon.analysis {
                Some(analysis) => {
                    summary.inside_points += analysis.result.total_points;
                    if analysis.result.total_points == 0 {
                        summary.empty += 1;
                    }
                }
                None => summary.failed += 1,
            }
        }

        summary
    }
}

/// Metadata about the analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Path of the points input.
    pub points_source: String,
    /// Path of the polygons input.
    pub polygons_source: String,
    /// Date and time of the analysis.
    pub analysis_date: DateTime<Utc>,
    /// Attribute aggregated.
    pub value_field: String,
    /// Number of points loaded.
    pub points_loaded: usize,
    /// Number of polygons read.
    pub polygons_analyzed: usize,
    /// Wall time of the run in seconds.
    pub duration_seconds: f64,
}

/// The complete analysis report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub summary: ReportSummary,
    pub polygons: Vec<PolygonReport>,
}

impl Report {
    pub fn new(metadata: ReportMetadata, polygons: Vec<PolygonReport>) -> Self {
        let summary = ReportSummary::from_polygons(&polygons);
        Self {
            metadata,
            summary,
            polygons,
        }
    }
}
