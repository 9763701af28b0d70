//! Loading points and polygons from JSON inputs.
//!
//! Points come either as a GeoJSON `FeatureCollection` of `Point` features
//! or as an array of stored point records (`id`, `lat`, `lon`, `info`)
//! whose coordinates may be numbers or numeric text. Polygons come as a
//! GeoJSON `FeatureCollection`, a single `Feature`, a bare `Polygon`
//! geometry, or a bare array of `[lon, lat]` positions.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{Coordinate, NamedPolygon, Point, PointId};

/// Errors raised while reading input files.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path}: {reason}")]
    Unsupported { path: String, reason: String },

    #[error("{path} contains no {what}")]
    Empty { path: String, what: &'static str },
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Point { coordinates: Vec<f64> },
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    #[serde(other)]
    Other,
}

/// Row shape of the persisted points table.
#[derive(Debug, Deserialize)]
struct PointRecord {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    lat: Option<NumberOrText>,
    #[serde(default)]
    lon: Option<NumberOrText>,
    #[serde(default, alias = "properties")]
    info: Option<Map<String, Value>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    // Unparseable text becomes NaN so the aggregator skips the point.
    fn to_f64(&self) -> f64 {
        match self {
            NumberOrText::Number(n) => *n,
            NumberOrText::Text(s) => s.trim().parse().unwrap_or(f64::NAN),
        }
    }
}

/// Read a points file.
pub fn load_points(path: &Path, id_field: &str) -> Result<Vec<Point>, SourceError> {
    let document = read_json(path)?;
    parse_points(document, id_field).map_err(|e| e.at(path))
}

/// Read a polygons file.
pub fn load_polygons(path: &Path) -> Result<Vec<NamedPolygon>, SourceError> {
    let document = read_json(path)?;
    let polygons = parse_polygons(document).map_err(|e| e.at(path))?;

    if polygons.is_empty() {
        return Err(SourceError::Empty {
            path: path.display().to_string(),
            what: "polygons",
        });
    }

    Ok(polygons)
}

fn read_json(path: &Path) -> Result<Value, SourceError> {
    let content = fs::read_to_string(path).map_err(|source| SourceError::Read {
        path: path.display().to_string(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| SourceError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Parse failure that does not yet know which file it came from.
#[derive(Debug)]
enum ParseFailure {
    Json(serde_json::Error),
    Unsupported(String),
}

impl ParseFailure {
    fn at(self, path: &Path) -> SourceError {
        let path = path.display().to_string();
        match self {
            ParseFailure::Json(source) => SourceError::Parse { path, source },
            ParseFailure::Unsupported(reason) => SourceError::Unsupported { path, reason },
        }
    }
}

impl From<serde_json::Error> for ParseFailure {
    fn from(e: serde_json::Error) -> Self {
        ParseFailure::Json(e)
    }
}

fn parse_points(document: Value, id_field: &str) -> Result<Vec<Point>, ParseFailure> {
    let has_features = document.get("features").is_some();

    match document {
        Value::Array(_) => {
            let records: Vec<PointRecord> = serde_json::from_value(document)?;
            Ok(records
                .into_iter()
                .enumerate()
                .map(|(index, record)| point_from_record(index, record))
                .collect())
        }
        Value::Object(_) if has_features => {
            let collection: FeatureCollection = serde_json::from_value(document)?;
            Ok(points_from_features(collection.features, id_field))
        }
        _ => Err(ParseFailure::Unsupported(
            "expected a FeatureCollection or an array of point records".to_string(),
        )),
    }
}

fn points_from_features(features: Vec<Feature>, id_field: &str) -> Vec<Point> {
    let total = features.len();
    let mut points = Vec::with_capacity(total);

    for (index, feature) in features.into_iter().enumerate() {
        let coordinates = match feature.geometry {
            Some(Geometry::Point { coordinates }) if coordinates.len() >= 2 => coordinates,
            _ => {
                debug!("Feature {} has no usable Point geometry", index + 1);
                continue;
            }
        };

        let attributes = feature.properties.unwrap_or_default();
        let id = attributes
            .get(id_field)
            .and_then(point_id)
            .or_else(|| feature.id.as_ref().and_then(point_id))
            .unwrap_or_else(|| position_id(index));

        points.push(Point {
            id,
            coordinate: Coordinate::new(coordinates[0], coordinates[1]),
            attributes,
        });
    }

    if points.len() < total {
        warn!(
            "Ignored {} of {} features without Point geometry",
            total - points.len(),
            total
        );
    }

    points
}

fn point_from_record(index: usize, record: PointRecord) -> Point {
    let coordinate = |value: &Option<NumberOrText>| {
        value.as_ref().map(NumberOrText::to_f64).unwrap_or(f64::NAN)
    };

    let mut attributes = record.info.unwrap_or_default();
    for (key, value) in record.extra {
        attributes.entry(key).or_insert(value);
    }

    Point {
        id: point_id(&record.id).unwrap_or_else(|| position_id(index)),
        coordinate: Coordinate::new(coordinate(&record.lon), coordinate(&record.lat)),
        attributes,
    }
}

/// Integers keep their value, other numbers keep their JSON text. Null,
/// booleans and containers are not identifiers.
fn point_id(value: &Value) -> Option<PointId> {
    match value {
        Value::Number(n) => Some(
            n.as_i64()
                .map(PointId::Number)
                .unwrap_or_else(|| PointId::Text(n.to_string())),
        ),
        Value::String(s) => Some(PointId::Text(s.clone())),
        _ => None,
    }
}

/// One-based position in the input, used when a point has no identifier.
fn position_id(index: usize) -> PointId {
    PointId::Number(index as i64 + 1)
}

fn parse_polygons(document: Value) -> Result<Vec<NamedPolygon>, ParseFailure> {
    let kind = document
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_string);

    match (document, kind.as_deref()) {
        (document @ Value::Array(_), _) => {
            let positions: Vec<Vec<f64>> = serde_json::from_value(document)?;
            Ok(vec![NamedPolygon {
                name: default_name(0),
                boundary: ring_from_positions(&positions),
            }])
        }
        (document, Some("FeatureCollection")) => {
            let collection: FeatureCollection = serde_json::from_value(document)?;
            Ok(polygons_from_features(collection.features))
        }
        (document, Some("Feature")) => {
            let feature: Feature = serde_json::from_value(document)?;
            Ok(polygons_from_features(vec![feature]))
        }
        (document, Some("Polygon")) => {
            let geometry: Geometry = serde_json::from_value(document)?;
            Ok(polygon_from_geometry(geometry, default_name(0))
                .into_iter()
                .collect())
        }
        (_, other) => Err(ParseFailure::Unsupported(format!(
            "unsupported polygon document type: {}",
            other.unwrap_or("none")
        ))),
    }
}

fn polygons_from_features(features: Vec<Feature>) -> Vec<NamedPolygon> {
    let mut polygons = Vec::new();

    for (index, feature) in features.into_iter().enumerate() {
        let name = feature
            .properties
            .as_ref()
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| default_name(index));

        match feature.geometry {
            Some(geometry) => match polygon_from_geometry(geometry, name) {
                Some(polygon) => polygons.push(polygon),
                None => warn!("Feature {} is not a Polygon, ignoring", index + 1),
            },
            None => warn!("Feature {} has no geometry, ignoring", index + 1),
        }
    }

    polygons
}

fn polygon_from_geometry(geometry: Geometry, name: String) -> Option<NamedPolygon> {
    let Geometry::Polygon { coordinates } = geometry else {
        return None;
    };

    if coordinates.len() > 1 {
        warn!(
            "Polygon '{}' has {} holes; only the exterior ring is used",
            name,
            coordinates.len() - 1
        );
    }

    let boundary = coordinates
        .first()
        .map(|exterior| ring_from_positions(exterior))
        .unwrap_or_default();

    Some(NamedPolygon { name, boundary })
}

// Short positions become NaN so ring validation rejects them.
fn ring_from_positions(positions: &[Vec<f64>]) -> Vec<Coordinate> {
    positions
        .iter()
        .map(|p| match p.as_slice() {
            [lon, lat, ..] => Coordinate::new(*lon, *lat),
            _ => Coordinate::new(f64::NAN, f64::NAN),
        })
        .collect()
}

fn default_name(index: usize) -> String {
    format!("polygon-{}", index + 1)
}
