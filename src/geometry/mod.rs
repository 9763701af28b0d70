//! Point-in-polygon testing.
//!
//! Coordinates are planar `(longitude, latitude)` pairs. Polygons spanning
//! the antimeridian or a pole are not handled.
//!
//! Boundary policy: a point lying exactly on an edge or a vertex of the
//! ring is inside.

use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::{BoundingRect, Coord, LineString, Polygon, Rect};

use crate::error::AggregateError;
use crate::models::Coordinate;

/// Minimum number of distinct vertices for a usable ring.
pub const MIN_DISTINCT_VERTICES: usize = 3;

/// A validated, closed polygon boundary without holes.
#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    polygon: Polygon<f64>,
    bounds: Rect<f64>,
    distinct_vertices: usize,
}

impl Ring {
    /// Validate a boundary and close it if it is open.
    ///
    /// Fails with `InvalidPolygon` when a vertex is not finite or when fewer
    /// than three distinct vertices remain.
    pub fn new(vertices: &[Coordinate]) -> Result<Self, AggregateError> {
        if let Some(index) = vertices.iter().position(|v| !v.is_finite()) {
            return Err(AggregateError::invalid_polygon(format!(
                "vertex {} has a non-finite coordinate",
                index
            )));
        }

        let distinct_vertices = count_distinct(vertices);
        if distinct_vertices < MIN_DISTINCT_VERTICES {
            return Err(AggregateError::invalid_polygon(format!(
                "ring needs at least {} distinct vertices, found {}",
                MIN_DISTINCT_VERTICES, distinct_vertices
            )));
        }

        let exterior: LineString<f64> = vertices.iter().map(|v| to_coord(*v)).collect();
        // Polygon::new closes the exterior ring when the last vertex differs.
        let polygon = Polygon::new(exterior, Vec::new());
        let bounds = polygon
            .bounding_rect()
            .ok_or_else(|| AggregateError::invalid_polygon("ring has no extent"))?;

        Ok(Self {
            polygon,
            bounds,
            distinct_vertices,
        })
    }

    /// Whether `point` lies inside the ring or on its boundary.
    ///
    /// Non-finite coordinates are never inside.
    pub fn contains(&self, point: Coordinate) -> bool {
        let coord = to_coord(point);
        if !self.in_bounds(coord) {
            return false;
        }

        matches!(
            self.polygon.coordinate_position(&coord),
            CoordPos::Inside | CoordPos::OnBoundary
        )
    }

    /// Number of distinct vertices.
    pub fn distinct_vertices(&self) -> usize {
        self.distinct_vertices
    }

    /// Closed exterior ring, first vertex repeated at the end.
    pub fn vertices(&self) -> Vec<Coordinate> {
        self.polygon
            .exterior()
            .coords()
            .map(|c| Coordinate::new(c.x, c.y))
            .collect()
    }

    // Inclusive, so boundary points still reach the exact test.
    fn in_bounds(&self, coord: Coord<f64>) -> bool {
        let min = self.bounds.min();
        let max = self.bounds.max();
        coord.x >= min.x && coord.x <= max.x && coord.y >= min.y && coord.y <= max.y
    }
}

fn to_coord(c: Coordinate) -> Coord<f64> {
    Coord { x: c.lon, y: c.lat }
}

fn count_distinct(vertices: &[Coordinate]) -> usize {
    let mut seen: Vec<Coordinate> = Vec::with_capacity(vertices.len());
    for vertex in vertices {
        if !seen.contains(vertex) {
            seen.push(*vertex);
        }
    }
    seen.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(points: &[(f64, f64)]) -> Result<Ring, AggregateError> {
        let vertices: Vec<Coordinate> = points.iter().copied().map(Coordinate::from).collect();
        Ring::new(&vertices)
    }

    fn square() -> Ring {
        ring(&[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)]).unwrap()
    }

    #[test]
    fn test_interior_and_exterior() {
        let square = square();
        assert!(square.contains(Coordinate::new(5.0, 5.0)));
        assert!(square.contains(Coordinate::new(0.5, 9.5)));
        assert!(!square.contains(Coordinate::new(20.0, 20.0)));
        assert!(!square.contains(Coordinate::new(-0.001, 5.0)));
        assert!(!square.contains(Coordinate::new(5.0, 10.001)));
    }

    #[test]
    fn test_boundary_counts_as_inside() {
        let square = square();
        // Edges
        assert!(square.contains(Coordinate::new(0.0, 5.0)));
        assert!(square.contains(Coordinate::new(10.0, 5.0)));
        assert!(square.contains(Coordinate::new(5.0, 0.0)));
        assert!(square.contains(Coordinate::new(5.0, 10.0)));
        // Vertices
        assert!(square.contains(Coordinate::new(0.0, 0.0)));
        assert!(square.contains(Coordinate::new(10.0, 10.0)));
    }

    #[test]
    fn test_boundary_result_is_stable() {
        let square = square();
        let on_edge = Coordinate::new(10.0, 3.25);
        let first = square.contains(on_edge);
        for _ in 0..100 {
            assert_eq!(square.contains(on_edge), first);
        }
    }

    #[test]
    fn test_open_and_closed_rings_agree() {
        let open = square();
        let closed =
            ring(&[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0), (0.0, 0.0)]).unwrap();

        assert_eq!(open, closed);
        assert_eq!(closed.distinct_vertices(), 4);
        assert_eq!(open.vertices().first(), open.vertices().last());
    }

    #[test]
    fn test_concave_ring() {
        // L shape with the notch at the top right.
        let l_shape = ring(&[
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 5.0),
            (5.0, 5.0),
            (5.0, 10.0),
            (0.0, 10.0),
        ])
        .unwrap();

        assert!(l_shape.contains(Coordinate::new(2.0, 8.0)));
        assert!(l_shape.contains(Coordinate::new(8.0, 2.0)));
        assert!(!l_shape.contains(Coordinate::new(8.0, 8.0)));
    }

    #[test]
    fn test_too_few_distinct_vertices() {
        let err = ring(&[(0.0, 0.0), (1.0, 1.0), (0.0, 0.0), (1.0, 1.0)]).unwrap_err();
        assert!(matches!(err, AggregateError::InvalidPolygon { .. }));

        assert!(ring(&[(0.0, 0.0), (1.0, 1.0)]).is_err());
        assert!(ring(&[]).is_err());
    }

    #[test]
    fn test_non_finite_vertex_rejected() {
        let err = ring(&[(0.0, 0.0), (f64::INFINITY, 1.0), (2.0, 0.0)]).unwrap_err();
        assert!(err.to_string().contains("non-finite"));

        assert!(ring(&[(0.0, 0.0), (1.0, f64::NAN), (2.0, 0.0)]).is_err());
    }

    #[test]
    fn test_degenerate_rings_do_not_panic() {
        let collinear = ring(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]).unwrap();
        assert!(!collinear.contains(Coordinate::new(1.0, 1.0)));
        let _ = collinear.contains(Coordinate::new(1.0, 0.0));

        let bowtie = ring(&[(0.0, 0.0), (10.0, 10.0), (10.0, 0.0), (0.0, 10.0)]).unwrap();
        for x in 0..=10 {
            for y in 0..=10 {
                let _ = bowtie.contains(Coordinate::new(f64::from(x), f64::from(y)));
            }
        }
    }

    #[test]
    fn test_non_finite_query_is_outside() {
        let square = square();
        assert!(!square.contains(Coordinate::new(f64::NAN, 5.0)));
        assert!(!square.contains(Coordinate::new(5.0, f64::INFINITY)));
    }
}
