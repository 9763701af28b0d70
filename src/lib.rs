//! Polystat - point-in-polygon aggregation for geographic point sets.
//!
//! The core is [`analysis::aggregate`]: given a polygon boundary and a set
//! of points, it reports which points fall inside and the sum, mean and
//! median of their designated numeric attribute. It is pure and
//! synchronous; loading, caching and reporting live in the other modules.

pub mod analysis;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod geometry;
pub mod models;
pub mod pagination;
pub mod report;
pub mod source;

pub use analysis::{aggregate, analyze};
pub use error::AggregateError;
pub use geometry::Ring;
pub use models::{AggregationResult, Coordinate, Point, PointId, ValueField};
