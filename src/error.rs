//! Error types for the aggregation core.

use thiserror::Error;

/// Errors raised by ring validation and point checks.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregateError {
    /// The ring cannot describe a polygon.
    #[error("invalid polygon: {reason}")]
    InvalidPolygon { reason: String },

    /// A point has a non-finite coordinate.
    #[error("invalid point {id}: coordinates must be finite")]
    InvalidPoint { id: String },
}

impl AggregateError {
    pub(crate) fn invalid_polygon(reason: impl Into<String>) -> Self {
        AggregateError::InvalidPolygon {
            reason: reason.into(),
        }
    }
}
