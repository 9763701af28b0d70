//! Spatial aggregation and descriptive statistics.

pub mod aggregator;
pub mod stats;

pub use aggregator::{aggregate, analyze, extract_value};
pub use stats::summarize;
