//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::{Path, PathBuf};

/// Polystat - point-in-polygon statistics for geographic point sets
///
/// Counts the points that fall inside each polygon and reports the sum,
/// mean and median of a numeric attribute over them. Markdown/JSON reports.
///
/// Examples:
///   polystat --points points.geojson --polygons areas.geojson
///   polystat --points points.geojson --polygons areas.geojson --format json -o report.json
///   polystat --points points.json --dry-run --page 2 --limit 100
///   polystat --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Points file (GeoJSON FeatureCollection or array of point records)
    #[arg(short, long, value_name = "FILE", required_unless_present = "init_config")]
    pub points: Option<PathBuf>,

    /// Polygons file (GeoJSON FeatureCollection, Feature, Polygon or [lon, lat] array)
    ///
    /// Not required with --dry-run.
    #[arg(short = 'g', long, value_name = "FILE")]
    pub polygons: Option<PathBuf>,

    /// Output file path for the report
    ///
    /// Default: from config or polystat_report.md
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .polystat.toml in the current directory
    #[arg(short, long, value_name = "FILE", env = "POLYSTAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Attribute to aggregate
    ///
    /// Default: from config or "value"
    #[arg(long, value_name = "NAME")]
    pub value_field: Option<String>,

    /// Number of polygons aggregated concurrently
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Page of points to list with --dry-run (1-based)
    #[arg(long, default_value = "1", value_name = "PAGE")]
    pub page: usize,

    /// Points per page with --dry-run
    #[arg(long, value_name = "COUNT")]
    pub limit: Option<usize>,

    /// Only list points whose value is at least this (with --dry-run)
    #[arg(long, value_name = "VALUE", allow_negative_numbers = true)]
    pub min_value: Option<f64>,

    /// Leave interior point identifiers out of the report
    #[arg(long)]
    pub no_ids: bool,

    /// Exit with code 2 if any polygon contains no points
    #[arg(long)]
    pub fail_on_empty: bool,

    /// Dry run: load and list points without aggregating
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .polystat.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Path of the points file. Empty when not set (validate first).
    pub fn points_path(&self) -> &Path {
        self.points.as_deref().unwrap_or(Path::new(""))
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        let points = self
            .points
            .as_ref()
            .ok_or_else(|| "--points is required".to_string())?;
        check_file(points, "Points")?;

        match self.polygons {
            Some(ref polygons) => check_file(polygons, "Polygons")?,
            None if !self.dry_run => {
                return Err("--polygons is required unless --dry-run is set".to_string());
            }
            None => {}
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.page == 0 {
            return Err("Page must be at least 1".to_string());
        }

        if self.limit == Some(0) {
            return Err("Limit must be at least 1".to_string());
        }

        if let Some(min) = self.min_value {
            if !min.is_finite() {
                return Err("Minimum value must be a finite number".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

fn check_file(path: &Path, label: &str) -> Result<(), String> {
    if !path.exists() {
        return Err(format!("{} file does not exist: {}", label, path.display()));
    }
    if !path.is_file() {
        return Err(format!("{} path is not a file: {}", label, path.display()));
    }
    Ok(())
}
