//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.polystat.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::models::ValueField;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".polystat.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input data settings.
    #[serde(default)]
    pub data: DataConfig,

    /// Point listing settings.
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Number of polygons aggregated concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
            concurrency: default_concurrency(),
        }
    }
}

fn default_output() -> String {
    "polystat_report.md".to_string()
}

fn default_concurrency() -> usize {
    4
}

/// How point attributes are read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Attribute aggregated for statistics.
    #[serde(default = "default_value_field")]
    pub value_field: String,

    /// Attributes tried, in order, when the value field is absent.
    #[serde(default = "default_fallback_fields")]
    pub fallback_fields: Vec<String>,

    /// Attribute holding the point identifier.
    #[serde(default = "default_id_field")]
    pub id_field: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            value_field: default_value_field(),
            fallback_fields: default_fallback_fields(),
            id_field: default_id_field(),
        }
    }
}

impl DataConfig {
    pub fn value_field(&self) -> ValueField {
        ValueField::new(&self.value_field).with_fallbacks(&self.fallback_fields)
    }
}

fn default_value_field() -> String {
    "value".to_string()
}

fn default_fallback_fields() -> Vec<String> {
    vec!["valor".to_string()]
}

fn default_id_field() -> String {
    "id".to_string()
}

/// Point listing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Points per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    2000
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// List interior point identifiers.
    #[serde(default = "default_true")]
    pub include_ids: bool,

    /// Include per-attribute totals.
    #[serde(default = "default_true")]
    pub include_property_totals: bool,

    /// Maximum identifiers listed per polygon in Markdown.
    #[serde(default = "default_max_listed_ids")]
    pub max_listed_ids: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_ids: true,
            include_property_totals: true,
            max_listed_ids: default_max_listed_ids(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_listed_ids() -> usize {
    50
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings when given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }
        if let Some(limit) = args.limit {
            self.pagination.page_size = limit;
        }
        if let Some(ref field) = args.value_field {
            self.data.value_field = field.clone();
        }
        if args.no_ids {
            self.report.include_ids = false;
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Log level for the run. `verbose = true` in the file raises the
    /// default to DEBUG; `--quiet` still wins.
    pub fn log_level(&self, args: &crate::cli::Args) -> tracing::Level {
        if self.general.verbose && !args.quiet {
            tracing::Level::DEBUG
        } else {
            args.log_level()
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}
