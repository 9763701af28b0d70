//! Markdown and JSON report generation.
//!
//! This module renders aggregation results into the report written at the
//! end of a run.

use crate::config::ReportConfig;
use crate::models::{PolygonAnalysis, PolygonReport, Report, ReportMetadata, ReportSummary};
use anyhow::Result;
use serde_json::Value;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, options: &ReportConfig) -> String {
    let mut output = String::new();

    output.push_str("# Polystat Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_summary_section(&report.summary, &report.polygons));
    output.push_str(&generate_polygons_section(&report.polygons, options));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Points:** `{}`\n", metadata.points_source));
    section.push_str(&format!("- **Polygons:** `{}`\n", metadata.polygons_source));
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Value Field:** `{}`\n", metadata.value_field));
    section.push_str(&format!("- **Points Loaded:** {}\n", metadata.points_loaded));
    section.push_str(&format!(
        "- **Polygons Analyzed:** {}\n",
        metadata.polygons_analyzed
    ));
    section.push_str(&format!(
        "- **Analysis Duration:** {:.2}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the summary table, one row per polygon.
fn generate_summary_section(summary: &ReportSummary, polygons: &[PolygonReport]) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str(&format!(
        "{} polygons, {} interior point matches, {} empty, {} rejected.\n\n",
        summary.polygons, summary.inside_points, summary.empty, summary.failed
    ));

    section.push_str("| Polygon | Points | Sum | Mean | Median |\n");
    section.push_str("|:---|:---:|---:|---:|---:|\n");

    for polygon in polygons {
        match &polygon.analysis {
            Some(analysis) => {
                let result = &analysis.result;
                section.push_str(&format!(
                    "| {} | {} | {:.2} | {:.2} | {:.2} |\n",
                    escape_cell(&polygon.name),
                    result.total_points,
                    result.sum,
                    result.mean,
                    result.median
                ));
            }
            None => {
                section.push_str(&format!(
                    "| {} | rejected | - | - | - |\n",
                    escape_cell(&polygon.name)
                ));
            }
        }
    }
    section.push('\n');

    section
}

/// Escape pipes so a value cannot split a table row.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Generate the per-polygon detail sections.
fn generate_polygons_section(polygons: &[PolygonReport], options: &ReportConfig) -> String {
    let mut section = String::new();

    section.push_str("## Polygons\n\n");

    for polygon in polygons {
        section.push_str(&format!("### {}\n\n", polygon.name));
        section.push_str(&format!("*Vertices: {}*\n\n", polygon.vertex_count));

        match (&polygon.analysis, &polygon.error) {
            (Some(analysis), _) => section.push_str(&generate_analysis_block(analysis, options)),
            (None, Some(error)) => section.push_str(&format!("> **Rejected:** {}\n\n", error)),
            (None, None) => {}
        }
    }

    section
}

/// Generate the detail block for one analyzed polygon.
fn generate_analysis_block(analysis: &PolygonAnalysis, options: &ReportConfig) -> String {
    let mut block = String::new();
    let result = &analysis.result;

    if result.total_points == 0 {
        block.push_str("No points fall inside this polygon.\n\n");
    } else {
        block.push_str(&format!(
            "- **Points inside:** {} ({} with a value)\n",
            result.total_points, analysis.valued_points
        ));
        block.push_str(&format!("- **Sum:** {:.2}\n", result.sum));
        block.push_str(&format!("- **Mean:** {:.2}\n", result.mean));
        block.push_str(&format!("- **Median:** {:.2}\n", result.median));
        block.push('\n');
    }

    if analysis.skipped_points > 0 {
        block.push_str(&format!(
            "*{} points skipped for invalid coordinates.*\n\n",
            analysis.skipped_points
        ));
    }

    if options.include_ids && !result.inside_ids.is_empty() {
        let listed: Vec<String> = result
            .inside_ids
            .iter()
            .take(options.max_listed_ids)
            .map(|id| format!("`{}`", id))
            .collect();

        block.push_str(&format!("**Point IDs:** {}", listed.join(", ")));
        let remaining = result.inside_ids.len().saturating_sub(listed.len());
        if remaining > 0 {
            block.push_str(&format!(" and {} more", remaining));
        }
        block.push_str("\n\n");
    }

    if options.include_property_totals && !analysis.property_totals.is_empty() {
        block.push_str("| Attribute | Total |\n");
        block.push_str("|:---|---:|\n");
        for (name, total) in &analysis.property_totals {
            block.push_str(&format!("| {} | {:.2} |\n", escape_cell(name), total));
        }
        block.push('\n');
    }

    block
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by Polystat*\n".to_string()
}

/// Generate a JSON report.
///
/// `insideIds` and `propertyTotals` are left out entirely when disabled in
/// `options`, so an omitted list is never mistaken for an empty one.
pub fn generate_json_report(report: &Report, options: &ReportConfig) -> Result<String> {
    let mut value = serde_json::to_value(report)?;

    let analyses = value["polygons"]
        .as_array_mut()
        .into_iter()
        .flatten()
        .filter_map(|polygon| polygon.get_mut("analysis"))
        .filter_map(Value::as_object_mut);

    for analysis in analyses {
        if !options.include_ids {
            analysis.remove("insideIds");
        }
        if !options.include_property_totals {
            analysis.remove("propertyTotals");
        }
    }

    serde_json::to_string_pretty(&value).map_err(Into::into)
}
