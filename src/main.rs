//! Polystat - point-in-polygon statistics CLI
//!
//! Loads a point set and a set of polygons, aggregates a numeric
//! attribute over the points inside each polygon, and writes a
//! Markdown or JSON report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad config, unreadable input, rejected polygon)
//!   2 - A polygon contains no points and --fail-on-empty is set

use anyhow::{Context, Result};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use polystat::analysis::{self, extract_value};
use polystat::cache::PointCache;
use polystat::cli::{Args, OutputFormat};
use polystat::config::{Config, CONFIG_FILE};
use polystat::geometry::Ring;
use polystat::models::{NamedPolygon, Point, PolygonReport, Report, ReportMetadata, ValueField};
use polystat::pagination::{paginate, PointFilter};
use polystat::{report, source};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Configuration comes first so `verbose` in the file can set the log level
    let (mut config, origin) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(config.log_level(&args))?;

    info!("Polystat v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    origin.log();

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .polystat.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to change the value field, page size, report options and more.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")
}

/// Run the complete analysis. Returns the process exit code.
async fn run(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();
    let field = config.data.value_field();

    // Step 1: Load points through the run's cache
    let mut cache = PointCache::new();
    let points_path = args.points_path().to_path_buf();
    println!("📥 Loading points: {}", points_path.display());

    let points = cache
        .get_or_load(&points_path, |path| {
            source::load_points(path, &config.data.id_field)
        })
        .with_context(|| format!("Failed to load points from {}", points_path.display()))?;
    info!("Loaded {} points", points.len());

    if args.dry_run {
        return handle_dry_run(&points, &args, &config, &field);
    }

    // Step 2: Load polygons
    let polygons_path = args
        .polygons
        .clone()
        .context("--polygons is required unless --dry-run is set")?;
    let polygons = source::load_polygons(&polygons_path)
        .with_context(|| format!("Failed to load polygons from {}", polygons_path.display()))?;
    let polygon_count = polygons.len();

    // Step 3: Aggregate each polygon
    println!(
        "🔬 Aggregating `{}` over {} polygons...",
        field.name, polygon_count
    );
    let polygon_reports = analyze_polygons(
        Arc::clone(&points),
        polygons,
        field.clone(),
        config.data.id_field.clone(),
        config.general.concurrency,
    )
    .await?;

    // Step 4: Build and write the report
    let metadata = ReportMetadata {
        points_source: points_path.display().to_string(),
        polygons_source: polygons_path.display().to_string(),
        analysis_date: Utc::now(),
        value_field: field.name.clone(),
        points_loaded: points.len(),
        polygons_analyzed: polygon_count,
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };
    let report = Report::new(metadata, polygon_reports);

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report, &config.report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report, &config.report),
    };

    let output_path = PathBuf::from(&config.general.output);
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    let summary = &report.summary;
    println!("\n📊 Analysis Summary:");
    println!("   Points loaded: {}", points.len());
    println!("   Polygons: {}", summary.polygons);
    println!("   Interior point matches: {}", summary.inside_points);
    println!(
        "   Empty polygons: {} | Rejected polygons: {}",
        summary.empty, summary.failed
    );
    println!("   Duration: {:.2}s", report.metadata.duration_seconds);
    println!("\n✅ Report saved to: {}", output_path.display());

    if summary.failed > 0 {
        eprintln!("\n⛔ {} polygons were rejected. See the report for details.", summary.failed);
        return Ok(1);
    }

    if args.fail_on_empty && summary.empty > 0 {
        eprintln!(
            "\n⛔ {} polygons contain no points. Failing (exit code 2).",
            summary.empty
        );
        return Ok(2);
    }

    Ok(0)
}

/// Aggregate every polygon on the blocking pool, at most `concurrency` at a
/// time. Reports come back in polygon input order.
async fn analyze_polygons(
    points: Arc<[Point]>,
    polygons: Vec<NamedPolygon>,
    field: ValueField,
    id_field: String,
    concurrency: usize,
) -> Result<Vec<PolygonReport>> {
    let field = Arc::new(field);
    let id_field: Arc<str> = id_field.into();

    let jobs = polygons.into_iter().map(|polygon| {
        let points = Arc::clone(&points);
        let field = Arc::clone(&field);
        let id_field = Arc::clone(&id_field);
        tokio::task::spawn_blocking(move || analyze_polygon(&polygon, &points, &field, &id_field))
    });

    let results: Vec<_> = stream::iter(jobs)
        .buffered(concurrency.max(1))
        .collect()
        .await;

    results
        .into_iter()
        .map(|joined| joined.context("Aggregation task failed"))
        .collect()
}

/// Validate one polygon and aggregate the points inside it.
fn analyze_polygon(
    polygon: &NamedPolygon,
    points: &[Point],
    field: &ValueField,
    id_field: &str,
) -> PolygonReport {
    match Ring::new(&polygon.boundary) {
        Ok(ring) => {
            let analysis = analysis::analyze(&ring, points, field, Some(id_field));
            info!(
                "Polygon '{}': {} points inside, sum {:.2}, mean {:.2}, median {:.2}",
                polygon.name,
                analysis.result.total_points,
                analysis.result.sum,
                analysis.result.mean,
                analysis.result.median
            );
            PolygonReport::analyzed(polygon, analysis)
        }
        Err(e) => {
            warn!("Polygon '{}' rejected: {}", polygon.name, e);
            PolygonReport::failed(polygon, e.to_string())
        }
    }
}

/// Handle --dry-run: list one page of points, no aggregation.
fn handle_dry_run(
    points: &[Point],
    args: &Args,
    config: &Config,
    field: &ValueField,
) -> Result<i32> {
    let filter = PointFilter {
        min_value: args.min_value,
    };
    let filtered = filter.apply(points, field);
    let page = paginate(&filtered, args.page, config.pagination.page_size);

    if args.format == OutputFormat::Json {
        let json = serde_json::to_string_pretty(&page).context("Failed to serialize page")?;
        println!("{}", json);
        return Ok(0);
    }

    println!("\n🔍 Dry run: listing points (no aggregation)...\n");

    if page.items.is_empty() {
        println!(
            "   No points on page {} ({} matching points, {} pages).",
            page.page, page.total, page.total_pages
        );
    } else {
        println!(
            "   Page {} of {} ({} matching points):\n",
            page.page, page.total_pages, page.total
        );
        for point in &page.items {
            let value = extract_value(&point.attributes, field)
                .map(|v| format!("{:.2}", v))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "     📍 {} ({:.6}, {:.6}) {} = {}",
                point.id, point.coordinate.lon, point.coordinate.lat, field.name, value
            );
        }
    }

    println!("\n✅ Dry run complete. No polygons were aggregated.");
    Ok(0)
}

/// Where the run's configuration came from.
#[derive(Debug)]
enum ConfigOrigin {
    Explicit(PathBuf),
    DefaultFile,
    Defaults,
    Unreadable(anyhow::Error),
}

impl ConfigOrigin {
    fn log(&self) {
        match self {
            ConfigOrigin::Explicit(path) => info!("Loaded config from: {}", path.display()),
            ConfigOrigin::DefaultFile => info!("Loaded default config from {}", CONFIG_FILE),
            ConfigOrigin::Defaults => debug!("No config file found, using defaults"),
            ConfigOrigin::Unreadable(e) => warn!("Failed to load config: {:#}", e),
        }
    }
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so the origin is returned for logging
/// afterwards.
fn load_config(args: &Args) -> Result<(Config, ConfigOrigin)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigOrigin::Explicit(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigOrigin::DefaultFile)),
        Ok(None) => Ok((Config::default(), ConfigOrigin::Defaults)),
        Err(e) => Ok((Config::default(), ConfigOrigin::Unreadable(e))),
    }
}
