//! CLI entry point for the grade rater.
//!
//! Builds course and professor aggregates from the cleaned grade exports and
//! answers search, listing and lookup queries with blended scores.

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use grade_rater::analyzers::types::{EntityKind, EntitySummary};
use grade_rater::catalog::Catalog;
use grade_rater::config::{RatingsBackend, Settings};
use grade_rater::infra::ratings::{RatingFile, SqlRatingStore};
use grade_rater::output::{write_csv, write_json};
use grade_rater::query::{QueryService, SearchFilters};
use grade_rater::services::{NoRatings, RatingSource};
use serde::Serialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "grade_rater")]
#[command(about = "Course and professor grade statistics blended with user ratings", long_about = None)]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

/// Flags that take precedence over the environment.
#[derive(Args)]
struct Overrides {
    /// Directory containing the cleaned grade CSV exports
    #[arg(short = 'd', long, global = true)]
    data_dir: Option<PathBuf>,

    /// sqlx SQLite URL of the reviews database
    #[arg(long, global = true)]
    ratings_db: Option<String>,

    /// JSON file of rating samples, used when no database is given
    #[arg(long, global = true)]
    ratings_file: Option<PathBuf>,

    /// Maximum number of concurrent rating lookups
    #[arg(short, long, global = true)]
    concurrency: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search courses or professors by id, subject or description
    Search {
        /// Text to look for (case-insensitive)
        #[arg(value_name = "QUERY", default_value = "")]
        query: String,

        #[arg(short, long, value_enum, default_value_t = Kind::Course)]
        kind: Kind,

        /// Only keep results related to this instructor (or course, for professors)
        #[arg(short, long)]
        filter: Option<String>,

        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
    /// List every course or professor, sorted by id
    List {
        #[arg(short, long, value_enum, default_value_t = Kind::Course)]
        kind: Kind,

        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
    /// Show one course or professor with its grade breakdown
    Show {
        #[arg(value_name = "ID")]
        id: String,

        #[arg(short, long, value_enum, default_value_t = Kind::Course)]
        kind: Kind,
    },
    /// Print counts for the freshly built tables
    Stats,
    /// Rebuild the aggregates whenever they go stale and report how the
    /// rebuilds went. Serves no queries; use it to check that the exports
    /// keep aggregating cleanly.
    Watch {
        /// Seconds between freshness checks
        #[arg(short = 'r', long, default_value_t = 300)]
        check_every: u64,

        /// Number of checks to run (0 = infinite)
        #[arg(short = 'n', long, default_value_t = 0)]
        rounds: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Course,
    Professor,
}

impl From<Kind> for EntityKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Course => EntityKind::Course,
            Kind::Professor => EntityKind::Professor,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Csv,
}

#[derive(Serialize)]
struct CatalogStats {
    built_at: DateTime<Utc>,
    courses: usize,
    professors: usize,
    courses_without_gpa: usize,
    total_grades_recorded: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/grade_rater.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("grade_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let settings = apply_overrides(Settings::from_env(), cli.overrides);
    debug!(data_dir = %settings.data_dir.display(), concurrency = settings.enrich_concurrency, "Settings loaded");

    let catalog = Arc::new(Catalog::new(settings.data_dir.clone(), settings.max_age));

    match cli.command {
        Commands::Search {
            query,
            kind,
            filter,
            format,
        } => {
            let service = open_service(&catalog, &settings).await?;
            let filters = SearchFilters { related: filter };
            let results = service.search(kind.into(), &query, &filters).await;
            info!(results = results.len(), "Search complete");

            write_summaries(format, &results)?;
        }
        Commands::List { kind, format } => {
            let service = open_service(&catalog, &settings).await?;
            let results = service.list_all(kind.into()).await;

            write_summaries(format, &results)?;
        }
        Commands::Show { id, kind } => {
            let service = open_service(&catalog, &settings).await?;
            let Some(detail) = service.get_one(kind.into(), &id).await else {
                bail!("No {} found with id '{}'", EntityKind::from(kind), id);
            };
            write_json(std::io::stdout().lock(), &detail)?;
        }
        Commands::Stats => {
            let snapshot = catalog.ensure_fresh().await?;
            let stats = CatalogStats {
                built_at: snapshot.built_at,
                courses: snapshot.courses.len(),
                professors: snapshot.professors.len(),
                courses_without_gpa: snapshot
                    .courses
                    .iter()
                    .filter(|c| c.csv_average_gpa.is_none())
                    .count(),
                total_grades_recorded: snapshot.courses.iter().map(|c| c.total_students).sum(),
            };
            write_json(std::io::stdout().lock(), &stats)?;
        }
        Commands::Watch {
            check_every,
            rounds,
        } => {
            let report = catalog
                .watch(Duration::from_secs(check_every), rounds)
                .await;
            write_json(std::io::stdout().lock(), &report)?;
        }
    }

    Ok(())
}

fn write_summaries(format: Format, summaries: &[EntitySummary]) -> Result<()> {
    let stdout = std::io::stdout().lock();
    match format {
        Format::Json => write_json(stdout, &summaries),
        Format::Csv => write_csv(stdout, summaries),
    }
}

/// Builds the aggregates if needed and wires up the rating source.
async fn open_service(catalog: &Arc<Catalog>, settings: &Settings) -> Result<QueryService> {
    catalog.ensure_fresh().await?;
    let ratings = open_ratings(&settings.ratings).await?;
    Ok(QueryService::new(
        catalog.clone(),
        ratings,
        settings.enrich_concurrency,
    ))
}

fn apply_overrides(mut settings: Settings, overrides: Overrides) -> Settings {
    if let Some(data_dir) = overrides.data_dir {
        settings.data_dir = data_dir;
    }
    if let Some(url) = overrides.ratings_db {
        settings.ratings = RatingsBackend::Database(url);
    } else if let Some(path) = overrides.ratings_file {
        settings.ratings = RatingsBackend::File(path);
    }
    if let Some(concurrency) = overrides.concurrency {
        settings.enrich_concurrency = concurrency.max(1);
    }
    settings
}

/// Opens the configured rating source.
async fn open_ratings(backend: &RatingsBackend) -> Result<Arc<dyn RatingSource>> {
    let source: Arc<dyn RatingSource> = match backend {
        RatingsBackend::Database(url) => {
            let store = SqlRatingStore::connect(url).await?;
            store.ensure_schema().await?;
            Arc::new(store)
        }
        RatingsBackend::File(path) => {
            info!(path = %path.display(), "Loading rating samples from file");
            Arc::new(RatingFile::load(path)?)
        }
        RatingsBackend::Disabled => {
            info!("No rating source configured, scoring from grade data only");
            Arc::new(NoRatings)
        }
    };
    Ok(source)
}
