//! Runtime settings read from the environment.
//!
//! | Variable                | Default           |
//! |-------------------------|-------------------|
//! | `GRADE_DATA_DIR`        | `data/class_data` |
//! | `RATINGS_DATABASE_URL`  | unset             |
//! | `RATINGS_FILE`          | unset             |
//! | `ENRICH_CONCURRENCY`    | `8`               |
//! | `REFRESH_MAX_AGE_HOURS` | `24`              |

use chrono::TimeDelta;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

const DEFAULT_DATA_DIR: &str = "data/class_data";
const DEFAULT_CONCURRENCY: usize = 8;
const DEFAULT_MAX_AGE_HOURS: i64 = 24;

/// Where user ratings come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RatingsBackend {
    /// `reviews` table behind an sqlx SQLite URL.
    Database(String),
    /// JSON file of pre-computed samples.
    File(PathBuf),
    /// CSV-only scoring.
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub ratings: RatingsBackend,
    pub enrich_concurrency: usize,
    pub max_age: TimeDelta,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            ratings: RatingsBackend::Disabled,
            enrich_concurrency: DEFAULT_CONCURRENCY,
            max_age: TimeDelta::hours(DEFAULT_MAX_AGE_HOURS),
        }
    }
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`. Unparsable or negative values fall
    /// back to their defaults with a warning. A database URL wins over a ratings file.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = get("GRADE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let ratings = match (get("RATINGS_DATABASE_URL"), get("RATINGS_FILE")) {
            (Some(url), _) => RatingsBackend::Database(url),
            (None, Some(path)) => RatingsBackend::File(PathBuf::from(path)),
            (None, None) => RatingsBackend::Disabled,
        };

        let enrich_concurrency =
            parse_or("ENRICH_CONCURRENCY", get("ENRICH_CONCURRENCY"), DEFAULT_CONCURRENCY).max(1);

        let max_age_hours =
            match parse_or("REFRESH_MAX_AGE_HOURS", get("REFRESH_MAX_AGE_HOURS"), DEFAULT_MAX_AGE_HOURS) {
                hours if hours < 0 => {
                    warn!(key = "REFRESH_MAX_AGE_HOURS", hours, "Ignoring negative setting");
                    DEFAULT_MAX_AGE_HOURS
                }
                hours => hours,
            };

        Self {
            data_dir,
            ratings,
            enrich_concurrency,
            max_age: TimeDelta::try_hours(max_age_hours)
                .unwrap_or_else(|| TimeDelta::hours(DEFAULT_MAX_AGE_HOURS)),
        }
    }
}

fn parse_or<T: FromStr + Copy>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %value, "Ignoring unparsable setting");
            default
        }),
    }
}
