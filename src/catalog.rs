//! Owner of the current aggregate snapshot and its refresh schedule.
//!
//! Readers clone an `Arc` to a complete [`Snapshot`]; a refresh builds a new
//! snapshot off to the side and swaps it in under the write lock. A failed
//! refresh leaves the previous snapshot in place.

use anyhow::Result;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::analyzers::analyzer::build_snapshot;
use crate::analyzers::types::Snapshot;

/// Default staleness budget for a snapshot.
pub fn default_max_age() -> TimeDelta {
    TimeDelta::hours(24)
}

/// Returns true if nothing has been built yet or the last build is older
/// than `max_age` at `now`.
pub fn needs_refresh(
    last_built: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    max_age: TimeDelta,
) -> bool {
    match last_built {
        None => true,
        Some(built_at) => now - built_at > max_age,
    }
}

/// Counts from a [`Catalog::watch`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WatchReport {
    pub rounds: usize,
    pub rebuilds: usize,
    pub failures: usize,
}

pub struct Catalog {
    data_dir: PathBuf,
    max_age: TimeDelta,
    current: RwLock<Option<Arc<Snapshot>>>,
    refresh_lock: Mutex<()>,
}

impl Catalog {
    pub fn new(data_dir: impl Into<PathBuf>, max_age: TimeDelta) -> Self {
        Self {
            data_dir: data_dir.into(),
            max_age,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// The snapshot currently being served, if any build has completed.
    pub async fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.current.read().await.clone()
    }

    pub async fn last_built(&self) -> Option<DateTime<Utc>> {
        self.current.read().await.as_ref().map(|s| s.built_at)
    }

    pub async fn needs_refresh(&self) -> bool {
        needs_refresh(self.last_built().await, Utc::now(), self.max_age)
    }

    /// Rebuilds the snapshot from the data directory and swaps it in.
    ///
    /// On error the previous snapshot keeps being served.
    #[tracing::instrument(skip(self), fields(data_dir = %self.data_dir.display()))]
    pub async fn refresh(&self) -> Result<Arc<Snapshot>> {
        let _guard = self.refresh_lock.lock().await;
        self.rebuild().await
    }

    /// Rebuilds only if the current snapshot is missing or stale.
    pub async fn ensure_fresh(&self) -> Result<Arc<Snapshot>> {
        let _guard = self.refresh_lock.lock().await;

        // Another caller may have rebuilt while we waited for the lock.
        if !self.needs_refresh().await {
            if let Some(snapshot) = self.snapshot().await {
                return Ok(snapshot);
            }
        }

        self.rebuild().await
    }

    /// Checks freshness every `check_every` and rebuilds stale snapshots,
    /// for `rounds` checks (0 runs forever). Failed rebuilds are logged and
    /// counted; the previous snapshot stays in service.
    #[tracing::instrument(skip(self))]
    pub async fn watch(&self, check_every: Duration, rounds: usize) -> WatchReport {
        if rounds == 0 {
            info!(?check_every, "Watching indefinitely. Press Ctrl+C to stop.");
        } else {
            info!(rounds, ?check_every, "Starting freshness checks");
        }

        let mut report = WatchReport::default();

        loop {
            if rounds > 0 && report.rounds >= rounds {
                break;
            }

            report.rounds += 1;
            let round = report.rounds;

            if self.needs_refresh().await {
                let _guard = self.refresh_lock.lock().await;
                match self.rebuild().await {
                    Ok(_) => report.rebuilds += 1,
                    Err(e) => {
                        report.failures += 1;
                        let last_built = self.last_built().await;
                        error!(round, error = %e, last_built = ?last_built, "Rebuild failed, keeping previous snapshot");
                    }
                }
            } else {
                debug!(round, "Aggregates still fresh");
            }

            if rounds == 0 || round < rounds {
                tokio::time::sleep(check_every).await;
            }
        }

        info!(?report, "Finished watching");
        report
    }

    async fn rebuild(&self) -> Result<Arc<Snapshot>> {
        let data_dir = self.data_dir.clone();
        let built = tokio::task::spawn_blocking(move || build_snapshot(&data_dir)).await?;

        let snapshot = match built {
            Ok(snapshot) => Arc::new(snapshot),
            Err(e) => {
                let serving_stale = self.current.read().await.is_some();
                warn!(error = %e, serving_stale, "Aggregation failed");
                return Err(e);
            }
        };

        *self.current.write().await = Some(snapshot.clone());

        info!(
            courses = snapshot.courses.len(),
            professors = snapshot.professors.len(),
            built_at = %snapshot.built_at,
            "Snapshot swapped in"
        );
        Ok(snapshot)
    }
}
