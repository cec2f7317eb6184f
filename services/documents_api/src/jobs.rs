//! services/documents_api/src/jobs.rs
//!
//! Daily scheduling for the retention sweeps.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use document_history_core::RetentionSweeper;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Which sweep a scheduled job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepKind {
    Archive,
    PurgeTrash,
}

impl SweepKind {
    fn name(&self) -> &'static str {
        match self {
            SweepKind::Archive => "archive",
            SweepKind::PurgeTrash => "purge_trash",
        }
    }
}

/// Time from `now` until the next occurrence of `at` (UTC). If `at` is
/// exactly now, the next run is a day later.
pub fn until_next(now: DateTime<Utc>, at: NaiveTime) -> Duration {
    let today = Utc.from_utc_datetime(&now.date_naive().and_time(at));
    let next = if today > now {
        today
    } else {
        today + Duration::days(1)
    };
    next - now
}

/// Spawns one task per sweep. Each runs daily at its configured UTC time
/// until `shutdown` is cancelled.
pub fn spawn_retention_jobs(
    sweeper: Arc<RetentionSweeper>,
    archive_at: NaiveTime,
    purge_at: NaiveTime,
    shutdown: CancellationToken,
) -> Vec<JoinHandle<()>> {
    [(SweepKind::Archive, archive_at), (SweepKind::PurgeTrash, purge_at)]
        .into_iter()
        .map(|(kind, at)| tokio::spawn(run_daily(sweeper.clone(), kind, at, shutdown.clone())))
        .collect()
}

async fn run_daily(
    sweeper: Arc<RetentionSweeper>,
    kind: SweepKind,
    at: NaiveTime,
    shutdown: CancellationToken,
) {
    info!(job = kind.name(), at = %at, "Retention job scheduled");
    loop {
        let wait = until_next(Utc::now(), at)
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!(job = kind.name(), "Retention job stopped");
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        let now = Utc::now();
        let result = match kind {
            SweepKind::Archive => sweeper.archive_stale(now).await,
            SweepKind::PurgeTrash => sweeper.purge_trashed(now).await,
        };
        if let Err(e) = result {
            error!(job = kind.name(), error = %e, "Retention sweep could not list candidates");
        }
    }
}
