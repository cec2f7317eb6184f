//! crates/document_history_core/src/retention.rs
//!
//! Batch sweeps that enforce the retention policy: purging long-trashed
//! documents and archiving old active ones.
//!
//! A failure on one document is logged and counted and the sweep moves on.
//! Nothing is retried within a run; a document that failed is still eligible
//! and is picked up again by the next run.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::history::AuditHistoryLog;
use crate::ports::{DocumentRepository, PortResult};

pub const DEFAULT_TRASH_RETENTION_DAYS: i64 = 90;
pub const DEFAULT_ARCHIVE_RETENTION_DAYS: i64 = 730;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// How long a document stays in the trash before it is purged.
    pub trash_retention: Duration,
    /// How old an active document gets before it is archived.
    pub archive_retention: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            trash_retention: Duration::days(DEFAULT_TRASH_RETENTION_DAYS),
            archive_retention: Duration::days(DEFAULT_ARCHIVE_RETENTION_DAYS),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub succeeded: usize,
    pub failed: usize,
}

pub struct RetentionSweeper {
    documents: Arc<dyn DocumentRepository>,
    history: Arc<AuditHistoryLog>,
    policy: RetentionPolicy,
}

impl RetentionSweeper {
    pub fn new(
        documents: Arc<dyn DocumentRepository>,
        history: Arc<AuditHistoryLog>,
        policy: RetentionPolicy,
    ) -> Self {
        Self {
            documents,
            history,
            policy,
        }
    }

    /// Permanently deletes documents trashed longer than the trash retention,
    /// together with their history.
    pub async fn purge_trashed(&self, now: DateTime<Utc>) -> PortResult<SweepReport> {
        let cutoff = cutoff_before(now, self.policy.trash_retention);
        let candidates = self.documents.list_trashed_before(cutoff).await?;

        let mut report = SweepReport::default();
        for document_id in candidates {
            report.examined += 1;
            match self.purge_one(document_id).await {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    error!(document_id = %document_id, error = %e, "Failed to purge trashed document");
                    report.failed += 1;
                }
            }
        }

        info!(
            cutoff = %cutoff,
            examined = report.examined,
            purged = report.succeeded,
            failed = report.failed,
            "Trash purge sweep finished"
        );
        Ok(report)
    }

    /// Moves active documents older than the archive retention out of the
    /// active store. Trashed documents are left to the purge sweep.
    pub async fn archive_stale(&self, now: DateTime<Utc>) -> PortResult<SweepReport> {
        let cutoff = cutoff_before(now, self.policy.archive_retention);
        let candidates = self.documents.list_created_before(cutoff).await?;

        let mut report = SweepReport::default();
        for document_id in candidates {
            report.examined += 1;
            match self.documents.archive_document(document_id).await {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    error!(document_id = %document_id, error = %e, "Failed to archive document");
                    report.failed += 1;
                }
            }
        }

        info!(
            cutoff = %cutoff,
            examined = report.examined,
            archived = report.succeeded,
            failed = report.failed,
            "Archive sweep finished"
        );
        Ok(report)
    }

    // History goes first so a failed document delete can simply be retried.
    async fn purge_one(&self, document_id: Uuid) -> PortResult<()> {
        self.history.purge(document_id).await?;
        self.documents.purge_document(document_id).await
    }
}

/// `now - retention`, clamped to the earliest representable instant so an
/// oversized window selects nothing instead of overflowing.
fn cutoff_before(now: DateTime<Utc>, retention: Duration) -> DateTime<Utc> {
    now.checked_sub_signed(retention)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
