//! crates/document_history_core/src/listeners.rs
//!
//! The lifecycle listeners wired into the emitter at startup.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::NewHistoryEntry;
use crate::events::{LifecycleEvent, LifecycleEventKind};
use crate::history::AuditHistoryLog;
use crate::ports::{LifecycleListener, PortResult, UserDirectory};

/// Persists every lifecycle event as an audit history entry.
///
/// This is the only writer of document history.
pub struct AuditTrailListener {
    log: Arc<AuditHistoryLog>,
    users: Arc<dyn UserDirectory>,
}

impl AuditTrailListener {
    pub fn new(log: Arc<AuditHistoryLog>, users: Arc<dyn UserDirectory>) -> Self {
        Self { log, users }
    }
}

#[async_trait]
impl LifecycleListener for AuditTrailListener {
    fn name(&self) -> &'static str {
        "audit_trail"
    }

    async fn handle(&self, event: &LifecycleEvent) -> PortResult<()> {
        let user = self.users.find_user(event.user_id).await?;
        if user.is_none() {
            // Stored anyway; the timeline reports it as an integrity error.
            warn!(
                user_id = %event.user_id,
                document_id = %event.document_id,
                "Acting user not found while recording history"
            );
        }

        self.log
            .append(NewHistoryEntry {
                document_id: event.document_id,
                action: event.action(),
                description: event.description(),
                occurred_at: event.occurred_at,
                user,
            })
            .await?;
        Ok(())
    }
}

/// Emits one structured log line per lifecycle event.
pub struct EventLogListener;

#[async_trait]
impl LifecycleListener for EventLogListener {
    fn name(&self) -> &'static str {
        "event_log"
    }

    async fn handle(&self, event: &LifecycleEvent) -> PortResult<()> {
        match &event.kind {
            LifecycleEventKind::Created { filename } => info!(
                document_id = %event.document_id,
                user_id = %event.user_id,
                filename = %filename,
                "Document created"
            ),
            LifecycleEventKind::MetadataUpdated { changes } => info!(
                document_id = %event.document_id,
                user_id = %event.user_id,
                fields = ?changes.keys().map(|f| f.as_str()).collect::<Vec<_>>(),
                "Document metadata updated"
            ),
            LifecycleEventKind::Processed { processed } => info!(
                document_id = %event.document_id,
                user_id = %event.user_id,
                processed = *processed,
                "Document processed state changed"
            ),
            LifecycleEventKind::Trashed { trashed } => info!(
                document_id = %event.document_id,
                user_id = %event.user_id,
                trashed = *trashed,
                "Document trashed state changed"
            ),
        }
        Ok(())
    }
}
