//! crates/document_history_core/src/events.rs
//!
//! Lifecycle events raised once per successful document mutation.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{ActionType, FieldChange, FieldChanges};

/// What happened to the document, with the payload specific to that kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEventKind {
    Created { filename: String },
    MetadataUpdated { changes: FieldChanges },
    /// `processed` is the resulting state; `false` means unprocessed.
    Processed { processed: bool },
    /// `trashed` is the resulting state; `false` means restored.
    Trashed { trashed: bool },
}

/// An immutable record of one state-changing action on a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub document_id: Uuid,
    pub user_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub kind: LifecycleEventKind,
}

impl LifecycleEvent {
    /// The audit action this event is recorded as.
    pub fn action(&self) -> ActionType {
        match &self.kind {
            LifecycleEventKind::Created { .. } => ActionType::Create,
            LifecycleEventKind::MetadataUpdated { .. } => ActionType::UpdateMetadata,
            LifecycleEventKind::Processed { processed: true } => ActionType::Process,
            LifecycleEventKind::Processed { processed: false } => ActionType::Unprocess,
            LifecycleEventKind::Trashed { trashed: true } => ActionType::Trash,
            LifecycleEventKind::Trashed { trashed: false } => ActionType::Restore,
        }
    }

    /// Field-level description for the audit entry. Simple state toggles have none.
    pub fn description(&self) -> Option<String> {
        match &self.kind {
            LifecycleEventKind::MetadataUpdated { changes } => Some(describe_changes(changes)),
            LifecycleEventKind::Created { .. }
            | LifecycleEventKind::Processed { .. }
            | LifecycleEventKind::Trashed { .. } => None,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match &self.kind {
            LifecycleEventKind::Created { .. } => "DocumentCreated",
            LifecycleEventKind::MetadataUpdated { .. } => "DocumentMetadataUpdated",
            LifecycleEventKind::Processed { .. } => "DocumentProcessed",
            LifecycleEventKind::Trashed { .. } => "DocumentTrashed",
        }
    }
}

/// Renders one clause per changed field, joined with `"; "`.
pub fn describe_changes(changes: &FieldChanges) -> String {
    changes
        .iter()
        .map(|(field, FieldChange { old, new })| {
            let label = field.label();
            match (old.as_deref(), new.as_deref()) {
                (Some(old), Some(new)) => format!("Changed {label} from \"{old}\" to \"{new}\""),
                (None, Some(new)) => format!("Set {label} to \"{new}\""),
                (Some(old), None) => format!("Cleared {label} (was \"{old}\")"),
                (None, None) => format!("Changed {label}"),
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}
