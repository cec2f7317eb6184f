//! crates/document_history_core/src/error.rs
//!
//! Error types raised by the document entity, the service layer and the
//! history read model.

use uuid::Uuid;

use crate::domain::{MetadataField, MAX_METADATA_VALUE_LEN};
use crate::ports::PortError;

/// A precondition of a document mutation was violated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Metadata cannot be edited while the document is marked as processed")]
    DocumentProcessed,
    #[error("No metadata changes were supplied")]
    NoChanges,
    #[error("{} must not exceed {} characters", .field.label(), MAX_METADATA_VALUE_LEN)]
    ValueTooLong { field: MetadataField },
    #[error("Unknown metadata field: {0}")]
    UnknownField(String),
    #[error("Document processed state is already {processed}")]
    ProcessedUnchanged { processed: bool },
    #[error("Document is already in the trash")]
    AlreadyTrashed,
    #[error("Document is not in the trash")]
    NotTrashed,
    #[error("A filename is required")]
    EmptyFilename,
}

impl ValidationError {
    /// The metadata field the message belongs to, if any.
    pub fn field(&self) -> Option<MetadataField> {
        match self {
            ValidationError::ValueTooLong { field } => Some(*field),
            _ => None,
        }
    }
}

/// A stored history entry is missing data the timeline cannot render without.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("History entry {entry_id} of document {document_id} is missing {missing}")]
pub struct DataIntegrityError {
    pub entry_id: Uuid,
    pub document_id: Uuid,
    pub missing: &'static str,
}

/// Errors returned by `DocumentService` operations.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Document {0} not found")]
    NotFound(Uuid),
    #[error("Document store unavailable: {0}")]
    Unavailable(String),
}

impl DocumentError {
    pub(crate) fn from_port(document_id: Uuid, err: PortError) -> Self {
        match err {
            PortError::NotFound(_) => DocumentError::NotFound(document_id),
            PortError::Unavailable(msg) => DocumentError::Unavailable(msg),
        }
    }
}

/// Errors returned while building a history timeline.
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    #[error(transparent)]
    Integrity(#[from] DataIntegrityError),
    #[error("History for document {0} not found")]
    NotFound(Uuid),
    #[error("History store unavailable: {0}")]
    Unavailable(String),
}

impl TimelineError {
    pub(crate) fn from_port(document_id: Uuid, err: PortError) -> Self {
        match err {
            PortError::NotFound(_) => TimelineError::NotFound(document_id),
            PortError::Unavailable(msg) => TimelineError::Unavailable(msg),
        }
    }
}
