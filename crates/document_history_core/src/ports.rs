//! crates/document_history_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use std::pin::Pin;
use uuid::Uuid;

use crate::document::Document;
use crate::domain::{HistoryEntry, User};
use crate::events::LifecycleEvent;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// A lazy, finite stream of history entries in storage order.
pub type HistoryStream = Pin<Box<dyn Stream<Item = PortResult<HistoryEntry>> + Send>>;

//=========================================================================================
// Persistence Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn load_document(&self, document_id: Uuid) -> PortResult<Document>;

    async fn insert_document(&self, document: &Document) -> PortResult<()>;

    /// Overwrites the stored state of an existing document.
    async fn save_document(&self, document: &Document) -> PortResult<()>;

    /// Ids of trashed documents whose `trashed_at` is before `cutoff`.
    async fn list_trashed_before(&self, cutoff: DateTime<Utc>) -> PortResult<Vec<Uuid>>;

    /// Ids of active (not trashed) documents created before `cutoff`.
    async fn list_created_before(&self, cutoff: DateTime<Utc>) -> PortResult<Vec<Uuid>>;

    /// Moves a document out of the active store.
    async fn archive_document(&self, document_id: Uuid) -> PortResult<()>;

    /// Permanently deletes a document.
    async fn purge_document(&self, document_id: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append_history_entry(&self, entry: &HistoryEntry) -> PortResult<()>;

    /// Streams a document's entries ordered by sequence, oldest first.
    fn query_history(&self, document_id: Uuid) -> HistoryStream;

    /// The highest sequence stored for the document, or 0 if it has none.
    async fn last_sequence(&self, document_id: Uuid) -> PortResult<u64>;

    async fn purge_history(&self, document_id: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, user_id: Uuid) -> PortResult<Option<User>>;
}

//=========================================================================================
// Event Listener Port
//=========================================================================================

#[async_trait]
pub trait LifecycleListener: Send + Sync {
    /// Short name used when logging dispatch failures.
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &LifecycleEvent) -> PortResult<()>;
}
