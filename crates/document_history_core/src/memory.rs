//! crates/document_history_core/src/memory.rs
//!
//! An in-process implementation of the persistence ports, used by tests and
//! by local wiring that does not need a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::document::Document;
use crate::domain::{HistoryEntry, User};
use crate::ports::{
    DocumentRepository, HistoryStore, HistoryStream, PortError, PortResult, UserDirectory,
};

#[derive(Default)]
struct State {
    documents: HashMap<Uuid, Document>,
    archived: HashMap<Uuid, Document>,
    history: HashMap<Uuid, Vec<HistoryEntry>>,
    users: HashMap<Uuid, User>,
}

/// Documents, history and users held in memory behind one lock.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
    history_offline: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: User) {
        self.write().users.insert(user.user_id, user);
    }

    /// While offline, history appends fail with `PortError::Unavailable`.
    pub fn set_history_offline(&self, offline: bool) {
        self.history_offline.store(offline, Ordering::SeqCst);
    }

    pub fn is_archived(&self, document_id: Uuid) -> bool {
        self.read().archived.contains_key(&document_id)
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found(document_id: Uuid) -> PortError {
    PortError::NotFound(format!("Document {} not found", document_id))
}

#[async_trait]
impl DocumentRepository for InMemoryStore {
    async fn load_document(&self, document_id: Uuid) -> PortResult<Document> {
        self.read()
            .documents
            .get(&document_id)
            .cloned()
            .ok_or_else(|| not_found(document_id))
    }

    async fn insert_document(&self, document: &Document) -> PortResult<()> {
        self.write().documents.insert(document.id, document.clone());
        Ok(())
    }

    async fn save_document(&self, document: &Document) -> PortResult<()> {
        let mut state = self.write();
        let slot = state
            .documents
            .get_mut(&document.id)
            .ok_or_else(|| not_found(document.id))?;
        *slot = document.clone();
        Ok(())
    }

    async fn list_trashed_before(&self, cutoff: DateTime<Utc>) -> PortResult<Vec<Uuid>> {
        Ok(self
            .read()
            .documents
            .values()
            .filter(|d| d.trashed && d.trashed_at.is_some_and(|at| at < cutoff))
            .map(|d| d.id)
            .collect())
    }

    async fn list_created_before(&self, cutoff: DateTime<Utc>) -> PortResult<Vec<Uuid>> {
        Ok(self
            .read()
            .documents
            .values()
            .filter(|d| !d.trashed && d.created_at < cutoff)
            .map(|d| d.id)
            .collect())
    }

    async fn archive_document(&self, document_id: Uuid) -> PortResult<()> {
        let mut state = self.write();
        let document = state
            .documents
            .remove(&document_id)
            .ok_or_else(|| not_found(document_id))?;
        state.archived.insert(document_id, document);
        Ok(())
    }

    async fn purge_document(&self, document_id: Uuid) -> PortResult<()> {
        self.write()
            .documents
            .remove(&document_id)
            .map(|_| ())
            .ok_or_else(|| not_found(document_id))
    }
}

#[async_trait]
impl HistoryStore for InMemoryStore {
    async fn append_history_entry(&self, entry: &HistoryEntry) -> PortResult<()> {
        if self.history_offline.load(Ordering::SeqCst) {
            return Err(PortError::Unavailable("history store is offline".to_string()));
        }
        self.write()
            .history
            .entry(entry.document_id)
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    fn query_history(&self, document_id: Uuid) -> HistoryStream {
        let mut entries = self
            .read()
            .history
            .get(&document_id)
            .cloned()
            .unwrap_or_default();
        entries.sort_by_key(|e| e.sequence);
        Box::pin(stream::iter(entries.into_iter().map(Ok)))
    }

    async fn last_sequence(&self, document_id: Uuid) -> PortResult<u64> {
        Ok(self
            .read()
            .history
            .get(&document_id)
            .and_then(|entries| entries.iter().map(|e| e.sequence).max())
            .unwrap_or(0))
    }

    async fn purge_history(&self, document_id: Uuid) -> PortResult<()> {
        self.write().history.remove(&document_id);
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn find_user(&self, user_id: Uuid) -> PortResult<Option<User>> {
        Ok(self.read().users.get(&user_id).cloned())
    }
}
