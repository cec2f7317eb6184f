//! crates/document_history_core/src/history.rs
//!
//! The append-only audit history log.
//!
//! Every entry gets the next sequence number within its document. Appends to
//! the same document serialize on a per-document slot holding the last
//! assigned sequence; appends to different documents never wait on each
//! other. A slot only lives while appends for its document are in flight and
//! is seeded from storage when created, so numbering survives restarts and
//! the map never grows past the documents currently being written.

use futures::TryStreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;
use uuid::Uuid;

use crate::domain::{HistoryEntry, NewHistoryEntry};
use crate::ports::{HistoryStore, HistoryStream, PortResult};

type SequenceSlot = Arc<tokio::sync::Mutex<Option<u64>>>;

pub struct AuditHistoryLog {
    store: Arc<dyn HistoryStore>,
    slots: Mutex<HashMap<Uuid, SequenceSlot>>,
}

impl AuditHistoryLog {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self {
            store,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Sequences and stores one entry, returning it as stored.
    ///
    /// If storage rejects the entry its sequence number is not consumed, and
    /// the next append re-reads the last sequence from storage in case the
    /// write landed anyway.
    pub async fn append(&self, entry: NewHistoryEntry) -> PortResult<HistoryEntry> {
        let document_id = entry.document_id;
        let slot = self.slot(document_id);
        let mut last = slot.lock().await;

        let result = self.append_after(*last, entry).await;
        *last = result.as_ref().ok().map(|stored| stored.sequence);
        drop(last);

        self.release_if_idle(document_id, &slot);
        result
    }

    async fn append_after(&self, last: Option<u64>, entry: NewHistoryEntry) -> PortResult<HistoryEntry> {
        let document_id = entry.document_id;
        let previous = match last {
            Some(sequence) => sequence,
            None => self.store.last_sequence(document_id).await?,
        };
        let stored = HistoryEntry::from_new(entry, previous + 1);
        self.store.append_history_entry(&stored).await?;

        debug!(
            document_id = %document_id,
            sequence = stored.sequence,
            action = %stored.action,
            "History entry appended"
        );
        Ok(stored)
    }

    /// Streams the document's entries oldest first. Each call starts a fresh pass.
    pub fn query(&self, document_id: Uuid) -> HistoryStream {
        self.store.query_history(document_id)
    }

    /// Collects the whole of `query` into memory.
    pub async fn entries(&self, document_id: Uuid) -> PortResult<Vec<HistoryEntry>> {
        self.query(document_id).try_collect().await
    }

    /// Deletes the document's history and forgets its sequence.
    pub async fn purge(&self, document_id: Uuid) -> PortResult<()> {
        let slot = self.slot(document_id);
        let mut last = slot.lock().await;
        let result = self.store.purge_history(document_id).await;
        *last = None;
        drop(last);

        self.release_if_idle(document_id, &slot);
        result
    }

    /// Drops the document's slot unless another task is holding a clone of it.
    /// A dropped slot is reseeded from storage on the next append.
    fn release_if_idle(&self, document_id: Uuid, slot: &SequenceSlot) {
        let mut slots = self.lock_slots();
        let idle = slots
            .get(&document_id)
            .is_some_and(|held| Arc::ptr_eq(held, slot) && Arc::strong_count(slot) == 2);
        if idle {
            slots.remove(&document_id);
        }
    }

    fn slot(&self, document_id: Uuid) -> SequenceSlot {
        self.lock_slots()
            .entry(document_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(None)))
            .clone()
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<Uuid, SequenceSlot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
