//! crates/document_history_core/src/service.rs
//!
//! The write path for documents: load, mutate, save, then emit exactly one
//! lifecycle event.
//!
//! A successful return means the document was saved. Whether its audit entry
//! was recorded is reported separately in `MutationOutcome::dispatch`.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::document::Document;
use crate::domain::{DocumentMetadata, MetadataChanges};
use crate::emitter::{DispatchReport, EventEmitter};
use crate::error::{DocumentError, ValidationError};
use crate::events::LifecycleEventKind;
use crate::ports::DocumentRepository;

/// The saved document and how its lifecycle event was dispatched.
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    pub document: Document,
    pub dispatch: DispatchReport,
}

pub struct DocumentService {
    documents: Arc<dyn DocumentRepository>,
    emitter: Arc<EventEmitter>,
}

impl DocumentService {
    pub fn new(documents: Arc<dyn DocumentRepository>, emitter: Arc<EventEmitter>) -> Self {
        Self { documents, emitter }
    }

    pub async fn create_document(
        &self,
        user_id: Uuid,
        filename: &str,
        metadata: DocumentMetadata,
    ) -> Result<MutationOutcome, DocumentError> {
        let filename = filename.trim();
        if filename.is_empty() {
            return Err(ValidationError::EmptyFilename.into());
        }

        let document = Document::new(filename, metadata, Utc::now());
        self.documents
            .insert_document(&document)
            .await
            .map_err(|e| DocumentError::from_port(document.id, e))?;

        let kind = LifecycleEventKind::Created {
            filename: document.filename.clone(),
        };
        let dispatch = self.emitter.emit(&document, user_id, kind).await;
        Ok(MutationOutcome { document, dispatch })
    }

    pub async fn get_document(&self, document_id: Uuid) -> Result<Document, DocumentError> {
        self.documents
            .load_document(document_id)
            .await
            .map_err(|e| DocumentError::from_port(document_id, e))
    }

    pub async fn update_metadata(
        &self,
        document_id: Uuid,
        user_id: Uuid,
        changes: &MetadataChanges,
    ) -> Result<MutationOutcome, DocumentError> {
        self.mutate(document_id, user_id, |document, now| {
            let changes = document.update_metadata(changes, now)?;
            Ok(LifecycleEventKind::MetadataUpdated { changes })
        })
        .await
    }

    pub async fn set_processed(
        &self,
        document_id: Uuid,
        user_id: Uuid,
        processed: bool,
    ) -> Result<MutationOutcome, DocumentError> {
        self.mutate(document_id, user_id, |document, now| {
            let processed = document.set_processed(processed, now)?;
            Ok(LifecycleEventKind::Processed { processed })
        })
        .await
    }

    pub async fn trash(&self, document_id: Uuid, user_id: Uuid) -> Result<MutationOutcome, DocumentError> {
        self.mutate(document_id, user_id, |document, now| {
            document.trash(now)?;
            Ok(LifecycleEventKind::Trashed { trashed: true })
        })
        .await
    }

    pub async fn restore(&self, document_id: Uuid, user_id: Uuid) -> Result<MutationOutcome, DocumentError> {
        self.mutate(document_id, user_id, |document, now| {
            document.restore(now)?;
            Ok(LifecycleEventKind::Trashed { trashed: false })
        })
        .await
    }

    async fn mutate<F>(
        &self,
        document_id: Uuid,
        user_id: Uuid,
        apply: F,
    ) -> Result<MutationOutcome, DocumentError>
    where
        F: FnOnce(&mut Document, DateTime<Utc>) -> Result<LifecycleEventKind, ValidationError> + Send,
    {
        let mut document = self.get_document(document_id).await?;

        let kind = apply(&mut document, Utc::now()).map_err(|e| {
            debug!(document_id = %document_id, error = %e, "Document mutation rejected");
            e
        })?;

        self.documents
            .save_document(&document)
            .await
            .map_err(|e| DocumentError::from_port(document_id, e))?;

        let dispatch = self.emitter.emit(&document, user_id, kind).await;
        if !dispatch.is_complete() {
            warn!(
                document_id = %document_id,
                failed = ?dispatch.failed,
                "Document saved but not every listener recorded the change"
            );
        }
        Ok(MutationOutcome { document, dispatch })
    }
}
