//! services/documents_api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of
//! the persistence ports from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_stream::stream;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use document_history_core::document::Document;
use document_history_core::domain::{ActionType, DocumentMetadata, HistoryEntry, User};
use document_history_core::ports::{
    DocumentRepository, HistoryStore, HistoryStream, PortError, PortResult, UserDirectory,
};
use futures::TryStreamExt;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the persistence ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unavailable(e: sqlx::Error) -> PortError {
    PortError::Unavailable(e.to_string())
}

fn not_found(document_id: Uuid) -> PortError {
    PortError::NotFound(format!("Document {} not found", document_id))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const DOCUMENT_COLUMNS: &str = "id, filename, policy_number, loss_sequence, claimant, description, \
     assigned_to, producer_number, processed, trashed, trashed_at, created_at, updated_at";

#[derive(FromRow)]
struct DocumentRecord {
    id: Uuid,
    filename: String,
    policy_number: Option<String>,
    loss_sequence: Option<String>,
    claimant: Option<String>,
    description: Option<String>,
    assigned_to: Option<String>,
    producer_number: Option<String>,
    processed: bool,
    trashed: bool,
    trashed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl DocumentRecord {
    fn to_domain(self) -> Document {
        Document {
            id: self.id,
            filename: self.filename,
            metadata: DocumentMetadata {
                policy_number: self.policy_number,
                loss_sequence: self.loss_sequence,
                claimant: self.claimant,
                description: self.description,
                assigned_to: self.assigned_to,
                producer_number: self.producer_number,
            },
            processed: self.processed,
            trashed: self.trashed,
            trashed_at: self.trashed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct HistoryRecord {
    id: Uuid,
    document_id: Uuid,
    sequence: i64,
    action: String,
    description: Option<String>,
    occurred_at: DateTime<Utc>,
    user_id: Option<Uuid>,
    user_display_name: Option<String>,
}
impl HistoryRecord {
    fn to_domain(self) -> HistoryEntry {
        let user = match (self.user_id, self.user_display_name) {
            (Some(user_id), Some(display_name)) => Some(User {
                user_id,
                display_name,
            }),
            _ => None,
        };
        HistoryEntry {
            id: self.id,
            document_id: self.document_id,
            sequence: self.sequence as u64,
            action: ActionType::from(self.action.as_str()),
            description: self.description,
            occurred_at: self.occurred_at,
            user,
        }
    }
}

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    display_name: String,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            display_name: self.display_name,
        }
    }
}

//=========================================================================================
// `DocumentRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentRepository for DbAdapter {
    async fn load_document(&self, document_id: Uuid) -> PortResult<Document> {
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1 AND archived_at IS NULL"
        );
        let record = sqlx::query_as::<_, DocumentRecord>(&sql)
            .bind(document_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => not_found(document_id),
                _ => unavailable(e),
            })?;
        Ok(record.to_domain())
    }

    async fn insert_document(&self, document: &Document) -> PortResult<()> {
        let sql = format!(
            "INSERT INTO documents ({DOCUMENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
        );
        let m = &document.metadata;
        sqlx::query(&sql)
            .bind(document.id)
            .bind(&document.filename)
            .bind(&m.policy_number)
            .bind(&m.loss_sequence)
            .bind(&m.claimant)
            .bind(&m.description)
            .bind(&m.assigned_to)
            .bind(&m.producer_number)
            .bind(document.processed)
            .bind(document.trashed)
            .bind(document.trashed_at)
            .bind(document.created_at)
            .bind(document.updated_at)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn save_document(&self, document: &Document) -> PortResult<()> {
        let m = &document.metadata;
        let result = sqlx::query(
            "UPDATE documents SET filename = $2, policy_number = $3, loss_sequence = $4, \
             claimant = $5, description = $6, assigned_to = $7, producer_number = $8, \
             processed = $9, trashed = $10, trashed_at = $11, updated_at = $12 \
             WHERE id = $1 AND archived_at IS NULL",
        )
        .bind(document.id)
        .bind(&document.filename)
        .bind(&m.policy_number)
        .bind(&m.loss_sequence)
        .bind(&m.claimant)
        .bind(&m.description)
        .bind(&m.assigned_to)
        .bind(&m.producer_number)
        .bind(document.processed)
        .bind(document.trashed)
        .bind(document.trashed_at)
        .bind(document.updated_at)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        if result.rows_affected() == 0 {
            return Err(not_found(document.id));
        }
        Ok(())
    }

    async fn list_trashed_before(&self, cutoff: DateTime<Utc>) -> PortResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM documents WHERE trashed AND trashed_at < $1 AND archived_at IS NULL",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)
    }

    async fn list_created_before(&self, cutoff: DateTime<Utc>) -> PortResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM documents WHERE NOT trashed AND created_at < $1 AND archived_at IS NULL",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)
    }

    async fn archive_document(&self, document_id: Uuid) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE documents SET archived_at = now() WHERE id = $1 AND archived_at IS NULL",
        )
        .bind(document_id)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        if result.rows_affected() == 0 {
            return Err(not_found(document_id));
        }
        Ok(())
    }

    async fn purge_document(&self, document_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;

        if result.rows_affected() == 0 {
            return Err(not_found(document_id));
        }
        Ok(())
    }
}

//=========================================================================================
// `HistoryStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl HistoryStore for DbAdapter {
    async fn append_history_entry(&self, entry: &HistoryEntry) -> PortResult<()> {
        let (user_id, user_display_name) = match &entry.user {
            Some(user) => (Some(user.user_id), Some(user.display_name.as_str())),
            None => (None, None),
        };
        sqlx::query(
            "INSERT INTO document_history \
             (id, document_id, sequence, action, description, occurred_at, user_id, user_display_name) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(entry.id)
        .bind(entry.document_id)
        .bind(entry.sequence as i64)
        .bind(entry.action.as_str())
        .bind(&entry.description)
        .bind(entry.occurred_at)
        .bind(user_id)
        .bind(user_display_name)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(())
    }

    fn query_history(&self, document_id: Uuid) -> HistoryStream {
        let pool = self.pool.clone();
        Box::pin(stream! {
            let mut rows = sqlx::query_as::<_, HistoryRecord>(
                "SELECT id, document_id, sequence, action, description, occurred_at, user_id, \
                 user_display_name FROM document_history WHERE document_id = $1 ORDER BY sequence ASC",
            )
            .bind(document_id)
            .fetch(&pool);

            loop {
                match rows.try_next().await {
                    Ok(Some(record)) => yield Ok(record.to_domain()),
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(unavailable(e));
                        break;
                    }
                }
            }
        })
    }

    async fn last_sequence(&self, document_id: Uuid) -> PortResult<u64> {
        let last = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(MAX(sequence), 0) FROM document_history WHERE document_id = $1",
        )
        .bind(document_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(last as u64)
    }

    async fn purge_history(&self, document_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM document_history WHERE document_id = $1")
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}

//=========================================================================================
// `UserDirectory` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserDirectory for DbAdapter {
    async fn find_user(&self, user_id: Uuid) -> PortResult<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, display_name FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(record.map(UserRecord::to_domain))
    }
}
