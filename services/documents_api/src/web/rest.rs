//! services/documents_api/src/web/rest.rs
//!
//! Contains the Axum handlers for the document endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::middleware::ActingUser;
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use document_history_core::{
    Document, DocumentError, DocumentMetadata, MetadataChanges, MetadataField, MutationOutcome,
    TimelineEntry, TimelineError, ValidationError,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        create_document_handler,
        get_document_handler,
        update_metadata_handler,
        set_processed_handler,
        trash_document_handler,
        restore_document_handler,
        document_history_handler,
    ),
    components(
        schemas(
            CreateDocumentRequest,
            UpdateMetadataRequest,
            SetProcessedRequest,
            MetadataResponse,
            DocumentResponse,
            MutationResponse,
            HistoryUserResponse,
            TimelineEntryResponse,
            HistoryResponse,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Documents API", description = "Document metadata, lifecycle and audit history.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// Upload record for a new document. Metadata keys use the camelCase field names.
#[derive(Deserialize, ToSchema)]
pub struct CreateDocumentRequest {
    pub filename: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Metadata edits keyed by camelCase field name. An empty value clears the field.
#[derive(Deserialize, ToSchema)]
pub struct UpdateMetadataRequest {
    pub changes: BTreeMap<String, String>,
}

#[derive(Deserialize, ToSchema)]
pub struct SetProcessedRequest {
    pub processed: bool,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetadataResponse {
    pub policy_number: Option<String>,
    pub loss_sequence: Option<String>,
    pub claimant: Option<String>,
    pub description: Option<String>,
    pub assigned_to: Option<String>,
    pub producer_number: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub filename: String,
    pub metadata: MetadataResponse,
    pub processed: bool,
    pub trashed: bool,
    pub trashed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(document: Document) -> Self {
        let m = document.metadata;
        Self {
            id: document.id,
            filename: document.filename,
            metadata: MetadataResponse {
                policy_number: m.policy_number,
                loss_sequence: m.loss_sequence,
                claimant: m.claimant,
                description: m.description,
                assigned_to: m.assigned_to,
                producer_number: m.producer_number,
            },
            processed: document.processed,
            trashed: document.trashed,
            trashed_at: document.trashed_at,
            created_at: document.created_at,
            updated_at: document.updated_at,
        }
    }
}

/// The saved document, and whether its history entry was recorded.
#[derive(Serialize, ToSchema)]
pub struct MutationResponse {
    pub document: DocumentResponse,
    pub history_recorded: bool,
}

impl From<MutationOutcome> for MutationResponse {
    fn from(outcome: MutationOutcome) -> Self {
        Self {
            history_recorded: outcome.dispatch.is_complete(),
            document: outcome.document.into(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct HistoryUserResponse {
    pub id: Uuid,
    pub name: String,
}

#[derive(Serialize, ToSchema)]
pub struct TimelineEntryResponse {
    pub id: Uuid,
    pub sequence: u64,
    pub action: String,
    pub icon: String,
    pub label: String,
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub display_timestamp: String,
    pub user: HistoryUserResponse,
}

impl From<TimelineEntry> for TimelineEntryResponse {
    fn from(entry: TimelineEntry) -> Self {
        Self {
            id: entry.id,
            sequence: entry.sequence,
            action: entry.action.as_str().to_string(),
            icon: entry.icon.to_string(),
            label: entry.label,
            description: entry.description,
            timestamp: entry.occurred_at,
            display_timestamp: entry.display_timestamp,
            user: HistoryUserResponse {
                id: entry.user.user_id,
                name: entry.user.display_name,
            },
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct HistoryResponse {
    pub document_id: Uuid,
    pub entries: Vec<TimelineEntryResponse>,
}

/// Error body. `field` names the metadata field a validation message belongs to.
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, message: impl Into<String>) -> HandlerError {
    (
        status,
        Json(ErrorResponse {
            message: message.into(),
            field: None,
        }),
    )
}

fn validation_error(e: ValidationError) -> HandlerError {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorResponse {
            message: e.to_string(),
            field: e.field().map(|f| f.as_str().to_string()),
        }),
    )
}

fn document_error(e: DocumentError) -> HandlerError {
    match e {
        DocumentError::Validation(v) => validation_error(v),
        DocumentError::NotFound(_) => error_response(StatusCode::NOT_FOUND, e.to_string()),
        DocumentError::Unavailable(_) => {
            error!("Document store failure: {:?}", e);
            error_response(StatusCode::SERVICE_UNAVAILABLE, "Document store is unavailable")
        }
    }
}

fn parse_changes(raw: BTreeMap<String, String>) -> Result<MetadataChanges, HandlerError> {
    raw.into_iter()
        .map(|(name, value)| Ok((name.parse::<MetadataField>()?, value)))
        .collect::<Result<MetadataChanges, ValidationError>>()
        .map_err(validation_error)
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Register a new document.
#[utoipa::path(
    post,
    path = "/documents",
    request_body = CreateDocumentRequest,
    responses(
        (status = 201, description = "Document created", body = MutationResponse),
        (status = 422, description = "Invalid filename or metadata", body = ErrorResponse),
        (status = 503, description = "Document store unavailable", body = ErrorResponse)
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the acting user.")
    )
)]
pub async fn create_document_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ActingUser(user_id)): Extension<ActingUser>,
    Json(req): Json<CreateDocumentRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let changes = parse_changes(req.metadata)?;
    let metadata = DocumentMetadata::from_changes(&changes).map_err(validation_error)?;

    let outcome = app_state
        .documents
        .create_document(user_id, &req.filename, metadata)
        .await
        .map_err(document_error)?;

    Ok((StatusCode::CREATED, Json(MutationResponse::from(outcome))))
}

/// Fetch a document's current state.
#[utoipa::path(
    get,
    path = "/documents/{id}",
    responses(
        (status = 200, description = "The document", body = DocumentResponse),
        (status = 404, description = "No such document", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Document id."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the acting user.")
    )
)]
pub async fn get_document_handler(
    State(app_state): State<Arc<AppState>>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<DocumentResponse>, HandlerError> {
    let document = app_state
        .documents
        .get_document(document_id)
        .await
        .map_err(document_error)?;
    Ok(Json(document.into()))
}

/// Edit document metadata. Rejected while the document is processed.
#[utoipa::path(
    patch,
    path = "/documents/{id}/metadata",
    request_body = UpdateMetadataRequest,
    responses(
        (status = 200, description = "Metadata updated", body = MutationResponse),
        (status = 404, description = "No such document", body = ErrorResponse),
        (status = 422, description = "Edit rejected", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Document id."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the acting user.")
    )
)]
pub async fn update_metadata_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ActingUser(user_id)): Extension<ActingUser>,
    Path(document_id): Path<Uuid>,
    Json(req): Json<UpdateMetadataRequest>,
) -> Result<Json<MutationResponse>, HandlerError> {
    let changes = parse_changes(req.changes)?;
    let outcome = app_state
        .documents
        .update_metadata(document_id, user_id, &changes)
        .await
        .map_err(document_error)?;
    Ok(Json(outcome.into()))
}

/// Mark or unmark a document as processed.
#[utoipa::path(
    put,
    path = "/documents/{id}/processed",
    request_body = SetProcessedRequest,
    responses(
        (status = 200, description = "Processed state changed", body = MutationResponse),
        (status = 404, description = "No such document", body = ErrorResponse),
        (status = 422, description = "Already in that state", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Document id."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the acting user.")
    )
)]
pub async fn set_processed_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ActingUser(user_id)): Extension<ActingUser>,
    Path(document_id): Path<Uuid>,
    Json(req): Json<SetProcessedRequest>,
) -> Result<Json<MutationResponse>, HandlerError> {
    let outcome = app_state
        .documents
        .set_processed(document_id, user_id, req.processed)
        .await
        .map_err(document_error)?;
    Ok(Json(outcome.into()))
}

/// Move a document to the trash.
#[utoipa::path(
    post,
    path = "/documents/{id}/trash",
    responses(
        (status = 200, description = "Document trashed", body = MutationResponse),
        (status = 404, description = "No such document", body = ErrorResponse),
        (status = 422, description = "Already trashed", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Document id."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the acting user.")
    )
)]
pub async fn trash_document_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ActingUser(user_id)): Extension<ActingUser>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<MutationResponse>, HandlerError> {
    let outcome = app_state
        .documents
        .trash(document_id, user_id)
        .await
        .map_err(document_error)?;
    Ok(Json(outcome.into()))
}

/// Restore a trashed document.
#[utoipa::path(
    post,
    path = "/documents/{id}/restore",
    responses(
        (status = 200, description = "Document restored", body = MutationResponse),
        (status = 404, description = "No such document", body = ErrorResponse),
        (status = 422, description = "Document is not trashed", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Document id."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the acting user.")
    )
)]
pub async fn restore_document_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ActingUser(user_id)): Extension<ActingUser>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<MutationResponse>, HandlerError> {
    let outcome = app_state
        .documents
        .restore(document_id, user_id)
        .await
        .map_err(document_error)?;
    Ok(Json(outcome.into()))
}

/// The document's audit history as a display-ready timeline.
#[utoipa::path(
    get,
    path = "/documents/{id}/history",
    responses(
        (status = 200, description = "History timeline", body = HistoryResponse),
        (status = 404, description = "No such document", body = ErrorResponse),
        (status = 500, description = "Stored history is incomplete", body = ErrorResponse),
        (status = 503, description = "History store unavailable", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Document id."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the acting user.")
    )
)]
pub async fn document_history_handler(
    State(app_state): State<Arc<AppState>>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<HistoryResponse>, HandlerError> {
    app_state
        .documents
        .get_document(document_id)
        .await
        .map_err(document_error)?;

    let timeline = app_state
        .timeline
        .build_timeline(document_id)
        .await
        .map_err(|e| match e {
            TimelineError::Integrity(_) => {
                error!("Cannot render history: {}", e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            TimelineError::NotFound(_) => error_response(StatusCode::NOT_FOUND, e.to_string()),
            TimelineError::Unavailable(_) => {
                error!("History store failure: {:?}", e);
                error_response(StatusCode::SERVICE_UNAVAILABLE, "History store is unavailable")
            }
        })?;

    Ok(Json(HistoryResponse {
        document_id,
        entries: timeline.into_iter().map(TimelineEntryResponse::from).collect(),
    }))
}
