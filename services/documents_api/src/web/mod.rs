pub mod middleware;
pub mod rest;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;

pub use middleware::require_user;
pub use rest::{
    create_document_handler, document_history_handler, get_document_handler,
    restore_document_handler, set_processed_handler, trash_document_handler,
    update_metadata_handler,
};
use state::AppState;

/// Builds the document routes. Every route requires the acting-user header.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/documents", post(create_document_handler))
        .route("/documents/{id}", get(get_document_handler))
        .route("/documents/{id}/metadata", patch(update_metadata_handler))
        .route("/documents/{id}/processed", put(set_processed_handler))
        .route("/documents/{id}/trash", post(trash_document_handler))
        .route("/documents/{id}/restore", post(restore_document_handler))
        .route("/documents/{id}/history", get(document_history_handler))
        .layer(axum_middleware::from_fn(require_user))
        .with_state(app_state)
}
