//! services/documents_api/src/web/middleware.rs
//!
//! Resolves the acting user for document routes.

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use tracing::debug;
use uuid::Uuid;

/// Header carrying the id of the user performing the request.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user on whose behalf a request runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActingUser(pub Uuid);

/// Middleware that reads the `x-user-id` header and stores it as `ActingUser`.
///
/// A missing header is 401 Unauthorized; a malformed one is 400 Bad Request.
pub async fn require_user(mut req: Request, next: Next) -> Result<Response, StatusCode> {
    let raw = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let user_id = Uuid::parse_str(raw.trim()).map_err(|_| {
        debug!(header = raw, "Rejected malformed user id header");
        StatusCode::BAD_REQUEST
    })?;

    req.extensions_mut().insert(ActingUser(user_id));
    Ok(next.run(req).await)
}
