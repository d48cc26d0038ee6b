//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::web::proposals::ErrorBody;
use crate::web::state::AppState;

/// The authenticated caller, inserted into request extensions by
/// [`require_auth`] for handlers to extract.
#[derive(Debug, Clone, Copy)]
pub struct AuthedUser(pub Uuid);

/// Pulls the opaque bearer token out of the `Authorization` header.
/// A missing header or a non-bearer scheme both count as "no credential".
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
}

/// Middleware that resolves the bearer token to a user identity.
///
/// If valid, inserts [`AuthedUser`] into request extensions for handlers to use.
/// If invalid or missing, returns 401 with a generic message; the underlying
/// reason is only logged server-side.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorBody>)> {
    let token = match bearer_token(req.headers()) {
        Some(token) => token.to_string(),
        None => {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(ErrorBody::new("Authorization token missing.")),
            ))
        }
    };

    let user_id = state.db.validate_auth_session(&token).await.map_err(|e| {
        error!("Failed to validate auth session: {:?}", e);
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody::new("Unauthorized. Invalid or expired token.")),
        )
    })?;

    req.extensions_mut().insert(AuthedUser(user_id));

    Ok(next.run(req).await)
}
