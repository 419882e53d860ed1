//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::web::state::AppState;

use careprep_core::ports::AuthError;

/// Middleware that verifies the bearer token and extracts the identity.
///
/// The token is delegated to the identity provider through the
/// `TokenVerifier` port; on success the `Identity` lands in the request
/// extensions for handlers to use. Failures map onto 401 (or 503 when the
/// provider itself is down).
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Extract the Authorization header
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    // 2. Pull the token out of the `Bearer <token>` scheme
    let token = header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;

    // 3. Delegate verification to the identity provider
    let identity = state.verifier.verify(token).await?;

    // 4. Insert the identity into request extensions
    req.extensions_mut().insert(identity);

    // 5. Continue to the handler
    Ok(next.run(req).await)
}
