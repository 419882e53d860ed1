//! services/api/src/web/auth.rs
//!
//! The token-verification endpoint. The heavy lifting happens in the auth
//! middleware; by the time this handler runs, the identity is proven.

use axum::{response::IntoResponse, Extension, Json};
use serde::Serialize;
use utoipa::ToSchema;

use careprep_core::domain::Identity;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    #[schema(value_type = Object)]
    pub user: Identity,
}

/// Confirm a bearer token and return the caller's identity.
#[utoipa::path(
    post,
    path = "/auth/verify",
    responses(
        (status = 200, description = "Token is valid", body = VerifyResponse),
        (status = 401, description = "Missing, expired, or invalid token")
    ),
    security(("bearer_token" = []))
)]
pub async fn verify_handler(Extension(identity): Extension<Identity>) -> impl IntoResponse {
    Json(VerifyResponse {
        success: true,
        user: identity,
    })
}
