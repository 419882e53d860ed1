//! services/api/src/web/summaries.rs
//!
//! Read-only handlers for visit summaries. Summaries are created by the
//! AI summarize endpoint and never deleted through the API.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;
use careprep_core::domain::{Identity, VisitSummary};

const DEFAULT_LIST_LIMIT: i64 = 50;

//=========================================================================================
// Response Types
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct ListSummariesResponse {
    #[schema(value_type = Vec<Object>)]
    pub summaries: Vec<VisitSummary>,
}

#[derive(Serialize, ToSchema)]
pub struct LatestSummaryResponse {
    #[schema(value_type = Option<Object>)]
    pub summary: Option<VisitSummary>,
}

#[derive(Serialize, ToSchema)]
pub struct GetSummaryResponse {
    #[schema(value_type = Object)]
    pub summary: VisitSummary,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// List the caller's visit summaries, newest first.
#[utoipa::path(
    get,
    path = "/visit-summaries/list",
    responses(
        (status = 200, description = "The caller's visit summaries", body = ListSummariesResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_token" = []))
)]
pub async fn list_summaries_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let summaries = state
        .store
        .list_visit_summaries(&identity.uid, DEFAULT_LIST_LIMIT)
        .await?;
    Ok(Json(ListSummariesResponse { summaries }))
}

/// Return the caller's most recent visit summary, if any.
#[utoipa::path(
    get,
    path = "/visit-summaries/latest",
    responses(
        (status = 200, description = "Latest summary or null", body = LatestSummaryResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_token" = []))
)]
pub async fn latest_summary_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state.store.latest_visit_summary(&identity.uid).await?;
    Ok(Json(LatestSummaryResponse { summary }))
}

/// Fetch one visit summary.
#[utoipa::path(
    get,
    path = "/visit-summaries/{id}",
    params(("id" = String, Path, description = "Visit summary id")),
    responses(
        (status = 200, description = "The visit summary", body = GetSummaryResponse),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "No such summary")
    ),
    security(("bearer_token" = []))
)]
pub async fn get_summary_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state.store.get_visit_summary(&identity.uid, id).await?;
    Ok(Json(GetSummaryResponse { summary }))
}
