//! services/api/src/web/symptoms.rs
//!
//! Handlers for the symptom log: add, list, delete, and the AI-backed
//! doctor-visit summary.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;
use careprep_core::domain::{Identity, NewSymptom, Symptom};

/// Default page size for listings; the store clamps to 100 regardless.
const DEFAULT_LIST_LIMIT: i64 = 50;

/// How many records feed the AI symptom summary.
const SUMMARY_FETCH_LIMIT: i64 = 30;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct AddSymptomRequest {
    pub symptom: Option<String>,
    pub severity: Option<i32>,
    pub notes: Option<String>,
    pub date: Option<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
pub struct AddSymptomResponse {
    pub success: bool,
    #[schema(value_type = String)]
    pub id: Uuid,
    #[schema(value_type = Object)]
    pub symptom: Symptom,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

#[derive(Serialize, ToSchema)]
pub struct ListSymptomsResponse {
    #[schema(value_type = Vec<Object>)]
    pub symptoms: Vec<Symptom>,
}

#[derive(Serialize, ToSchema)]
pub struct DeleteSymptomResponse {
    pub success: bool,
}

#[derive(Serialize, ToSchema)]
pub struct SymptomSummaryResponse {
    pub success: bool,
    pub summary: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Log a new symptom entry.
#[utoipa::path(
    post,
    path = "/symptoms/add",
    request_body = AddSymptomRequest,
    responses(
        (status = 201, description = "Symptom recorded", body = AddSymptomResponse),
        (status = 400, description = "Missing or out-of-range input"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_token" = []))
)]
pub async fn add_symptom_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<AddSymptomRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let symptom = req
        .symptom
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Symptom is required".to_string()))?;
    let date = req
        .date
        .ok_or_else(|| ApiError::Validation("Date is required".to_string()))?;
    let severity = req
        .severity
        .ok_or_else(|| ApiError::Validation("Severity is required".to_string()))?;
    if !(1..=10).contains(&severity) {
        return Err(ApiError::Validation(
            "Severity must be between 1 and 10".to_string(),
        ));
    }

    let record = state
        .store
        .add_symptom(NewSymptom {
            user_id: identity.uid,
            symptom,
            severity,
            notes: req.notes.unwrap_or_default(),
            date,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AddSymptomResponse {
            success: true,
            id: record.id,
            symptom: record,
        }),
    ))
}

/// List the caller's symptoms, oldest first.
#[utoipa::path(
    get,
    path = "/symptoms/list",
    params(("limit" = Option<i64>, Query, description = "Maximum records to return (capped at 100)")),
    responses(
        (status = 200, description = "The caller's symptom log", body = ListSymptomsResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_token" = []))
)]
pub async fn list_symptoms_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let symptoms = state.store.list_symptoms(&identity.uid, limit).await?;
    Ok(Json(ListSymptomsResponse { symptoms }))
}

/// Delete one of the caller's symptoms.
#[utoipa::path(
    delete,
    path = "/symptoms/{id}",
    params(("id" = String, Path, description = "Symptom id")),
    responses(
        (status = 200, description = "Symptom deleted", body = DeleteSymptomResponse),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "No such symptom")
    ),
    security(("bearer_token" = []))
)]
pub async fn delete_symptom_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.delete_symptom(&identity.uid, id).await?;
    Ok(Json(DeleteSymptomResponse { success: true }))
}

/// Produce a doctor-friendly summary of the caller's recent symptoms.
/// Degrades to a deterministic digest when no AI backend is reachable.
#[utoipa::path(
    post,
    path = "/symptoms/summary",
    responses(
        (status = 200, description = "Summary text", body = SymptomSummaryResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_token" = []))
)]
pub async fn symptom_summary_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let symptoms = state
        .store
        .recent_symptoms(&identity.uid, SUMMARY_FETCH_LIMIT)
        .await?;
    let reply = state.ai.summarize_symptoms(&symptoms).await;
    Ok(Json(SymptomSummaryResponse {
        success: true,
        summary: reply.text,
    }))
}
