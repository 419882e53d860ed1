//! services/api/src/web/ai.rs
//!
//! Handlers for the AI-backed endpoints: chat, document summarization, and
//! the latest-summary lookup. These never surface upstream AI failures;
//! the pipeline degrades to templated text instead.

use axum::{extract::State, response::IntoResponse, Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;
use crate::web::summaries::LatestSummaryResponse;
use careprep_core::domain::{ChatMode, Identity, NewVisitSummary, Symptom, VisitSummary};
use careprep_core::ports::{ChatRequest, DocumentRequest};

/// How many recent symptoms feed the pre-visit chat context.
const CHAT_SYMPTOM_LIMIT: i64 = 10;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct ChatRequestBody {
    pub message: Option<String>,
    /// `"pre_visit"` (default) or `"post_visit"`. Validated in the handler
    /// so an unknown value answers 400 like the other input checks.
    pub mode: Option<String>,
    #[serde(default)]
    pub context: Option<ChatContextBody>,
}

/// Client-supplied context override. When absent, the server fetches the
/// caller's recent records itself.
#[derive(Deserialize, ToSchema)]
pub struct ChatContextBody {
    #[serde(default)]
    #[schema(value_type = Option<Vec<Object>>)]
    pub symptoms: Option<Vec<Symptom>>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub summary: Option<VisitSummary>,
}

#[derive(Serialize, ToSchema)]
pub struct ChatResponseBody {
    pub success: bool,
    pub response: String,
    /// Present and true only when the static template answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeRequestBody {
    pub document_id: Option<Uuid>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeResponseBody {
    pub success: bool,
    #[schema(value_type = String)]
    pub summary_id: Uuid,
    #[schema(value_type = Object)]
    pub summary: VisitSummary,
    /// Which tier of the pipeline produced the analysis. Anything other
    /// than the primary backend means the text is not grounded in the
    /// actual document content.
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<bool>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Answer a patient chat question in pre- or post-visit mode.
#[utoipa::path(
    post,
    path = "/ai/chat",
    request_body = ChatRequestBody,
    responses(
        (status = 200, description = "Assistant response", body = ChatResponseBody),
        (status = 400, description = "Missing message or invalid mode"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_token" = []))
)]
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<ChatRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    let message = req
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Message is required".to_string()))?;
    let mode = match req.mode.as_deref() {
        None | Some("pre_visit") => ChatMode::PreVisit,
        Some("post_visit") => ChatMode::PostVisit,
        Some(other) => {
            return Err(ApiError::Validation(format!("Invalid mode: {other}")));
        }
    };

    let (symptoms, summary) = match req.context {
        Some(context) => (
            context.symptoms.unwrap_or_default(),
            context.summary,
        ),
        None => match mode {
            ChatMode::PreVisit => (
                state
                    .store
                    .recent_symptoms(&identity.uid, CHAT_SYMPTOM_LIMIT)
                    .await?,
                None,
            ),
            ChatMode::PostVisit => (
                Vec::new(),
                state.store.latest_visit_summary(&identity.uid).await?,
            ),
        },
    };

    let reply = state
        .ai
        .chat(&ChatRequest {
            message,
            mode,
            symptoms,
            summary,
        })
        .await;

    Ok(Json(ChatResponseBody {
        success: true,
        response: reply.text,
        fallback: reply.fallback.then_some(true),
    }))
}

/// Summarize an uploaded document into a visit summary.
///
/// Exactly one `VisitSummary` is created per call, and the source document
/// is stamped with `processedText`/`processedAt` whichever pipeline tier
/// produced the analysis.
#[utoipa::path(
    post,
    path = "/ai/summarize",
    request_body = SummarizeRequestBody,
    responses(
        (status = 200, description = "Summary created", body = SummarizeResponseBody),
        (status = 400, description = "Missing documentId"),
        (status = 403, description = "Document owned by another user"),
        (status = 404, description = "No such document")
    ),
    security(("bearer_token" = []))
)]
pub async fn summarize_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<SummarizeRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    let document_id = req
        .document_id
        .ok_or_else(|| ApiError::Validation("documentId is required".to_string()))?;

    let document = state.store.get_document(&identity.uid, document_id).await?;
    let bytes = state.files.read(&document.file_path).await?;

    let reply = state
        .ai
        .summarize_document(&DocumentRequest {
            file_name: document.file_name.clone(),
            file_type: document.file_type.clone(),
            bytes,
        })
        .await;

    let summary = state
        .store
        .add_visit_summary(NewVisitSummary {
            user_id: identity.uid,
            document_id,
            analysis: reply.analysis.clone(),
        })
        .await?;
    state
        .store
        .mark_document_processed(document_id, &reply.analysis.processed_text, Utc::now())
        .await?;

    Ok(Json(SummarizeResponseBody {
        success: true,
        summary_id: summary.id,
        summary,
        source: reply.source,
        fallback: reply.fallback.then_some(true),
    }))
}

/// Return the caller's most recent visit summary, if any.
#[utoipa::path(
    get,
    path = "/ai/summary",
    responses(
        (status = 200, description = "Latest summary or null", body = LatestSummaryResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_token" = []))
)]
pub async fn latest_ai_summary_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state.store.latest_visit_summary(&identity.uid).await?;
    Ok(Json(LatestSummaryResponse { summary }))
}
