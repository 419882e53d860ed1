//! services/api/src/web/rest.rs
//!
//! Contains the health endpoint, the router assembly, and the master
//! definition for the OpenAPI specification.

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

use crate::web::documents::MAX_UPLOAD_BYTES;
use crate::web::state::AppState;
use crate::web::{ai, auth, documents, middleware, summaries, symptoms};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::verify_handler,
        symptoms::add_symptom_handler,
        symptoms::list_symptoms_handler,
        symptoms::delete_symptom_handler,
        symptoms::symptom_summary_handler,
        documents::upload_document_handler,
        documents::list_documents_handler,
        documents::get_document_handler,
        documents::download_document_handler,
        documents::delete_document_handler,
        ai::chat_handler,
        ai::summarize_handler,
        ai::latest_ai_summary_handler,
        summaries::list_summaries_handler,
        summaries::latest_summary_handler,
        summaries::get_summary_handler,
    ),
    components(
        schemas(
            HealthResponse,
            auth::VerifyResponse,
            symptoms::AddSymptomRequest,
            symptoms::AddSymptomResponse,
            symptoms::ListSymptomsResponse,
            symptoms::DeleteSymptomResponse,
            symptoms::SymptomSummaryResponse,
            documents::UploadResponse,
            documents::ListDocumentsResponse,
            documents::GetDocumentResponse,
            documents::DeleteDocumentResponse,
            ai::ChatRequestBody,
            ai::ChatContextBody,
            ai::ChatResponseBody,
            ai::SummarizeRequestBody,
            ai::SummarizeResponseBody,
            summaries::ListSummariesResponse,
            summaries::LatestSummaryResponse,
            summaries::GetSummaryResponse,
        )
    ),
    modifiers(&BearerToken),
    tags(
        (name = "CarePrep API", description = "API endpoints for patient visit preparation.")
    )
)]
pub struct ApiDoc;

/// Registers the bearer-token scheme the protected paths reference.
struct BearerToken;

impl Modify for BearerToken {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_token",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

//=========================================================================================
// Health Endpoint
//=========================================================================================

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub firebase_ready: bool,
    pub timestamp: String,
}

/// Liveness check; the only route outside the auth gate.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "CarePrep API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        firebase_ready: state.verifier.ready(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

//=========================================================================================
// Router Assembly
//=========================================================================================

/// Builds the application router around a prepared `AppState`. Kept out of
/// `main` so tests can drive the exact same routes with fake adapters.
pub fn router(app_state: Arc<AppState>) -> Router {
    let cors = match app_state.config.frontend_url.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]),
        Err(_) => {
            warn!(
                "FRONTEND_URL {:?} is not a valid origin; CORS stays closed",
                app_state.config.frontend_url
            );
            CorsLayer::new()
        }
    };

    // Public routes (no auth required)
    let public_routes = Router::new().route("/health", get(health_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/verify", post(auth::verify_handler))
        .route("/symptoms/add", post(symptoms::add_symptom_handler))
        .route("/symptoms/list", get(symptoms::list_symptoms_handler))
        .route("/symptoms/summary", post(symptoms::symptom_summary_handler))
        .route("/symptoms/{id}", delete(symptoms::delete_symptom_handler))
        .route("/documents/upload", post(documents::upload_document_handler))
        .route("/documents/list", get(documents::list_documents_handler))
        .route(
            "/documents/{id}/file",
            get(documents::download_document_handler),
        )
        .route(
            "/documents/{id}",
            get(documents::get_document_handler).delete(documents::delete_document_handler),
        )
        .route("/ai/chat", post(ai::chat_handler))
        .route("/ai/summarize", post(ai::summarize_handler))
        .route("/ai/summary", get(ai::latest_ai_summary_handler))
        .route(
            "/visit-summaries/list",
            get(summaries::list_summaries_handler),
        )
        .route(
            "/visit-summaries/latest",
            get(summaries::latest_summary_handler),
        )
        .route("/visit-summaries/{id}", get(summaries::get_summary_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            middleware::require_auth,
        ));

    // The body limit leaves headroom above the file cap so the handler can
    // answer an over-sized upload with its own 400 instead of a bare 413.
    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024))
        .layer(cors)
        .with_state(app_state)
}
