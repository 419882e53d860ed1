//! services/api/src/web/documents.rs
//!
//! Handlers for medical document upload, listing, download, and deletion.
//! Files land in the user-partitioned file store; the record goes to the
//! record store with a storage-local path.

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;
use careprep_core::domain::{Document, Identity, NewDocument};

/// Hard ceiling for one uploaded file.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// MIME types the upload accepts.
const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "image/jpeg",
    "image/png",
    "text/csv",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

const DEFAULT_LIST_LIMIT: i64 = 50;

//=========================================================================================
// Response Types
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    pub success: bool,
    #[schema(value_type = String)]
    pub id: Uuid,
    #[schema(value_type = Object)]
    pub document: Document,
}

#[derive(Serialize, ToSchema)]
pub struct ListDocumentsResponse {
    #[schema(value_type = Vec<Object>)]
    pub documents: Vec<Document>,
}

#[derive(Serialize, ToSchema)]
pub struct GetDocumentResponse {
    #[schema(value_type = Object)]
    pub document: Document,
}

#[derive(Serialize, ToSchema)]
pub struct DeleteDocumentResponse {
    pub success: bool,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Upload a medical document (multipart, one file part).
#[utoipa::path(
    post,
    path = "/documents/upload",
    request_body(content_type = "multipart/form-data", description = "The document to upload."),
    responses(
        (status = 201, description = "Document stored", body = UploadResponse),
        (status = 400, description = "Missing file, unsupported type, or file too large"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_token" = []))
)]
pub async fn upload_document_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Failed to read multipart data: {e}")))?
        .ok_or_else(|| ApiError::Validation("Multipart form must include a file".to_string()))?;

    let file_name = field.file_name().unwrap_or("untitled").to_string();
    let file_type = field
        .content_type()
        .map(str::to_string)
        .ok_or_else(|| ApiError::Validation("File content type is required".to_string()))?;

    if !ALLOWED_MIME_TYPES.contains(&file_type.as_str()) {
        return Err(ApiError::Validation(format!(
            "Unsupported file type: {file_type}"
        )));
    }

    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::Validation(format!("Failed to read file bytes: {e}")))?;

    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::Validation(
            "File too large (max 10MB)".to_string(),
        ));
    }

    let file_id = Uuid::new_v4().to_string();
    let file_path = state
        .files
        .save(&identity.uid, &file_id, &file_name, &bytes)
        .await?;

    let document = state
        .store
        .add_document(NewDocument {
            user_id: identity.uid,
            file_id,
            file_name,
            file_type,
            file_path,
            file_size: bytes.len() as i64,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            success: true,
            id: document.id,
            document,
        }),
    ))
}

/// List the caller's documents, newest first.
#[utoipa::path(
    get,
    path = "/documents/list",
    responses(
        (status = 200, description = "The caller's documents", body = ListDocumentsResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_token" = []))
)]
pub async fn list_documents_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let documents = state
        .store
        .list_documents(&identity.uid, DEFAULT_LIST_LIMIT)
        .await?;
    Ok(Json(ListDocumentsResponse { documents }))
}

/// Fetch one document record.
#[utoipa::path(
    get,
    path = "/documents/{id}",
    params(("id" = String, Path, description = "Document id")),
    responses(
        (status = 200, description = "The document record", body = GetDocumentResponse),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "No such document")
    ),
    security(("bearer_token" = []))
)]
pub async fn get_document_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let document = state.store.get_document(&identity.uid, id).await?;
    Ok(Json(GetDocumentResponse { document }))
}

/// Download the raw file bytes for one document.
#[utoipa::path(
    get,
    path = "/documents/{id}/file",
    params(("id" = String, Path, description = "Document id")),
    responses(
        (status = 200, description = "Raw file bytes"),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "No such document")
    ),
    security(("bearer_token" = []))
)]
pub async fn download_document_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let document = state.store.get_document(&identity.uid, id).await?;
    let bytes = state.files.read(&document.file_path).await?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, document.file_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", document.file_name),
        )
        .body(Body::from(bytes))
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(response)
}

/// Delete a document record along with its stored file.
#[utoipa::path(
    delete,
    path = "/documents/{id}",
    params(("id" = String, Path, description = "Document id")),
    responses(
        (status = 200, description = "Document deleted", body = DeleteDocumentResponse),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "No such document")
    ),
    security(("bearer_token" = []))
)]
pub async fn delete_document_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let document = state.store.get_document(&identity.uid, id).await?;
    // The file may already be gone; the record removal still proceeds.
    state.files.remove(&document.file_path).await?;
    state.store.delete_document(&identity.uid, id).await?;
    Ok(Json(DeleteDocumentResponse { success: true }))
}
