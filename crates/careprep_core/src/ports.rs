//! crates/careprep_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of the concrete external collaborators: the managed
//! record store, the file store, the identity provider, and the AI backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    ChatMode, Document, DocumentAnalysis, Identity, NewDocument, NewSymptom, NewVisitSummary,
    Symptom, VisitSummary,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for record and file store operations.
/// This abstracts away the specific errors from external services.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The record exists but is owned by another user. Deliberately carries
    /// no detail so the caller cannot distinguish it from a generic denial.
    #[error("Forbidden")]
    Forbidden,
    /// The backing store is not initialized or not reachable.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Failures reported by the identity provider when verifying a bearer token.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing or malformed Authorization header")]
    MissingToken,
    #[error("Token has expired")]
    ExpiredToken,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Identity provider is not configured")]
    NotConfigured,
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Failures reported by an AI provider. The pipeline treats `RateLimited`
/// as retryable and `NotConfigured` as "skip this provider".
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider is not configured")]
    NotConfigured,
    #[error("Rate limited by upstream")]
    RateLimited,
    #[error("Upstream unavailable: {0}")]
    Unavailable(String),
    #[error("Unexpected provider failure: {0}")]
    Unexpected(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Wraps the external identity provider's token-verification call.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Turns a bearer token into a user identity or an auth failure.
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;

    /// Whether the provider has credentials and can be expected to answer.
    fn ready(&self) -> bool {
        true
    }
}

/// Keyed reads/writes/deletes against the record collections, always scoped
/// by owning-user identity. Ownership is enforced here, not by the store:
/// `get_*`/`delete_*` fetch by id first and answer `Forbidden` on an owner
/// mismatch so that a 404 and a 403 stay distinguishable.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // --- Symptoms ---
    async fn add_symptom(&self, symptom: NewSymptom) -> PortResult<Symptom>;
    /// Up to `limit` (clamped to 100) of the owner's symptoms, ascending by date.
    async fn list_symptoms(&self, uid: &str, limit: i64) -> PortResult<Vec<Symptom>>;
    /// The owner's `limit` most recent symptoms, returned in chronological
    /// order. Distinct from `list_symptoms`, which windows from the oldest.
    async fn recent_symptoms(&self, uid: &str, limit: i64) -> PortResult<Vec<Symptom>>;
    async fn get_symptom(&self, uid: &str, id: Uuid) -> PortResult<Symptom>;
    async fn delete_symptom(&self, uid: &str, id: Uuid) -> PortResult<()>;

    // --- Documents ---
    async fn add_document(&self, document: NewDocument) -> PortResult<Document>;
    /// Up to `limit` (clamped to 100) of the owner's documents, newest first.
    async fn list_documents(&self, uid: &str, limit: i64) -> PortResult<Vec<Document>>;
    async fn get_document(&self, uid: &str, id: Uuid) -> PortResult<Document>;
    async fn delete_document(&self, uid: &str, id: Uuid) -> PortResult<()>;
    /// Stamps the one-time processing outcome onto the source document.
    async fn mark_document_processed(
        &self,
        id: Uuid,
        processed_text: &str,
        processed_at: DateTime<Utc>,
    ) -> PortResult<()>;

    // --- Visit summaries ---
    async fn add_visit_summary(&self, summary: NewVisitSummary) -> PortResult<VisitSummary>;
    async fn list_visit_summaries(&self, uid: &str, limit: i64) -> PortResult<Vec<VisitSummary>>;
    async fn get_visit_summary(&self, uid: &str, id: Uuid) -> PortResult<VisitSummary>;
    async fn latest_visit_summary(&self, uid: &str) -> PortResult<Option<VisitSummary>>;
}

/// Persists uploaded file bytes in a location namespaced by user identity.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Writes the bytes and returns the storage-local path for the record.
    async fn save(
        &self,
        uid: &str,
        file_id: &str,
        original_name: &str,
        bytes: &[u8],
    ) -> PortResult<String>;

    async fn read(&self, path: &str) -> PortResult<Vec<u8>>;

    /// Removes the backing file; a missing file is tolerated, not an error.
    async fn remove(&self, path: &str) -> PortResult<()>;
}

/// A chat turn plus the structured context the prompt embeds.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub message: String,
    pub mode: ChatMode,
    /// Recent symptoms, used in pre-visit mode.
    pub symptoms: Vec<Symptom>,
    /// Latest visit summary, used in post-visit mode.
    pub summary: Option<VisitSummary>,
}

/// A document-processing request. The raw bytes are present for providers
/// that can read them; fallback providers key on name and type alone.
#[derive(Debug, Clone)]
pub struct DocumentRequest {
    pub file_name: String,
    pub file_type: String,
    pub bytes: Vec<u8>,
}

/// One provider strategy in the AI fallback chain. Providers are tried in
/// order until one succeeds; adding, removing, or reordering them is a
/// wiring change, not a code change.
#[async_trait]
pub trait AiProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn chat(&self, request: &ChatRequest) -> ProviderResult<String>;

    async fn summarize_document(&self, request: &DocumentRequest)
        -> ProviderResult<DocumentAnalysis>;

    async fn summarize_symptoms(&self, symptoms: &[Symptom]) -> ProviderResult<String>;
}
