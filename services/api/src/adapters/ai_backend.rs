//! services/api/src/adapters/ai_backend.rs
//!
//! This module contains the adapter for the primary (internal) AI backend.
//! It implements the `AiProvider` port from the `core` crate by POSTing
//! JSON to the backend's chat, document-processing, and symptom-summary
//! endpoints.

use async_trait::async_trait;
use base64::Engine;
use careprep_core::domain::{ChatMode, DocumentAnalysis, FollowUp, Medication, Symptom};
use careprep_core::ports::{
    AiProvider, ChatRequest, DocumentRequest, ProviderError, ProviderResult,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

const CHAT_TIMEOUT: Duration = Duration::from_secs(15);
const DOCUMENT_TIMEOUT: Duration = Duration::from_secs(60);
const SYMPTOMS_TIMEOUT: Duration = Duration::from_secs(30);

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AiProvider` against the internal AI backend.
#[derive(Clone)]
pub struct PrimaryBackendAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl PrimaryBackendAdapter {
    /// Creates a new `PrimaryBackendAdapter`. `base_url` has no trailing slash.
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn map_send_error(err: reqwest::Error) -> ProviderError {
        if err.is_timeout() || err.is_connect() {
            ProviderError::Unavailable(err.to_string())
        } else {
            ProviderError::Unexpected(err.to_string())
        }
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> ProviderResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Unavailable(format!(
                "AI backend returned {status}: {body}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Unexpected(e.to_string()))
    }
}

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Deserialize)]
struct ChatResponseBody {
    success: bool,
    #[serde(default)]
    response: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProcessResponseBody {
    success: bool,
    #[serde(default)]
    processed_text: String,
    #[serde(default)]
    doctor_summary: String,
    #[serde(default)]
    patient_summary: String,
    #[serde(default)]
    medications: Vec<Medication>,
    #[serde(default)]
    follow_ups: Vec<FollowUp>,
    #[serde(default)]
    red_flags: Vec<String>,
}

#[derive(Deserialize)]
struct SummaryResponseBody {
    success: bool,
    #[serde(default)]
    summary: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessRequestBody<'a> {
    file_name: &'a str,
    file_type: &'a str,
    /// Base64-encoded file bytes.
    file_content: String,
}

//=========================================================================================
// `AiProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl AiProvider for PrimaryBackendAdapter {
    fn name(&self) -> &'static str {
        "ai-backend"
    }

    async fn chat(&self, request: &ChatRequest) -> ProviderResult<String> {
        let context = match request.mode {
            ChatMode::PreVisit => json!({ "symptoms": request.symptoms }),
            ChatMode::PostVisit => json!({ "summary": request.summary }),
        };
        let body = json!({
            "message": request.message,
            "mode": request.mode.as_str(),
            "context": context,
        });

        let parsed: ChatResponseBody = self.post_json("/chat", &body, CHAT_TIMEOUT).await?;
        if !parsed.success {
            return Err(ProviderError::Unexpected(
                "AI backend reported a chat failure".to_string(),
            ));
        }
        Ok(parsed.response)
    }

    async fn summarize_document(
        &self,
        request: &DocumentRequest,
    ) -> ProviderResult<DocumentAnalysis> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&request.bytes);
        let body = serde_json::to_value(ProcessRequestBody {
            file_name: &request.file_name,
            file_type: &request.file_type,
            file_content: encoded,
        })
        .map_err(|e| ProviderError::Unexpected(e.to_string()))?;

        let parsed: ProcessResponseBody = self
            .post_json("/process/document", &body, DOCUMENT_TIMEOUT)
            .await?;
        if !parsed.success {
            return Err(ProviderError::Unexpected(
                "AI backend reported a processing failure".to_string(),
            ));
        }
        Ok(DocumentAnalysis {
            processed_text: parsed.processed_text,
            doctor_summary: parsed.doctor_summary,
            patient_summary: parsed.patient_summary,
            medications: parsed.medications,
            follow_ups: parsed.follow_ups,
            red_flags: parsed.red_flags,
        })
    }

    async fn summarize_symptoms(&self, symptoms: &[Symptom]) -> ProviderResult<String> {
        let body = json!({ "symptoms": symptoms });
        let parsed: SummaryResponseBody = self
            .post_json("/summarize/symptoms", &body, SYMPTOMS_TIMEOUT)
            .await?;
        if !parsed.success {
            return Err(ProviderError::Unexpected(
                "AI backend reported a summary failure".to_string(),
            ));
        }
        Ok(parsed.summary)
    }
}
