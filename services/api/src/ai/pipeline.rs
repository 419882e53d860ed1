//! services/api/src/ai/pipeline.rs
//!
//! The AI response pipeline: an ordered list of provider strategies tried
//! in sequence, with a capped retry on rate-limit responses, ending in a
//! static template tier that cannot fail. The pipeline never surfaces a
//! hard failure to its callers; it degrades instead.

use std::sync::Arc;
use std::time::Duration;

use careprep_core::domain::DocumentAnalysis;
use careprep_core::ports::{AiProvider, ChatRequest, DocumentRequest, ProviderError};
use careprep_core::Symptom;
use tracing::{debug, warn};

use super::prompts::{static_chat_reply, static_document_analysis, static_symptom_digest};

/// Name reported when the static template tier produced the response.
pub const STATIC_SOURCE: &str = "static";

/// A capped-attempt policy for one outbound dependency. Only rate-limit
/// failures are retried; everything else falls through immediately.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// A single attempt, no waiting. Used for the fallback LLM and in tests.
    pub const fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Two attempts total with a 5 second wait, matching the primary
    /// backend's rate-limit contract.
    pub const fn rate_limit_default() -> Self {
        Self::new(2, Duration::from_secs(5))
    }
}

/// One provider plus the retry policy that governs it.
pub struct ProviderEntry {
    pub provider: Arc<dyn AiProvider>,
    pub retry: RetryPolicy,
}

impl ProviderEntry {
    pub fn new(provider: Arc<dyn AiProvider>, retry: RetryPolicy) -> Self {
        Self { provider, retry }
    }
}

/// A chat response together with its provenance. `fallback` is true only
/// when the static tier answered.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub text: String,
    pub fallback: bool,
    pub source: String,
}

/// A document analysis together with its provenance. A non-primary source
/// means the analysis was not derived from the actual document content.
#[derive(Debug, Clone)]
pub struct DocumentReply {
    pub analysis: DocumentAnalysis,
    pub fallback: bool,
    pub source: String,
}

/// A symptom summary together with its provenance.
#[derive(Debug, Clone)]
pub struct SummaryReply {
    pub text: String,
    pub fallback: bool,
    pub source: String,
}

/// Tries each configured provider in order and degrades to static text.
pub struct AiPipeline {
    providers: Vec<ProviderEntry>,
}

impl AiPipeline {
    pub fn new(providers: Vec<ProviderEntry>) -> Self {
        Self { providers }
    }

    /// Whether a failed attempt against `entry` should be retried.
    fn should_retry(entry: &ProviderEntry, err: &ProviderError, attempt: u32) -> bool {
        matches!(err, ProviderError::RateLimited) && attempt < entry.retry.max_attempts
    }

    pub async fn chat(&self, request: &ChatRequest) -> ChatReply {
        for entry in &self.providers {
            let mut attempt = 0;
            loop {
                attempt += 1;
                match entry.provider.chat(request).await {
                    Ok(text) => {
                        return ChatReply {
                            text,
                            fallback: false,
                            source: entry.provider.name().to_string(),
                        }
                    }
                    Err(ProviderError::NotConfigured) => {
                        debug!(provider = entry.provider.name(), "provider not configured, skipping");
                        break;
                    }
                    Err(err) if Self::should_retry(entry, &err, attempt) => {
                        warn!(
                            provider = entry.provider.name(),
                            attempt, "rate limited, waiting before retry"
                        );
                        tokio::time::sleep(entry.retry.backoff).await;
                    }
                    Err(err) => {
                        warn!(provider = entry.provider.name(), "chat failed: {err}");
                        break;
                    }
                }
            }
        }

        ChatReply {
            text: static_chat_reply(&request.message, request.mode),
            fallback: true,
            source: STATIC_SOURCE.to_string(),
        }
    }

    pub async fn summarize_document(&self, request: &DocumentRequest) -> DocumentReply {
        for entry in &self.providers {
            let mut attempt = 0;
            loop {
                attempt += 1;
                match entry.provider.summarize_document(request).await {
                    Ok(analysis) => {
                        return DocumentReply {
                            analysis,
                            fallback: false,
                            source: entry.provider.name().to_string(),
                        }
                    }
                    Err(ProviderError::NotConfigured) => {
                        debug!(provider = entry.provider.name(), "provider not configured, skipping");
                        break;
                    }
                    Err(err) if Self::should_retry(entry, &err, attempt) => {
                        warn!(
                            provider = entry.provider.name(),
                            attempt, "rate limited, waiting before retry"
                        );
                        tokio::time::sleep(entry.retry.backoff).await;
                    }
                    Err(err) => {
                        warn!(
                            provider = entry.provider.name(),
                            "document summarize failed: {err}"
                        );
                        break;
                    }
                }
            }
        }

        DocumentReply {
            analysis: static_document_analysis(&request.file_name),
            fallback: true,
            source: STATIC_SOURCE.to_string(),
        }
    }

    pub async fn summarize_symptoms(&self, symptoms: &[Symptom]) -> SummaryReply {
        for entry in &self.providers {
            let mut attempt = 0;
            loop {
                attempt += 1;
                match entry.provider.summarize_symptoms(symptoms).await {
                    Ok(text) => {
                        return SummaryReply {
                            text,
                            fallback: false,
                            source: entry.provider.name().to_string(),
                        }
                    }
                    Err(ProviderError::NotConfigured) => {
                        debug!(provider = entry.provider.name(), "provider not configured, skipping");
                        break;
                    }
                    Err(err) if Self::should_retry(entry, &err, attempt) => {
                        warn!(
                            provider = entry.provider.name(),
                            attempt, "rate limited, waiting before retry"
                        );
                        tokio::time::sleep(entry.retry.backoff).await;
                    }
                    Err(err) => {
                        warn!(
                            provider = entry.provider.name(),
                            "symptom summarize failed: {err}"
                        );
                        break;
                    }
                }
            }
        }

        SummaryReply {
            text: static_symptom_digest(symptoms),
            fallback: true,
            source: STATIC_SOURCE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use careprep_core::domain::{ChatMode, FollowUp};
    use careprep_core::ports::ProviderResult;
    use chrono::{NaiveDate, Utc};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    /// A provider whose responses are scripted per call.
    struct ScriptedProvider {
        name: &'static str,
        script: Mutex<VecDeque<Result<String, ProviderError>>>,
        calls: AtomicU32,
    }

    impl ScriptedProvider {
        fn new(name: &'static str, script: Vec<Result<String, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                name,
                script: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        fn next(&self) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ProviderError::Unavailable("script exhausted".into())))
        }
    }

    #[async_trait]
    impl AiProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn chat(&self, _request: &ChatRequest) -> ProviderResult<String> {
            self.next()
        }

        async fn summarize_document(
            &self,
            _request: &DocumentRequest,
        ) -> ProviderResult<DocumentAnalysis> {
            self.next().map(|text| DocumentAnalysis {
                processed_text: text.clone(),
                doctor_summary: text.clone(),
                patient_summary: text,
                medications: Vec::new(),
                follow_ups: vec![FollowUp {
                    action: "follow up".into(),
                    timing: "soon".into(),
                }],
                red_flags: Vec::new(),
            })
        }

        async fn summarize_symptoms(&self, _symptoms: &[Symptom]) -> ProviderResult<String> {
            self.next()
        }
    }

    fn chat_request(message: &str) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            mode: ChatMode::PreVisit,
            symptoms: Vec::new(),
            summary: None,
        }
    }

    fn sample_symptoms() -> Vec<Symptom> {
        vec![Symptom {
            id: Uuid::new_v4(),
            user_id: "user-1".into(),
            symptom: "Headache".into(),
            severity: 7,
            notes: String::new(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            created_at: Utc::now(),
        }]
    }

    /// Two attempts with no delay so tests stay fast.
    const TEST_RETRY: RetryPolicy = RetryPolicy::new(2, Duration::ZERO);

    #[tokio::test]
    async fn primary_success_needs_no_fallback() {
        let primary = ScriptedProvider::new("primary", vec![Ok("all good".into())]);
        let pipeline = AiPipeline::new(vec![ProviderEntry::new(primary.clone(), TEST_RETRY)]);

        let reply = pipeline.chat(&chat_request("hello")).await;
        assert!(!reply.fallback);
        assert_eq!(reply.source, "primary");
        assert_eq!(reply.text, "all good");
        assert_eq!(primary.calls(), 1);
    }

    #[tokio::test]
    async fn rate_limit_is_retried_once_then_falls_through() {
        let primary = ScriptedProvider::new(
            "primary",
            vec![Err(ProviderError::RateLimited), Err(ProviderError::RateLimited)],
        );
        let pipeline = AiPipeline::new(vec![ProviderEntry::new(primary.clone(), TEST_RETRY)]);

        let reply = pipeline.chat(&chat_request("am I okay?")).await;
        // Two attempts total, then the static tier answers.
        assert_eq!(primary.calls(), 2);
        assert!(reply.fallback);
        assert_eq!(reply.source, STATIC_SOURCE);
        assert!(reply.text.contains("am I okay?"));
        assert!(reply.text.contains("NOT medical advice"));
    }

    #[tokio::test]
    async fn non_rate_limit_failure_is_not_retried() {
        let primary = ScriptedProvider::new(
            "primary",
            vec![Err(ProviderError::Unavailable("boom".into()))],
        );
        let fallback = ScriptedProvider::new("openrouter", vec![Ok("from fallback".into())]);
        let pipeline = AiPipeline::new(vec![
            ProviderEntry::new(primary.clone(), TEST_RETRY),
            ProviderEntry::new(fallback.clone(), RetryPolicy::no_retry()),
        ]);

        let reply = pipeline.chat(&chat_request("hello")).await;
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 1);
        assert!(!reply.fallback);
        assert_eq!(reply.source, "openrouter");
        assert_eq!(reply.text, "from fallback");
    }

    #[tokio::test]
    async fn unconfigured_provider_is_skipped_silently() {
        let fallback =
            ScriptedProvider::new("openrouter", vec![Err(ProviderError::NotConfigured)]);
        let pipeline =
            AiPipeline::new(vec![ProviderEntry::new(fallback.clone(), TEST_RETRY)]);

        let reply = pipeline.chat(&chat_request("hi")).await;
        // NotConfigured is not retried even under a retrying policy.
        assert_eq!(fallback.calls(), 1);
        assert!(reply.fallback);
    }

    #[tokio::test]
    async fn document_fallback_llm_result_is_flagged_by_source() {
        let primary = ScriptedProvider::new(
            "primary",
            vec![Err(ProviderError::Unavailable("down".into()))],
        );
        let fallback = ScriptedProvider::new("openrouter", vec![Ok("generic analysis".into())]);
        let pipeline = AiPipeline::new(vec![
            ProviderEntry::new(primary, TEST_RETRY),
            ProviderEntry::new(fallback, RetryPolicy::no_retry()),
        ]);

        let request = DocumentRequest {
            file_name: "results.pdf".into(),
            file_type: "application/pdf".into(),
            bytes: vec![1, 2, 3],
        };
        let reply = pipeline.summarize_document(&request).await;
        assert!(!reply.fallback);
        assert_eq!(reply.source, "openrouter");
        assert_eq!(reply.analysis.patient_summary, "generic analysis");
    }

    #[tokio::test]
    async fn document_static_tier_keys_on_file_name() {
        let pipeline = AiPipeline::new(Vec::new());
        let request = DocumentRequest {
            file_name: "labs.pdf".into(),
            file_type: "application/pdf".into(),
            bytes: Vec::new(),
        };
        let reply = pipeline.summarize_document(&request).await;
        assert!(reply.fallback);
        assert_eq!(reply.source, STATIC_SOURCE);
        assert!(reply.analysis.patient_summary.contains("labs.pdf"));
    }

    #[tokio::test]
    async fn symptom_summary_degrades_to_deterministic_digest() {
        let primary = ScriptedProvider::new(
            "primary",
            vec![Err(ProviderError::Unexpected("parse error".into()))],
        );
        let pipeline = AiPipeline::new(vec![ProviderEntry::new(primary, TEST_RETRY)]);

        let reply = pipeline.summarize_symptoms(&sample_symptoms()).await;
        assert!(reply.fallback);
        assert!(reply.text.contains("Headache (Severity: 7/10)"));
        assert!(reply.text.contains("Next Steps"));
    }
}
