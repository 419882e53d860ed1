//! services/api/src/adapters/openrouter.rs
//!
//! This module contains the adapter for the public OpenRouter
//! chat-completions API, the second tier of the AI fallback chain. It
//! builds CarePrep's domain prompts, calls the hosted model directly, and
//! section-parses the structured document response.
//!
//! The document path here cannot read file bytes; its prompt is keyed on
//! file name and type only, so the resulting analysis is generic rather
//! than document-grounded. Callers surface that provenance.

use async_trait::async_trait;
use careprep_core::domain::{ChatMode, DocumentAnalysis, FollowUp, Medication, Symptom};
use careprep_core::ports::{
    AiProvider, ChatRequest, DocumentRequest, ProviderError, ProviderResult,
};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::ai::prompts;

pub const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

const CHAT_TIMEOUT: Duration = Duration::from_secs(30);
const DOCUMENT_TIMEOUT: Duration = Duration::from_secs(45);
const SYMPTOMS_TIMEOUT: Duration = Duration::from_secs(30);

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AiProvider` using the OpenRouter API.
/// Without an API key every call answers `NotConfigured` and the pipeline
/// moves on to the static tier.
#[derive(Clone)]
pub struct OpenRouterAdapter {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    api_url: String,
}

impl OpenRouterAdapter {
    /// Creates a new `OpenRouterAdapter`.
    pub fn new(client: reqwest::Client, api_key: Option<String>, model: String) -> Self {
        Self {
            client,
            api_key,
            model,
            api_url: OPENROUTER_API_URL.to_string(),
        }
    }

    /// Points the adapter at a different completions endpoint. Used in tests.
    #[allow(dead_code)]
    pub fn with_api_url(mut self, api_url: String) -> Self {
        self.api_url = api_url;
        self
    }

    async fn complete(
        &self,
        prompt: String,
        temperature: f32,
        max_tokens: u32,
        timeout: Duration,
    ) -> ProviderResult<String> {
        let api_key = self.api_key.as_ref().ok_or(ProviderError::NotConfigured)?;

        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        let response = self
            .client
            .post(&self.api_url)
            .timeout(timeout)
            .bearer_auth(api_key)
            .header("HTTP-Referer", "https://careprep-ai.local")
            .header("X-Title", "CarePrep AI")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    ProviderError::Unavailable(e.to_string())
                } else {
                    ProviderError::Unexpected(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Unavailable(format!(
                "OpenRouter returned {status}: {body}"
            )));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Unexpected(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                ProviderError::Unexpected("OpenRouter returned no choices".to_string())
            })
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: String,
}

//=========================================================================================
// Structured-response parsing
//=========================================================================================

fn header_regex(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .unwrap()
}

/// The byte range of `content` belonging to the section that starts at
/// `header`, ending at the nearest following section header.
fn section_body<'a>(content: &'a str, header: &Regex, enders: &[&Regex]) -> Option<&'a str> {
    let start = header.find(content)?.end();
    let rest = &content[start..];
    let end = enders
        .iter()
        .filter_map(|e| e.find(rest).map(|m| m.start()))
        .min()
        .unwrap_or(rest.len());
    Some(rest[..end].trim())
}

/// Parses the structured sections out of an LLM document response. Missing
/// sections degrade to empty lists and a prefix-of-content summary, the
/// same way the original service parsed these responses.
pub fn parse_document_sections(content: &str) -> DocumentAnalysis {
    let patient_header = header_regex(r"\*\*PATIENT-FRIENDLY SUMMARY\*\*[:\s]*");
    let meds_header = header_regex(r"\*\*MEDICATIONS\*\*[:\s]*");
    let follow_header = header_regex(r"\*\*FOLLOW-UP(?: ACTIONS?)?\*\*[:\s]*");
    let red_header = header_regex(r"\*\*RED FLAGS\*\*[:\s]*");

    let patient_summary = section_body(
        content,
        &patient_header,
        &[&meds_header, &follow_header, &red_header],
    )
    .map(str::to_string)
    .unwrap_or_else(|| {
        let cut = content
            .char_indices()
            .nth(1500)
            .map(|(i, _)| i)
            .unwrap_or(content.len());
        content[..cut].to_string()
    });

    let name_line = header_regex(r"-\s*name:\s*(.+)");
    let medications = section_body(content, &meds_header, &[&follow_header, &red_header])
        .map(|body| {
            name_line
                .captures_iter(body)
                .map(|cap| Medication {
                    name: cap[1].trim().to_string(),
                    dosage: "As prescribed".to_string(),
                    timing: "Follow doctor instructions".to_string(),
                    notes: String::new(),
                })
                .collect()
        })
        .unwrap_or_default();

    let action_line = header_regex(r"-\s*action:\s*(.+)");
    let follow_ups = section_body(content, &follow_header, &[&red_header])
        .map(|body| {
            action_line
                .captures_iter(body)
                .map(|cap| FollowUp {
                    action: cap[1].trim().to_string(),
                    timing: "As scheduled".to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    let bullet_line = Regex::new(r"(?m)^\s*[-•]\s*(.+?)\s*$").unwrap();
    let red_flags = section_body(content, &red_header, &[])
        .map(|body| {
            bullet_line
                .captures_iter(body)
                .map(|cap| cap[1].to_string())
                .filter(|line| !line.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let doctor_cut = content
        .char_indices()
        .nth(1000)
        .map(|(i, _)| i)
        .unwrap_or(content.len());

    DocumentAnalysis {
        processed_text: content.to_string(),
        doctor_summary: content[..doctor_cut].to_string(),
        patient_summary,
        medications,
        follow_ups,
        red_flags,
    }
}

//=========================================================================================
// `AiProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl AiProvider for OpenRouterAdapter {
    fn name(&self) -> &'static str {
        "openrouter"
    }

    async fn chat(&self, request: &ChatRequest) -> ProviderResult<String> {
        let prompt = match request.mode {
            ChatMode::PreVisit => {
                prompts::pre_visit_chat_prompt(&request.message, &request.symptoms)
            }
            ChatMode::PostVisit => {
                prompts::post_visit_chat_prompt(&request.message, request.summary.as_ref())
            }
        };
        self.complete(prompt, 0.7, 800, CHAT_TIMEOUT).await
    }

    async fn summarize_document(
        &self,
        request: &DocumentRequest,
    ) -> ProviderResult<DocumentAnalysis> {
        let prompt = prompts::document_fallback_prompt(&request.file_name, &request.file_type);
        let content = self.complete(prompt, 0.5, 1500, DOCUMENT_TIMEOUT).await?;
        Ok(parse_document_sections(&content))
    }

    async fn summarize_symptoms(&self, symptoms: &[Symptom]) -> ProviderResult<String> {
        let prompt = prompts::symptom_summary_prompt(symptoms);
        self.complete(prompt, 0.7, 1500, SYMPTOMS_TIMEOUT).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"Some preamble.

**PATIENT-FRIENDLY SUMMARY**
This document is a standard lab report. It lists test results and reference ranges.

It is best reviewed together with your doctor.

**MEDICATIONS**
- name: Lisinopril
- name: Metformin

**FOLLOW-UP ACTIONS**
- action: Book a review appointment
- action: Bring the report to your visit

**RED FLAGS**
- Severe chest pain
- Sudden shortness of breath
"#;

    #[test]
    fn parses_all_sections() {
        let analysis = parse_document_sections(SAMPLE);
        assert!(analysis
            .patient_summary
            .starts_with("This document is a standard lab report."));
        assert!(!analysis.patient_summary.contains("Lisinopril"));
        assert_eq!(
            analysis.medications.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(),
            ["Lisinopril", "Metformin"]
        );
        assert_eq!(analysis.medications[0].dosage, "As prescribed");
        assert_eq!(
            analysis.follow_ups.iter().map(|f| f.action.as_str()).collect::<Vec<_>>(),
            ["Book a review appointment", "Bring the report to your visit"]
        );
        assert_eq!(analysis.follow_ups[0].timing, "As scheduled");
        assert_eq!(
            analysis.red_flags,
            ["Severe chest pain", "Sudden shortness of breath"]
        );
    }

    #[test]
    fn unstructured_content_becomes_the_summary() {
        let content = "Just a plain paragraph with no sections at all.";
        let analysis = parse_document_sections(content);
        assert_eq!(analysis.patient_summary, content);
        assert!(analysis.medications.is_empty());
        assert!(analysis.follow_ups.is_empty());
        assert!(analysis.red_flags.is_empty());
        assert_eq!(analysis.processed_text, content);
    }

    #[test]
    fn section_headers_match_case_insensitively() {
        let content = "**Patient-Friendly Summary**\nPlain words here.\n**Red Flags**\n- Fainting\n";
        let analysis = parse_document_sections(content);
        assert_eq!(analysis.patient_summary, "Plain words here.");
        assert_eq!(analysis.red_flags, ["Fainting"]);
    }

    #[tokio::test]
    async fn missing_api_key_reports_not_configured() {
        let adapter = OpenRouterAdapter::new(
            reqwest::Client::new(),
            None,
            "mistralai/mistral-7b-instruct".to_string(),
        );
        let result = adapter
            .summarize_symptoms(&[])
            .await;
        assert!(matches!(result, Err(ProviderError::NotConfigured)));
    }
}
