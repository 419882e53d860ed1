//! crates/careprep_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or web framework;
//! serde derives exist because the wire format and the store both
//! speak camelCase JSON for the nested list fields.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The authenticated caller, as asserted by the external identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// A single symptom log entry. Created on submission, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symptom {
    pub id: Uuid,
    pub user_id: String,
    pub symptom: String,
    /// Severity on a 1-10 scale; validated at the web layer.
    pub severity: i32,
    pub notes: String,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Insertion payload for a symptom; the store assigns id and created_at.
#[derive(Debug, Clone)]
pub struct NewSymptom {
    pub user_id: String,
    pub symptom: String,
    pub severity: i32,
    pub notes: String,
    pub date: NaiveDate,
}

/// An uploaded medical document and its processing state.
///
/// `processed_text` and `processed_at` are set exactly once, when the
/// AI pipeline finishes summarizing the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub user_id: String,
    pub file_id: String,
    pub file_name: String,
    /// MIME type as supplied by the upload.
    pub file_type: String,
    /// Storage-local reference, relative to the upload root.
    pub file_path: String,
    pub file_size: i64,
    pub processed_text: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Insertion payload for a document record.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub user_id: String,
    pub file_id: String,
    pub file_name: String,
    pub file_type: String,
    pub file_path: String,
    pub file_size: i64,
}

/// One medication extracted from a processed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub name: String,
    pub dosage: String,
    pub timing: String,
    pub notes: String,
}

/// A follow-up action extracted from a processed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUp {
    pub action: String,
    pub timing: String,
}

/// The structured outcome of summarizing one document. Created exactly
/// once per successful processing call and immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitSummary {
    pub id: Uuid,
    pub user_id: String,
    pub document_id: Uuid,
    pub doctor_summary: String,
    pub patient_summary: String,
    pub medications: Vec<Medication>,
    pub follow_ups: Vec<FollowUp>,
    pub red_flags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Insertion payload for a visit summary.
#[derive(Debug, Clone)]
pub struct NewVisitSummary {
    pub user_id: String,
    pub document_id: Uuid,
    pub analysis: DocumentAnalysis,
}

/// The analysis an AI provider produces for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAnalysis {
    pub processed_text: String,
    pub doctor_summary: String,
    pub patient_summary: String,
    pub medications: Vec<Medication>,
    pub follow_ups: Vec<FollowUp>,
    pub red_flags: Vec<String>,
}

/// Which conversation the assistant is having with the patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    PreVisit,
    PostVisit,
}

impl ChatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::PreVisit => "pre_visit",
            ChatMode::PostVisit => "post_visit",
        }
    }
}
