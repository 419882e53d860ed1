//! services/api/tests/routes.rs
//!
//! End-to-end tests of the HTTP surface, driven through the real router
//! with in-memory fakes behind the record store, file store, and token
//! verifier ports.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{Days, NaiveDate, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use api_lib::ai::{AiPipeline, ProviderEntry, RetryPolicy};
use api_lib::config::Config;
use api_lib::web::{router, AppState};
use careprep_core::domain::{
    ChatMode, Document, DocumentAnalysis, Identity, NewDocument, NewSymptom, NewVisitSummary,
    Symptom, VisitSummary,
};
use careprep_core::ports::{
    AiProvider, AuthError, ChatRequest, DocumentRequest, FileStore, PortError, PortResult,
    ProviderError, ProviderResult, RecordStore, TokenVerifier,
};

//=========================================================================================
// In-memory fakes
//=========================================================================================

#[derive(Default)]
struct FakeStore {
    symptoms: Mutex<Vec<Symptom>>,
    documents: Mutex<Vec<Document>>,
    summaries: Mutex<Vec<VisitSummary>>,
}

fn clamp(limit: i64) -> usize {
    limit.clamp(1, 100) as usize
}

#[async_trait]
impl RecordStore for FakeStore {
    async fn add_symptom(&self, symptom: NewSymptom) -> PortResult<Symptom> {
        let record = Symptom {
            id: Uuid::new_v4(),
            user_id: symptom.user_id,
            symptom: symptom.symptom,
            severity: symptom.severity,
            notes: symptom.notes,
            date: symptom.date,
            created_at: Utc::now(),
        };
        self.symptoms.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn list_symptoms(&self, uid: &str, limit: i64) -> PortResult<Vec<Symptom>> {
        let mut rows: Vec<Symptom> = self
            .symptoms
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == uid)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.date);
        rows.truncate(clamp(limit));
        Ok(rows)
    }

    async fn recent_symptoms(&self, uid: &str, limit: i64) -> PortResult<Vec<Symptom>> {
        let mut rows: Vec<Symptom> = self
            .symptoms
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == uid)
            .cloned()
            .collect();
        rows.sort_by_key(|s| std::cmp::Reverse((s.date, s.created_at)));
        rows.truncate(clamp(limit));
        rows.reverse();
        Ok(rows)
    }

    async fn get_symptom(&self, uid: &str, id: Uuid) -> PortResult<Symptom> {
        let rows = self.symptoms.lock().unwrap();
        let row = rows
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("symptom {id}")))?;
        if row.user_id != uid {
            return Err(PortError::Forbidden);
        }
        Ok(row)
    }

    async fn delete_symptom(&self, uid: &str, id: Uuid) -> PortResult<()> {
        self.get_symptom(uid, id).await?;
        self.symptoms.lock().unwrap().retain(|s| s.id != id);
        Ok(())
    }

    async fn add_document(&self, document: NewDocument) -> PortResult<Document> {
        let record = Document {
            id: Uuid::new_v4(),
            user_id: document.user_id,
            file_id: document.file_id,
            file_name: document.file_name,
            file_type: document.file_type,
            file_path: document.file_path,
            file_size: document.file_size,
            processed_text: None,
            processed_at: None,
            created_at: Utc::now(),
        };
        self.documents.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn list_documents(&self, uid: &str, limit: i64) -> PortResult<Vec<Document>> {
        let mut rows: Vec<Document> = self
            .documents
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.user_id == uid)
            .cloned()
            .collect();
        rows.sort_by_key(|d| std::cmp::Reverse(d.created_at));
        rows.truncate(clamp(limit));
        Ok(rows)
    }

    async fn get_document(&self, uid: &str, id: Uuid) -> PortResult<Document> {
        let rows = self.documents.lock().unwrap();
        let row = rows
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("document {id}")))?;
        if row.user_id != uid {
            return Err(PortError::Forbidden);
        }
        Ok(row)
    }

    async fn delete_document(&self, uid: &str, id: Uuid) -> PortResult<()> {
        self.get_document(uid, id).await?;
        self.documents.lock().unwrap().retain(|d| d.id != id);
        Ok(())
    }

    async fn mark_document_processed(
        &self,
        id: Uuid,
        processed_text: &str,
        processed_at: chrono::DateTime<Utc>,
    ) -> PortResult<()> {
        let mut rows = self.documents.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| PortError::NotFound(format!("document {id}")))?;
        row.processed_text = Some(processed_text.to_string());
        row.processed_at = Some(processed_at);
        Ok(())
    }

    async fn add_visit_summary(&self, summary: NewVisitSummary) -> PortResult<VisitSummary> {
        let record = VisitSummary {
            id: Uuid::new_v4(),
            user_id: summary.user_id,
            document_id: summary.document_id,
            doctor_summary: summary.analysis.doctor_summary,
            patient_summary: summary.analysis.patient_summary,
            medications: summary.analysis.medications,
            follow_ups: summary.analysis.follow_ups,
            red_flags: summary.analysis.red_flags,
            created_at: Utc::now(),
        };
        self.summaries.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn list_visit_summaries(&self, uid: &str, limit: i64) -> PortResult<Vec<VisitSummary>> {
        let mut rows: Vec<VisitSummary> = self
            .summaries
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == uid)
            .cloned()
            .collect();
        rows.sort_by_key(|s| std::cmp::Reverse(s.created_at));
        rows.truncate(clamp(limit));
        Ok(rows)
    }

    async fn get_visit_summary(&self, uid: &str, id: Uuid) -> PortResult<VisitSummary> {
        let rows = self.summaries.lock().unwrap();
        let row = rows
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("visit summary {id}")))?;
        if row.user_id != uid {
            return Err(PortError::Forbidden);
        }
        Ok(row)
    }

    async fn latest_visit_summary(&self, uid: &str) -> PortResult<Option<VisitSummary>> {
        Ok(self.list_visit_summaries(uid, 1).await?.into_iter().next())
    }
}

#[derive(Default)]
struct FakeFiles {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl FileStore for FakeFiles {
    async fn save(
        &self,
        uid: &str,
        file_id: &str,
        _original_name: &str,
        bytes: &[u8],
    ) -> PortResult<String> {
        let path = format!("{uid}/{file_id}");
        self.blobs.lock().unwrap().insert(path.clone(), bytes.to_vec());
        Ok(path)
    }

    async fn read(&self, path: &str) -> PortResult<Vec<u8>> {
        self.blobs
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("file {path}")))
    }

    async fn remove(&self, path: &str) -> PortResult<()> {
        self.blobs.lock().unwrap().remove(path);
        Ok(())
    }
}

/// Accepts `<uid>-token` for any uid and rejects everything else.
struct FakeVerifier;

#[async_trait]
impl TokenVerifier for FakeVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        match token.strip_suffix("-token") {
            Some(uid) => Ok(Identity {
                uid: uid.to_string(),
                email: Some(format!("{uid}@example.com")),
                display_name: None,
            }),
            None => Err(AuthError::InvalidToken("unknown token".to_string())),
        }
    }
}

/// A provider that answers every call with fixed content.
struct CannedProvider;

#[async_trait]
impl AiProvider for CannedProvider {
    fn name(&self) -> &'static str {
        "canned"
    }

    async fn chat(&self, _request: &ChatRequest) -> ProviderResult<String> {
        Ok("canned chat answer".to_string())
    }

    async fn summarize_document(
        &self,
        request: &DocumentRequest,
    ) -> ProviderResult<DocumentAnalysis> {
        Ok(DocumentAnalysis {
            processed_text: format!("extracted text of {}", request.file_name),
            doctor_summary: "clinical overview".to_string(),
            patient_summary: "plain-language overview".to_string(),
            medications: Vec::new(),
            follow_ups: Vec::new(),
            red_flags: Vec::new(),
        })
    }

    async fn summarize_symptoms(&self, _symptoms: &[Symptom]) -> ProviderResult<String> {
        Ok("canned symptom summary".to_string())
    }
}

/// A provider that records the symptom names it was handed per chat call.
struct CapturingProvider {
    seen: Arc<Mutex<Vec<Vec<String>>>>,
}

#[async_trait]
impl AiProvider for CapturingProvider {
    fn name(&self) -> &'static str {
        "capturing"
    }

    async fn chat(&self, request: &ChatRequest) -> ProviderResult<String> {
        let names = request.symptoms.iter().map(|s| s.symptom.clone()).collect();
        self.seen.lock().unwrap().push(names);
        Ok("noted".to_string())
    }

    async fn summarize_document(
        &self,
        _request: &DocumentRequest,
    ) -> ProviderResult<DocumentAnalysis> {
        Err(ProviderError::Unavailable("chat only".to_string()))
    }

    async fn summarize_symptoms(&self, _symptoms: &[Symptom]) -> ProviderResult<String> {
        Err(ProviderError::Unavailable("chat only".to_string()))
    }
}

/// A provider that always reports a rate limit, counting its calls.
struct RateLimitedProvider {
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl AiProvider for RateLimitedProvider {
    fn name(&self) -> &'static str {
        "rate-limited"
    }

    async fn chat(&self, _request: &ChatRequest) -> ProviderResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ProviderError::RateLimited)
    }

    async fn summarize_document(
        &self,
        _request: &DocumentRequest,
    ) -> ProviderResult<DocumentAnalysis> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ProviderError::RateLimited)
    }

    async fn summarize_symptoms(&self, _symptoms: &[Symptom]) -> ProviderResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ProviderError::RateLimited)
    }
}

//=========================================================================================
// Harness
//=========================================================================================

fn test_config() -> Config {
    Config {
        bind_address: SocketAddr::from(([127, 0, 0, 1], 0)),
        database_url: "postgres://unused".to_string(),
        log_level: tracing::Level::INFO,
        frontend_url: "http://localhost:3000".to_string(),
        upload_dir: PathBuf::from("./uploads"),
        ai_service_url: None,
        openrouter_api_key: None,
        openrouter_model: "mistralai/mistral-7b-instruct".to_string(),
        firebase_project_id: None,
        firebase_api_key: Some("test-key".to_string()),
    }
}

fn test_app(providers: Vec<ProviderEntry>) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState {
        store: Arc::new(FakeStore::default()),
        files: Arc::new(FakeFiles::default()),
        verifier: Arc::new(FakeVerifier),
        ai: Arc::new(AiPipeline::new(providers)),
        config: Arc::new(test_config()),
    });
    (router(state.clone()), state)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

fn authed_json(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}-token"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}-token"))
        .body(Body::empty())
        .unwrap()
}

const BOUNDARY: &str = "test-boundary-7f92";

fn multipart_upload(token: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/documents/upload")
        .header(header::AUTHORIZATION, format!("Bearer {token}-token"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn add_symptom_body(name: &str, severity: i64) -> Value {
    serde_json::json!({
        "symptom": name,
        "severity": severity,
        "notes": "",
        "date": "2026-08-01"
    })
}

fn dated_symptom_body(name: &str, severity: i64, date: NaiveDate) -> Value {
    serde_json::json!({
        "symptom": name,
        "severity": severity,
        "notes": "",
        "date": date.format("%Y-%m-%d").to_string()
    })
}

/// Logs `count` symptoms named S1..Scount on consecutive ascending dates.
async fn log_dated_symptoms(app: &Router, token: &str, count: u64) {
    let base = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
    for i in 1..=count {
        let body = dated_symptom_body(
            &format!("S{i}"),
            5,
            base.checked_add_days(Days::new(i)).unwrap(),
        );
        let (status, _) = send(app, authed_json("POST", "/symptoms/add", token, body)).await;
        assert_eq!(status, StatusCode::CREATED);
    }
}

//=========================================================================================
// Tests
//=========================================================================================

#[tokio::test]
async fn health_needs_no_token() {
    let (app, _) = test_app(Vec::new());
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["firebaseReady"], true);
}

#[tokio::test]
async fn protected_routes_reject_missing_token() {
    let (app, _) = test_app(Vec::new());
    let req = Request::builder()
        .uri("/symptoms/list")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "No token provided");
}

#[tokio::test]
async fn verify_returns_the_caller_identity() {
    let (app, _) = test_app(Vec::new());
    let (status, json) = send(&app, authed("POST", "/auth/verify", "alice")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["user"]["uid"], "alice");
}

#[tokio::test]
async fn out_of_range_severity_creates_no_record() {
    let (app, _) = test_app(Vec::new());

    for severity in [0, 11] {
        let (status, json) = send(
            &app,
            authed_json("POST", "/symptoms/add", "alice", add_symptom_body("Headache", severity)),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Severity must be between 1 and 10");
    }

    let (status, json) = send(&app, authed("GET", "/symptoms/list", "alice")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["symptoms"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn symptom_round_trip_and_delete() {
    let (app, _) = test_app(Vec::new());

    let (status, json) = send(
        &app,
        authed_json("POST", "/symptoms/add", "alice", add_symptom_body("Fatigue", 6)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = json["id"].as_str().unwrap().to_string();

    let (_, json) = send(&app, authed("GET", "/symptoms/list", "alice")).await;
    assert_eq!(json["symptoms"].as_array().unwrap().len(), 1);
    assert_eq!(json["symptoms"][0]["symptom"], "Fatigue");

    let (status, json) = send(&app, authed("DELETE", &format!("/symptoms/{id}"), "alice")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    let (_, json) = send(&app, authed("GET", "/symptoms/list", "alice")).await;
    assert_eq!(json["symptoms"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn deleting_a_missing_symptom_is_404() {
    let (app, _) = test_app(Vec::new());
    let id = Uuid::new_v4();
    let (status, json) = send(&app, authed("DELETE", &format!("/symptoms/{id}"), "alice")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Not found");
}

#[tokio::test]
async fn records_are_invisible_across_users() {
    let (app, _) = test_app(Vec::new());

    let (_, json) = send(
        &app,
        authed_json("POST", "/symptoms/add", "alice", add_symptom_body("Dizziness", 4)),
    )
    .await;
    let id = json["id"].as_str().unwrap().to_string();

    // Bob's listing does not include Alice's record.
    let (_, json) = send(&app, authed("GET", "/symptoms/list", "bob")).await;
    assert_eq!(json["symptoms"].as_array().unwrap().len(), 0);

    // Bob cannot delete it either, and the denial is a 403, not a 404.
    let (status, json) = send(&app, authed("DELETE", &format!("/symptoms/{id}"), "bob")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "Access denied");

    // The record survives for Alice.
    let (_, json) = send(&app, authed("GET", "/symptoms/list", "alice")).await;
    assert_eq!(json["symptoms"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn upload_then_download_round_trip() {
    let (app, _) = test_app(Vec::new());
    let payload = b"%PDF-1.4 fake lab report";

    let (status, json) = send(
        &app,
        multipart_upload("alice", "labs.pdf", "application/pdf", payload),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["document"]["fileName"], "labs.pdf");
    let id = json["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(authed("GET", &format!("/documents/{id}/file"), "alice"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/pdf"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(bytes.as_ref(), payload);
}

#[tokio::test]
async fn upload_rejects_unsupported_type() {
    let (app, _) = test_app(Vec::new());
    let (status, json) = send(
        &app,
        multipart_upload("alice", "run.exe", "application/x-msdownload", b"MZ"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("Unsupported file type"));
}

#[tokio::test]
async fn upload_size_limit_is_exact() {
    let (app, _) = test_app(Vec::new());
    let max = 10 * 1024 * 1024;

    let (status, _) = send(
        &app,
        multipart_upload("alice", "big.pdf", "application/pdf", &vec![0u8; max]),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = send(
        &app,
        multipart_upload("alice", "too-big.pdf", "application/pdf", &vec![0u8; max + 1]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "File too large (max 10MB)");
}

#[tokio::test]
async fn deleting_a_document_removes_record_and_file() {
    let (app, state) = test_app(Vec::new());

    let (_, json) = send(
        &app,
        multipart_upload("alice", "scan.png", "image/png", b"png-bytes"),
    )
    .await;
    let id = json["id"].as_str().unwrap().to_string();
    let path = json["document"]["filePath"].as_str().unwrap().to_string();

    let (status, _) = send(&app, authed("DELETE", &format!("/documents/{id}"), "alice")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, authed("GET", &format!("/documents/{id}"), "alice")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(state.files.read(&path).await.is_err());
}

#[tokio::test]
async fn chat_degrades_to_template_after_retries() {
    let calls = Arc::new(AtomicU32::new(0));
    let provider = ProviderEntry::new(
        Arc::new(RateLimitedProvider {
            calls: calls.clone(),
        }),
        RetryPolicy::new(2, Duration::ZERO),
    );
    let (app, _) = test_app(vec![provider]);

    let (status, json) = send(
        &app,
        authed_json(
            "POST",
            "/ai/chat",
            "alice",
            serde_json::json!({ "message": "Should I fast before blood work?", "mode": "pre_visit" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["fallback"], true);
    // The template echoes the question and carries the medical disclaimer.
    let text = json["response"].as_str().unwrap();
    assert!(text.contains("Should I fast before blood work?"));
    assert!(text.contains("IMPORTANT MEDICAL DISCLAIMER"));
    // Two attempts against the rate-limited provider, then the static tier.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn chat_context_carries_the_most_recent_symptoms() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let provider = ProviderEntry::new(
        Arc::new(CapturingProvider { seen: seen.clone() }),
        RetryPolicy::no_retry(),
    );
    let (app, _) = test_app(vec![provider]);

    log_dated_symptoms(&app, "alice", 15).await;

    let (status, _) = send(
        &app,
        authed_json(
            "POST",
            "/ai/chat",
            "alice",
            serde_json::json!({ "message": "What should I mention?", "mode": "pre_visit" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The newest ten symptoms, oldest first; S1..S5 fall off the window.
    let expected: Vec<String> = (6..=15).map(|i| format!("S{i}")).collect();
    assert_eq!(*seen.lock().unwrap(), vec![expected]);
}

#[tokio::test]
async fn symptom_digest_prefers_recent_entries() {
    let (app, _) = test_app(Vec::new());

    log_dated_symptoms(&app, "alice", 35).await;

    let (status, json) = send(&app, authed("POST", "/symptoms/summary", "alice")).await;
    assert_eq!(status, StatusCode::OK);
    let text = json["summary"].as_str().unwrap();
    // The digest bullets the ten newest of the fetched window.
    assert!(text.contains("S35 (Severity"));
    assert!(text.contains("S26 (Severity"));
    assert!(!text.contains("S25 (Severity"));
}

#[tokio::test]
async fn chat_rejects_an_unknown_mode() {
    let (app, _) = test_app(Vec::new());
    let (status, json) = send(
        &app,
        authed_json(
            "POST",
            "/ai/chat",
            "alice",
            serde_json::json!({ "message": "hello", "mode": "banana" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid mode: banana");
}

#[tokio::test]
async fn chat_requires_a_message() {
    let (app, _) = test_app(Vec::new());
    let (status, json) = send(
        &app,
        authed_json("POST", "/ai/chat", "alice", serde_json::json!({ "message": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Message is required");
}

#[tokio::test]
async fn summarize_creates_one_summary_and_stamps_the_document() {
    let (app, _) = test_app(Vec::new());

    let (_, json) = send(
        &app,
        multipart_upload("alice", "discharge.pdf", "application/pdf", b"%PDF-1.4 notes"),
    )
    .await;
    let document_id = json["id"].as_str().unwrap().to_string();

    let (status, json) = send(
        &app,
        authed_json(
            "POST",
            "/ai/summarize",
            "alice",
            serde_json::json!({ "documentId": document_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["source"], "static");
    assert_eq!(json["fallback"], true);
    assert_eq!(json["summary"]["documentId"], document_id.as_str());
    let summary_id = json["summaryId"].as_str().unwrap().to_string();

    // Exactly one summary exists, it is the latest, and it is fetchable.
    let (_, json) = send(&app, authed("GET", "/visit-summaries/list", "alice")).await;
    assert_eq!(json["summaries"].as_array().unwrap().len(), 1);
    let (_, json) = send(&app, authed("GET", "/ai/summary", "alice")).await;
    assert_eq!(json["summary"]["id"], summary_id.as_str());
    let (status, _) = send(
        &app,
        authed("GET", &format!("/visit-summaries/{summary_id}"), "alice"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The source document carries the processing stamp.
    let (_, json) = send(&app, authed("GET", &format!("/documents/{document_id}"), "alice")).await;
    assert!(!json["document"]["processedAt"].is_null());
    assert!(!json["document"]["processedText"].is_null());
}

#[tokio::test]
async fn summarize_through_a_live_provider_is_not_flagged() {
    let provider = ProviderEntry::new(Arc::new(CannedProvider), RetryPolicy::no_retry());
    let (app, _) = test_app(vec![provider]);

    let (_, json) = send(
        &app,
        multipart_upload("alice", "report.pdf", "application/pdf", b"%PDF-1.4 report"),
    )
    .await;
    let document_id = json["id"].as_str().unwrap().to_string();

    let (status, json) = send(
        &app,
        authed_json(
            "POST",
            "/ai/summarize",
            "alice",
            serde_json::json!({ "documentId": document_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["source"], "canned");
    // The fallback marker is omitted entirely for grounded summaries.
    assert!(json.get("fallback").is_none());
    assert_eq!(json["summary"]["patientSummary"], "plain-language overview");

    let (_, json) = send(&app, authed("GET", "/visit-summaries/list", "alice")).await;
    assert_eq!(json["summaries"].as_array().unwrap().len(), 1);
    let (_, json) = send(&app, authed("GET", &format!("/documents/{document_id}"), "alice")).await;
    assert_eq!(
        json["document"]["processedText"],
        "extracted text of report.pdf"
    );
    assert!(!json["document"]["processedAt"].is_null());
}

#[tokio::test]
async fn summarize_rejects_other_users_documents() {
    let (app, _) = test_app(Vec::new());

    let (_, json) = send(
        &app,
        multipart_upload("alice", "labs.pdf", "application/pdf", b"%PDF-1.4"),
    )
    .await;
    let document_id = json["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        authed_json(
            "POST",
            "/ai/summarize",
            "bob",
            serde_json::json!({ "documentId": document_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // No summary was created for either user.
    let (_, json) = send(&app, authed("GET", "/visit-summaries/list", "bob")).await;
    assert_eq!(json["summaries"].as_array().unwrap().len(), 0);
    let (_, json) = send(&app, authed("GET", "/visit-summaries/list", "alice")).await;
    assert_eq!(json["summaries"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn symptom_summary_digest_lists_recent_entries() {
    let (app, _) = test_app(Vec::new());

    send(
        &app,
        authed_json("POST", "/symptoms/add", "alice", add_symptom_body("Migraine", 8)),
    )
    .await;

    let (status, json) = send(&app, authed("POST", "/symptoms/summary", "alice")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    let text = json["summary"].as_str().unwrap();
    assert!(text.contains("Migraine"));
    assert!(text.contains("Severity: 8/10"));
}

#[tokio::test]
async fn listing_is_read_only() {
    let (app, _) = test_app(Vec::new());
    send(
        &app,
        authed_json("POST", "/symptoms/add", "alice", add_symptom_body("Cough", 3)),
    )
    .await;

    for _ in 0..3 {
        let (_, json) = send(&app, authed("GET", "/symptoms/list", "alice")).await;
        assert_eq!(json["symptoms"].as_array().unwrap().len(), 1);
    }
}

// Keep the chat mode strings stable; clients send them verbatim.
#[test]
fn chat_mode_wire_names() {
    assert_eq!(ChatMode::PreVisit.as_str(), "pre_visit");
    assert_eq!(ChatMode::PostVisit.as_str(), "post_visit");
}
