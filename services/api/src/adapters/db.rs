//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete
//! implementation of the `RecordStore` port from the `core` crate. All
//! record collections are owner-scoped: reads fetch by id first and
//! compare the owner, so a missing record and a foreign record stay
//! distinguishable (404 vs 403) without leaking anything else.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use careprep_core::domain::{
    Document, FollowUp, Medication, NewDocument, NewSymptom, NewVisitSummary, Symptom,
    VisitSummary,
};
use careprep_core::ports::{PortError, PortResult, RecordStore};

/// Result sets are bounded so client-visible lists stay small.
const MAX_LIST_LIMIT: i64 = 100;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `RecordStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    fn map_err(context: &str, e: sqlx::Error) -> PortError {
        match e {
            sqlx::Error::RowNotFound => PortError::NotFound(context.to_string()),
            sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                PortError::Unavailable(e.to_string())
            }
            _ => PortError::Unexpected(e.to_string()),
        }
    }

    fn clamp_limit(limit: i64) -> i64 {
        limit.clamp(1, MAX_LIST_LIMIT)
    }

    /// Ownership gate shared by the `get_*`/`delete_*` operations.
    fn check_owner(record_uid: &str, uid: &str) -> PortResult<()> {
        if record_uid == uid {
            Ok(())
        } else {
            Err(PortError::Forbidden)
        }
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct SymptomRow {
    id: Uuid,
    user_id: String,
    symptom: String,
    severity: i32,
    notes: String,
    date: NaiveDate,
    created_at: DateTime<Utc>,
}

impl SymptomRow {
    fn to_domain(self) -> Symptom {
        Symptom {
            id: self.id,
            user_id: self.user_id,
            symptom: self.symptom,
            severity: self.severity,
            notes: self.notes,
            date: self.date,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct DocumentRow {
    id: Uuid,
    user_id: String,
    file_id: String,
    file_name: String,
    file_type: String,
    file_path: String,
    file_size: i64,
    processed_text: Option<String>,
    processed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl DocumentRow {
    fn to_domain(self) -> Document {
        Document {
            id: self.id,
            user_id: self.user_id,
            file_id: self.file_id,
            file_name: self.file_name,
            file_type: self.file_type,
            file_path: self.file_path,
            file_size: self.file_size,
            processed_text: self.processed_text,
            processed_at: self.processed_at,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct VisitSummaryRow {
    id: Uuid,
    user_id: String,
    document_id: Uuid,
    doctor_summary: String,
    patient_summary: String,
    medications: Json<Vec<Medication>>,
    follow_ups: Json<Vec<FollowUp>>,
    red_flags: Json<Vec<String>>,
    created_at: DateTime<Utc>,
}

impl VisitSummaryRow {
    fn to_domain(self) -> VisitSummary {
        VisitSummary {
            id: self.id,
            user_id: self.user_id,
            document_id: self.document_id,
            doctor_summary: self.doctor_summary,
            patient_summary: self.patient_summary,
            medications: self.medications.0,
            follow_ups: self.follow_ups.0,
            red_flags: self.red_flags.0,
            created_at: self.created_at,
        }
    }
}

const SYMPTOM_COLUMNS: &str = "id, user_id, symptom, severity, notes, date, created_at";
const DOCUMENT_COLUMNS: &str = "id, user_id, file_id, file_name, file_type, file_path, \
                                file_size, processed_text, processed_at, created_at";
const SUMMARY_COLUMNS: &str = "id, user_id, document_id, doctor_summary, patient_summary, \
                               medications, follow_ups, red_flags, created_at";

//=========================================================================================
// `RecordStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl RecordStore for DbAdapter {
    async fn add_symptom(&self, symptom: NewSymptom) -> PortResult<Symptom> {
        let query = format!(
            "INSERT INTO symptoms (id, user_id, symptom, severity, notes, date) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {SYMPTOM_COLUMNS}"
        );
        let row = sqlx::query_as::<_, SymptomRow>(&query)
            .bind(Uuid::new_v4())
            .bind(&symptom.user_id)
            .bind(&symptom.symptom)
            .bind(symptom.severity)
            .bind(&symptom.notes)
            .bind(symptom.date)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Self::map_err("symptom", e))?;
        Ok(row.to_domain())
    }

    async fn list_symptoms(&self, uid: &str, limit: i64) -> PortResult<Vec<Symptom>> {
        let query = format!(
            "SELECT {SYMPTOM_COLUMNS} FROM symptoms WHERE user_id = $1 \
             ORDER BY date ASC LIMIT $2"
        );
        let rows = sqlx::query_as::<_, SymptomRow>(&query)
            .bind(uid)
            .bind(Self::clamp_limit(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Self::map_err("symptoms", e))?;
        Ok(rows.into_iter().map(SymptomRow::to_domain).collect())
    }

    async fn recent_symptoms(&self, uid: &str, limit: i64) -> PortResult<Vec<Symptom>> {
        let query = format!(
            "SELECT {SYMPTOM_COLUMNS} FROM symptoms WHERE user_id = $1 \
             ORDER BY date DESC, created_at DESC LIMIT $2"
        );
        let rows = sqlx::query_as::<_, SymptomRow>(&query)
            .bind(uid)
            .bind(Self::clamp_limit(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Self::map_err("symptoms", e))?;
        let mut symptoms: Vec<Symptom> =
            rows.into_iter().map(SymptomRow::to_domain).collect();
        // The window is taken from the newest end; callers want it oldest-first.
        symptoms.reverse();
        Ok(symptoms)
    }

    async fn get_symptom(&self, uid: &str, id: Uuid) -> PortResult<Symptom> {
        let query = format!("SELECT {SYMPTOM_COLUMNS} FROM symptoms WHERE id = $1");
        let row = sqlx::query_as::<_, SymptomRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Self::map_err("symptom", e))?
            .ok_or_else(|| PortError::NotFound(format!("Symptom {id} not found")))?;
        Self::check_owner(&row.user_id, uid)?;
        Ok(row.to_domain())
    }

    async fn delete_symptom(&self, uid: &str, id: Uuid) -> PortResult<()> {
        // Ownership check rides on the fetch; the delete itself is keyed.
        self.get_symptom(uid, id).await?;
        sqlx::query("DELETE FROM symptoms WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::map_err("symptom", e))?;
        Ok(())
    }

    async fn add_document(&self, document: NewDocument) -> PortResult<Document> {
        let query = format!(
            "INSERT INTO documents (id, user_id, file_id, file_name, file_type, file_path, file_size) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {DOCUMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, DocumentRow>(&query)
            .bind(Uuid::new_v4())
            .bind(&document.user_id)
            .bind(&document.file_id)
            .bind(&document.file_name)
            .bind(&document.file_type)
            .bind(&document.file_path)
            .bind(document.file_size)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Self::map_err("document", e))?;
        Ok(row.to_domain())
    }

    async fn list_documents(&self, uid: &str, limit: i64) -> PortResult<Vec<Document>> {
        let query = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT $2"
        );
        let rows = sqlx::query_as::<_, DocumentRow>(&query)
            .bind(uid)
            .bind(Self::clamp_limit(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Self::map_err("documents", e))?;
        Ok(rows.into_iter().map(DocumentRow::to_domain).collect())
    }

    async fn get_document(&self, uid: &str, id: Uuid) -> PortResult<Document> {
        let query = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1");
        let row = sqlx::query_as::<_, DocumentRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Self::map_err("document", e))?
            .ok_or_else(|| PortError::NotFound(format!("Document {id} not found")))?;
        Self::check_owner(&row.user_id, uid)?;
        Ok(row.to_domain())
    }

    async fn delete_document(&self, uid: &str, id: Uuid) -> PortResult<()> {
        self.get_document(uid, id).await?;
        sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::map_err("document", e))?;
        Ok(())
    }

    async fn mark_document_processed(
        &self,
        id: Uuid,
        processed_text: &str,
        processed_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("UPDATE documents SET processed_text = $1, processed_at = $2 WHERE id = $3")
            .bind(processed_text)
            .bind(processed_at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::map_err("document", e))?;
        Ok(())
    }

    async fn add_visit_summary(&self, summary: NewVisitSummary) -> PortResult<VisitSummary> {
        let query = format!(
            "INSERT INTO visit_summaries \
             (id, user_id, document_id, doctor_summary, patient_summary, medications, follow_ups, red_flags) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {SUMMARY_COLUMNS}"
        );
        let analysis = summary.analysis;
        let row = sqlx::query_as::<_, VisitSummaryRow>(&query)
            .bind(Uuid::new_v4())
            .bind(&summary.user_id)
            .bind(summary.document_id)
            .bind(&analysis.doctor_summary)
            .bind(&analysis.patient_summary)
            .bind(Json(&analysis.medications))
            .bind(Json(&analysis.follow_ups))
            .bind(Json(&analysis.red_flags))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Self::map_err("visit summary", e))?;
        Ok(row.to_domain())
    }

    async fn list_visit_summaries(&self, uid: &str, limit: i64) -> PortResult<Vec<VisitSummary>> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM visit_summaries WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT $2"
        );
        let rows = sqlx::query_as::<_, VisitSummaryRow>(&query)
            .bind(uid)
            .bind(Self::clamp_limit(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Self::map_err("visit summaries", e))?;
        Ok(rows.into_iter().map(VisitSummaryRow::to_domain).collect())
    }

    async fn get_visit_summary(&self, uid: &str, id: Uuid) -> PortResult<VisitSummary> {
        let query = format!("SELECT {SUMMARY_COLUMNS} FROM visit_summaries WHERE id = $1");
        let row = sqlx::query_as::<_, VisitSummaryRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Self::map_err("visit summary", e))?
            .ok_or_else(|| PortError::NotFound(format!("Visit summary {id} not found")))?;
        Self::check_owner(&row.user_id, uid)?;
        Ok(row.to_domain())
    }

    async fn latest_visit_summary(&self, uid: &str) -> PortResult<Option<VisitSummary>> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM visit_summaries WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, VisitSummaryRow>(&query)
            .bind(uid)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Self::map_err("visit summary", e))?;
        Ok(row.map(VisitSummaryRow::to_domain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_clamped_to_the_bounded_window() {
        assert_eq!(DbAdapter::clamp_limit(0), 1);
        assert_eq!(DbAdapter::clamp_limit(50), 50);
        assert_eq!(DbAdapter::clamp_limit(1000), 100);
    }

    #[test]
    fn owner_mismatch_is_forbidden() {
        assert!(DbAdapter::check_owner("user-a", "user-a").is_ok());
        assert!(matches!(
            DbAdapter::check_owner("user-a", "user-b"),
            Err(PortError::Forbidden)
        ));
    }
}
