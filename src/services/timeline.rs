// src/services/timeline.rs
//! Candidate timeline: an append-only log of what happened to a candidate

use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::common::new_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineEvent {
    CandidateCreated,
    CandidateUpdated,
    PostulationCreated,
    StageChanged,
    NoteAdded,
    EvaluationAdded,
    AttachmentUploaded,
    AttachmentDeleted,
    InterviewScheduled,
    InterviewStatusChanged,
    EmailSent,
    AiAnalysisCompleted,
}

impl TimelineEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimelineEvent::CandidateCreated => "candidate_created",
            TimelineEvent::CandidateUpdated => "candidate_updated",
            TimelineEvent::PostulationCreated => "postulation_created",
            TimelineEvent::StageChanged => "stage_changed",
            TimelineEvent::NoteAdded => "note_added",
            TimelineEvent::EvaluationAdded => "evaluation_added",
            TimelineEvent::AttachmentUploaded => "attachment_uploaded",
            TimelineEvent::AttachmentDeleted => "attachment_deleted",
            TimelineEvent::InterviewScheduled => "interview_scheduled",
            TimelineEvent::InterviewStatusChanged => "interview_status_changed",
            TimelineEvent::EmailSent => "email_sent",
            TimelineEvent::AiAnalysisCompleted => "ai_analysis_completed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimelineEntry<'a> {
    pub candidate_id: &'a str,
    pub application_id: Option<&'a str>,
    pub event: TimelineEvent,
    pub description: String,
    pub metadata: Option<Value>,
    pub actor_id: Option<&'a str>,
}

impl<'a> TimelineEntry<'a> {
    pub fn new(candidate_id: &'a str, event: TimelineEvent, description: impl Into<String>) -> Self {
        Self {
            candidate_id,
            application_id: None,
            event,
            description: description.into(),
            metadata: None,
            actor_id: None,
        }
    }

    pub fn application(mut self, application_id: Option<&'a str>) -> Self {
        self.application_id = application_id;
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn actor(mut self, actor_id: &'a str) -> Self {
        self.actor_id = Some(actor_id);
        self
    }
}

/// Inserts a timeline row and returns its id
pub async fn log_timeline_event(pool: &SqlitePool, entry: TimelineEntry<'_>) -> Result<String, sqlx::Error> {
    let id = new_id();
    sqlx::query(
        r#"
        INSERT INTO candidate_timeline (id, candidate_id, application_id, event_type, description, metadata, actor_id)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(entry.candidate_id)
    .bind(entry.application_id)
    .bind(entry.event.as_str())
    .bind(&entry.description)
    .bind(entry.metadata.map(|m| m.to_string()))
    .bind(entry.actor_id)
    .execute(pool)
    .await?;

    debug!(
        candidate_id = %entry.candidate_id,
        event_type = entry.event.as_str(),
        "Timeline event recorded"
    );
    Ok(id)
}

/// Same as [`log_timeline_event`] but never fails the caller
pub async fn record(pool: &SqlitePool, entry: TimelineEntry<'_>) {
    let candidate_id = entry.candidate_id.to_string();
    let event_type = entry.event.as_str();
    if let Err(e) = log_timeline_event(pool, entry).await {
        warn!(
            error = %e,
            candidate_id = %candidate_id,
            event_type = event_type,
            "Failed to record timeline event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::testing::test_pool;
    use serde_json::json;

    #[tokio::test]
    async fn test_log_timeline_event_persists_metadata() {
        let pool = test_pool().await;
        sqlx::query("INSERT INTO candidates (id, full_name, email) VALUES ('c1', 'Ana', 'ana@x.cl')")
            .execute(&pool)
            .await
            .unwrap();

        let entry = TimelineEntry::new("c1", TimelineEvent::StageChanged, "Etapa cambiada")
            .metadata(json!({ "from": "postulado", "to": "oferta" }))
            .actor("u1");
        let id = log_timeline_event(&pool, entry).await.unwrap();

        let (event_type, metadata): (String, Option<String>) =
            sqlx::query_as("SELECT event_type, metadata FROM candidate_timeline WHERE id = ?")
                .bind(&id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(event_type, "stage_changed");
        let metadata: Value = serde_json::from_str(&metadata.unwrap()).unwrap();
        assert_eq!(metadata["to"], "oferta");
    }

    #[tokio::test]
    async fn test_record_swallows_errors() {
        let pool = test_pool().await;
        // Unknown candidate violates the foreign key; record must not panic
        record(&pool, TimelineEntry::new("missing", TimelineEvent::NoteAdded, "x")).await;
    }
}
