// src/ai_processing/queue.rs
//! Queue operations over `ai_processing_queue`
//!
//! Ordering is priority descending, then insertion order. Claiming is a single
//! `UPDATE ... RETURNING` so two workers never receive the same task.

use serde_json::{json, Value};
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use super::models::*;
use crate::candidates::models::Evaluation;
use crate::candidates::queries::{find_candidate, store_evaluation, NewEvaluation};
use crate::common::{new_id, ApiError};
use crate::services::ai_analysis::{parse_analysis, AiAnalyzer, AnalysisResult, CandidateProfile};
use crate::services::timeline::{self, TimelineEntry, TimelineEvent};

/// Rows a worker may take: pending, or processing for too long with attempts left
const CLAIMABLE: &str = r#"
    (status = 'pending'
     OR (status = 'processing'
         AND started_at < datetime('now', ?1)
         AND attempts < max_attempts))
"#;

const NOTES_IN_PROFILE: i64 = 20;

/// A guarded status write matched no row: another caller already finished or
/// reclaimed the task
fn not_processing(task_id: &str) -> ApiError {
    warn!(task_id = %task_id, "AI task changed state before the update");
    ApiError::BadRequest("La tarea no está en proceso".to_string())
}

/// New queue entry
#[derive(Debug, Clone)]
pub struct NewTask<'a> {
    pub candidate_id: &'a str,
    pub application_id: Option<&'a str>,
    pub task_type: &'a str,
    pub priority: i64,
    pub payload: Option<&'a Value>,
    pub requested_by: Option<&'a str>,
}

/// How a worker finished a task
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    Success(Value),
    Failure(String),
}

#[derive(Clone)]
pub struct AiQueue {
    db: SqlitePool,
}

fn stale_modifier() -> String {
    format!("-{} minutes", STALE_PROCESSING_MINUTES)
}

impl AiQueue {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Adds a task unless the same candidate already has one of this type in flight
    ///
    /// Returns the task and whether it was newly created.
    pub async fn enqueue(&self, task: NewTask<'_>) -> Result<(AiTask, bool), ApiError> {
        find_candidate(&self.db, task.candidate_id).await?;

        let payload = task.payload.map(Value::to_string);
        let inserted = sqlx::query_as::<_, AiTask>(
            r#"
            INSERT INTO ai_processing_queue (id, candidate_id, application_id, task_type, priority, payload, requested_by)
            SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7
            WHERE NOT EXISTS (
                SELECT 1 FROM ai_processing_queue
                WHERE candidate_id = ?2 AND task_type = ?4 AND status IN ('pending', 'processing')
            )
            RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(task.candidate_id)
        .bind(task.application_id)
        .bind(task.task_type)
        .bind(task.priority)
        .bind(&payload)
        .bind(task.requested_by)
        .fetch_optional(&self.db)
        .await?;

        if let Some(created) = inserted {
            info!(
                task_id = %created.id,
                candidate_id = %created.candidate_id,
                task_type = %created.task_type,
                priority = created.priority,
                "AI task enqueued"
            );
            return Ok((created, true));
        }

        let existing = sqlx::query_as::<_, AiTask>(
            r#"
            SELECT * FROM ai_processing_queue
            WHERE candidate_id = ? AND task_type = ? AND status IN ('pending', 'processing')
            ORDER BY rowid ASC LIMIT 1
            "#,
        )
        .bind(task.candidate_id)
        .bind(task.task_type)
        .fetch_one(&self.db)
        .await?;

        info!(task_id = %existing.id, "AI task already queued, returning existing");
        Ok((existing, false))
    }

    /// The task the next claim would return, without taking it
    pub async fn peek(&self) -> Result<Option<AiTask>, sqlx::Error> {
        sqlx::query_as::<_, AiTask>(&format!(
            "SELECT * FROM ai_processing_queue WHERE {} ORDER BY priority DESC, rowid ASC LIMIT 1",
            CLAIMABLE
        ))
        .bind(stale_modifier())
        .fetch_optional(&self.db)
        .await
    }

    /// Atomically moves the next task to `processing` for `worker_id`
    pub async fn claim_next(&self, worker_id: &str) -> Result<Option<AiTask>, sqlx::Error> {
        self.fail_exhausted_stale().await?;

        let claimed = sqlx::query_as::<_, AiTask>(&format!(
            r#"
            UPDATE ai_processing_queue
            SET status = 'processing', worker_id = ?2, started_at = datetime('now'), attempts = attempts + 1
            WHERE id = (
                SELECT id FROM ai_processing_queue
                WHERE {claimable}
                ORDER BY priority DESC, rowid ASC
                LIMIT 1
            )
            AND {claimable}
            RETURNING *
            "#,
            claimable = CLAIMABLE
        ))
        .bind(stale_modifier())
        .bind(worker_id)
        .fetch_optional(&self.db)
        .await?;

        if let Some(task) = &claimed {
            info!(
                task_id = %task.id,
                worker_id = %worker_id,
                attempt = task.attempts,
                "AI task claimed"
            );
        }
        Ok(claimed)
    }

    /// Stale tasks with no attempts left are failed instead of reclaimed
    async fn fail_exhausted_stale(&self) -> Result<(), sqlx::Error> {
        let failed = sqlx::query(
            r#"
            UPDATE ai_processing_queue
            SET status = 'failed', completed_at = datetime('now'),
                error_message = COALESCE(error_message, 'Tiempo de procesamiento agotado')
            WHERE status = 'processing' AND started_at < datetime('now', ?) AND attempts >= max_attempts
            "#,
        )
        .bind(stale_modifier())
        .execute(&self.db)
        .await?
        .rows_affected();

        if failed > 0 {
            warn!(count = failed, "Stale AI tasks out of attempts marked as failed");
        }
        Ok(())
    }

    pub async fn get(&self, task_id: &str) -> Result<AiTask, ApiError> {
        sqlx::query_as::<_, AiTask>("SELECT * FROM ai_processing_queue WHERE id = ?")
            .bind(task_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Tarea no encontrada".to_string()))
    }

    /// Starts a specific pending task
    pub async fn start(&self, task_id: &str, worker_id: &str) -> Result<AiTask, ApiError> {
        let started = sqlx::query_as::<_, AiTask>(
            r#"
            UPDATE ai_processing_queue
            SET status = 'processing', worker_id = ?, started_at = datetime('now'), attempts = attempts + 1
            WHERE id = ? AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(worker_id)
        .bind(task_id)
        .fetch_optional(&self.db)
        .await?;

        match started {
            Some(task) => {
                info!(task_id = %task.id, worker_id = %worker_id, "AI task started");
                Ok(task)
            }
            None => {
                let current = self.get(task_id).await?;
                Err(ApiError::BadRequest(format!(
                    "La tarea no está pendiente (estado actual: {})",
                    current.status
                )))
            }
        }
    }

    /// Records the outcome of a processing task
    ///
    /// A scoring result is stored as an AI evaluation; a result that cannot be
    /// read as an analysis counts as a failure.
    pub async fn complete(&self, task_id: &str, outcome: TaskOutcome) -> Result<CompletedTask, ApiError> {
        let task = self.get(task_id).await?;
        if task.status != "processing" {
            return Err(ApiError::BadRequest(format!(
                "La tarea no está en proceso (estado actual: {})",
                task.status
            )));
        }

        let result = match outcome {
            TaskOutcome::Failure(message) => return self.record_failure(&task, &message).await,
            TaskOutcome::Success(result) => result,
        };

        let analysis = if SCORING_TASK_TYPES.contains(&task.task_type.as_str()) {
            let content = match &result {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            match parse_analysis(&content) {
                Ok(analysis) => Some(analysis),
                Err(e) => {
                    warn!(task_id = %task.id, error = %e, "AI task result is not a valid analysis");
                    return self
                        .record_failure(&task, &format!("Resultado de análisis inválido: {}", e))
                        .await;
                }
            }
        } else {
            None
        };

        let stored_result = match &analysis {
            Some(analysis) => serde_json::to_string(analysis).unwrap_or_else(|_| result.to_string()),
            None => result.to_string(),
        };

        let mut tx = self.db.begin().await?;

        let completed = sqlx::query_as::<_, AiTask>(
            r#"
            UPDATE ai_processing_queue
            SET status = 'completed', result = ?, error_message = NULL, completed_at = datetime('now')
            WHERE id = ? AND status = 'processing' AND attempts = ?
            RETURNING *
            "#,
        )
        .bind(&stored_result)
        .bind(&task.id)
        .bind(task.attempts)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| not_processing(&task.id))?;

        let (evaluation, postulation_score) = match &analysis {
            Some(analysis) => {
                let (evaluation, score) = store_evaluation(
                    &mut tx,
                    NewEvaluation {
                        candidate_id: &completed.candidate_id,
                        application_id: completed.application_id.as_deref(),
                        evaluator_id: None,
                        source: "ia",
                        score: analysis.score,
                        strengths: &analysis.strengths,
                        weaknesses: &analysis.weaknesses,
                        recommendation: &analysis.recommendation,
                        comments: Some(&analysis.summary),
                    },
                )
                .await
                .map_err(|e| {
                    error!(task_id = %completed.id, error = %e, "Failed to store AI evaluation");
                    ApiError::DatabaseError(e)
                })?;
                (Some(evaluation), score)
            }
            None => (None, None),
        };

        tx.commit().await?;

        if let (Some(analysis), Some(evaluation)) = (&analysis, &evaluation) {
            self.record_analysis_event(&completed, analysis, evaluation).await;
        }

        info!(
            task_id = %completed.id,
            task_type = %completed.task_type,
            has_evaluation = evaluation.is_some(),
            "AI task completed"
        );

        Ok(CompletedTask {
            task: completed,
            evaluation,
            postulation_score,
        })
    }

    async fn record_failure(&self, task: &AiTask, message: &str) -> Result<CompletedTask, ApiError> {
        let retry = task.attempts < task.max_attempts;

        let sql = if retry {
            r#"
            UPDATE ai_processing_queue
            SET status = 'pending', error_message = ?, worker_id = NULL, started_at = NULL
            WHERE id = ? AND status = 'processing' AND attempts = ?
            RETURNING *
            "#
        } else {
            r#"
            UPDATE ai_processing_queue
            SET status = 'failed', error_message = ?, completed_at = datetime('now')
            WHERE id = ? AND status = 'processing' AND attempts = ?
            RETURNING *
            "#
        };

        let updated = sqlx::query_as::<_, AiTask>(sql)
            .bind(message)
            .bind(&task.id)
            .bind(task.attempts)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| not_processing(&task.id))?;

        if retry {
            warn!(
                task_id = %task.id,
                attempt = task.attempts,
                max_attempts = task.max_attempts,
                error = %message,
                "AI task failed, requeued"
            );
        } else {
            error!(task_id = %task.id, error = %message, "AI task failed permanently");
        }

        Ok(CompletedTask {
            task: updated,
            evaluation: None,
            postulation_score: None,
        })
    }

    async fn record_analysis_event(&self, task: &AiTask, analysis: &AnalysisResult, evaluation: &Evaluation) {
        timeline::record(
            &self.db,
            TimelineEntry::new(
                &task.candidate_id,
                TimelineEvent::AiAnalysisCompleted,
                format!("Análisis IA completado: puntaje {}", analysis.score),
            )
            .application(task.application_id.as_deref())
            .metadata(json!({
                "taskId": task.id,
                "taskType": task.task_type,
                "score": analysis.score,
                "recommendation": analysis.recommendation,
                "evaluationId": evaluation.id,
            })),
        )
        .await;
    }

    pub async fn stats(&self) -> Result<QueueStats, sqlx::Error> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM ai_processing_queue GROUP BY status",
        )
        .fetch_all(&self.db)
        .await?;

        let mut stats = QueueStats::default();
        for (status, count) in rows {
            match status.as_str() {
                "pending" => stats.pending = count,
                "processing" => stats.processing = count,
                "completed" => stats.completed = count,
                "failed" => stats.failed = count,
                _ => {}
            }
            stats.total += count;
        }

        stats.oldest_pending_at = sqlx::query_scalar::<_, Option<String>>(
            "SELECT MIN(created_at) FROM ai_processing_queue WHERE status = 'pending'",
        )
        .fetch_one(&self.db)
        .await?;

        Ok(stats)
    }

    /// What the analyzer sees about the task's candidate
    pub async fn build_profile(&self, task: &AiTask) -> Result<CandidateProfile, ApiError> {
        let candidate = find_candidate(&self.db, &task.candidate_id).await?;

        let (application_title, application_description) = match task.application_id.as_deref() {
            Some(application_id) => sqlx::query_as::<_, (String, Option<String>)>(
                "SELECT title, description FROM applications WHERE id = ?",
            )
            .bind(application_id)
            .fetch_optional(&self.db)
            .await?
            .map(|(title, description)| (Some(title), description))
            .unwrap_or((None, None)),
            None => (None, None),
        };

        let notes = sqlx::query_scalar::<_, String>(
            "SELECT content FROM candidate_notes WHERE candidate_id = ? ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )
        .bind(&task.candidate_id)
        .bind(NOTES_IN_PROFILE)
        .fetch_all(&self.db)
        .await?;

        let attachments = sqlx::query_scalar::<_, String>(
            "SELECT file_name FROM candidate_attachments WHERE candidate_id = ? ORDER BY created_at ASC",
        )
        .bind(&task.candidate_id)
        .fetch_all(&self.db)
        .await?;

        let extra = task
            .payload
            .as_deref()
            .and_then(|p| serde_json::from_str::<Value>(p).ok());

        Ok(CandidateProfile {
            full_name: candidate.full_name,
            email: candidate.email,
            phone: candidate.phone,
            linkedin_url: candidate.linkedin_url,
            application_title,
            application_description,
            notes,
            attachments,
            extra,
        })
    }

    /// Claims the next task and runs it through `analyzer` in-process
    pub async fn process_next(
        &self,
        analyzer: &dyn AiAnalyzer,
        worker_id: &str,
    ) -> Result<Option<CompletedTask>, ApiError> {
        let task = match self.claim_next(worker_id).await? {
            Some(task) => task,
            None => return Ok(None),
        };

        let outcome = match self.build_profile(&task).await {
            Ok(profile) => match analyzer.analyze(&task.task_type, &profile).await {
                Ok(analysis) => TaskOutcome::Success(serde_json::to_value(&analysis).unwrap_or(Value::Null)),
                Err(e) => TaskOutcome::Failure(e.to_string()),
            },
            Err(e) => TaskOutcome::Failure(e.to_string()),
        };

        self.complete(&task.id, outcome).await.map(Some)
    }
}
