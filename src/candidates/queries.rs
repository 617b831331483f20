// src/candidates/queries.rs
//! Lookups shared by the candidate, interview and AI handlers

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, error, warn};

use super::models::{Candidate, Evaluation, Postulation};
use crate::common::{new_id, ApiError};

pub async fn find_candidate(pool: &SqlitePool, candidate_id: &str) -> Result<Candidate, ApiError> {
    sqlx::query_as::<_, Candidate>("SELECT * FROM candidates WHERE id = ?")
        .bind(candidate_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            error!(error = %e, candidate_id = %candidate_id, "Database error fetching candidate");
            ApiError::DatabaseError(e)
        })?
        .ok_or_else(|| {
            warn!(candidate_id = %candidate_id, "Candidate not found");
            ApiError::NotFound("Candidato no encontrado".to_string())
        })
}

pub async fn find_postulation(pool: &SqlitePool, postulation_id: &str) -> Result<Postulation, ApiError> {
    sqlx::query_as::<_, Postulation>("SELECT * FROM postulations WHERE id = ?")
        .bind(postulation_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| {
            warn!(postulation_id = %postulation_id, "Postulation not found");
            ApiError::NotFound("Postulación no encontrada".to_string())
        })
}

/// Title of an opening, 404 when it does not exist
pub async fn find_application_title(pool: &SqlitePool, application_id: &str) -> Result<String, ApiError> {
    sqlx::query_scalar::<_, String>("SELECT title FROM applications WHERE id = ?")
        .bind(application_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| {
            warn!(application_id = %application_id, "Application not found");
            ApiError::NotFound("Proceso de selección no encontrado".to_string())
        })
}

/// Sets the postulation score to the average of the candidate's evaluations
/// for that application. Returns the new score, if a postulation exists.
pub async fn recalculate_postulation_score(
    conn: &mut SqliteConnection,
    candidate_id: &str,
    application_id: &str,
) -> Result<Option<f64>, sqlx::Error> {
    let score = sqlx::query_scalar::<_, Option<f64>>(
        r#"
        UPDATE postulations
        SET score = (
                SELECT ROUND(AVG(score), 2) FROM candidate_evaluations
                WHERE candidate_id = ? AND application_id = ?
            ),
            updated_at = datetime('now')
        WHERE candidate_id = ? AND application_id = ?
        RETURNING score
        "#,
    )
    .bind(candidate_id)
    .bind(application_id)
    .bind(candidate_id)
    .bind(application_id)
    .fetch_optional(&mut *conn)
    .await?
    .flatten();

    debug!(
        candidate_id = %candidate_id,
        application_id = %application_id,
        score = ?score,
        "Postulation score recalculated"
    );
    Ok(score)
}

/// Evaluation about to be stored, manual or produced by the AI queue
#[derive(Debug, Clone)]
pub struct NewEvaluation<'a> {
    pub candidate_id: &'a str,
    pub application_id: Option<&'a str>,
    pub evaluator_id: Option<&'a str>,
    pub source: &'a str,
    pub score: i64,
    pub strengths: &'a [String],
    pub weaknesses: &'a [String],
    pub recommendation: &'a str,
    pub comments: Option<&'a str>,
}

/// Inserts the evaluation and refreshes the postulation score it contributes to.
/// Callers pass a transaction so both writes land together.
pub async fn store_evaluation(
    conn: &mut SqliteConnection,
    evaluation: NewEvaluation<'_>,
) -> Result<(Evaluation, Option<f64>), sqlx::Error> {
    let list = |items: &[String]| serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string());

    let stored = sqlx::query_as::<_, Evaluation>(
        r#"
        INSERT INTO candidate_evaluations
            (id, candidate_id, application_id, evaluator_id, source, score, strengths, weaknesses, recommendation, comments)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(new_id())
    .bind(evaluation.candidate_id)
    .bind(evaluation.application_id)
    .bind(evaluation.evaluator_id)
    .bind(evaluation.source)
    .bind(evaluation.score)
    .bind(list(evaluation.strengths))
    .bind(list(evaluation.weaknesses))
    .bind(evaluation.recommendation)
    .bind(evaluation.comments)
    .fetch_one(&mut *conn)
    .await?;

    let postulation_score = match evaluation.application_id {
        Some(application_id) => {
            recalculate_postulation_score(conn, evaluation.candidate_id, application_id).await?
        }
        None => None,
    };

    Ok((stored, postulation_score))
}
