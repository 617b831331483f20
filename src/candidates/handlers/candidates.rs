// src/candidates/handlers/candidates.rs

use axum::{
    extract::{Extension, Path, Query},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::auth::{AuthedUser, Permission};
use crate::candidates::models::*;
use crate::candidates::queries::{find_application_title, find_candidate};
use crate::candidates::validators::CandidateValidator;
use crate::common::helpers::{like_contains, trimmed};
use crate::common::{new_id, safe_email_log, ApiError, ApiResponse, AppState, Validator};
use crate::services::timeline::{self, TimelineEntry, TimelineEvent};

const DUPLICATE_EMAIL: &str = "Ya existe un candidato con ese email";

/// POST /api/candidates - Create a candidate, optionally inside an opening
pub async fn create_candidate(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(request): Json<CreateCandidateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ManageCandidates)?;

    CandidateValidator.validate(&request).into_result()?;

    let full_name = trimmed(&request.full_name).unwrap_or_default();
    let email = trimmed(&request.email).unwrap_or_default().to_lowercase();

    let application_title = match request.application_id.as_deref() {
        Some(application_id) => Some(find_application_title(&state.db, application_id).await?),
        None => None,
    };

    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM candidates WHERE email = ?")
        .bind(&email)
        .fetch_one(&state.db)
        .await?;
    if existing > 0 {
        warn!(email = %safe_email_log(&email), "Candidate creation failed: duplicate email");
        return Err(ApiError::BadRequest(DUPLICATE_EMAIL.to_string()));
    }

    let candidate_id = new_id();
    let mut tx = state.db.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO candidates (id, full_name, email, phone, linkedin_url, source, created_by)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&candidate_id)
    .bind(&full_name)
    .bind(&email)
    .bind(trimmed(&request.phone))
    .bind(trimmed(&request.linkedin_url))
    .bind(trimmed(&request.source))
    .bind(&authed.id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        error!(error = %e, "Database error inserting candidate");
        ApiError::duplicate_or_database(e, DUPLICATE_EMAIL)
    })?;

    if let Some(application_id) = request.application_id.as_deref() {
        sqlx::query(
            "INSERT INTO postulations (id, candidate_id, application_id, stage) VALUES (?, ?, ?, 'postulado')",
        )
        .bind(new_id())
        .bind(&candidate_id)
        .bind(application_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    timeline::record(
        &state.db,
        TimelineEntry::new(&candidate_id, TimelineEvent::CandidateCreated, "Candidato registrado")
            .actor(&authed.id),
    )
    .await;

    if let (Some(application_id), Some(title)) = (request.application_id.as_deref(), application_title) {
        timeline::record(
            &state.db,
            TimelineEntry::new(
                &candidate_id,
                TimelineEvent::PostulationCreated,
                format!("Agregado al proceso {}", title),
            )
            .application(Some(application_id))
            .actor(&authed.id),
        )
        .await;
    }

    let candidate = find_candidate(&state.db, &candidate_id).await?;

    info!(
        candidate_id = %candidate.id,
        created_by = %authed.id,
        "Candidate created"
    );

    Ok(ApiResponse::created(candidate).with_message("Candidato creado exitosamente"))
}

/// GET /api/candidates?applicationId=&stage=&search=
pub async fn list_candidates(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Query(query): Query<CandidateListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ViewCandidates)?;

    if let Some(stage) = query.stage.as_deref() {
        if Stage::parse(stage).is_none() {
            return Err(ApiError::ValidationError("Etapa inválida".to_string()));
        }
    }

    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| like_contains(&s.to_lowercase()));

    let candidates = sqlx::query_as::<_, Candidate>(
        r#"
        SELECT c.* FROM candidates c
        WHERE (?1 IS NULL
               OR LOWER(c.full_name) LIKE ?1 ESCAPE '\'
               OR LOWER(c.email) LIKE ?1 ESCAPE '\')
          AND (?2 IS NULL AND ?3 IS NULL OR EXISTS (
                SELECT 1 FROM postulations p
                WHERE p.candidate_id = c.id
                  AND (?2 IS NULL OR p.application_id = ?2)
                  AND (?3 IS NULL OR p.stage = ?3)
          ))
        ORDER BY c.created_at DESC, c.rowid DESC
        "#,
    )
    .bind(&search)
    .bind(&query.application_id)
    .bind(&query.stage)
    .fetch_all(&state.db)
    .await
    .map_err(|e| {
        error!(error = %e, "Database error listing candidates");
        ApiError::DatabaseError(e)
    })?;

    info!(
        user_id = %authed.id,
        count = candidates.len(),
        "Candidates listed"
    );

    Ok(ApiResponse::ok(candidates))
}

/// GET /api/candidates/:id - Candidate with its postulations
pub async fn get_candidate(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(candidate_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ViewCandidates)?;

    let candidate = find_candidate(&state.db, &candidate_id).await?;

    let postulations = sqlx::query_as::<_, CandidatePostulation>(
        r#"
        SELECT p.id, p.application_id, a.title AS application_title, p.stage, p.score,
               p.assigned_to, p.updated_at
        FROM postulations p
        JOIN applications a ON a.id = p.application_id
        WHERE p.candidate_id = ?
        ORDER BY p.created_at DESC
        "#,
    )
    .bind(&candidate_id)
    .fetch_all(&state.db)
    .await?;

    Ok(ApiResponse::ok(CandidateDetail {
        candidate,
        postulations,
    }))
}

/// PUT /api/candidates/:id
pub async fn update_candidate(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(candidate_id): Path<String>,
    Json(request): Json<UpdateCandidateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ManageCandidates)?;

    CandidateValidator.validate(&request).into_result()?;
    find_candidate(&state.db, &candidate_id).await?;

    let email = trimmed(&request.email).map(|e| e.to_lowercase());
    if let Some(email) = &email {
        let taken = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM candidates WHERE email = ? AND id != ?",
        )
        .bind(email)
        .bind(&candidate_id)
        .fetch_one(&state.db)
        .await?;
        if taken > 0 {
            return Err(ApiError::BadRequest(DUPLICATE_EMAIL.to_string()));
        }
    }

    let candidate = sqlx::query_as::<_, Candidate>(
        r#"
        UPDATE candidates SET
            full_name = COALESCE(?, full_name),
            email = COALESCE(?, email),
            phone = COALESCE(?, phone),
            linkedin_url = COALESCE(?, linkedin_url),
            source = COALESCE(?, source),
            updated_at = datetime('now')
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(trimmed(&request.full_name))
    .bind(&email)
    .bind(trimmed(&request.phone))
    .bind(trimmed(&request.linkedin_url))
    .bind(trimmed(&request.source))
    .bind(&candidate_id)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        error!(error = %e, candidate_id = %candidate_id, "Database error updating candidate");
        ApiError::duplicate_or_database(e, DUPLICATE_EMAIL)
    })?;

    timeline::record(
        &state.db,
        TimelineEntry::new(&candidate_id, TimelineEvent::CandidateUpdated, "Datos del candidato actualizados")
            .actor(&authed.id),
    )
    .await;

    info!(candidate_id = %candidate_id, updated_by = %authed.id, "Candidate updated");
    Ok(ApiResponse::ok(candidate).with_message("Candidato actualizado"))
}

/// DELETE /api/candidates/:id - Removes the candidate and its stored files
pub async fn delete_candidate(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(candidate_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ManageCandidates)?;

    find_candidate(&state.db, &candidate_id).await?;

    let paths = sqlx::query_scalar::<_, String>(
        "SELECT storage_path FROM candidate_attachments WHERE candidate_id = ?",
    )
    .bind(&candidate_id)
    .fetch_all(&state.db)
    .await?;

    sqlx::query("DELETE FROM candidates WHERE id = ?")
        .bind(&candidate_id)
        .execute(&state.db)
        .await?;

    // Rows are gone; orphaned objects are only logged
    for path in &paths {
        if let Err(e) = state.storage.delete(path).await {
            warn!(error = %e, path = %path, "Failed to delete attachment from storage");
        }
    }

    info!(
        candidate_id = %candidate_id,
        deleted_by = %authed.id,
        attachments_removed = paths.len(),
        "Candidate deleted"
    );

    Ok(ApiResponse::ok(json!({ "id": candidate_id })).with_message("Candidato eliminado"))
}
