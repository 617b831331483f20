// src/candidates/handlers/postulations.rs

use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::auth::{AuthedUser, Permission};
use crate::candidates::models::*;
use crate::candidates::queries::{find_application_title, find_candidate, find_postulation};
use crate::candidates::validators::StageValidator;
use crate::common::{new_id, ApiError, ApiResponse, AppState, Validator};
use crate::services::notifications::{notify_user, NewNotification};
use crate::services::timeline::{self, TimelineEntry, TimelineEvent};

const DUPLICATE_POSTULATION: &str = "El candidato ya está en este proceso";

/// POST /api/applications/:id/candidates - Add an existing candidate to an opening
pub async fn add_candidate_to_application(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(application_id): Path<String>,
    Json(request): Json<AddCandidateToApplicationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ManageCandidates)?;

    let candidate_id = request
        .candidate_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::ValidationError("El candidato es requerido".to_string()))?;

    let title = find_application_title(&state.db, &application_id).await?;
    let candidate = find_candidate(&state.db, candidate_id).await?;

    let exists = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM postulations WHERE candidate_id = ? AND application_id = ?",
    )
    .bind(candidate_id)
    .bind(&application_id)
    .fetch_one(&state.db)
    .await?;

    if exists > 0 {
        warn!(
            candidate_id = %candidate_id,
            application_id = %application_id,
            "Candidate already in application"
        );
        return Err(ApiError::BadRequest(DUPLICATE_POSTULATION.to_string()));
    }

    let postulation = sqlx::query_as::<_, Postulation>(
        r#"
        INSERT INTO postulations (id, candidate_id, application_id, stage, assigned_to)
        VALUES (?, ?, ?, 'postulado', ?)
        RETURNING *
        "#,
    )
    .bind(new_id())
    .bind(candidate_id)
    .bind(&application_id)
    .bind(&request.assigned_to)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        error!(error = %e, "Database error creating postulation");
        ApiError::duplicate_or_database(e, DUPLICATE_POSTULATION)
    })?;

    timeline::record(
        &state.db,
        TimelineEntry::new(
            &candidate.id,
            TimelineEvent::PostulationCreated,
            format!("Agregado al proceso {}", title),
        )
        .application(Some(&application_id))
        .actor(&authed.id),
    )
    .await;

    info!(
        postulation_id = %postulation.id,
        candidate_id = %candidate_id,
        application_id = %application_id,
        "Candidate added to application"
    );

    Ok(ApiResponse::created(postulation).with_message("Candidato agregado al proceso"))
}

/// PATCH /api/postulations/:id/stage - Move a postulation through the pipeline
pub async fn update_postulation_stage(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(postulation_id): Path<String>,
    Json(request): Json<UpdateStageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ManageCandidates)?;

    StageValidator.validate(&request).into_result()?;
    let new_stage = request
        .stage
        .as_deref()
        .and_then(Stage::parse)
        .ok_or_else(|| ApiError::ValidationError("Etapa inválida".to_string()))?;

    let current = find_postulation(&state.db, &postulation_id).await?;
    if current.stage == new_stage.as_str() {
        return Ok(ApiResponse::ok(current).with_message("La postulación ya está en esa etapa"));
    }

    let updated = sqlx::query_as::<_, Postulation>(
        "UPDATE postulations SET stage = ?, updated_at = datetime('now') WHERE id = ? RETURNING *",
    )
    .bind(new_stage.as_str())
    .bind(&postulation_id)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        error!(error = %e, postulation_id = %postulation_id, "Database error updating stage");
        ApiError::DatabaseError(e)
    })?;

    let candidate = find_candidate(&state.db, &updated.candidate_id).await?;

    let reason = request
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());

    let mut description = format!("Etapa cambiada de {} a {}", current.stage, new_stage.as_str());
    if let Some(reason) = reason {
        description.push_str(&format!(": {}", reason));
    }

    timeline::record(
        &state.db,
        TimelineEntry::new(&updated.candidate_id, TimelineEvent::StageChanged, description)
            .application(Some(&updated.application_id))
            .metadata(json!({
                "from": current.stage,
                "to": new_stage.as_str(),
                "reason": reason,
            }))
            .actor(&authed.id),
    )
    .await;

    if let Some(assignee) = updated.assigned_to.as_deref().filter(|a| *a != authed.id) {
        notify_user(
            &state.db,
            NewNotification {
                user_id: assignee,
                kind: "stage_changed",
                title: "Cambio de etapa".to_string(),
                body: format!("{} pasó a la etapa {}", candidate.full_name, new_stage.label()),
                link: Some(format!("/candidates/{}", candidate.id)),
            },
        )
        .await;
    }

    info!(
        postulation_id = %postulation_id,
        from = %current.stage,
        to = new_stage.as_str(),
        changed_by = %authed.id,
        "Postulation stage updated"
    );

    Ok(ApiResponse::ok(updated).with_message("Etapa actualizada"))
}
