// src/applications/handlers.rs

use axum::{
    extract::{Extension, Path, Query},
    response::IntoResponse,
    Json,
};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use super::models::*;
use super::validators::ApplicationValidator;
use crate::auth::{AuthedUser, Permission};
use crate::candidates::models::Stage;
use crate::common::helpers::trimmed;
use crate::common::{new_id, ApiError, ApiResponse, AppState, Validator};

async fn find_application(pool: &SqlitePool, application_id: &str) -> Result<Application, ApiError> {
    sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = ?")
        .bind(application_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Proceso de selección no encontrado".to_string()))
}

/// Per-stage counts in pipeline order, zero for empty stages
pub async fn stage_counts(
    pool: &SqlitePool,
    application_id: Option<&str>,
) -> Result<Vec<StageCount>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT stage, COUNT(*) FROM postulations WHERE (?1 IS NULL OR application_id = ?1) GROUP BY stage",
    )
    .bind(application_id)
    .fetch_all(pool)
    .await?;
    let counts: HashMap<String, i64> = rows.into_iter().collect();

    Ok(Stage::ALL
        .iter()
        .map(|stage| StageCount {
            stage: stage.as_str().to_string(),
            label: stage.label().to_string(),
            count: counts.get(stage.as_str()).copied().unwrap_or(0),
        })
        .collect())
}

/// POST /api/applications
pub async fn create_application(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(request): Json<CreateApplicationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ManageApplications)?;

    ApplicationValidator.validate(&request).into_result()?;

    let application = sqlx::query_as::<_, Application>(
        r#"
        INSERT INTO applications (id, title, description, department, location, status, created_by)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(new_id())
    .bind(trimmed(&request.title))
    .bind(trimmed(&request.description))
    .bind(trimmed(&request.department))
    .bind(trimmed(&request.location))
    .bind(request.status.as_deref().unwrap_or("abierta"))
    .bind(&authed.id)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        error!(error = %e, "Database error creating application");
        ApiError::DatabaseError(e)
    })?;

    info!(
        application_id = %application.id,
        created_by = %authed.id,
        "Application created"
    );
    Ok(ApiResponse::created(application).with_message("Proceso de selección creado"))
}

/// GET /api/applications?status=
pub async fn list_applications(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Query(query): Query<ApplicationListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ViewApplications)?;

    if let Some(status) = query.status.as_deref() {
        if !APPLICATION_STATUSES.contains(&status) {
            return Err(ApiError::BadRequest(
                "Estado inválido. Valores permitidos: abierta, pausada, cerrada".to_string(),
            ));
        }
    }

    let applications = sqlx::query_as::<_, ApplicationListItem>(
        r#"
        SELECT a.*,
               (SELECT COUNT(*) FROM postulations p WHERE p.application_id = a.id) AS candidate_count
        FROM applications a
        WHERE (?1 IS NULL OR a.status = ?1)
        ORDER BY a.created_at DESC, a.rowid DESC
        "#,
    )
    .bind(&query.status)
    .fetch_all(&state.db)
    .await?;

    Ok(ApiResponse::ok(applications))
}

/// GET /api/applications/:id - With candidate counts per stage
pub async fn get_application(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(application_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ViewApplications)?;

    let application = find_application(&state.db, &application_id).await?;
    let stage_counts = stage_counts(&state.db, Some(&application_id)).await?;
    let total_candidates = stage_counts.iter().map(|s| s.count).sum();

    Ok(ApiResponse::ok(ApplicationDetail {
        application,
        total_candidates,
        stage_counts,
    }))
}

/// PUT /api/applications/:id
pub async fn update_application(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(application_id): Path<String>,
    Json(request): Json<UpdateApplicationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ManageApplications)?;

    ApplicationValidator.validate(&request).into_result()?;
    let current = find_application(&state.db, &application_id).await?;

    let application = sqlx::query_as::<_, Application>(
        r#"
        UPDATE applications SET
            title = COALESCE(?, title),
            description = COALESCE(?, description),
            department = COALESCE(?, department),
            location = COALESCE(?, location),
            status = COALESCE(?, status),
            updated_at = datetime('now')
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(trimmed(&request.title))
    .bind(trimmed(&request.description))
    .bind(trimmed(&request.department))
    .bind(trimmed(&request.location))
    .bind(&request.status)
    .bind(&application_id)
    .fetch_one(&state.db)
    .await?;

    if current.status != application.status {
        info!(
            application_id = %application_id,
            from = %current.status,
            to = %application.status,
            "Application status changed"
        );
    }
    info!(application_id = %application_id, updated_by = %authed.id, "Application updated");
    Ok(ApiResponse::ok(application).with_message("Proceso de selección actualizado"))
}

/// GET /api/applications/:id/postulations?stage= - Pipeline view
pub async fn get_pipeline(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(application_id): Path<String>,
    Query(query): Query<PipelineQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ViewApplications)?;

    if let Some(stage) = query.stage.as_deref() {
        if Stage::parse(stage).is_none() {
            return Err(ApiError::BadRequest("Etapa inválida".to_string()));
        }
    }
    find_application(&state.db, &application_id).await?;

    let rows = sqlx::query_as::<_, PipelineRow>(
        r#"
        SELECT p.id AS postulation_id, c.id AS candidate_id, c.full_name, c.email, c.phone,
               p.stage, p.score, p.assigned_to, u.full_name AS assignee_name,
               p.created_at, p.updated_at
        FROM postulations p
        JOIN candidates c ON c.id = p.candidate_id
        LEFT JOIN users u ON u.id = p.assigned_to
        WHERE p.application_id = ?1 AND (?2 IS NULL OR p.stage = ?2)
        ORDER BY p.score IS NULL, p.score DESC, p.created_at ASC
        "#,
    )
    .bind(&application_id)
    .bind(&query.stage)
    .fetch_all(&state.db)
    .await?;

    Ok(ApiResponse::ok(rows))
}
