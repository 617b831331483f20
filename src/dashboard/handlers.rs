// src/dashboard/handlers.rs

use axum::{extract::Extension, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use super::models::*;
use crate::applications::handlers::stage_counts;
use crate::auth::{AuthedUser, Permission};
use crate::common::{ApiError, ApiResponse, AppState};
use crate::interviews::models::InterviewDetails;
use crate::services::interviews::details_select;

const UPCOMING_FILTER: &str =
    "i.status = 'agendada' AND datetime(i.scheduled_at) >= datetime('now')";

async fn count(pool: &SqlitePool, sql: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(sql).fetch_one(pool).await
}

/// GET /api/dashboard/summary
pub async fn get_summary(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ViewReports)?;

    let open_applications =
        count(&state.db, "SELECT COUNT(*) FROM applications WHERE status = 'abierta'").await?;
    let total_candidates = count(&state.db, "SELECT COUNT(*) FROM candidates").await?;
    let active_postulations = count(
        &state.db,
        "SELECT COUNT(*) FROM postulations WHERE stage NOT IN ('seleccionado', 'descartado')",
    )
    .await?;
    let postulations_by_stage = stage_counts(&state.db, None).await?;

    let upcoming_interview_count = count(
        &state.db,
        &format!("SELECT COUNT(*) FROM interviews i WHERE {}", UPCOMING_FILTER),
    )
    .await?;
    let upcoming_interviews = sqlx::query_as::<_, InterviewDetails>(&format!(
        "{} WHERE {} ORDER BY datetime(i.scheduled_at) ASC LIMIT ?",
        details_select(),
        UPCOMING_FILTER
    ))
    .bind(UPCOMING_INTERVIEWS_SHOWN)
    .fetch_all(&state.db)
    .await?;

    let pending_ai_tasks = count(
        &state.db,
        "SELECT COUNT(*) FROM ai_processing_queue WHERE status IN ('pending', 'processing')",
    )
    .await?;

    let unread_notifications = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND read_at IS NULL",
    )
    .bind(&authed.id)
    .fetch_one(&state.db)
    .await?;

    info!(
        user_id = %authed.id,
        open_applications,
        upcoming_interview_count,
        pending_ai_tasks,
        "Dashboard summary generated"
    );

    Ok(ApiResponse::ok(DashboardSummary {
        open_applications,
        total_candidates,
        active_postulations,
        postulations_by_stage,
        upcoming_interview_count,
        upcoming_interviews,
        pending_ai_tasks,
        unread_notifications,
        generated_at: Utc::now().to_rfc3339(),
    }))
}

/// GET /api/health - Public liveness probe backed by a database round trip
pub async fn health_check(Extension(state_lock): Extension<Arc<RwLock<AppState>>>) -> impl IntoResponse {
    let state = state_lock.read().await.clone();

    let (status, database) = match count(&state.db, "SELECT 1").await {
        Ok(_) => (StatusCode::OK, "healthy"),
        Err(e) => {
            error!(error = %e, "Database health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "error")
        }
    };

    let health = HealthStatus {
        status: (if status == StatusCode::OK { "ok" } else { "degraded" }).to_string(),
        database: database.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checked_at: Utc::now().to_rfc3339(),
    };

    (status, ApiResponse::ok(health))
}
