// src/interviews/handlers.rs

use axum::{
    extract::{Extension, Path, Query},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::models::*;
use super::validators::InterviewStatusValidator;
use crate::auth::{AuthedUser, Permission};
use crate::common::helpers::trimmed;
use crate::common::{ApiError, ApiResponse, AppState, Validator};
use crate::services::interviews::{self as flow, details_select, load_interview_details};

/// POST /api/schedule-interview
pub async fn schedule_interview(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(request): Json<ScheduleInterviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ScheduleInterviews)?;

    let interview = flow::schedule_interview(&state, request, &authed.id).await?;
    let message = if interview.interview.email_sent {
        "Entrevista agendada e invitación enviada"
    } else {
        "Entrevista agendada"
    };

    Ok(ApiResponse::created(interview).with_message(message))
}

/// GET /api/interviews?candidateId=&assigneeId=&status=&upcoming=
pub async fn list_interviews(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Query(query): Query<InterviewListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ViewInterviews)?;

    if let Some(status) = query.status.as_deref() {
        if !INTERVIEW_STATUSES.contains(&status) {
            return Err(ApiError::BadRequest("Estado de entrevista inválido".to_string()));
        }
    }

    let upcoming = query.upcoming.unwrap_or(false);
    let sql = format!(
        r#"{}
        WHERE (?1 IS NULL OR i.candidate_id = ?1)
          AND (?2 IS NULL OR i.interviewer_id = ?2)
          AND (?3 IS NULL OR i.status = ?3)
          AND (?4 = 0 OR (i.status = 'agendada' AND datetime(i.scheduled_at) >= datetime('now')))
        ORDER BY datetime(i.scheduled_at) ASC
        "#,
        details_select()
    );

    let interviews = sqlx::query_as::<_, InterviewDetails>(&sql)
        .bind(&query.candidate_id)
        .bind(&query.assignee_id)
        .bind(&query.status)
        .bind(upcoming)
        .fetch_all(&state.db)
        .await?;

    Ok(ApiResponse::ok(interviews))
}

/// GET /api/interviews/:id
pub async fn get_interview(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(interview_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ViewInterviews)?;

    let interview = load_interview_details(&state.db, &interview_id).await?;
    Ok(ApiResponse::ok(interview))
}

/// PATCH /api/interviews/:id/status
pub async fn update_interview_status(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(interview_id): Path<String>,
    Json(request): Json<UpdateInterviewStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ScheduleInterviews)?;

    InterviewStatusValidator.validate(&request).into_result()?;
    let status = request.status.as_deref().unwrap_or_default();

    let interview = flow::change_interview_status(
        &state,
        &interview_id,
        status,
        trimmed(&request.notes),
        &authed.id,
    )
    .await?;

    Ok(ApiResponse::ok(interview).with_message("Estado de la entrevista actualizado"))
}

/// POST /api/interviews/:id/cancel
pub async fn cancel_interview(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(interview_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ScheduleInterviews)?;

    let interview =
        flow::change_interview_status(&state, &interview_id, "cancelada", None, &authed.id).await?;

    Ok(ApiResponse::ok(interview).with_message("Entrevista cancelada"))
}
