// src/candidates/handlers/evaluations.rs

use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::auth::{AuthedUser, Permission};
use crate::candidates::models::{CreateEvaluationRequest, Evaluation};
use crate::candidates::queries::{find_application_title, find_candidate, store_evaluation, NewEvaluation};
use crate::candidates::validators::EvaluationValidator;
use crate::common::{ApiError, ApiResponse, AppState, Validator};
use crate::services::timeline::{self, TimelineEntry, TimelineEvent};

/// POST /api/candidates/:id/evaluations
pub async fn create_evaluation(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(candidate_id): Path<String>,
    Json(request): Json<CreateEvaluationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::CreateEvaluations)?;

    EvaluationValidator.validate(&request).into_result()?;
    find_candidate(&state.db, &candidate_id).await?;
    if let Some(application_id) = request.application_id.as_deref() {
        find_application_title(&state.db, application_id).await?;
    }

    let score = request.score.unwrap_or_default();
    let recommendation = request.recommendation.as_deref().unwrap_or("mantener");
    let strengths = request.strengths.clone().unwrap_or_default();
    let weaknesses = request.weaknesses.clone().unwrap_or_default();

    let mut tx = state.db.begin().await?;
    let (evaluation, postulation_score) = store_evaluation(
        &mut tx,
        NewEvaluation {
            candidate_id: &candidate_id,
            application_id: request.application_id.as_deref(),
            evaluator_id: Some(&authed.id),
            source: "manual",
            score,
            strengths: &strengths,
            weaknesses: &weaknesses,
            recommendation,
            comments: request.comments.as_deref(),
        },
    )
    .await
    .map_err(|e| {
        error!(error = %e, candidate_id = %candidate_id, "Database error storing evaluation");
        ApiError::DatabaseError(e)
    })?;
    tx.commit().await?;

    timeline::record(
        &state.db,
        TimelineEntry::new(
            &candidate_id,
            TimelineEvent::EvaluationAdded,
            format!("Evaluación registrada: {} puntos ({})", score, recommendation),
        )
        .application(request.application_id.as_deref())
        .metadata(json!({ "evaluationId": evaluation.id, "score": score }))
        .actor(&authed.id),
    )
    .await;

    info!(
        evaluation_id = %evaluation.id,
        candidate_id = %candidate_id,
        score = score,
        postulation_score = ?postulation_score,
        "Evaluation created"
    );

    Ok(ApiResponse::created(json!({
        "evaluation": evaluation,
        "postulationScore": postulation_score,
    })))
}

/// GET /api/candidates/:id/evaluations - Newest first
pub async fn list_evaluations(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(candidate_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ViewCandidates)?;

    find_candidate(&state.db, &candidate_id).await?;

    let evaluations = sqlx::query_as::<_, Evaluation>(
        "SELECT * FROM candidate_evaluations WHERE candidate_id = ? ORDER BY created_at DESC, rowid DESC",
    )
    .bind(&candidate_id)
    .fetch_all(&state.db)
    .await?;

    Ok(ApiResponse::ok(evaluations))
}
