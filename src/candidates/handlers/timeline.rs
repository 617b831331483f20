// src/candidates/handlers/timeline.rs

use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::auth::{AuthedUser, Permission};
use crate::candidates::models::TimelineItem;
use crate::candidates::queries::find_candidate;
use crate::common::{ApiError, ApiResponse, AppState};

/// GET /api/candidates/:id/timeline - Newest first
pub async fn get_timeline(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(candidate_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ViewCandidates)?;

    find_candidate(&state.db, &candidate_id).await?;

    let items = sqlx::query_as::<_, TimelineItem>(
        r#"
        SELECT t.id, t.candidate_id, t.application_id, t.event_type, t.description, t.metadata,
               t.actor_id, u.full_name AS actor_name, t.created_at
        FROM candidate_timeline t
        LEFT JOIN users u ON u.id = t.actor_id
        WHERE t.candidate_id = ?
        ORDER BY t.created_at DESC, t.rowid DESC
        "#,
    )
    .bind(&candidate_id)
    .fetch_all(&state.db)
    .await?;

    Ok(ApiResponse::ok(items))
}
