// src/candidates/handlers/notes.rs

use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::auth::{AuthedUser, Permission};
use crate::candidates::models::{CandidateNote, CreateNoteRequest};
use crate::candidates::queries::find_candidate;
use crate::candidates::validators::NoteValidator;
use crate::common::{new_id, ApiError, ApiResponse, AppState, Validator};
use crate::services::timeline::{self, TimelineEntry, TimelineEvent};

const NOTE_SELECT: &str = r#"
    SELECT n.id, n.candidate_id, n.author_id, u.full_name AS author_name, n.content, n.created_at
    FROM candidate_notes n
    LEFT JOIN users u ON u.id = n.author_id
"#;

/// POST /api/candidates/:id/notes
pub async fn create_note(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(candidate_id): Path<String>,
    Json(request): Json<CreateNoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ViewCandidates)?;

    NoteValidator.validate(&request).into_result()?;
    find_candidate(&state.db, &candidate_id).await?;

    let note_id = new_id();
    let content = request.content.as_deref().unwrap_or_default().trim().to_string();

    sqlx::query(
        "INSERT INTO candidate_notes (id, candidate_id, author_id, content) VALUES (?, ?, ?, ?)",
    )
    .bind(&note_id)
    .bind(&candidate_id)
    .bind(&authed.id)
    .bind(&content)
    .execute(&state.db)
    .await?;

    timeline::record(
        &state.db,
        TimelineEntry::new(&candidate_id, TimelineEvent::NoteAdded, "Nota agregada")
            .metadata(json!({ "noteId": note_id }))
            .actor(&authed.id),
    )
    .await;

    let note = sqlx::query_as::<_, CandidateNote>(&format!("{} WHERE n.id = ?", NOTE_SELECT))
        .bind(&note_id)
        .fetch_one(&state.db)
        .await?;

    info!(note_id = %note_id, candidate_id = %candidate_id, "Note created");
    Ok(ApiResponse::created(note))
}

/// GET /api/candidates/:id/notes - Newest first
pub async fn list_notes(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(candidate_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ViewCandidates)?;

    find_candidate(&state.db, &candidate_id).await?;

    let notes = sqlx::query_as::<_, CandidateNote>(&format!(
        "{} WHERE n.candidate_id = ? ORDER BY n.created_at DESC, n.rowid DESC",
        NOTE_SELECT
    ))
    .bind(&candidate_id)
    .fetch_all(&state.db)
    .await?;

    Ok(ApiResponse::ok(notes))
}

/// DELETE /api/notes/:id - Author, or anyone who manages candidates
pub async fn delete_note(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(note_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();

    let author_id = sqlx::query_scalar::<_, String>("SELECT author_id FROM candidate_notes WHERE id = ?")
        .bind(&note_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Nota no encontrada".to_string()))?;

    if author_id != authed.id && !authed.has(Permission::ManageCandidates) {
        warn!(note_id = %note_id, user_id = %authed.id, "Note deletion denied");
        return Err(ApiError::forbidden());
    }

    sqlx::query("DELETE FROM candidate_notes WHERE id = ?")
        .bind(&note_id)
        .execute(&state.db)
        .await?;

    info!(note_id = %note_id, deleted_by = %authed.id, "Note deleted");
    Ok(ApiResponse::message("Nota eliminada"))
}
