// src/candidates/handlers/attachments.rs

use axum::{
    extract::{Extension, Multipart, Path},
    response::IntoResponse,
};
use bytes::Bytes;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::auth::{AuthedUser, Permission};
use crate::candidates::models::{Attachment, SignedAttachmentUrl};
use crate::candidates::queries::find_candidate;
use crate::candidates::validators::validate_attachment;
use crate::common::helpers::sanitize_file_name;
use crate::common::{new_id, ApiError, ApiResponse, AppState};
use crate::services::storage::StorageError;
use crate::services::timeline::{self, TimelineEntry, TimelineEvent};

const SIGNED_URL_TTL_SECS: u64 = 3600;

async fn find_attachment(state: &AppState, attachment_id: &str) -> Result<Attachment, ApiError> {
    sqlx::query_as::<_, Attachment>("SELECT * FROM candidate_attachments WHERE id = ?")
        .bind(attachment_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Archivo no encontrado".to_string()))
}

/// POST /api/candidates/:id/attachments - multipart field `file`
pub async fn upload_attachment(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(candidate_id): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ManageCandidates)?;

    find_candidate(&state.db, &candidate_id).await?;

    let mut file_data: Option<Bytes> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("No se pudo leer el formulario: {}", e)))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().map(str::to_string);
            file_data = Some(field.bytes().await.map_err(|e| {
                warn!(error = %e, "Failed to read uploaded file");
                ApiError::BadRequest("No se pudo leer el archivo (máximo 10 MB)".to_string())
            })?);
        }
    }

    let data = file_data.ok_or_else(|| ApiError::BadRequest("No se envió ningún archivo".to_string()))?;
    let mime_type = validate_attachment(&data).map_err(ApiError::ValidationError)?;

    let display_name = file_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "archivo".to_string());
    let attachment_id = new_id();
    let storage_path = format!(
        "candidates/{}/{}-{}",
        candidate_id,
        attachment_id,
        sanitize_file_name(&display_name)
    );
    let size_bytes = data.len() as i64;

    state.storage.upload(&storage_path, data, mime_type).await?;

    let inserted = sqlx::query_as::<_, Attachment>(
        r#"
        INSERT INTO candidate_attachments (id, candidate_id, file_name, storage_path, mime_type, size_bytes, uploaded_by)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&attachment_id)
    .bind(&candidate_id)
    .bind(&display_name)
    .bind(&storage_path)
    .bind(mime_type)
    .bind(size_bytes)
    .bind(&authed.id)
    .fetch_one(&state.db)
    .await;

    let attachment = match inserted {
        Ok(attachment) => attachment,
        Err(e) => {
            error!(error = %e, path = %storage_path, "Failed to store attachment row, removing object");
            if let Err(cleanup) = state.storage.delete(&storage_path).await {
                warn!(error = %cleanup, path = %storage_path, "Failed to remove orphaned object");
            }
            return Err(ApiError::DatabaseError(e));
        }
    };

    timeline::record(
        &state.db,
        TimelineEntry::new(
            &candidate_id,
            TimelineEvent::AttachmentUploaded,
            format!("Archivo adjuntado: {}", display_name),
        )
        .metadata(json!({ "attachmentId": attachment.id, "mimeType": mime_type }))
        .actor(&authed.id),
    )
    .await;

    info!(
        attachment_id = %attachment.id,
        candidate_id = %candidate_id,
        size_bytes = size_bytes,
        mime_type = mime_type,
        "Attachment uploaded"
    );

    Ok(ApiResponse::created(attachment).with_message("Archivo subido exitosamente"))
}

/// GET /api/candidates/:id/attachments
pub async fn list_attachments(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(candidate_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ViewCandidates)?;

    find_candidate(&state.db, &candidate_id).await?;

    let attachments = sqlx::query_as::<_, Attachment>(
        "SELECT * FROM candidate_attachments WHERE candidate_id = ? ORDER BY created_at DESC, rowid DESC",
    )
    .bind(&candidate_id)
    .fetch_all(&state.db)
    .await?;

    Ok(ApiResponse::ok(attachments))
}

/// GET /api/attachments/:id/url - Short lived download link
pub async fn attachment_url(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(attachment_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ViewCandidates)?;

    let attachment = find_attachment(&state, &attachment_id).await?;
    let url = state
        .storage
        .signed_url(&attachment.storage_path, SIGNED_URL_TTL_SECS)
        .await?;

    Ok(ApiResponse::ok(SignedAttachmentUrl {
        url,
        expires_in: SIGNED_URL_TTL_SECS,
    }))
}

/// DELETE /api/attachments/:id
pub async fn delete_attachment(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(attachment_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ManageCandidates)?;

    let attachment = find_attachment(&state, &attachment_id).await?;

    match state.storage.delete(&attachment.storage_path).await {
        Ok(()) => {}
        Err(StorageError::NotFound(path)) => {
            warn!(path = %path, "Attachment object already missing from storage");
        }
        Err(e) => return Err(e.into()),
    }

    sqlx::query("DELETE FROM candidate_attachments WHERE id = ?")
        .bind(&attachment_id)
        .execute(&state.db)
        .await?;

    timeline::record(
        &state.db,
        TimelineEntry::new(
            &attachment.candidate_id,
            TimelineEvent::AttachmentDeleted,
            format!("Archivo eliminado: {}", attachment.file_name),
        )
        .actor(&authed.id),
    )
    .await;

    info!(attachment_id = %attachment_id, deleted_by = %authed.id, "Attachment deleted");
    Ok(ApiResponse::message("Archivo eliminado"))
}
