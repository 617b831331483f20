// src/notifications/handlers/inbox.rs

use axum::{
    extract::{Extension, Path, Query},
    response::IntoResponse,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::auth::AuthedUser;
use crate::common::{ApiError, ApiResponse, AppState};
use crate::notifications::models::{Notification, NotificationList, NotificationListQuery};

const INBOX_LIMIT: i64 = 100;

/// GET /api/notifications?unread= - Current user's notifications, newest first
pub async fn list_notifications(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Query(query): Query<NotificationListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    let unread_only = query.unread.unwrap_or(false);

    let notifications = sqlx::query_as::<_, Notification>(
        r#"
        SELECT * FROM notifications
        WHERE user_id = ?1 AND (?2 = 0 OR read_at IS NULL)
        ORDER BY created_at DESC, rowid DESC
        LIMIT ?3
        "#,
    )
    .bind(&authed.id)
    .bind(unread_only)
    .bind(INBOX_LIMIT)
    .fetch_all(&state.db)
    .await?;

    let unread_count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND read_at IS NULL",
    )
    .bind(&authed.id)
    .fetch_one(&state.db)
    .await?;

    Ok(ApiResponse::ok(NotificationList {
        notifications,
        unread_count,
    }))
}

/// PATCH /api/notifications/:id/read
pub async fn mark_read(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(notification_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();

    // Other users' notifications look missing
    let notification = sqlx::query_as::<_, Notification>(
        r#"
        UPDATE notifications SET read_at = COALESCE(read_at, datetime('now'))
        WHERE id = ? AND user_id = ?
        RETURNING *
        "#,
    )
    .bind(&notification_id)
    .bind(&authed.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("Notificación no encontrada".to_string()))?;

    Ok(ApiResponse::ok(notification))
}

/// POST /api/notifications/read-all
pub async fn mark_all_read(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();

    let updated = sqlx::query(
        "UPDATE notifications SET read_at = datetime('now') WHERE user_id = ? AND read_at IS NULL",
    )
    .bind(&authed.id)
    .execute(&state.db)
    .await?
    .rows_affected();

    debug!(user_id = %authed.id, updated = updated, "Notifications marked as read");
    Ok(ApiResponse::ok(json!({ "updated": updated }))
        .with_message("Notificaciones marcadas como leídas"))
}
