// src/services/notifications.rs
//! In-app notifications for dashboard users

use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::common::new_id;

#[derive(Debug, Clone)]
pub struct NewNotification<'a> {
    pub user_id: &'a str,
    pub kind: &'a str,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
}

/// Stores a notification for `user_id`; failures are logged, not returned
pub async fn notify_user(pool: &SqlitePool, notification: NewNotification<'_>) -> Option<String> {
    let id = new_id();
    let result = sqlx::query(
        "INSERT INTO notifications (id, user_id, kind, title, body, link) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(notification.user_id)
    .bind(notification.kind)
    .bind(&notification.title)
    .bind(&notification.body)
    .bind(&notification.link)
    .execute(pool)
    .await;

    match result {
        Ok(_) => {
            debug!(user_id = %notification.user_id, kind = %notification.kind, "Notification created");
            Some(id)
        }
        Err(e) => {
            warn!(
                error = %e,
                user_id = %notification.user_id,
                kind = %notification.kind,
                "Failed to create notification"
            );
            None
        }
    }
}
