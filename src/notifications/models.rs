// src/notifications/models.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ============================================================================
// Email dispatch
// ============================================================================

pub const EMAIL_TYPES: [&str; 5] = [
    "candidate_email",
    "interview_invitation",
    "stage_update",
    "rejection",
    "custom",
];

/// Body of `POST /api/send-email`; which fields apply depends on `type`
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub candidate_id: Option<String>,
    pub interview_id: Option<String>,
    pub postulation_id: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub to: Option<Vec<String>>,
    pub html: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailResponse {
    #[serde(rename = "type")]
    pub kind: String,
    pub email_id: Option<String>,
    pub recipients: Vec<String>,
}

// ============================================================================
// In-app notifications
// ============================================================================

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub read_at: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct NotificationListQuery {
    pub unread: Option<bool>,
}
