// src/interviews/models.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const INTERVIEW_MODES: [&str; 2] = ["virtual", "presencial"];
pub const INTERVIEW_STATUSES: [&str; 4] = ["agendada", "completada", "cancelada", "no_asistio"];

pub const DEFAULT_DURATION_MINUTES: i64 = 60;
pub const MIN_DURATION_MINUTES: i64 = 15;
pub const MAX_DURATION_MINUTES: i64 = 480;

#[derive(FromRow, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Interview {
    pub id: String,
    pub candidate_id: String,
    pub application_id: String,
    pub interviewer_id: String,
    /// RFC 3339 with the offset the scheduler used
    pub scheduled_at: String,
    pub duration_minutes: i64,
    pub mode: String,
    pub location: Option<String>,
    pub meet_link: Option<String>,
    pub calendar_event_id: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub email_sent: bool,
    pub created_by: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Interview joined with the people and opening it refers to
#[derive(FromRow, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct InterviewDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub interview: Interview,
    pub candidate_name: String,
    pub candidate_email: String,
    pub application_title: String,
    pub interviewer_name: Option<String>,
    pub interviewer_email: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInterviewRequest {
    pub candidate_id: Option<String>,
    pub application_id: Option<String>,
    pub assignee_id: Option<String>,
    pub scheduled_at: Option<String>,
    pub duration_minutes: Option<i64>,
    pub mode: Option<String>,
    pub location: Option<String>,
    pub create_meet: Option<bool>,
    pub notes: Option<String>,
    pub send_email: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInterviewStatusRequest {
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct InterviewListQuery {
    pub candidate_id: Option<String>,
    pub assignee_id: Option<String>,
    pub status: Option<String>,
    pub upcoming: Option<bool>,
}
