// src/dashboard/models.rs

use serde::Serialize;

use crate::applications::models::StageCount;
use crate::interviews::models::InterviewDetails;

/// Interviews listed on the summary
pub const UPCOMING_INTERVIEWS_SHOWN: i64 = 5;

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub open_applications: i64,
    pub total_candidates: i64,
    pub active_postulations: i64,
    pub postulations_by_stage: Vec<StageCount>,
    pub upcoming_interview_count: i64,
    pub upcoming_interviews: Vec<InterviewDetails>,
    pub pending_ai_tasks: i64,
    pub unread_notifications: i64,
    pub generated_at: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: String,
    pub database: String,
    pub version: String,
    pub checked_at: String,
}
