// src/ai_processing/models.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use crate::candidates::models::Evaluation;
use crate::common::helpers::serialize_optional_json;

pub const TASK_TYPES: [&str; 3] = ["cv_analysis", "candidate_scoring", "profile_summary"];

/// Task types whose result becomes a candidate evaluation
pub const SCORING_TASK_TYPES: [&str; 2] = ["cv_analysis", "candidate_scoring"];

pub const DEFAULT_PRIORITY: i64 = 5;
pub const MAX_PRIORITY: i64 = 10;

/// A task left in `processing` longer than this can be claimed again
pub const STALE_PROCESSING_MINUTES: i64 = 15;

#[derive(FromRow, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AiTask {
    pub id: String,
    pub candidate_id: String,
    pub application_id: Option<String>,
    pub task_type: String,
    pub priority: i64,
    pub status: String,
    #[serde(serialize_with = "serialize_optional_json")]
    pub payload: Option<String>,
    #[serde(serialize_with = "serialize_optional_json")]
    pub result: Option<String>,
    pub error_message: Option<String>,
    pub attempts: i64,
    pub max_attempts: i64,
    pub worker_id: Option<String>,
    pub requested_by: Option<String>,
    pub created_at: Option<String>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueRequest {
    pub candidate_id: Option<String>,
    pub application_id: Option<String>,
    pub task_type: Option<String>,
    pub priority: Option<i64>,
    pub payload: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueResponse {
    pub task: AiTask,
    /// False when an equivalent task was already queued
    pub created: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub worker_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StartTaskRequest {
    pub task_id: Option<String>,
    pub worker_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CompleteTaskRequest {
    pub task_id: Option<String>,
    pub success: Option<bool>,
    pub result: Option<Value>,
    pub error: Option<String>,
}

/// Result of finishing a task
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedTask {
    pub task: AiTask,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Evaluation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postulation_score: Option<f64>,
}

#[derive(Debug, Serialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
    pub total: i64,
    pub oldest_pending_at: Option<String>,
}
