// src/applications/models.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle of an opening
pub const APPLICATION_STATUSES: [&str; 3] = ["abierta", "pausada", "cerrada"];

// ============================================================================
// Application Models
// ============================================================================

#[derive(FromRow, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub status: String,
    pub created_by: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// List row with the number of candidates in the opening
#[derive(FromRow, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationListItem {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub application: Application,
    pub candidate_count: i64,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StageCount {
    pub stage: String,
    pub label: String,
    pub count: i64,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDetail {
    #[serde(flatten)]
    pub application: Application,
    pub total_candidates: i64,
    pub stage_counts: Vec<StageCount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApplicationRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineQuery {
    pub stage: Option<String>,
}

// ============================================================================
// Pipeline
// ============================================================================

/// One postulation of the opening joined with its candidate
#[derive(FromRow, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRow {
    pub postulation_id: String,
    pub candidate_id: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub stage: String,
    pub score: Option<f64>,
    pub assigned_to: Option<String>,
    pub assignee_name: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}
