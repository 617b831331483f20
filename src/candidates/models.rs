// src/candidates/models.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::common::helpers::{serialize_optional_json, serialize_optional_json_list};

// ============================================================================
// Pipeline Stages
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Postulado,
    PreEntrevista,
    EntrevistaTecnica,
    EntrevistaFinal,
    Oferta,
    Seleccionado,
    Descartado,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Postulado,
        Stage::PreEntrevista,
        Stage::EntrevistaTecnica,
        Stage::EntrevistaFinal,
        Stage::Oferta,
        Stage::Seleccionado,
        Stage::Descartado,
    ];

    pub fn parse(value: &str) -> Option<Stage> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == value.trim())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Postulado => "postulado",
            Stage::PreEntrevista => "pre-entrevista",
            Stage::EntrevistaTecnica => "entrevista-tecnica",
            Stage::EntrevistaFinal => "entrevista-final",
            Stage::Oferta => "oferta",
            Stage::Seleccionado => "seleccionado",
            Stage::Descartado => "descartado",
        }
    }

    /// Human readable name used in emails
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Postulado => "Postulado",
            Stage::PreEntrevista => "Pre-entrevista",
            Stage::EntrevistaTecnica => "Entrevista técnica",
            Stage::EntrevistaFinal => "Entrevista final",
            Stage::Oferta => "Oferta",
            Stage::Seleccionado => "Seleccionado",
            Stage::Descartado => "Descartado",
        }
    }
}

// ============================================================================
// Candidate Models
// ============================================================================

#[derive(FromRow, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
    pub source: Option<String>,
    pub created_by: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDetail {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub postulations: Vec<CandidatePostulation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCandidateRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
    pub source: Option<String>,
    pub application_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCandidateRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateListQuery {
    pub application_id: Option<String>,
    pub stage: Option<String>,
    pub search: Option<String>,
}

// ============================================================================
// Postulation Models
// ============================================================================

#[derive(FromRow, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Postulation {
    pub id: String,
    pub candidate_id: String,
    pub application_id: String,
    pub stage: String,
    pub score: Option<f64>,
    pub assigned_to: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Postulation of a candidate together with the opening title
#[derive(FromRow, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePostulation {
    pub id: String,
    pub application_id: String,
    pub application_title: String,
    pub stage: String,
    pub score: Option<f64>,
    pub assigned_to: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCandidateToApplicationRequest {
    pub candidate_id: Option<String>,
    pub assigned_to: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStageRequest {
    pub stage: Option<String>,
    pub reason: Option<String>,
}

// ============================================================================
// Notes
// ============================================================================

#[derive(FromRow, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CandidateNote {
    pub id: String,
    pub candidate_id: String,
    pub author_id: String,
    #[sqlx(default)]
    pub author_name: Option<String>,
    pub content: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub content: Option<String>,
}

// ============================================================================
// Evaluations
// ============================================================================

pub const RECOMMENDATIONS: [&str; 3] = ["avanzar", "mantener", "descartar"];

#[derive(FromRow, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub id: String,
    pub candidate_id: String,
    pub application_id: Option<String>,
    pub evaluator_id: Option<String>,
    pub source: String,
    pub score: i64,
    #[serde(serialize_with = "serialize_optional_json_list")]
    pub strengths: Option<String>,
    #[serde(serialize_with = "serialize_optional_json_list")]
    pub weaknesses: Option<String>,
    pub recommendation: String,
    pub comments: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEvaluationRequest {
    pub application_id: Option<String>,
    pub score: Option<i64>,
    pub strengths: Option<Vec<String>>,
    pub weaknesses: Option<Vec<String>>,
    pub recommendation: Option<String>,
    pub comments: Option<String>,
}

// ============================================================================
// Attachments
// ============================================================================

pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

pub const ALLOWED_ATTACHMENT_TYPES: [&str; 5] = [
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "image/png",
    "image/jpeg",
];

#[derive(FromRow, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub candidate_id: String,
    pub file_name: String,
    pub storage_path: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub uploaded_by: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedAttachmentUrl {
    pub url: String,
    pub expires_in: u64,
}

// ============================================================================
// Timeline
// ============================================================================

#[derive(FromRow, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TimelineItem {
    pub id: String,
    pub candidate_id: String,
    pub application_id: Option<String>,
    pub event_type: String,
    pub description: String,
    #[serde(serialize_with = "serialize_optional_json")]
    pub metadata: Option<String>,
    pub actor_id: Option<String>,
    #[sqlx(default)]
    pub actor_name: Option<String>,
    pub created_at: Option<String>,
}
