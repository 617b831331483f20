// src/candidates/validators.rs

use super::models::*;
use crate::common::validation::{is_blank, is_valid_email};
use crate::common::{ValidationResult, Validator};

// ============================================================================
// Candidate Validators
// ============================================================================

pub struct CandidateValidator;

fn validate_linkedin(result: &mut ValidationResult, url: &Option<String>) {
    if let Some(url) = url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            result.add_error("linkedinUrl", "La URL de LinkedIn no es válida");
        }
    }
}

impl Validator<CreateCandidateRequest> for CandidateValidator {
    fn validate(&self, data: &CreateCandidateRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if is_blank(&data.full_name) {
            result.add_error("fullName", "El nombre es requerido");
        }

        match data.email.as_deref().map(str::trim) {
            None | Some("") => result.add_error("email", "El email es requerido"),
            Some(email) if !is_valid_email(email) => {
                result.add_error("email", "El email no es válido")
            }
            _ => {}
        }

        validate_linkedin(&mut result, &data.linkedin_url);
        result
    }
}

impl Validator<UpdateCandidateRequest> for CandidateValidator {
    fn validate(&self, data: &UpdateCandidateRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.full_name.is_some() && is_blank(&data.full_name) {
            result.add_error("fullName", "El nombre no puede estar vacío");
        }

        if let Some(email) = &data.email {
            if !is_valid_email(email) {
                result.add_error("email", "El email no es válido");
            }
        }

        validate_linkedin(&mut result, &data.linkedin_url);
        result
    }
}

// ============================================================================
// Pipeline Validators
// ============================================================================

pub struct StageValidator;

impl Validator<UpdateStageRequest> for StageValidator {
    fn validate(&self, data: &UpdateStageRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        match data.stage.as_deref() {
            None => result.add_error("stage", "La etapa es requerida"),
            Some(stage) if Stage::parse(stage).is_none() => {
                result.add_error("stage", "Etapa inválida")
            }
            _ => {}
        }

        if let Some(reason) = &data.reason {
            if reason.len() > 1000 {
                result.add_error("reason", "El motivo no puede superar 1000 caracteres");
            }
        }

        result
    }
}

// ============================================================================
// Notes and Evaluations
// ============================================================================

pub struct NoteValidator;

impl Validator<CreateNoteRequest> for NoteValidator {
    fn validate(&self, data: &CreateNoteRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if is_blank(&data.content) {
            result.add_error("content", "El contenido de la nota es requerido");
        } else if data.content.as_deref().map(str::len).unwrap_or(0) > 5000 {
            result.add_error("content", "La nota no puede superar 5000 caracteres");
        }

        result
    }
}

pub struct EvaluationValidator;

impl Validator<CreateEvaluationRequest> for EvaluationValidator {
    fn validate(&self, data: &CreateEvaluationRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        match data.score {
            None => result.add_error("score", "El puntaje es requerido"),
            Some(score) if !(0..=100).contains(&score) => {
                result.add_error("score", "El puntaje debe estar entre 0 y 100")
            }
            _ => {}
        }

        match data.recommendation.as_deref() {
            Some(r) if RECOMMENDATIONS.contains(&r) => {}
            _ => result.add_error(
                "recommendation",
                "La recomendación debe ser avanzar, mantener o descartar",
            ),
        }

        if let Some(comments) = &data.comments {
            if comments.len() > 5000 {
                result.add_error("comments", "Los comentarios no pueden superar 5000 caracteres");
            }
        }

        result
    }
}

/// Checks size and sniffed type of an uploaded attachment, returning its MIME type
pub fn validate_attachment(data: &[u8]) -> Result<&'static str, String> {
    if data.is_empty() {
        return Err("El archivo está vacío".to_string());
    }
    if data.len() > MAX_ATTACHMENT_BYTES {
        return Err("El archivo no puede superar 10 MB".to_string());
    }

    let mime = infer::get(data)
        .map(|kind| kind.mime_type())
        .ok_or_else(|| "Tipo de archivo no reconocido".to_string())?;

    ALLOWED_ATTACHMENT_TYPES
        .iter()
        .find(|allowed| **allowed == mime)
        .copied()
        .ok_or_else(|| {
            "Tipo de archivo no permitido. Formatos válidos: PDF, DOC, DOCX, PNG, JPG".to_string()
        })
}
