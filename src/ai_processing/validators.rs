// src/ai_processing/validators.rs

use super::models::*;
use crate::common::validation::is_blank;
use crate::common::{ValidationResult, Validator};

pub struct EnqueueValidator;

impl Validator<EnqueueRequest> for EnqueueValidator {
    fn validate(&self, data: &EnqueueRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if is_blank(&data.candidate_id) {
            result.add_error("candidateId", "El candidato es requerido");
        }

        match data.task_type.as_deref() {
            None => result.add_error("taskType", "El tipo de tarea es requerido"),
            Some(t) if !TASK_TYPES.contains(&t) => result.add_error(
                "taskType",
                "Tipo de tarea inválido. Valores permitidos: cv_analysis, candidate_scoring, profile_summary",
            ),
            _ => {}
        }

        if let Some(priority) = data.priority {
            if !(0..=MAX_PRIORITY).contains(&priority) {
                result.add_error("priority", "La prioridad debe estar entre 0 y 10");
            }
        }

        result
    }
}

pub struct CompleteTaskValidator;

impl Validator<CompleteTaskRequest> for CompleteTaskValidator {
    fn validate(&self, data: &CompleteTaskRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if is_blank(&data.task_id) {
            result.add_error("taskId", "El id de la tarea es requerido");
        }
        match data.success {
            None => result.add_error("success", "El campo success es requerido"),
            Some(true) if data.result.is_none() => {
                result.add_error("result", "El resultado es requerido cuando success es true")
            }
            _ => {}
        }

        result
    }
}
