// src/interviews/validators.rs

use super::models::*;
use crate::common::validation::{is_blank, parse_future_datetime};
use crate::common::{ValidationResult, Validator};

pub struct ScheduleInterviewValidator;

impl Validator<ScheduleInterviewRequest> for ScheduleInterviewValidator {
    fn validate(&self, data: &ScheduleInterviewRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if is_blank(&data.candidate_id) {
            result.add_error("candidateId", "El candidato es requerido");
        }
        if is_blank(&data.application_id) {
            result.add_error("applicationId", "El proceso de selección es requerido");
        }
        if is_blank(&data.assignee_id) {
            result.add_error("assigneeId", "El entrevistador es requerido");
        }

        match data.scheduled_at.as_deref().map(str::trim) {
            None | Some("") => {
                result.add_error("scheduledAt", "La fecha de la entrevista es requerida")
            }
            Some(value) => {
                if let Err(message) = parse_future_datetime(value) {
                    result.add_error("scheduledAt", message);
                }
            }
        }

        if let Some(minutes) = data.duration_minutes {
            if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&minutes) {
                result.add_error(
                    "durationMinutes",
                    "La duración debe estar entre 15 y 480 minutos",
                );
            }
        }

        let mode = data.mode.as_deref().unwrap_or("virtual");
        if !INTERVIEW_MODES.contains(&mode) {
            result.add_error("mode", "La modalidad debe ser virtual o presencial");
        } else if mode == "presencial" && is_blank(&data.location) {
            result.add_error(
                "location",
                "La ubicación es requerida para entrevistas presenciales",
            );
        }

        result
    }
}

pub struct InterviewStatusValidator;

impl Validator<UpdateInterviewStatusRequest> for InterviewStatusValidator {
    fn validate(&self, data: &UpdateInterviewStatusRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        match data.status.as_deref() {
            None => result.add_error("status", "El estado es requerido"),
            Some(status) if !INTERVIEW_STATUSES.contains(&status) => result.add_error(
                "status",
                "Estado inválido. Valores permitidos: agendada, completada, cancelada, no_asistio",
            ),
            _ => {}
        }

        result
    }
}
