// src/notifications/validators.rs

use super::models::*;
use crate::common::validation::{is_blank, is_valid_email};
use crate::common::{ValidationResult, Validator};

pub struct SendEmailValidator;

fn require(result: &mut ValidationResult, value: &Option<String>, field: &str, message: &str) {
    if is_blank(value) {
        result.add_error(field, message);
    }
}

impl Validator<SendEmailRequest> for SendEmailValidator {
    fn validate(&self, data: &SendEmailRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        match data.kind.as_deref() {
            None => result.add_error("type", "El tipo de correo es requerido"),
            Some("candidate_email") => {
                require(&mut result, &data.candidate_id, "candidateId", "El candidato es requerido");
                require(&mut result, &data.subject, "subject", "El asunto es requerido");
                require(&mut result, &data.message, "message", "El mensaje es requerido");
            }
            Some("interview_invitation") => {
                require(&mut result, &data.interview_id, "interviewId", "La entrevista es requerida");
            }
            Some("stage_update") | Some("rejection") => {
                require(&mut result, &data.postulation_id, "postulationId", "La postulación es requerida");
            }
            Some("custom") => {
                match data.to.as_deref() {
                    None | Some([]) => result.add_error("to", "Se requiere al menos un destinatario"),
                    Some(recipients) if recipients.iter().any(|r| !is_valid_email(r)) => {
                        result.add_error("to", "Uno o más destinatarios no son válidos")
                    }
                    _ => {}
                }
                require(&mut result, &data.subject, "subject", "El asunto es requerido");
                require(&mut result, &data.html, "html", "El contenido es requerido");
            }
            Some(_) => result.add_error(
                "type",
                "Tipo de correo inválido. Valores permitidos: candidate_email, interview_invitation, stage_update, rejection, custom",
            ),
        }

        if data.subject.as_deref().map(str::len).unwrap_or(0) > 200 {
            result.add_error("subject", "El asunto no puede superar 200 caracteres");
        }

        result
    }
}
