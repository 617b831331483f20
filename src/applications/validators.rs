// src/applications/validators.rs

use super::models::*;
use crate::common::validation::is_blank;
use crate::common::{ValidationResult, Validator};

pub struct ApplicationValidator;

fn validate_status(result: &mut ValidationResult, status: &Option<String>) {
    if let Some(status) = status {
        if !APPLICATION_STATUSES.contains(&status.as_str()) {
            result.add_error(
                "status",
                "Estado inválido. Valores permitidos: abierta, pausada, cerrada",
            );
        }
    }
}

fn validate_title_length(result: &mut ValidationResult, title: &Option<String>) {
    if title.as_deref().map(|t| t.trim().chars().count()).unwrap_or(0) > 200 {
        result.add_error("title", "El título no puede superar 200 caracteres");
    }
}

impl Validator<CreateApplicationRequest> for ApplicationValidator {
    fn validate(&self, data: &CreateApplicationRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if is_blank(&data.title) {
            result.add_error("title", "El título es requerido");
        }
        validate_title_length(&mut result, &data.title);
        validate_status(&mut result, &data.status);

        result
    }
}

impl Validator<UpdateApplicationRequest> for ApplicationValidator {
    fn validate(&self, data: &UpdateApplicationRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.title.is_some() && is_blank(&data.title) {
            result.add_error("title", "El título no puede estar vacío");
        }
        validate_title_length(&mut result, &data.title);
        validate_status(&mut result, &data.status);

        result
    }
}
