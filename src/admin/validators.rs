// src/admin/validators.rs

use super::models::*;
use crate::auth::Role;
use crate::common::validation::{is_blank, is_valid_email};
use crate::common::{ValidationResult, Validator};

pub struct CreateUserValidator;

impl Validator<CreateUserRequest> for CreateUserValidator {
    fn validate(&self, data: &CreateUserRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        match data.email.as_deref().map(str::trim) {
            None | Some("") => result.add_error("email", "El email es requerido"),
            Some(email) if !is_valid_email(email) => {
                result.add_error("email", "El email no es válido")
            }
            _ => {}
        }

        match &data.password {
            None => result.add_error("password", "La contraseña es requerida"),
            Some(password) if password.chars().count() < MIN_PASSWORD_LENGTH => result.add_error(
                "password",
                "La contraseña debe tener al menos 8 caracteres",
            ),
            _ => {}
        }

        if is_blank(&data.full_name) {
            result.add_error("fullName", "El nombre completo es requerido");
        }

        validate_role(&mut result, &data.role);

        result
    }
}

pub struct UpdateRoleValidator;

impl Validator<UpdateRoleRequest> for UpdateRoleValidator {
    fn validate(&self, data: &UpdateRoleRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        validate_role(&mut result, &data.role);
        result
    }
}

fn validate_role(result: &mut ValidationResult, role: &Option<String>) {
    match role.as_deref() {
        None => result.add_error("role", "El rol es requerido"),
        Some(role) if Role::parse(role).is_none() => result.add_error("role", "Rol inválido"),
        _ => {}
    }
}
