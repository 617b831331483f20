// Common validation types and traits

use chrono::{DateTime, FixedOffset, Utc};
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.is_valid = false;
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    /// Converts into `Err` when any rule failed, so callers can use `?`
    pub fn into_result(self) -> Result<(), super::ApiError> {
        if self.is_valid {
            Ok(())
        } else {
            Err(self.into())
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

pub trait Validator<T> {
    fn validate(&self, data: &T) -> ValidationResult;
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$")
            .expect("email regex is valid")
    })
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email.trim())
}

pub fn is_valid_uuid(value: &str) -> bool {
    uuid::Uuid::parse_str(value).is_ok()
}

/// Required text field: missing or blank
pub fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or("").is_empty()
}

/// Parses an RFC 3339 timestamp and checks it lies in the future
pub fn parse_future_datetime(value: &str) -> Result<DateTime<FixedOffset>, &'static str> {
    let parsed = DateTime::parse_from_rfc3339(value)
        .map_err(|_| "La fecha debe estar en formato ISO 8601")?;
    if parsed.with_timezone(&Utc) <= Utc::now() {
        return Err("La fecha debe ser futura");
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("ana.perez@empresa.cl"));
        assert!(is_valid_email("  user+tag@example.com "));
        assert!(!is_valid_email("sin-arroba.com"));
        assert!(!is_valid_email("a@b"));
    }

    #[test]
    fn test_blank_detection() {
        assert!(is_blank(&None));
        assert!(is_blank(&Some("   ".to_string())));
        assert!(!is_blank(&Some("x".to_string())));
    }

    #[test]
    fn test_future_datetime() {
        let future = (Utc::now() + chrono::Duration::days(2)).to_rfc3339();
        assert!(parse_future_datetime(&future).is_ok());
        assert_eq!(
            parse_future_datetime("2001-01-01T10:00:00Z").unwrap_err(),
            "La fecha debe ser futura"
        );
        assert!(parse_future_datetime("mañana").is_err());
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationResult::new().into_result().is_ok());
        let mut result = ValidationResult::new();
        result.add_error("x", "malo");
        assert!(result.into_result().is_err());
    }
}
