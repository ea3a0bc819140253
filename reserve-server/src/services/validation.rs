//! Input validation
//!
//! One [`InputValidator`] is built from config and handed to every manager.
//! It runs the DTO `validator` rules, the numeric limits and the enum
//! parsing, and reports failures as 400s with per-field details.

use serde_json::Value;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Role, TableStatus};
use validator::{Validate, ValidationErrors};

pub const DEFAULT_MAX_TABLE_CAPACITY: i32 = 20;
pub const DEFAULT_MAX_PARTY_SIZE: i32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputValidator {
    max_table_capacity: i32,
    max_party_size: i32,
}

impl Default for InputValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TABLE_CAPACITY, DEFAULT_MAX_PARTY_SIZE)
    }
}

impl InputValidator {
    pub fn new(max_table_capacity: i32, max_party_size: i32) -> Self {
        Self {
            max_table_capacity: max_table_capacity.max(1),
            max_party_size: max_party_size.max(1),
        }
    }

    /// Run the derive rules of a request DTO
    pub fn check<T: Validate>(&self, payload: &T) -> AppResult<()> {
        payload.validate().map_err(into_app_error)
    }

    pub fn check_capacity(&self, capacity: i32) -> AppResult<()> {
        in_range("capacity", capacity, self.max_table_capacity)
    }

    pub fn check_party_size(&self, number_of_people: i32) -> AppResult<()> {
        in_range("number_of_people", number_of_people, self.max_party_size)
    }

    pub fn parse_role(&self, raw: &str) -> AppResult<Role> {
        raw.trim().parse().map_err(|_| {
            AppError::with_message(
                ErrorCode::InvalidRole,
                format!("Invalid role {raw:?}, expected admin or customer"),
            )
            .with_detail("role", raw)
        })
    }

    pub fn parse_status(&self, raw: &str) -> AppResult<TableStatus> {
        raw.trim().parse().map_err(|_| {
            AppError::with_message(
                ErrorCode::InvalidTableStatus,
                format!("Invalid status {raw:?}, expected available, reserved or occupied"),
            )
            .with_detail("status", raw)
        })
    }
}

fn in_range(field: &str, value: i32, max: i32) -> AppResult<()> {
    if (1..=max).contains(&value) {
        return Ok(());
    }
    Err(
        AppError::validation(format!("{field} must be between 1 and {max}"))
            .with_detail(field, value),
    )
}

fn into_app_error(errors: ValidationErrors) -> AppError {
    let mut fields: Vec<(String, Vec<String>)> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    let summary = fields
        .first()
        .and_then(|(_, messages)| messages.first().cloned())
        .unwrap_or_else(|| "Invalid input".to_string());

    fields
        .into_iter()
        .fold(AppError::validation(summary), |err, (field, messages)| {
            err.with_detail(field, Value::from(messages))
        })
}
