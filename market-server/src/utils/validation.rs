//! Input validation helpers
//!
//! Limits shared by query-string DTOs (`validator` derive) and hand-written
//! checks.

use validator::{Validate, ValidationErrors};

use crate::utils::AppError;

// ── Limits ──────────────────────────────────────────────────────────

/// Largest page a list endpoint will return
pub const MAX_PAGE_SIZE: u32 = 100;

/// Free-text search terms
pub const MAX_SEARCH_LEN: usize = 200;

/// Default cap on ids accepted by one bulk request
pub const DEFAULT_MAX_BULK_IDS: usize = 100;

// ── Helpers ─────────────────────────────────────────────────────────

/// Run `validator` rules and map failures to a `ValidationFailed` error
/// carrying one detail entry per offending field.
pub fn validate_dto<T: Validate>(dto: &T) -> Result<(), AppError> {
    dto.validate().map_err(validation_error)
}

pub fn validation_error(errors: ValidationErrors) -> AppError {
    let mut err = AppError::validation("Invalid query parameters");
    for (field, field_errors) in errors.field_errors() {
        let messages: Vec<String> = field_errors
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string())
            })
            .collect();
        err = err.with_detail(field.to_string(), messages);
    }
    err
}

/// Optional free-text value within the length limit
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value
        && v.len() > max_len
    {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.len()
        )));
    }
    Ok(())
}
