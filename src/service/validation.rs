//! Field validation rules declared by each record type.

use crate::error::AppError;

/// Bounds for one field. String rules count characters; integer rules are inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidationRule {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub minimum: Option<i64>,
    pub maximum: Option<i64>,
}

impl ValidationRule {
    pub const fn length(min: usize, max: usize) -> Self {
        ValidationRule {
            min_length: Some(min),
            max_length: Some(max),
            minimum: None,
            maximum: None,
        }
    }

    pub const fn max_length(max: usize) -> Self {
        ValidationRule {
            min_length: None,
            max_length: Some(max),
            minimum: None,
            maximum: None,
        }
    }

    pub const fn range(min: i64, max: i64) -> Self {
        ValidationRule {
            min_length: None,
            max_length: None,
            minimum: Some(min),
            maximum: Some(max),
        }
    }

    pub const fn at_least(min: i64) -> Self {
        ValidationRule {
            min_length: None,
            max_length: None,
            minimum: Some(min),
            maximum: None,
        }
    }

    pub fn check_str(&self, field: &str, value: &str) -> Result<(), AppError> {
        let len = value.chars().count();
        if let Some(min) = self.min_length {
            if len < min {
                return Err(AppError::validation(
                    field,
                    format!("must be at least {} characters", min),
                ));
            }
        }
        if let Some(max) = self.max_length {
            if len > max {
                return Err(AppError::validation(
                    field,
                    format!("must be at most {} characters", max),
                ));
            }
        }
        Ok(())
    }

    pub fn check_int(&self, field: &str, value: i64) -> Result<(), AppError> {
        if let Some(min) = self.minimum {
            if value < min {
                return Err(AppError::validation(field, format!("must be at least {}", min)));
            }
        }
        if let Some(max) = self.maximum {
            if value > max {
                return Err(AppError::validation(field, format!("must be at most {}", max)));
            }
        }
        Ok(())
    }

    /// Range-check then narrow to the `INTEGER` column type.
    pub fn check_i32(&self, field: &str, value: i64) -> Result<i32, AppError> {
        self.check_int(field, value)?;
        i32::try_from(value).map_err(|_| AppError::validation(field, "is out of range"))
    }
}
