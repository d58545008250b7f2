//! Input validation
//!
//! Resource inputs are checked field by field with the closures from
//! [`validators`]; a [`ValidationReport`] collects every violation so the
//! caller sees them all at once.

pub mod validators;

use crate::core::error::{FieldViolation, ValidationError};
use serde_json::Value;

/// Collected field violations for one input
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ValidationReport {
    violations: Vec<FieldViolation>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one validator against a field value
    pub fn check<F>(&mut self, field: &str, value: &Value, validator: F) -> &mut Self
    where
        F: Fn(&str, &Value) -> Result<(), String>,
    {
        if let Err(message) = validator(field, value) {
            self.violations.push(FieldViolation {
                field: field.to_string(),
                message,
            });
        }
        self
    }

    /// Record a violation found by hand-written logic
    pub fn push(&mut self, field: &str, message: impl Into<String>) -> &mut Self {
        self.violations.push(FieldViolation {
            field: field.to_string(),
            message: message.into(),
        });
        self
    }

    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn into_violations(self) -> Vec<FieldViolation> {
        self.violations
    }
}

/// Turn a violation list into a result
pub fn ensure_valid(violations: Vec<FieldViolation>) -> Result<(), ValidationError> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::FieldErrors(violations))
    }
}
