//! Reusable field validators
//!
//! Each validator is a closure `(field, value) -> Result<(), message>`.
//! Validators only judge values of the type they understand and let other
//! types through, so they can be stacked on one field.

use crate::core::field::{FieldFormat, FieldValue};
use serde_json::Value;

/// Validator: field is required (not null)
pub fn required() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |field: &str, value: &Value| {
        if value.is_null() {
            Err(format!("'{}' is required", field))
        } else {
            Ok(())
        }
    }
}

/// Validator: string must contain a non-whitespace character
pub fn not_blank() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |field: &str, value: &Value| match value.as_str() {
        Some(s) if s.trim().is_empty() => Err(format!("'{}' must not be blank", field)),
        _ => Ok(()),
    }
}

/// Validator: number must be positive
pub fn positive() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |field: &str, value: &Value| {
        if let Some(num) = value.as_f64() {
            if num <= 0.0 {
                Err(format!("'{}' must be positive (value: {})", field, num))
            } else {
                Ok(())
            }
        } else {
            Ok(())
        }
    }
}

/// Validator: string length must be within range
pub fn string_length(
    min: usize,
    max: usize,
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| {
        if let Some(s) = value.as_str() {
            let len = s.chars().count();
            if len < min {
                Err(format!(
                    "'{}' must be at least {} characters (currently: {})",
                    field, min, len
                ))
            } else if len > max {
                Err(format!(
                    "'{}' must not exceed {} characters (currently: {})",
                    field, max, len
                ))
            } else {
                Ok(())
            }
        } else {
            Ok(())
        }
    }
}

/// Validator: integer must be within an inclusive range
pub fn int_range(
    min: i64,
    max: i64,
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| match value.as_i64() {
        Some(n) if n < min || n > max => Err(format!(
            "'{}' must be between {} and {} (value: {})",
            field, min, max, n
        )),
        _ => Ok(()),
    }
}

/// Validator: string must match a field format
pub fn format(
    format: FieldFormat,
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| match value {
        Value::String(s) if !format.validate(&FieldValue::String(s.clone())) => {
            Err(format!("'{}' has an invalid format (value: {})", field, s))
        }
        _ => Ok(()),
    }
}
