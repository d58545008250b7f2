//! Field value types and validation

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;
use uuid::Uuid;

/// A polymorphic field value that can hold different types
///
/// Used for filter conditions, natural keys and query parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Uuid(Uuid),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Json(Value),
    Null,
}

impl FieldValue {
    /// Get the value as a string if possible
    pub fn as_string(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as an integer if possible
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the value as a UUID if possible
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            FieldValue::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Textual form under which two values count as the same parameter
    ///
    /// Timestamps compare by their ISO-8601 string, JSON values by their
    /// serialized structure, everything else by string coercion. This is also
    /// the form compared against stored JSON when filtering.
    pub fn semantic_key(&self) -> String {
        match self {
            FieldValue::String(s) => s.clone(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::Uuid(u) => u.to_string(),
            FieldValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            FieldValue::DateTime(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
            FieldValue::Json(v) => match v {
                Value::String(s) => s.clone(),
                other => canonical_json(other),
            },
            FieldValue::Null => "null".to_string(),
        }
    }

    /// Build a field value from a stored JSON value
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => n
                    .as_f64()
                    .map(FieldValue::Float)
                    .unwrap_or_else(|| FieldValue::Json(value.clone())),
            },
            Value::String(s) => FieldValue::String(s.clone()),
            other => FieldValue::Json(other.clone()),
        }
    }
}

/// JSON text with object keys sorted at every level
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let body = entries
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), canonical_json(v)))
                .collect::<Vec<_>>()
                .join(",");
            format!("{{{}}}", body)
        }
        Value::Array(items) => format!(
            "[{}]",
            items.iter().map(canonical_json).collect::<Vec<_>>().join(",")
        ),
        other => other.to_string(),
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(value.into())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        FieldValue::Uuid(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::DateTime(value)
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::from_json(&value)
    }
}

/// Field format validators used by resource input validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    Email,
    /// Descriptor namespaces such as `uri://ed-fi.org/GradeLevelDescriptor`
    Namespace,
}

impl FieldFormat {
    /// Validate a field value against this format
    pub fn validate(&self, value: &FieldValue) -> bool {
        let string_value = match value.as_string() {
            Some(s) => s,
            None => return false,
        };

        match self {
            FieldFormat::Email => Self::is_valid_email(string_value),
            FieldFormat::Namespace => Self::is_valid_namespace(string_value),
        }
    }

    fn is_valid_email(email: &str) -> bool {
        static EMAIL_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
        EMAIL_REGEX
            .get_or_init(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").ok())
            .as_ref()
            .is_some_and(|regex| regex.is_match(email))
    }

    fn is_valid_namespace(namespace: &str) -> bool {
        static NAMESPACE_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
        NAMESPACE_REGEX
            .get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://\S+$").ok())
            .as_ref()
            .is_some_and(|regex| regex.is_match(namespace))
    }
}
