//! Field selection and response projection
//!
//! Each resource type registers the list of fields a caller may select.
//! [`FieldSelector::validate_fields`] turns the raw `fields` query value into
//! an ordered, non-empty subset of that list, and
//! [`FieldSelector::shape_data`] projects payloads onto it.

use crate::core::error::{ApiResult, ResourceError, SelectionError};
use crate::core::resource::ResourceDescriptor;
use indexmap::IndexSet;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Ordered set of effective field names
pub type FieldSet = IndexSet<String>;

fn field_token_regex() -> Option<&'static Regex> {
    static FIELD_TOKEN: OnceLock<Option<Regex>> = OnceLock::new();
    FIELD_TOKEN
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9]+$").ok())
        .as_ref()
}

fn is_valid_token(token: &str) -> bool {
    match field_token_regex() {
        Some(regex) => regex.is_match(token),
        None => !token.is_empty() && token.chars().all(|c| c.is_ascii_alphanumeric()),
    }
}

/// Per-resource-type allow-lists
#[derive(Debug, Clone, Default)]
pub struct FieldSelector {
    allow_lists: HashMap<String, Vec<String>>,
}

impl FieldSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a selector from resource descriptors
    pub fn from_descriptors<'a>(
        descriptors: impl IntoIterator<Item = &'a ResourceDescriptor>,
    ) -> Self {
        let mut selector = Self::new();
        for descriptor in descriptors {
            selector.register(descriptor.name, descriptor.fields.iter().copied());
        }
        selector
    }

    /// Register (or replace) the allow-list for a resource type
    pub fn register<I, S>(&mut self, resource_type: &str, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_lists.insert(
            resource_type.to_string(),
            fields.into_iter().map(Into::into).collect(),
        );
    }

    fn allow_list(&self, resource_type: &str) -> ApiResult<&[String]> {
        self.allow_lists
            .get(resource_type)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                ResourceError::UnknownType {
                    resource_type: resource_type.to_string(),
                }
                .into()
            })
    }

    /// Resolve the effective field set for a request
    ///
    /// - no `fields` parameter: the whole allow-list
    /// - blank value: [`SelectionError::InvalidSelectionField`]
    /// - empty token or a token outside `[A-Za-z0-9]`:
    ///   [`SelectionError::InvalidFilterField`]
    /// - any token not in the allow-list: the whole allow-list
    /// - otherwise the requested fields, first occurrence kept
    pub fn validate_fields(&self, resource_type: &str, raw: Option<&str>) -> ApiResult<FieldSet> {
        let allowed = self.allow_list(resource_type)?;
        let full = || allowed.iter().cloned().collect::<FieldSet>();

        let Some(raw) = raw else {
            return Ok(full());
        };

        if raw.trim().is_empty() {
            return Err(SelectionError::InvalidSelectionField {
                raw: raw.to_string(),
            }
            .into());
        }

        let mut requested = FieldSet::new();
        for token in raw.split(',') {
            if !is_valid_token(token) {
                return Err(SelectionError::InvalidFilterField {
                    field: token.to_string(),
                }
                .into());
            }
            requested.insert(token.to_string());
        }

        if requested.iter().any(|field| !allowed.contains(field)) {
            tracing::debug!(
                resource_type,
                fields = raw,
                "unrecognized field selection, returning all fields"
            );
            return Ok(full());
        }

        Ok(requested)
    }

    /// Project a payload onto the selected fields
    ///
    /// Accepts a single record, a bare array of records, or an object
    /// wrapping the records under the resource type's collection name.
    /// Fields absent from a record are omitted.
    pub fn shape_data(
        &self,
        payload: Value,
        fields: &FieldSet,
        resource_type: &str,
    ) -> ApiResult<Value> {
        self.allow_list(resource_type)?;

        Ok(match payload {
            Value::Array(records) => Value::Array(
                records
                    .into_iter()
                    .map(|record| project_record(record, fields))
                    .collect(),
            ),
            Value::Object(mut object) if matches!(object.get(resource_type), Some(Value::Array(_))) => {
                if let Some(records) = object.remove(resource_type) {
                    let shaped = match records {
                        Value::Array(records) => Value::Array(
                            records
                                .into_iter()
                                .map(|record| project_record(record, fields))
                                .collect(),
                        ),
                        other => other,
                    };
                    object.insert(resource_type.to_string(), shaped);
                }
                Value::Object(object)
            }
            record @ Value::Object(_) => project_record(record, fields),
            other => other,
        })
    }
}

fn project_record(record: Value, fields: &FieldSet) -> Value {
    match record {
        Value::Object(mut object) => {
            let mut projected = Map::new();
            for field in fields {
                if let Some(value) = object.remove(field) {
                    projected.insert(field.clone(), value);
                }
            }
            Value::Object(projected)
        }
        other => other,
    }
}
