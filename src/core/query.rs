//! Query options, filter conditions and paging

use crate::core::error::{ApiResult, RequestError, SelectionError};
use crate::core::field::FieldValue;
use crate::core::resource::ResourceDescriptor;
use serde::{Deserialize, Serialize};

/// Reserved query parameter names
pub const OFFSET_PARAM: &str = "offset";
pub const LIMIT_PARAM: &str = "limit";
pub const TOTAL_COUNT_PARAM: &str = "totalCount";
pub const FIELDS_PARAM: &str = "fields";

/// Paging window and whether to compute a total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    pub offset: usize,
    pub limit: usize,
    pub total_count: bool,
}

impl QueryOptions {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit,
            total_count: false,
        }
    }

    pub fn with_total_count(mut self) -> Self {
        self.total_count = true;
        self
    }
}

/// A filter on one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Condition {
    /// field = value
    Eq { field: String, value: FieldValue },
    /// field IN (values)
    AnyOf {
        field: String,
        values: Vec<FieldValue>,
    },
}

impl Condition {
    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Condition::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn any_of<V: Into<FieldValue>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Condition::AnyOf {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Condition::Eq { field, .. } | Condition::AnyOf { field, .. } => field,
        }
    }

    /// Whether a stored value satisfies this condition
    ///
    /// Comparison is on [`FieldValue::semantic_key`], matching the textual
    /// comparison the SQL backend performs.
    pub fn matches(&self, stored: &FieldValue) -> bool {
        let stored = stored.semantic_key();
        match self {
            Condition::Eq { value, .. } => value.semantic_key() == stored,
            Condition::AnyOf { values, .. } => values.iter().any(|v| v.semantic_key() == stored),
        }
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub records: Vec<T>,
    /// Total matching records ignoring the window, when requested
    pub total_count: Option<u64>,
}

impl<T> Page<T> {
    pub fn map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        Ok(Page {
            records: self
                .records
                .into_iter()
                .map(f)
                .collect::<Result<Vec<_>, E>>()?,
            total_count: self.total_count,
        })
    }
}

/// Parsed listing request
#[derive(Debug, Clone, PartialEq)]
pub struct ListRequest {
    pub options: QueryOptions,
    pub conditions: Vec<Condition>,
    /// Raw `fields` value, validated later by the field selector
    pub fields: Option<String>,
}

impl ListRequest {
    /// Parse query-string pairs for a resource type
    ///
    /// `offset`, `limit`, `totalCount` and `fields` are reserved; every other
    /// name must be one of the resource's fields and becomes an equality
    /// filter (a repeated name becomes an any-of filter). `limit` is clamped
    /// to `max_limit`.
    pub fn from_query(
        params: &[(String, String)],
        descriptor: &ResourceDescriptor,
        default_limit: usize,
        max_limit: usize,
    ) -> ApiResult<Self> {
        let mut offset = 0;
        let mut limit = default_limit;
        let mut total_count = false;
        let mut fields = None;
        let mut conditions: Vec<Condition> = Vec::new();

        for (name, value) in params {
            match name.as_str() {
                OFFSET_PARAM => offset = parse_usize(name, value)?,
                LIMIT_PARAM => limit = parse_usize(name, value)?,
                TOTAL_COUNT_PARAM => total_count = parse_bool(name, value)?,
                FIELDS_PARAM => fields = Some(value.clone()),
                field if descriptor.allows_field(field) => {
                    push_condition(&mut conditions, field, value);
                }
                other => {
                    return Err(SelectionError::InvalidFilterField {
                        field: other.to_string(),
                    }
                    .into());
                }
            }
        }

        Ok(Self {
            options: QueryOptions {
                offset,
                limit: limit.min(max_limit),
                total_count,
            },
            conditions,
            fields,
        })
    }
}

fn push_condition(conditions: &mut Vec<Condition>, field: &str, value: &str) {
    let value = FieldValue::from(value);
    match conditions.iter_mut().find(|c| c.field() == field) {
        Some(existing) => {
            let merged = match existing.clone() {
                Condition::Eq { value: first, .. } => vec![first, value],
                Condition::AnyOf { mut values, .. } => {
                    values.push(value);
                    values
                }
            };
            *existing = Condition::AnyOf {
                field: field.to_string(),
                values: merged,
            };
        }
        None => conditions.push(Condition::eq(field, value)),
    }
}

fn parse_usize(name: &str, value: &str) -> ApiResult<usize> {
    value.parse::<usize>().map_err(|_| {
        RequestError::InvalidParameter {
            parameter: name.to_string(),
            value: value.to_string(),
        }
        .into()
    })
}

fn parse_bool(name: &str, value: &str) -> ApiResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(RequestError::InvalidParameter {
            parameter: name.to_string(),
            value: value.to_string(),
        }
        .into()),
    }
}
