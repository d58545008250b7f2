//! Resource traits and descriptors shared by every resource type
//!
//! Every resource carries the same bookkeeping:
//! - id: surrogate identifier
//! - status: active / inactive / deleted
//! - createDate / lastModifiedDate / deleteDate
//!
//! plus a natural key (one or more business fields) that must be unique
//! among live records. [`Resource`] is generated by `impl_resource!`;
//! [`ResourceRules`] is written by hand for each type.

use crate::core::error::{ApiError, ApiResult, FieldViolation, StorageError};
use crate::core::etag::VersionToken;
use crate::core::field::FieldValue;
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A record as stored: field name → JSON value
pub type Document = Map<String, Value>;

/// Document field holding the surrogate id
pub const ID_FIELD: &str = "id";
/// Document field holding the record status
pub const STATUS_FIELD: &str = "status";
/// Document field holding the creation timestamp
pub const CREATE_DATE_FIELD: &str = "createDate";
/// Document field holding the last modification timestamp
pub const LAST_MODIFIED_FIELD: &str = "lastModifiedDate";
/// Document field holding the deletion timestamp
pub const DELETE_DATE_FIELD: &str = "deleteDate";
/// Document field holding the version token on responses
pub const ETAG_FIELD: &str = "_etag";

/// Current time at the precision version tokens carry
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Modification time for a write; always later than the previous version
pub fn next_version_time(previous: DateTime<Utc>) -> DateTime<Utc> {
    current_timestamp().max(previous + TimeDelta::milliseconds(1))
}

/// Whether a stored document is soft-deleted
pub fn document_is_deleted(document: &Document) -> bool {
    document.get(STATUS_FIELD).and_then(Value::as_str) == Some(RecordStatus::Deleted.as_str())
}

/// Id of a stored document
pub fn document_id(document: &Document) -> Option<Uuid> {
    document
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
}

/// Apply a soft delete to a stored document
pub fn mark_document_deleted(document: &mut Document, now: DateTime<Utc>) {
    let stamp = Value::String(now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true));
    document.insert(
        STATUS_FIELD.to_string(),
        Value::String(RecordStatus::Deleted.as_str().to_string()),
    );
    document.insert(DELETE_DATE_FIELD.to_string(), stamp.clone());
    document.insert(LAST_MODIFIED_FIELD.to_string(), stamp);
}

/// Lifecycle status of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Active,
    Inactive,
    Deleted,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Active => "active",
            RecordStatus::Inactive => "inactive",
            RecordStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(RecordStatus::Active),
            "inactive" => Ok(RecordStatus::Inactive),
            "deleted" => Ok(RecordStatus::Deleted),
            other => Err(format!("unknown record status '{}'", other)),
        }
    }
}

/// Static description of a resource type
///
/// The storage engines, the field selector and the HTTP layer are all
/// configured from this one value.
#[derive(Debug, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// Collection name used in URLs and as the selector key (e.g. `gradingPeriods`)
    pub name: &'static str,
    /// Backing table
    pub table: &'static str,
    /// Fields forming the natural key, in key order
    pub natural_key: &'static [&'static str],
    /// Fields callers may select and filter on
    pub fields: &'static [&'static str],
    /// Built-in page size when the caller gives no `limit`; `None` uses the
    /// configured pagination default
    pub default_limit: Option<usize>,
}

impl ResourceDescriptor {
    /// Natural key values of a stored document
    ///
    /// Missing fields yield `Null` so the key length is always stable.
    pub fn natural_key_of(&self, document: &Document) -> Vec<FieldValue> {
        self.natural_key
            .iter()
            .map(|field| {
                document
                    .get(*field)
                    .map(FieldValue::from_json)
                    .unwrap_or(FieldValue::Null)
            })
            .collect()
    }

    pub fn allows_field(&self, field: &str) -> bool {
        self.fields.contains(&field)
    }
}

/// A reference from one record to another by natural key
#[derive(Debug, Clone)]
pub struct ForeignReference {
    /// Field on the referencing record, used in error messages
    pub field: &'static str,
    /// Referenced resource type
    pub target: &'static ResourceDescriptor,
    /// Natural key of the referenced record
    pub key: Vec<FieldValue>,
}

impl ForeignReference {
    pub fn new(
        field: &'static str,
        target: &'static ResourceDescriptor,
        key: Vec<FieldValue>,
    ) -> Self {
        Self { field, target, key }
    }
}

/// Bookkeeping shared by all resource types
pub trait Resource: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    fn descriptor() -> &'static ResourceDescriptor;

    fn id(&self) -> Uuid;

    fn status(&self) -> RecordStatus;

    fn create_date(&self) -> DateTime<Utc>;

    fn last_modified_date(&self) -> DateTime<Utc>;

    fn delete_date(&self) -> Option<DateTime<Utc>>;

    /// Bump the last-modified timestamp
    fn mark_modified(&mut self, now: DateTime<Utc>);

    fn is_deleted(&self) -> bool {
        self.status() == RecordStatus::Deleted
    }

    /// Version token of the current state
    fn etag(&self) -> VersionToken {
        VersionToken::generate(self.last_modified_date())
    }

    fn to_document(&self) -> ApiResult<Document> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(ApiError::Internal(format!(
                "{} did not serialize to an object",
                Self::descriptor().name
            ))),
            Err(e) => Err(ApiError::Internal(e.to_string())),
        }
    }

    fn from_document(document: Document) -> ApiResult<Self> {
        serde_json::from_value(Value::Object(document)).map_err(|e| {
            StorageError::IntegrityError {
                message: format!("{}: {}", Self::descriptor().name, e),
            }
            .into()
        })
    }

    fn natural_key(&self) -> ApiResult<Vec<FieldValue>> {
        Ok(Self::descriptor().natural_key_of(&self.to_document()?))
    }
}

/// Per-type input handling and domain rules
pub trait ResourceRules: Resource {
    /// Request body accepted on create and update
    type Input: DeserializeOwned + Send + Sync + 'static;

    /// Field-level checks on the request body
    fn validate_input(input: &Self::Input) -> Vec<FieldViolation>;

    /// Build a new live record
    fn from_input(id: Uuid, input: Self::Input, now: DateTime<Utc>) -> Self;

    /// Replace the mutable fields with the input
    fn apply_input(&mut self, input: Self::Input);

    /// Records this one points to; each must exist and be live
    fn references(&self) -> Vec<ForeignReference> {
        Vec::new()
    }

    /// Cross-field domain rules
    fn check_rules(&self) -> ApiResult<()> {
        Ok(())
    }
}
