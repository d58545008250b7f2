//! Typed error handling for the resource layer
//!
//! Every failure raised by field selection, concurrency-token checks, query
//! building, validation and storage is expressed as an [`ApiError`] so that
//! callers can match on the category instead of inspecting strings.
//!
//! # Error Categories
//!
//! - [`SelectionError`]: malformed `fields` / filter input
//! - [`PreconditionError`]: `If-Match` / `If-None-Match` failures
//! - [`TokenError`]: malformed version tokens
//! - [`RequestError`]: domain validation failures surfaced as 400
//! - [`ResourceError`]: missing or unknown resources
//! - [`QueryError`]: query-building faults
//! - [`ValidationError`]: per-field input violations
//! - [`StorageError`]: storage backend failures
//! - [`ConfigError`]: configuration loading failures
//!
//! # Example
//!
//! ```rust,ignore
//! match service.delete(id, headers.if_match()).await {
//!     Ok(()) => StatusCode::NO_CONTENT.into_response(),
//!     Err(ApiError::Precondition(PreconditionError::Failed { .. })) => {
//!         // a concurrent writer got there first
//!     }
//!     Err(e) => e.into_response(),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// The main error type of the crate
#[derive(Debug, Error)]
pub enum ApiError {
    /// Field selection / filter field errors
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// Conditional request errors
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    /// Version token errors
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Client request errors (domain validation)
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Resource lookup errors
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Query building errors
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Field validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Storage backend errors
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Internal errors (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Shorthand for a [`RequestError::BadRequest`]
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::Request(RequestError::BadRequest {
            message: message.into(),
        })
    }

    /// Shorthand for a [`ResourceError::NotFound`]
    pub fn not_found(resource_type: impl Into<String>, id: Uuid) -> Self {
        ApiError::Resource(ResourceError::NotFound {
            resource_type: resource_type.into(),
            id,
        })
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Selection(_) => StatusCode::BAD_REQUEST,
            ApiError::Precondition(e) => e.status_code(),
            ApiError::Token(_) => StatusCode::BAD_REQUEST,
            ApiError::Request(_) => StatusCode::BAD_REQUEST,
            ApiError::Resource(e) => e.status_code(),
            ApiError::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Selection(e) => e.error_code(),
            ApiError::Precondition(e) => e.error_code(),
            ApiError::Token(_) => "INVALID_TOKEN_FORMAT",
            ApiError::Request(e) => e.error_code(),
            ApiError::Resource(e) => e.error_code(),
            ApiError::Query(_) => "PARAMETER_NOT_FOUND",
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Storage(_) => "STORAGE_ERROR",
            ApiError::Config(_) => "CONFIG_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    /// Get additional details for the error
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::Selection(SelectionError::InvalidFilterField { field }) => {
                Some(serde_json::json!({ "field": field }))
            }
            ApiError::Precondition(PreconditionError::Required { header })
            | ApiError::Precondition(PreconditionError::Failed { header }) => {
                Some(serde_json::json!({ "header": header }))
            }
            ApiError::Resource(ResourceError::NotFound { resource_type, id }) => {
                Some(serde_json::json!({
                    "resource_type": resource_type,
                    "id": id.to_string()
                }))
            }
            ApiError::Validation(ValidationError::FieldErrors(errors)) => {
                Some(serde_json::json!({ "fields": errors }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Selection Errors
// =============================================================================

/// Errors raised while validating a caller-supplied field list or filter
#[derive(Debug, Error)]
pub enum SelectionError {
    /// The `fields` parameter was present but blank
    #[error("Invalid field selection: '{raw}' does not name any field")]
    InvalidSelectionField { raw: String },

    /// A field token was empty or contained characters outside [A-Za-z0-9]
    #[error("Invalid filter field: '{field}'")]
    InvalidFilterField { field: String },
}

impl SelectionError {
    pub fn error_code(&self) -> &'static str {
        match self {
            SelectionError::InvalidSelectionField { .. } => "INVALID_SELECTION_FIELD",
            SelectionError::InvalidFilterField { .. } => "INVALID_FILTER_FIELD",
        }
    }
}

// =============================================================================
// Precondition Errors
// =============================================================================

/// Errors raised by conditional-request checks
#[derive(Debug, Error)]
pub enum PreconditionError {
    /// A required conditional header was not supplied
    #[error("Precondition required: missing {header} header")]
    Required { header: String },

    /// A conditional header was supplied but did not match
    #[error("Precondition failed: {header} does not match the current version")]
    Failed { header: String },
}

impl PreconditionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PreconditionError::Required { .. } => StatusCode::PRECONDITION_REQUIRED,
            PreconditionError::Failed { .. } => StatusCode::PRECONDITION_FAILED,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            PreconditionError::Required { .. } => "PRECONDITION_REQUIRED",
            PreconditionError::Failed { .. } => "PRECONDITION_FAILED",
        }
    }
}

// =============================================================================
// Token Errors
// =============================================================================

/// Errors related to version tokens
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token did not contain a parseable timestamp
    #[error("Invalid version token format: {token}")]
    InvalidFormat { token: String },
}

// =============================================================================
// Request Errors
// =============================================================================

/// Client errors detected by domain validation
#[derive(Debug, Error)]
pub enum RequestError {
    /// Domain rule violation (bad reference, bad ordering, duplicate key)
    #[error("{message}")]
    BadRequest { message: String },

    /// The request body could not be decoded
    #[error("Invalid request body: {message}")]
    InvalidBody { message: String },

    /// A path identifier was not a valid UUID
    #[error("Invalid resource id: '{id}'")]
    InvalidResourceId { id: String },

    /// A query parameter had an invalid value
    #[error("Invalid value '{value}' for query parameter '{parameter}'")]
    InvalidParameter { parameter: String, value: String },
}

impl RequestError {
    pub fn error_code(&self) -> &'static str {
        match self {
            RequestError::BadRequest { .. } => "BAD_REQUEST",
            RequestError::InvalidBody { .. } => "INVALID_BODY",
            RequestError::InvalidResourceId { .. } => "INVALID_RESOURCE_ID",
            RequestError::InvalidParameter { .. } => "INVALID_PARAMETER",
        }
    }
}

// =============================================================================
// Resource Errors
// =============================================================================

/// Errors related to resource lookup
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The resource is absent or not active
    #[error("{resource_type} with id '{id}' not found")]
    NotFound { resource_type: String, id: Uuid },

    /// The resource type is not registered
    #[error("Unknown resource type: {resource_type}")]
    UnknownType { resource_type: String },
}

impl ResourceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ResourceError::NotFound { .. } => StatusCode::NOT_FOUND,
            ResourceError::UnknownType { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ResourceError::NotFound { .. } => "RESOURCE_NOT_FOUND",
            ResourceError::UnknownType { .. } => "UNKNOWN_RESOURCE_TYPE",
        }
    }
}

// =============================================================================
// Query Errors
// =============================================================================

/// Errors raised while building parameterized queries
#[derive(Debug, Error)]
pub enum QueryError {
    /// A placeholder was requested for a value that was never registered
    #[error("Parameter not found: {value}")]
    ParameterNotFound { value: String },
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors related to input validation
#[derive(Debug, Error)]
pub enum ValidationError {
    /// One or more field violations
    #[error("Validation errors: {}", format_violations(.0))]
    FieldErrors(Vec<FieldViolation>),
}

/// A single field validation failure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

fn format_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.field, v.message))
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors related to storage backends
#[derive(Debug, Error)]
pub enum StorageError {
    /// Connection error
    #[error("Failed to connect to {backend}: {message}")]
    ConnectionError { backend: String, message: String },

    /// Query execution error
    #[error("{backend} query error: {message}")]
    QueryError { backend: String, message: String },

    /// Transaction error
    #[error("Transaction error: {message}")]
    TransactionError { message: String },

    /// Stored data could not be decoded into a record
    #[error("Data integrity error: {message}")]
    IntegrityError { message: String },
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse configuration
    #[error("Failed to parse config{}: {message}", .file.as_ref().map(|f| format!(" file '{}'", f)).unwrap_or_default())]
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Invalid value in configuration
    #[error("Invalid value '{value}' for field '{field}': {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// IO error while reading configuration
    #[error("IO error: {message}")]
    IoError { message: String },
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Request(RequestError::InvalidBody {
            message: err.to_string(),
        })
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Config(ConfigError::IoError {
            message: err.to_string(),
        })
    }
}

impl From<serde_yaml::Error> for ApiError {
    fn from(err: serde_yaml::Error) -> Self {
        ApiError::Config(ConfigError::ParseError {
            file: None,
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Storage(StorageError::QueryError {
            backend: "PostgreSQL".to_string(),
            message: err.to_string(),
        })
    }
}

/// A specialized Result type for resource-layer operations
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Tests
// =============================================================================
