//! # eduapi
//!
//! Resource versioning and query shaping for an education-data REST API.
//!
//! ## Features
//!
//! - **Version tokens**: every record carries an `ETag` derived from its
//!   last-modified timestamp; updates and deletes require `If-Match`
//! - **Field selection**: `?fields=a,b` projects records to an allow-list
//! - **Generic filtering**: any allow-listed field is an equality filter, with
//!   `offset`/`limit`/`totalCount` paging
//! - **Soft delete**: deleted records stay stored but vanish from reads
//! - **Referential checks**: creates and updates verify referenced records
//!   and natural-key uniqueness inside one transaction
//! - **Pluggable storage**: in-memory, or PostgreSQL with the `postgres` feature
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use eduapi::prelude::*;
//!
//! let app = entities::register_all(ServerBuilder::new(ApiConfig::default()))
//!     .with_store(InMemoryStore::new())
//!     .build()?;
//! ```

pub mod config;
pub mod core;
pub mod entities;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        ApiError, ApiResult, Condition, Document, FieldFormat, FieldSelector, FieldValue,
        ListRequest, Page, ParameterDeduplicator, QueryOptions, RecordStatus, Repository,
        Resource, ResourceDescriptor, ResourceRules, ResourceService, ResourceStore,
        StoreTransaction, VersionToken, is_modified_since, validate_if_match,
        validate_if_none_match,
    };

    // === Macros ===
    pub use crate::impl_resource;

    // === Resources ===
    pub use crate::entities;

    // === Storage ===
    pub use crate::storage::InMemoryStore;
    #[cfg(feature = "postgres")]
    pub use crate::storage::PostgresStore;

    // === Config ===
    pub use crate::config::ApiConfig;

    // === Server ===
    pub use crate::server::{ConditionalHeaders, ServerBuilder, init_tracing};

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use uuid::Uuid;
}
