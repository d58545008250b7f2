//! Core module: the versioning and query-shaping layer shared by every resource type

pub mod cache;
pub mod error;
pub mod etag;
pub mod field;
pub mod params;
pub mod query;
pub mod repository;
pub mod resource;
pub mod selection;
pub mod service;
pub mod store;
pub mod validation;

pub use cache::{CacheKeyMode, CachedRead, ResponseCache};
pub use error::{ApiError, ApiResult};
pub use etag::{VersionToken, is_modified_since, validate_if_match, validate_if_none_match};
pub use field::{FieldFormat, FieldValue};
pub use params::ParameterDeduplicator;
pub use query::{Condition, ListRequest, Page, QueryOptions};
pub use repository::{Repository, TransactionScope};
pub use resource::{
    Document, ForeignReference, RecordStatus, Resource, ResourceDescriptor, ResourceRules,
};
pub use selection::{FieldSelector, FieldSet};
pub use service::{ListLimits, ListResponse, RecordResponse, ResourceService};
pub use store::{ResourceStore, StoreTransaction};
pub use validation::ValidationReport;
