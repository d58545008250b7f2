//! Storage engine traits
//!
//! A [`ResourceStore`] persists [`Document`]s for any resource type; the
//! [`ResourceDescriptor`] passed with every call names the table, the natural
//! key and the filterable fields. Typed access lives in
//! [`Repository`](crate::core::repository::Repository).
//!
//! Mutations go through a [`StoreTransaction`]. Dropping a transaction
//! without calling [`StoreTransaction::commit`] discards its writes.

use crate::core::error::ApiResult;
use crate::core::field::FieldValue;
use crate::core::query::{Condition, Page, QueryOptions};
use crate::core::resource::{Document, ResourceDescriptor};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Read access plus transaction creation
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Short backend name for logs
    fn backend(&self) -> &'static str;

    /// Filtered, paginated listing ordered by id ascending
    ///
    /// Deleted records are skipped unless `include_deleted` is set. The total
    /// count, when requested, ignores the paging window.
    async fn find_all(
        &self,
        descriptor: &'static ResourceDescriptor,
        conditions: &[Condition],
        options: &QueryOptions,
        include_deleted: bool,
    ) -> ApiResult<Page<Document>>;

    /// Record by id, whatever its status
    async fn find_by_id(
        &self,
        descriptor: &'static ResourceDescriptor,
        id: Uuid,
    ) -> ApiResult<Option<Document>>;

    /// Live record by natural key
    async fn find_by_natural_key(
        &self,
        descriptor: &'static ResourceDescriptor,
        key: &[FieldValue],
    ) -> ApiResult<Option<Document>>;

    /// Open a write transaction
    async fn begin(&self) -> ApiResult<Box<dyn StoreTransaction>>;
}

/// A unit of work; reads inside it see its own pending writes
#[async_trait]
pub trait StoreTransaction: Send {
    async fn find_by_id(
        &mut self,
        descriptor: &'static ResourceDescriptor,
        id: Uuid,
    ) -> ApiResult<Option<Document>>;

    async fn find_by_natural_key(
        &mut self,
        descriptor: &'static ResourceDescriptor,
        key: &[FieldValue],
    ) -> ApiResult<Option<Document>>;

    /// Insert a new record
    async fn insert(
        &mut self,
        descriptor: &'static ResourceDescriptor,
        document: Document,
    ) -> ApiResult<()>;

    /// Replace an existing record
    async fn update(
        &mut self,
        descriptor: &'static ResourceDescriptor,
        document: Document,
    ) -> ApiResult<()>;

    /// Soft-delete a record; returns false when no live record has that id
    async fn soft_delete(
        &mut self,
        descriptor: &'static ResourceDescriptor,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> ApiResult<bool>;

    async fn commit(self: Box<Self>) -> ApiResult<()>;

    async fn rollback(self: Box<Self>) -> ApiResult<()>;
}
