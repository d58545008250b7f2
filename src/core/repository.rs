//! Typed repository over the shared storage engine
//!
//! [`Repository<R>`] is a stateless accessor: it converts between `R` and
//! stored documents and forwards to the [`ResourceStore`] with `R`'s
//! descriptor. [`TransactionScope`] does the same for one transaction and
//! can reach any resource type, which the services need for reference
//! checks.

use crate::core::error::ApiResult;
use crate::core::field::FieldValue;
use crate::core::query::{Condition, Page, QueryOptions};
use crate::core::resource::{Document, Resource, ResourceDescriptor, next_version_time};
use crate::core::store::{ResourceStore, StoreTransaction};
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

/// Typed access to one resource type
pub struct Repository<R: Resource> {
    store: Arc<dyn ResourceStore>,
    _marker: PhantomData<fn() -> R>,
}

impl<R: Resource> Clone for Repository<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _marker: PhantomData,
        }
    }
}

impl<R: Resource> Repository<R> {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<dyn ResourceStore> {
        &self.store
    }

    /// Listing as raw documents, live records only
    pub async fn find_documents(
        &self,
        options: &QueryOptions,
        conditions: &[Condition],
    ) -> ApiResult<Page<Document>> {
        self.store
            .find_all(R::descriptor(), conditions, options, false)
            .await
    }

    /// Filtered, paginated listing ordered by id
    pub async fn find_all_by(
        &self,
        options: &QueryOptions,
        conditions: &[Condition],
    ) -> ApiResult<Page<R>> {
        self.find_documents(options, conditions)
            .await?
            .map(R::from_document)
    }

    /// Same as [`find_all_by`](Self::find_all_by) but including deleted records
    pub async fn find_all_including_deleted(
        &self,
        options: &QueryOptions,
        conditions: &[Condition],
    ) -> ApiResult<Page<R>> {
        self.store
            .find_all(R::descriptor(), conditions, options, true)
            .await?
            .map(R::from_document)
    }

    /// Record by id, whatever its status
    pub async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<R>> {
        self.store
            .find_by_id(R::descriptor(), id)
            .await?
            .map(R::from_document)
            .transpose()
    }

    /// Live record by natural key, values in the descriptor's key order
    pub async fn find_by_composite_key(&self, key: &[FieldValue]) -> ApiResult<Option<R>> {
        self.store
            .find_by_natural_key(R::descriptor(), key)
            .await?
            .map(R::from_document)
            .transpose()
    }

    /// Soft delete in its own transaction
    ///
    /// Returns whether a live record was deleted; absence is not an error.
    /// Bypasses any read cache held by a service.
    pub async fn delete(&self, id: Uuid) -> ApiResult<bool> {
        let mut scope = self.begin().await?;
        let deleted = scope.soft_delete::<R>(id).await?;
        scope.commit().await?;
        Ok(deleted)
    }

    pub async fn begin(&self) -> ApiResult<TransactionScope> {
        TransactionScope::begin(self.store.as_ref()).await
    }
}

/// Typed view of an open transaction
///
/// Dropping the scope without committing rolls the transaction back.
pub struct TransactionScope {
    tx: Box<dyn StoreTransaction>,
}

impl TransactionScope {
    pub async fn begin(store: &dyn ResourceStore) -> ApiResult<Self> {
        Ok(Self {
            tx: store.begin().await?,
        })
    }

    pub async fn find_by_id<R: Resource>(&mut self, id: Uuid) -> ApiResult<Option<R>> {
        self.tx
            .find_by_id(R::descriptor(), id)
            .await?
            .map(R::from_document)
            .transpose()
    }

    pub async fn find_by_natural_key<R: Resource>(
        &mut self,
        key: &[FieldValue],
    ) -> ApiResult<Option<R>> {
        self.tx
            .find_by_natural_key(R::descriptor(), key)
            .await?
            .map(R::from_document)
            .transpose()
    }

    /// Whether a live record with this natural key exists, for any type
    pub async fn live_key_exists(
        &mut self,
        descriptor: &'static ResourceDescriptor,
        key: &[FieldValue],
    ) -> ApiResult<bool> {
        Ok(self.tx.find_by_natural_key(descriptor, key).await?.is_some())
    }

    /// Whether any record, live or deleted, holds this id
    pub async fn id_exists<R: Resource>(&mut self, id: Uuid) -> ApiResult<bool> {
        Ok(self.tx.find_by_id(R::descriptor(), id).await?.is_some())
    }

    pub async fn insert<R: Resource>(&mut self, record: &R) -> ApiResult<()> {
        self.tx
            .insert(R::descriptor(), record.to_document()?)
            .await
    }

    pub async fn update<R: Resource>(&mut self, record: &R) -> ApiResult<()> {
        self.tx
            .update(R::descriptor(), record.to_document()?)
            .await
    }

    /// Soft-delete a live record, stamped later than its current version
    pub async fn soft_delete<R: Resource>(&mut self, id: Uuid) -> ApiResult<bool> {
        let Some(existing) = self.find_by_id::<R>(id).await? else {
            return Ok(false);
        };
        if existing.is_deleted() {
            return Ok(false);
        }
        let now = next_version_time(existing.last_modified_date());
        self.tx.soft_delete(R::descriptor(), id, now).await
    }

    pub async fn commit(self) -> ApiResult<()> {
        self.tx.commit().await
    }

    pub async fn rollback(self) -> ApiResult<()> {
        self.tx.rollback().await
    }
}
