//! Resource service: the orchestration layer used by the HTTP handlers
//!
//! One [`ResourceService<R>`] exists per resource type. It validates field
//! selections, runs listings and lookups through the read cache, attaches
//! version tokens, and runs every mutation inside one transaction with the
//! conditional-request and referential checks applied before the write.

use crate::core::cache::{CachedRead, ResponseCache};
use crate::core::error::{ApiError, ApiResult};
use crate::core::etag::{VersionToken, validate_if_match, validate_if_none_match};
use crate::core::query::{ListRequest, Page};
use crate::core::repository::{Repository, TransactionScope};
use crate::core::resource::{
    Document, ETAG_FIELD, Resource, ResourceRules, current_timestamp, next_version_time,
};
use crate::core::selection::{FieldSelector, FieldSet};
use crate::core::store::ResourceStore;
use crate::core::validation::ensure_valid;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Listing limits applied by a service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListLimits {
    pub default_limit: usize,
    pub max_limit: usize,
}

/// Projected listing
#[derive(Debug, Clone, PartialEq)]
pub struct ListResponse {
    /// Array of projected records
    pub body: Value,
    pub total_count: Option<u64>,
}

/// Projected single record with its version
#[derive(Debug, Clone, PartialEq)]
pub struct RecordResponse {
    pub body: Value,
    pub etag: VersionToken,
}

pub struct ResourceService<R: ResourceRules> {
    repository: Repository<R>,
    selector: Arc<FieldSelector>,
    cache: Option<Arc<ResponseCache>>,
    limits: ListLimits,
}

impl<R: ResourceRules> ResourceService<R> {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        selector: Arc<FieldSelector>,
        cache: Option<Arc<ResponseCache>>,
        limits: ListLimits,
    ) -> Self {
        Self {
            repository: Repository::new(store),
            selector,
            cache,
            limits,
        }
    }

    pub fn repository(&self) -> &Repository<R> {
        &self.repository
    }

    fn name() -> &'static str {
        R::descriptor().name
    }

    /// Parse query-string pairs and run the listing
    pub async fn list_query(&self, params: &[(String, String)]) -> ApiResult<ListResponse> {
        let request = ListRequest::from_query(
            params,
            R::descriptor(),
            self.limits.default_limit,
            self.limits.max_limit,
        )?;
        self.list(request).await
    }

    pub async fn list(&self, request: ListRequest) -> ApiResult<ListResponse> {
        let fields = self
            .selector
            .validate_fields(Self::name(), request.fields.as_deref())?;

        let page = self.cached_page(&request).await?;
        let total_count = page.total_count;
        let records = page.map(R::from_document)?.records;

        Ok(ListResponse {
            body: self.render_all(&records, &fields)?,
            total_count,
        })
    }

    async fn cached_page(&self, request: &ListRequest) -> ApiResult<Page<Document>> {
        let Some(cache) = &self.cache else {
            return self
                .repository
                .find_documents(&request.options, &request.conditions)
                .await;
        };

        let key = cache.list_key(Self::name(), &request.conditions, &request.options);
        if let Some(CachedRead::Page(page)) = cache.get(&key) {
            return Ok(page);
        }

        let generation = cache.generation(Self::name());
        let page = self
            .repository
            .find_documents(&request.options, &request.conditions)
            .await?;
        cache.insert_if_current(Self::name(), key, generation, CachedRead::Page(page.clone()));
        Ok(page)
    }

    /// Live record by id, projected
    pub async fn get(&self, id: Uuid, fields: Option<&str>) -> ApiResult<RecordResponse> {
        let fields = self.selector.validate_fields(Self::name(), fields)?;
        let record = self.find_live(id).await?;
        Ok(RecordResponse {
            body: self.render(&record, &fields)?,
            etag: record.etag(),
        })
    }

    async fn find_live(&self, id: Uuid) -> ApiResult<R> {
        let record = match &self.cache {
            None => self.repository.find_by_id(id).await?,
            Some(cache) => {
                let key = cache.get_key(Self::name(), &id);
                match cache.get(&key) {
                    Some(CachedRead::Record(document)) => Some(R::from_document(document)?),
                    _ => {
                        let generation = cache.generation(Self::name());
                        let found = self.repository.find_by_id(id).await?;
                        if let Some(record) = &found {
                            let document = record.to_document()?;
                            cache.insert_if_current(
                                Self::name(),
                                key,
                                generation,
                                CachedRead::Record(document),
                            );
                        }
                        found
                    }
                }
            }
        };

        record
            .filter(|r| !r.is_deleted())
            .ok_or_else(|| ApiError::not_found(Self::name(), id))
    }

    /// Project a record and attach its version token
    pub fn render(&self, record: &R, fields: &FieldSet) -> ApiResult<Value> {
        let shaped = self.selector.shape_data(
            Value::Object(record.to_document()?),
            fields,
            Self::name(),
        )?;
        Ok(with_etag(shaped, record.etag()))
    }

    /// Full representation returned from mutations
    pub fn render_full(&self, record: &R) -> ApiResult<Value> {
        let fields = self.selector.validate_fields(Self::name(), None)?;
        self.render(record, &fields)
    }

    fn render_all(&self, records: &[R], fields: &FieldSet) -> ApiResult<Value> {
        let documents = records
            .iter()
            .map(|record| record.to_document().map(Value::Object))
            .collect::<ApiResult<Vec<_>>>()?;
        let shaped = self
            .selector
            .shape_data(Value::Array(documents), fields, Self::name())?;

        Ok(match shaped {
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .zip(records)
                    .map(|(item, record)| with_etag(item, record.etag()))
                    .collect(),
            ),
            other => other,
        })
    }

    /// Create a record
    ///
    /// Inside one transaction: the id must be unused, no live record may
    /// share the natural key (an `If-None-Match` equal to that record's
    /// version is a failed precondition), and every reference must resolve
    /// to a live record.
    pub async fn create(
        &self,
        id: Option<Uuid>,
        input: R::Input,
        if_none_match: Option<&str>,
    ) -> ApiResult<R> {
        self.check_input(&input)?;

        let record = R::from_input(id.unwrap_or_else(Uuid::new_v4), input, current_timestamp());
        record.check_rules()?;
        let key = record.natural_key()?;

        let mut scope = self.repository.begin().await?;

        if scope.id_exists::<R>(record.id()).await? {
            return Err(ApiError::bad_request(format!(
                "{} with id '{}' already exists",
                Self::name(),
                record.id()
            )));
        }

        if let Some(existing) = scope.find_by_natural_key::<R>(&key).await? {
            validate_if_none_match(if_none_match, Some(&existing.etag())).inspect_err(|_| {
                tracing::debug!(resource = Self::name(), id = %existing.id(), "If-None-Match matched existing record");
            })?;
            return Err(ApiError::bad_request(format!(
                "A {} record with the same natural key already exists",
                Self::name()
            )));
        }

        check_references(&mut scope, &record).await?;

        scope.insert(&record).await?;
        scope.commit().await?;
        self.invalidate();

        tracing::info!(resource = Self::name(), id = %record.id(), "created");
        Ok(record)
    }

    /// Replace the mutable fields of a live record
    ///
    /// `If-Match` is required and must name the current version; the
    /// natural key cannot change.
    pub async fn update(&self, id: Uuid, input: R::Input, if_match: Option<&str>) -> ApiResult<R> {
        self.check_input(&input)?;

        let mut scope = self.repository.begin().await?;
        let existing = live_in_scope::<R>(&mut scope, id).await?;

        validate_if_match(if_match, &existing.etag()).inspect_err(|e| {
            tracing::debug!(resource = Self::name(), %id, error = %e, "update rejected");
        })?;

        let mut updated = existing.clone();
        updated.apply_input(input);

        if updated.natural_key()? != existing.natural_key()? {
            return Err(ApiError::bad_request(format!(
                "Natural key fields of {} cannot be changed",
                Self::name()
            )));
        }

        updated.check_rules()?;
        check_references(&mut scope, &updated).await?;
        updated.mark_modified(next_version_time(existing.last_modified_date()));

        scope.update(&updated).await?;
        scope.commit().await?;
        self.invalidate();

        tracing::info!(resource = Self::name(), %id, "updated");
        Ok(updated)
    }

    /// Soft-delete a live record
    ///
    /// `If-Match` is required; `*` matches any version. A stale token leaves
    /// the record untouched.
    pub async fn delete(&self, id: Uuid, if_match: Option<&str>) -> ApiResult<()> {
        let mut scope = self.repository.begin().await?;
        let existing = live_in_scope::<R>(&mut scope, id).await?;

        validate_if_match(if_match, &existing.etag()).inspect_err(|e| {
            tracing::debug!(resource = Self::name(), %id, error = %e, "delete rejected");
        })?;

        scope.soft_delete::<R>(id).await?;
        scope.commit().await?;
        self.invalidate();

        tracing::info!(resource = Self::name(), %id, "deleted");
        Ok(())
    }

    fn check_input(&self, input: &R::Input) -> ApiResult<()> {
        ensure_valid(R::validate_input(input)).map_err(|e| {
            tracing::warn!(resource = Self::name(), error = %e, "invalid input");
            e.into()
        })
    }

    fn invalidate(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate(Self::name());
        }
    }
}

async fn live_in_scope<R: Resource>(scope: &mut TransactionScope, id: Uuid) -> ApiResult<R> {
    scope
        .find_by_id::<R>(id)
        .await?
        .filter(|record| !record.is_deleted())
        .ok_or_else(|| ApiError::not_found(R::descriptor().name, id))
}

/// Every reference must resolve to a live record; the first miss fails
async fn check_references<R: ResourceRules>(
    scope: &mut TransactionScope,
    record: &R,
) -> ApiResult<()> {
    for reference in record.references() {
        if !scope.live_key_exists(reference.target, &reference.key).await? {
            let key = reference
                .key
                .iter()
                .map(|v| v.semantic_key())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::debug!(
                resource = R::descriptor().name,
                field = reference.field,
                target = reference.target.name,
                "unresolved reference"
            );
            return Err(ApiError::bad_request(format!(
                "Referenced {} '{}' does not exist in {}",
                reference.field, key, reference.target.name
            )));
        }
    }
    Ok(())
}

fn with_etag(mut value: Value, etag: VersionToken) -> Value {
    if let Value::Object(map) = &mut value {
        map.insert(ETAG_FIELD.to_string(), Value::String(etag.into()));
    }
    value
}
