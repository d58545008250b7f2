//! In-memory implementation of ResourceStore for testing and development
//!
//! Tables are `BTreeMap`s keyed by id, so iteration order is id order.
//! A transaction holds the store's writer lock for its whole life and stages
//! its writes; commit applies them under the table lock, drop discards them.

use crate::core::error::{ApiError, ApiResult, StorageError};
use crate::core::field::FieldValue;
use crate::core::query::{Condition, Page, QueryOptions};
use crate::core::resource::{
    Document, ResourceDescriptor, document_id, document_is_deleted, mark_document_deleted,
};
use crate::core::store::{ResourceStore, StoreTransaction};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

type Table = BTreeMap<Uuid, Document>;
type Tables = HashMap<&'static str, Table>;

/// In-memory resource store
///
/// Useful for testing and development. Uses RwLock for thread-safe access.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    writer: Arc<Mutex<()>>,
}

impl InMemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> ApiResult<RwLockReadGuard<'_, Tables>> {
        read_tables(&self.tables)
    }
}

fn read_tables(tables: &RwLock<Tables>) -> ApiResult<RwLockReadGuard<'_, Tables>> {
    tables.read().map_err(|e| {
        StorageError::QueryError {
            backend: "memory".to_string(),
            message: format!("Failed to acquire read lock: {}", e),
        }
        .into()
    })
}

fn write_tables(tables: &RwLock<Tables>) -> ApiResult<RwLockWriteGuard<'_, Tables>> {
    tables.write().map_err(|e| {
        StorageError::TransactionError {
            message: format!("Failed to acquire write lock: {}", e),
        }
        .into()
    })
}

fn field_of(document: &Document, field: &str) -> FieldValue {
    document
        .get(field)
        .map(FieldValue::from_json)
        .unwrap_or(FieldValue::Null)
}

fn matches_all(document: &Document, conditions: &[Condition]) -> bool {
    conditions
        .iter()
        .all(|condition| condition.matches(&field_of(document, condition.field())))
}

fn same_key(descriptor: &ResourceDescriptor, document: &Document, key: &[FieldValue]) -> bool {
    let stored = descriptor.natural_key_of(document);
    stored.len() == key.len()
        && stored
            .iter()
            .zip(key)
            .all(|(a, b)| a.semantic_key() == b.semantic_key())
}

fn require_id(document: &Document) -> ApiResult<Uuid> {
    document_id(document).ok_or_else(|| {
        StorageError::IntegrityError {
            message: "document has no valid id".to_string(),
        }
        .into()
    })
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn find_all(
        &self,
        descriptor: &'static ResourceDescriptor,
        conditions: &[Condition],
        options: &QueryOptions,
        include_deleted: bool,
    ) -> ApiResult<Page<Document>> {
        let tables = self.read()?;
        let matching: Vec<&Document> = tables
            .get(descriptor.table)
            .into_iter()
            .flat_map(|table| table.values())
            .filter(|doc| include_deleted || !document_is_deleted(doc))
            .filter(|doc| matches_all(doc, conditions))
            .collect();

        let total_count = options.total_count.then_some(matching.len() as u64);
        let records = matching
            .into_iter()
            .skip(options.offset)
            .take(options.limit)
            .cloned()
            .collect();

        Ok(Page {
            records,
            total_count,
        })
    }

    async fn find_by_id(
        &self,
        descriptor: &'static ResourceDescriptor,
        id: Uuid,
    ) -> ApiResult<Option<Document>> {
        let tables = self.read()?;
        Ok(tables
            .get(descriptor.table)
            .and_then(|table| table.get(&id))
            .cloned())
    }

    async fn find_by_natural_key(
        &self,
        descriptor: &'static ResourceDescriptor,
        key: &[FieldValue],
    ) -> ApiResult<Option<Document>> {
        let tables = self.read()?;
        Ok(tables
            .get(descriptor.table)
            .into_iter()
            .flat_map(|table| table.values())
            .find(|doc| !document_is_deleted(doc) && same_key(descriptor, doc, key))
            .cloned())
    }

    async fn begin(&self) -> ApiResult<Box<dyn StoreTransaction>> {
        let guard = self.writer.clone().lock_owned().await;
        Ok(Box::new(InMemoryTransaction {
            tables: self.tables.clone(),
            staged: HashMap::new(),
            _guard: guard,
        }))
    }
}

/// Staged writes over a snapshot-free view of the committed tables
struct InMemoryTransaction {
    tables: Arc<RwLock<Tables>>,
    staged: Tables,
    _guard: OwnedMutexGuard<()>,
}

impl InMemoryTransaction {
    fn lookup(&self, table: &'static str, id: Uuid) -> ApiResult<Option<Document>> {
        if let Some(doc) = self.staged.get(table).and_then(|t| t.get(&id)) {
            return Ok(Some(doc.clone()));
        }
        let tables = read_tables(&self.tables)?;
        Ok(tables.get(table).and_then(|t| t.get(&id)).cloned())
    }

    /// Committed rows overlaid with staged rows
    fn merged(&self, table: &'static str) -> ApiResult<Vec<Document>> {
        let tables = read_tables(&self.tables)?;
        let mut rows: Table = tables.get(table).cloned().unwrap_or_default();
        if let Some(staged) = self.staged.get(table) {
            for (id, doc) in staged {
                rows.insert(*id, doc.clone());
            }
        }
        Ok(rows.into_values().collect())
    }

    fn live_key_holder(
        &self,
        descriptor: &'static ResourceDescriptor,
        key: &[FieldValue],
    ) -> ApiResult<Option<Document>> {
        Ok(self
            .merged(descriptor.table)?
            .into_iter()
            .find(|doc| !document_is_deleted(doc) && same_key(descriptor, doc, key)))
    }

    fn stage(&mut self, table: &'static str, id: Uuid, document: Document) {
        self.staged.entry(table).or_default().insert(id, document);
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn find_by_id(
        &mut self,
        descriptor: &'static ResourceDescriptor,
        id: Uuid,
    ) -> ApiResult<Option<Document>> {
        self.lookup(descriptor.table, id)
    }

    async fn find_by_natural_key(
        &mut self,
        descriptor: &'static ResourceDescriptor,
        key: &[FieldValue],
    ) -> ApiResult<Option<Document>> {
        self.live_key_holder(descriptor, key)
    }

    async fn insert(
        &mut self,
        descriptor: &'static ResourceDescriptor,
        document: Document,
    ) -> ApiResult<()> {
        let id = require_id(&document)?;
        if self.lookup(descriptor.table, id)?.is_some() {
            return Err(ApiError::bad_request(format!(
                "{} with id '{}' already exists",
                descriptor.name, id
            )));
        }
        let key = descriptor.natural_key_of(&document);
        if !document_is_deleted(&document) && self.live_key_holder(descriptor, &key)?.is_some() {
            return Err(ApiError::bad_request(format!(
                "A {} record with the same natural key already exists",
                descriptor.name
            )));
        }
        self.stage(descriptor.table, id, document);
        Ok(())
    }

    async fn update(
        &mut self,
        descriptor: &'static ResourceDescriptor,
        document: Document,
    ) -> ApiResult<()> {
        let id = require_id(&document)?;
        if self.lookup(descriptor.table, id)?.is_none() {
            return Err(StorageError::QueryError {
                backend: "memory".to_string(),
                message: format!("{} '{}' does not exist", descriptor.name, id),
            }
            .into());
        }
        self.stage(descriptor.table, id, document);
        Ok(())
    }

    async fn soft_delete(
        &mut self,
        descriptor: &'static ResourceDescriptor,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> ApiResult<bool> {
        match self.lookup(descriptor.table, id)? {
            Some(mut document) if !document_is_deleted(&document) => {
                mark_document_deleted(&mut document, now);
                self.stage(descriptor.table, id, document);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn commit(self: Box<Self>) -> ApiResult<()> {
        let this = *self;
        let mut tables = write_tables(&this.tables)?;
        for (table, rows) in this.staged {
            tables.entry(table).or_default().extend(rows);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> ApiResult<()> {
        Ok(())
    }
}
