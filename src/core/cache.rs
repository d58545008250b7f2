//! Read cache for listings and single-record lookups
//!
//! Entries hold unprojected documents so one entry can serve any field
//! selection. Writes to a resource type drop every entry of that type and
//! bump its generation; a read that started under an older generation does
//! not store its result.

use crate::core::query::{Condition, Page, QueryOptions};
use crate::core::resource::Document;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// How cache keys are derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheKeyMode {
    /// Key includes the filter conditions and paging window
    #[default]
    PerQuery,
    /// One listing key per resource type, regardless of the query
    Fixed,
}

/// Cached read result
#[derive(Debug, Clone, PartialEq)]
pub enum CachedRead {
    Page(Page<Document>),
    Record(Document),
}

#[derive(Debug)]
struct CacheEntry {
    value: CachedRead,
    stored_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    generations: HashMap<String, u64>,
}

/// TTL cache keyed by `{resource}:{operation}[:{query}]`
#[derive(Debug)]
pub struct ResponseCache {
    state: RwLock<CacheState>,
    ttl: Duration,
    key_mode: CacheKeyMode,
}

impl ResponseCache {
    pub fn new(ttl: Duration, key_mode: CacheKeyMode) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            ttl,
            key_mode,
        }
    }

    pub fn key_mode(&self) -> CacheKeyMode {
        self.key_mode
    }

    /// Key for a listing
    pub fn list_key(
        &self,
        resource: &str,
        conditions: &[Condition],
        options: &QueryOptions,
    ) -> String {
        match self.key_mode {
            CacheKeyMode::Fixed => format!("{}:list", resource),
            CacheKeyMode::PerQuery => {
                let predicate = serde_json::to_string(conditions).unwrap_or_default();
                format!(
                    "{}:list:{}:{}:{}:{}",
                    resource, predicate, options.offset, options.limit, options.total_count
                )
            }
        }
    }

    /// Key for a single-record lookup; always per id
    pub fn get_key(&self, resource: &str, id: &uuid::Uuid) -> String {
        format!("{}:get:{}", resource, id)
    }

    pub fn get(&self, key: &str) -> Option<CachedRead> {
        let state = self.state.read().ok()?;
        let entry = state.entries.get(key)?;
        if entry.stored_at.elapsed() > self.ttl {
            return None;
        }
        tracing::trace!(key, "cache hit");
        Some(entry.value.clone())
    }

    /// Current generation of a resource type
    ///
    /// Capture it before reading the store and hand it to
    /// [`insert_if_current`](Self::insert_if_current).
    pub fn generation(&self, resource: &str) -> u64 {
        self.state
            .read()
            .map(|state| state.generations.get(resource).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Store a read result unless the resource was invalidated since
    /// `generation` was captured. Returns whether the entry was stored.
    pub fn insert_if_current(
        &self,
        resource: &str,
        key: String,
        generation: u64,
        value: CachedRead,
    ) -> bool {
        let Ok(mut state) = self.state.write() else {
            return false;
        };
        if state.generations.get(resource).copied().unwrap_or(0) != generation {
            tracing::trace!(key = %key, "stale read not cached");
            return false;
        }
        let ttl = self.ttl;
        state
            .entries
            .retain(|_, entry| entry.stored_at.elapsed() <= ttl);
        state.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
        true
    }

    /// Drop all entries of a resource type and bump its generation
    pub fn invalidate(&self, resource: &str) {
        let prefix = format!("{}:", resource);
        if let Ok(mut state) = self.state.write() {
            *state.generations.entry(resource.to_string()).or_insert(0) += 1;
            state.entries.retain(|key, _| !key.starts_with(&prefix));
        }
    }

    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
