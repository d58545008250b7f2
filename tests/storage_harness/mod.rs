//! Shared test harness for storage backend testing
//!
//! Provides services wired to any `ResourceStore`, request-body fixtures for
//! the grading-period scenario (a school, a grading period descriptor and the
//! period itself), and the contract suites.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//! use storage_harness::*;
//!
//! store_contract_tests!(Arc::new(InMemoryStore::new()) as Arc<dyn ResourceStore>);
//! ```

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use eduapi::config::ApiConfig;
use eduapi::core::cache::{CacheKeyMode, ResponseCache};
use eduapi::core::error::ApiResult;
use eduapi::core::field::FieldValue;
use eduapi::core::query::{Condition, Page, QueryOptions};
use eduapi::core::resource::{Document, ResourceDescriptor};
use eduapi::core::selection::FieldSelector;
use eduapi::core::service::{ListLimits, ResourceService};
use eduapi::core::store::{ResourceStore, StoreTransaction};
use eduapi::entities::{
    self, Descriptor, DescriptorInput, GradingPeriod, GradingPeriodInput, School, SchoolInput,
    Staff, StaffInput, User, UserInput,
};
use eduapi::server::ServerBuilder;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use uuid::Uuid;

#[macro_use]
pub mod store_contract_tests;
#[macro_use]
pub mod rest_tests;

pub const SCHOOL_ID: i64 = 255901001;
pub const PERIOD_NAMESPACE: &str = "uri://ed-fi.org/GradingPeriodDescriptor";
pub const PERIOD_CODE: &str = "First Six Weeks";
pub const PERIOD_DESCRIPTOR: &str = "uri://ed-fi.org/GradingPeriodDescriptor#First Six Weeks";

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

/// One service per resource type used by the suites, all over the same store
pub struct Services {
    pub store: Arc<dyn ResourceStore>,
    pub descriptors: ResourceService<Descriptor>,
    pub schools: ResourceService<School>,
    pub periods: ResourceService<GradingPeriod>,
    pub staff: ResourceService<Staff>,
    pub users: ResourceService<User>,
}

pub fn services(store: Arc<dyn ResourceStore>) -> Services {
    let selector = Arc::new(FieldSelector::from_descriptors(entities::catalogue()));
    let cache = Some(Arc::new(ResponseCache::new(
        Duration::from_secs(60),
        CacheKeyMode::PerQuery,
    )));
    let limits = ListLimits {
        default_limit: 25,
        max_limit: 500,
    };

    Services {
        descriptors: ResourceService::new(store.clone(), selector.clone(), cache.clone(), limits),
        schools: ResourceService::new(store.clone(), selector.clone(), cache.clone(), limits),
        periods: ResourceService::new(store.clone(), selector.clone(), cache.clone(), limits),
        staff: ResourceService::new(store.clone(), selector.clone(), cache.clone(), limits),
        users: ResourceService::new(store.clone(), selector, cache, limits),
        store,
    }
}

/// Full router with every built-in resource type over `store`
pub fn build_router(store: Arc<dyn ResourceStore>) -> axum::Router {
    entities::register_all(ServerBuilder::new(ApiConfig::default()))
        .with_shared_store(store)
        .build()
        .expect("router should build")
}

// ---------------------------------------------------------------------------
// Gated store
// ---------------------------------------------------------------------------

/// Store wrapper that can hold one read between the store access and its
/// return, so a test can commit a write in that window
pub struct GatedStore {
    inner: Arc<dyn ResourceStore>,
    armed: AtomicBool,
    read_done: Notify,
    release: Notify,
}

impl GatedStore {
    pub fn new(inner: Arc<dyn ResourceStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            armed: AtomicBool::new(false),
            read_done: Notify::new(),
            release: Notify::new(),
        })
    }

    /// Hold the next `find_all` or `find_by_id`
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Wait until the held read has fetched its result
    pub async fn wait_for_read(&self) {
        self.read_done.notified().await;
    }

    /// Let the held read return
    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn gate(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.read_done.notify_one();
            self.release.notified().await;
        }
    }
}

#[async_trait]
impl ResourceStore for GatedStore {
    fn backend(&self) -> &'static str {
        self.inner.backend()
    }

    async fn find_all(
        &self,
        descriptor: &'static ResourceDescriptor,
        conditions: &[Condition],
        options: &QueryOptions,
        include_deleted: bool,
    ) -> ApiResult<Page<Document>> {
        let page = self
            .inner
            .find_all(descriptor, conditions, options, include_deleted)
            .await?;
        self.gate().await;
        Ok(page)
    }

    async fn find_by_id(
        &self,
        descriptor: &'static ResourceDescriptor,
        id: Uuid,
    ) -> ApiResult<Option<Document>> {
        let found = self.inner.find_by_id(descriptor, id).await?;
        self.gate().await;
        Ok(found)
    }

    async fn find_by_natural_key(
        &self,
        descriptor: &'static ResourceDescriptor,
        key: &[FieldValue],
    ) -> ApiResult<Option<Document>> {
        self.inner.find_by_natural_key(descriptor, key).await
    }

    async fn begin(&self) -> ApiResult<Box<dyn StoreTransaction>> {
        self.inner.begin().await
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("fixture date")
}

pub fn school_input(school_id: i64) -> SchoolInput {
    SchoolInput {
        school_id,
        name_of_institution: format!("School {}", school_id),
        short_name_of_institution: None,
        local_education_agency_id: Some(255901),
    }
}

pub fn descriptor_input(namespace: &str, code_value: &str) -> DescriptorInput {
    DescriptorInput {
        namespace: namespace.to_string(),
        code_value: code_value.to_string(),
        short_description: code_value.to_string(),
        description: None,
        effective_begin_date: None,
        effective_end_date: None,
    }
}

pub fn period_input(begin: &str, end: &str) -> GradingPeriodInput {
    GradingPeriodInput {
        grading_period_descriptor: PERIOD_DESCRIPTOR.to_string(),
        period_sequence: 1,
        school_id: SCHOOL_ID,
        school_year: 2025,
        begin_date: date(begin),
        end_date: date(end),
        total_instructional_days: 29,
    }
}

pub fn staff_input(staff_unique_id: &str) -> StaffInput {
    StaffInput {
        staff_unique_id: staff_unique_id.to_string(),
        first_name: "Ada".to_string(),
        last_surname: "Lovelace".to_string(),
        electronic_mail_address: Some("ada@grandbend.edu".to_string()),
        hire_date: None,
    }
}

pub fn user_input(username: &str) -> UserInput {
    UserInput {
        username: username.to_string(),
        email: format!("{}@grandbend.edu", username),
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        staff_unique_id: None,
    }
}

/// Create the school and the grading period descriptor a period points to
pub async fn seed_period_references(services: &Services) {
    services
        .schools
        .create(None, school_input(SCHOOL_ID), None)
        .await
        .expect("seed school");
    services
        .descriptors
        .create(None, descriptor_input(PERIOD_NAMESPACE, PERIOD_CODE), None)
        .await
        .expect("seed descriptor");
}
