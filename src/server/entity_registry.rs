//! Registry of exposed resource types and their route factories

use crate::core::cache::ResponseCache;
use crate::core::resource::{ResourceDescriptor, ResourceRules};
use crate::core::selection::FieldSelector;
use crate::core::service::{ListLimits, ResourceService};
use crate::core::store::ResourceStore;
use crate::server::handlers::resource_routes;
use axum::Router;
use indexmap::IndexMap;
use std::marker::PhantomData;
use std::sync::Arc;

/// Shared pieces every resource router is built from
#[derive(Clone)]
pub struct RouteContext {
    pub store: Arc<dyn ResourceStore>,
    pub selector: Arc<FieldSelector>,
    pub cache: Option<Arc<ResponseCache>>,
}

/// Describes how to build the routes of one resource type
pub trait ResourceRoutes: Send + Sync {
    fn descriptor(&self) -> &'static ResourceDescriptor;

    /// Build the CRUD router with the given listing limits
    fn build_routes(&self, context: &RouteContext, limits: ListLimits) -> Router;
}

/// Route factory for a concrete resource type
pub struct TypedRoutes<R>(PhantomData<fn() -> R>);

impl<R> Default for TypedRoutes<R> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<R: ResourceRules> ResourceRoutes for TypedRoutes<R> {
    fn descriptor(&self) -> &'static ResourceDescriptor {
        R::descriptor()
    }

    fn build_routes(&self, context: &RouteContext, limits: ListLimits) -> Router {
        let service = ResourceService::<R>::new(
            context.store.clone(),
            context.selector.clone(),
            context.cache.clone(),
            limits,
        );
        resource_routes(Arc::new(service))
    }
}

/// Registered resource types in registration order
///
/// Registering a collection name twice replaces the earlier entry.
#[derive(Default)]
pub struct EntityRegistry {
    entries: IndexMap<&'static str, Box<dyn ResourceRoutes>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, routes: Box<dyn ResourceRoutes>) {
        self.entries.insert(routes.descriptor().name, routes);
    }

    /// Register a resource type by its Rust type
    pub fn register_type<R: ResourceRules>(&mut self) {
        self.register(Box::new(TypedRoutes::<R>::default()));
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &'static ResourceDescriptor> + '_ {
        self.entries.values().map(|routes| routes.descriptor())
    }

    /// Collection names in registration order
    pub fn resource_names(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }

    /// Merge the routers of every registered type
    pub fn build_routes(
        &self,
        context: &RouteContext,
        limits_for: impl Fn(&ResourceDescriptor) -> ListLimits,
    ) -> Router {
        self.entries
            .values()
            .fold(Router::new(), |router, routes| {
                let limits = limits_for(routes.descriptor());
                router.merge(routes.build_routes(context, limits))
            })
    }
}
