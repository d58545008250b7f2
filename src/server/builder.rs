//! ServerBuilder for fluent API to build HTTP servers

use super::entity_registry::{EntityRegistry, RouteContext};
use super::handlers::TOTAL_COUNT_HEADER;
use crate::config::ApiConfig;
use crate::core::cache::ResponseCache;
use crate::core::resource::ResourceRules;
use crate::core::selection::FieldSelector;
use crate::core::service::ListLimits;
use crate::core::store::ResourceStore;
use anyhow::Result;
use axum::http::header;
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Builder for creating HTTP servers with auto-registered routes
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new(ApiConfig::default())
///     .with_store(InMemoryStore::new())
///     .register::<GradingPeriod>()
///     .build()?;
/// ```
pub struct ServerBuilder {
    config: ApiConfig,
    store: Option<Arc<dyn ResourceStore>>,
    entity_registry: EntityRegistry,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            store: None,
            entity_registry: EntityRegistry::new(),
            custom_routes: Vec::new(),
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Set the resource store (required)
    pub fn with_store(self, store: impl ResourceStore + 'static) -> Self {
        self.with_shared_store(Arc::new(store))
    }

    pub fn with_shared_store(mut self, store: Arc<dyn ResourceStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Add routes that don't fit the resource CRUD pattern
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Expose a resource type under `/{collection}`
    pub fn register<R: ResourceRules>(mut self) -> Self {
        self.entity_registry.register_type::<R>();
        self
    }

    /// Build the final REST router
    ///
    /// This generates:
    /// - CRUD routes for all registered resource types
    /// - `/health`
    /// - request tracing and CORS layers
    pub fn build(self) -> Result<Router> {
        self.config.validate()?;

        let store = self
            .store
            .ok_or_else(|| anyhow::anyhow!("ResourceStore is required. Call .with_store()"))?;
        if self.entity_registry.resource_names().is_empty() {
            tracing::warn!("no resource types registered");
        }

        let selector = Arc::new(FieldSelector::from_descriptors(
            self.entity_registry.descriptors(),
        ));
        let cache_config = &self.config.cache;
        let cache = cache_config
            .enabled
            .then(|| Arc::new(ResponseCache::new(cache_config.ttl(), cache_config.key_mode)));

        let context = RouteContext {
            store: store.clone(),
            selector,
            cache,
        };
        let config = &self.config;
        let resource_routes = self.entity_registry.build_routes(&context, |descriptor| {
            ListLimits {
                default_limit: config.default_limit_for(descriptor.name, descriptor.default_limit),
                max_limit: config.pagination.max_limit,
            }
        });

        tracing::info!(
            backend = store.backend(),
            resources = ?self.entity_registry.resource_names(),
            cache = config.cache.enabled,
            "router built"
        );

        let app = self
            .custom_routes
            .into_iter()
            .fold(health_routes().merge(resource_routes), |app, routes| app.merge(routes));

        Ok(app.layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer()),
        ))
    }

    /// Serve the application with graceful shutdown
    ///
    /// Binds to `server.bind_address` and stops on SIGTERM or Ctrl+C.
    pub async fn serve(self) -> Result<()> {
        let addr = self.config.server.bind_address.clone();
        let app = self.build()?;
        let listener = TcpListener::bind(&addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

fn health_routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "eduapi"
    }))
}

/// Browsers may read the version and paging headers
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([header::ETAG, header::LOCATION, TOTAL_COUNT_HEADER])
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
