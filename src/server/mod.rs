//! Server module for building HTTP servers with auto-registered routes
//!
//! [`ServerBuilder`] mounts, for every registered resource type:
//! - `GET`/`POST /{collection}`
//! - `GET`/`PUT`/`DELETE /{collection}/{id}`
//!
//! plus `/health`.

pub mod builder;
pub mod conditional;
pub mod entity_registry;
pub mod handlers;
pub mod telemetry;

pub use builder::ServerBuilder;
pub use conditional::ConditionalHeaders;
pub use entity_registry::{EntityRegistry, ResourceRoutes, RouteContext};
pub use handlers::{TOTAL_COUNT_HEADER, resource_routes};
pub use telemetry::init_tracing;
