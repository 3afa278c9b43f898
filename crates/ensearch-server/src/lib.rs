//! ensearch-server: reference resolution backend
//!
//! Serves point lookups, bulk lookups (whole or as a server-sent event
//! stream) and discovery search over an in-memory profile directory loaded
//! from JSON. The directory can be reloaded without a restart through
//! `POST /admin/reload`.

pub mod config;
pub mod directory;
pub mod error;
pub mod metrics;
pub mod resolver;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use directory::Directory;
pub use error::{Result, ServerError};
pub use metrics::init_prometheus_recorder;
pub use resolver::ProfileResolver;
pub use routes::{
    create_admin_router, create_public_router, create_router, create_router_with_metrics,
    HealthResponse, StreamEntry,
};
pub use state::{create_shared_state, ReloadResult, ServerState, SharedState};
