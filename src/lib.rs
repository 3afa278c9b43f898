//! ensearch: name and address search over a resolution service
//!
//! - [`core`]: query classification, profiles and the bulk contract
//! - [`client`]: caching HTTP client and the debounced search orchestrator
//! - [`server`]: axum reference backend over an in-memory directory

pub use ensearch_client as client;
pub use ensearch_core as core;
pub use ensearch_server as server;
