//! Server configuration

use ensearch_core::MAX_BULK;

/// Tunables for the resolution server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Maximum number of profiles returned by discovery search
    pub search_limit: usize,
    /// Maximum number of entries accepted in one bulk request
    pub bulk_limit: usize,
    /// Maximum number of requests handled concurrently
    pub max_concurrency: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            search_limit: 20,
            bulk_limit: MAX_BULK,
            max_concurrency: 256,
        }
    }
}
