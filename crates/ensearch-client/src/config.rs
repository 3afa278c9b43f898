//! Client and orchestrator configuration

use std::time::Duration;

/// Default resolution service location
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Default social graph service location
pub const DEFAULT_SOCIAL_URL: &str = "https://api.ethfollow.xyz";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the resolution service
    pub base_url: String,
    /// Base URL of the social graph service
    pub social_url: String,
    /// How long search results stay fresh
    pub search_ttl: Duration,
    /// How long point lookups stay fresh
    pub profile_ttl: Duration,
    /// How long social stats stay fresh
    pub social_ttl: Duration,
    /// How long an unread cache entry is kept before it is dropped
    pub cache_retention: Duration,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            social_url: DEFAULT_SOCIAL_URL.to_string(),
            search_ttl: Duration::from_secs(10),
            profile_ttl: Duration::from_secs(5 * 60),
            social_ttl: Duration::from_secs(5 * 60),
            cache_retention: Duration::from_secs(5 * 60),
            timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `ENSEARCH_API_URL` and `ENSEARCH_SOCIAL_URL`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("ENSEARCH_API_URL") {
            config.base_url = url;
        }
        if let Ok(url) = std::env::var("ENSEARCH_SOCIAL_URL") {
            config.social_url = url;
        }
        config
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Quiet period after the last keystroke before a query settles
    pub debounce: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
        }
    }
}
