//! HTTP client for the resolution service

use async_trait::async_trait;
use ensearch_core::{
    BulkEntry, BulkKind, BulkResponse, ErrorBody, Lookup, Profile, ResolutionOutcome, MAX_BULK,
};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::cache::{CacheKey, OperationKind, StaleCache};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::social::SocialStats;

/// The lookups the search orchestrator needs from a backend
#[async_trait]
pub trait Resolve: Send + Sync {
    /// Free-text search; no match is an empty vector, not an error
    async fn search(&self, term: &str) -> Result<Vec<Profile>>;

    /// Point lookup of a name or address
    async fn profile(&self, identifier: &str) -> Result<Profile>;
}

/// Caching client for search, point lookups, bulk lookups and social stats
#[derive(Clone)]
pub struct ResolutionClient {
    http: Client,
    config: ClientConfig,
    searches: StaleCache<Vec<Profile>>,
    profiles: StaleCache<Profile>,
    stats: StaleCache<SocialStats>,
}

impl ResolutionClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_http(http, config))
    }

    /// Client configured from `ENSEARCH_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env())
    }

    pub fn with_http(http: Client, config: ClientConfig) -> Self {
        Self {
            http,
            searches: StaleCache::with_retention(config.search_ttl, config.cache_retention),
            profiles: StaleCache::with_retention(config.profile_ttl, config.cache_retention),
            stats: StaleCache::with_retention(config.social_ttl, config.cache_retention),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Search the discovery index.
    ///
    /// Blank terms return an empty result without touching the network.
    pub async fn search(&self, term: &str) -> Result<Vec<Profile>> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let mut url = join(&self.config.base_url, &["v2", "discover", "search"])?;
        url.query_pairs_mut().append_pair("s", term);

        let http = self.http.clone();
        let what = term.to_string();
        self.searches
            .get_or_fetch(CacheKey::new(OperationKind::Search, term), move || {
                get_json(http, url, what)
            })
            .await
    }

    /// Point lookup of a name (`/n/`) or address (`/a/`).
    ///
    /// Inputs that are neither are rejected locally with `InvalidFormat`,
    /// blank inputs with `EmptyQuery`; no request is made for either.
    pub async fn profile(&self, identifier: &str) -> Result<Profile> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(ClientError::EmptyQuery);
        }

        let url = match Lookup::guess(identifier)? {
            Lookup::Name(name) => join(&self.config.base_url, &["n", &name])?,
            Lookup::Address(address) => join(&self.config.base_url, &["a", &address])?,
        };

        let http = self.http.clone();
        let what = identifier.to_string();
        self.profiles
            .get_or_fetch(CacheKey::new(OperationKind::Profile, identifier), move || {
                get_json(http, url, what)
            })
            .await
    }

    /// Single point lookup reduced to the other representation.
    ///
    /// "No such profile" answers come back as a tagged error outcome;
    /// only transport failures are `Err`.
    pub async fn resolve(&self, identifier: &str) -> Result<ResolutionOutcome> {
        let lookup = match Lookup::guess(identifier.trim()) {
            Ok(lookup) => lookup,
            Err(e) => return Ok(BulkEntry::Error(ErrorBody::from(e))),
        };

        match self.profile(identifier).await {
            Ok(profile) => Ok(ResolutionOutcome::from_lookup(&lookup, Ok(profile))),
            Err(e) if e.is_no_profile() => Ok(BulkEntry::Error(ErrorBody::from(&e))),
            Err(e) => Err(e),
        }
    }

    pub async fn bulk_names(&self, names: &[String]) -> Result<BulkResponse<ResolutionOutcome>> {
        self.bulk(BulkKind::Names, names).await
    }

    pub async fn bulk_addresses(
        &self,
        addresses: &[String],
    ) -> Result<BulkResponse<ResolutionOutcome>> {
        self.bulk(BulkKind::Addresses, addresses).await
    }

    pub async fn bulk_universal(
        &self,
        queries: &[String],
    ) -> Result<BulkResponse<ResolutionOutcome>> {
        self.bulk(BulkKind::Universal, queries).await
    }

    /// Bulk lookup, one outcome per input in input order.
    ///
    /// More than [`MAX_BULK`] inputs fail locally before any request is sent.
    pub async fn bulk(
        &self,
        kind: BulkKind,
        inputs: &[String],
    ) -> Result<BulkResponse<ResolutionOutcome>> {
        if inputs.len() > MAX_BULK {
            return Err(ClientError::TooManyInputs {
                count: inputs.len(),
                max: MAX_BULK,
            });
        }
        if inputs.is_empty() {
            return Ok(Vec::new().into());
        }

        let (path, param) = kind.route();
        let mut url = join(&self.config.base_url, &["bulk", path])?;
        {
            let mut pairs = url.query_pairs_mut();
            for input in inputs {
                pairs.append_pair(param, input);
            }
        }

        let wire: BulkResponse<BulkEntry<Profile>> =
            get_json(self.http.clone(), url, format!("bulk/{path}")).await?;

        if wire.response.len() != inputs.len() || wire.response_length != wire.response.len() {
            return Err(ClientError::InvalidResponse(format!(
                "bulk response has {} entries (length {}) for {} inputs",
                wire.response.len(),
                wire.response_length,
                inputs.len()
            )));
        }

        let outcomes: Vec<ResolutionOutcome> = inputs
            .iter()
            .zip(wire.response)
            .map(|(input, entry)| match kind.lookup(input) {
                Ok(lookup) => ResolutionOutcome::from_lookup(&lookup, entry.into()),
                Err(e) => BulkEntry::Error(ErrorBody::from(e)),
            })
            .collect();

        Ok(outcomes.into())
    }

    /// Follower counts from the social graph service.
    ///
    /// Failures are logged and reported as `None`; they never affect
    /// search or profile results.
    pub async fn social_stats(&self, identifier: &str) -> Option<SocialStats> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return None;
        }

        let url = match join(
            &self.config.social_url,
            &["api", "v1", "users", identifier, "stats"],
        ) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(error = %e, "Invalid social stats URL");
                return None;
            }
        };

        let http = self.http.clone();
        let what = identifier.to_string();
        let result = self
            .stats
            .get_or_fetch(CacheKey::new(OperationKind::SocialStats, identifier), move || {
                get_json(http, url, what)
            })
            .await;

        match result {
            Ok(stats) => Some(stats),
            Err(e) => {
                tracing::debug!(identifier, error = %e, "Social stats unavailable");
                None
            }
        }
    }
}

#[async_trait]
impl Resolve for ResolutionClient {
    async fn search(&self, term: &str) -> Result<Vec<Profile>> {
        ResolutionClient::search(self, term).await
    }

    async fn profile(&self, identifier: &str) -> Result<Profile> {
        ResolutionClient::profile(self, identifier).await
    }
}

/// Append path segments (percent-encoded) to a base URL
fn join(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| ClientError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn get_json<T: DeserializeOwned>(http: Client, url: Url, what: String) -> Result<T> {
    tracing::debug!(url = %url, "GET");
    let resp = http.get(url).send().await?;
    let resp = check_status(resp, &what).await?;
    Ok(resp.json().await?)
}

/// Map HTTP failures onto the error taxonomy
async fn check_status(resp: Response, what: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let message = resp
        .json::<ErrorBody>()
        .await
        .map(|body| body.error)
        .unwrap_or_default();

    Err(match status.as_u16() {
        404 => ClientError::NotFound(what.to_string()),
        400 if message.is_empty() => ClientError::InvalidFormat(what.to_string()),
        400 => ClientError::InvalidFormat(message),
        status => ClientError::Server { status, message },
    })
}

/// Builder for ResolutionClient
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            config: ClientConfig {
                base_url: base_url.into(),
                ..ClientConfig::default()
            },
        }
    }

    pub fn social_url(mut self, url: impl Into<String>) -> Self {
        self.config.social_url = url.into();
        self
    }

    pub fn search_ttl(mut self, ttl: std::time::Duration) -> Self {
        self.config.search_ttl = ttl;
        self
    }

    pub fn profile_ttl(mut self, ttl: std::time::Duration) -> Self {
        self.config.profile_ttl = ttl;
        self
    }

    pub fn social_ttl(mut self, ttl: std::time::Duration) -> Self {
        self.config.social_ttl = ttl;
        self
    }

    pub fn cache_retention(mut self, retention: std::time::Duration) -> Self {
        self.config.cache_retention = retention;
        self
    }

    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<ResolutionClient> {
        ResolutionClient::new(self.config)
    }
}
