//! Stale-while-revalidate cache with single-flight fetches
//!
//! ## Read path
//! 1. Fresh value → returned immediately
//! 2. Stale value → returned immediately, refresh spawned in the background
//!    (unless one is already running)
//! 3. No value → join the in-flight fetch for the key, or start one
//!
//! Concurrent readers of the same key never issue duplicate requests: they
//! all await the same shared future. Failed fetches are not cached; a stale
//! value survives a failed refresh.
//!
//! ## Retention
//! Entries not read for a whole retention window are dropped, checked at
//! most once per window on the read path. Keys whose only fetch failed
//! leave nothing behind.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;

use crate::error::Result;

/// How long an unread entry is kept when no retention is configured
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(5 * 60);

/// Which client operation a cache entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Search,
    Profile,
    SocialStats,
}

/// Cache key: operation plus normalized input
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: OperationKind,
    pub input: String,
}

impl CacheKey {
    /// Inputs are trimmed and lowercased so `Luc.eth ` and `luc.eth` share an entry
    pub fn new(kind: OperationKind, input: &str) -> Self {
        Self {
            kind,
            input: input.trim().to_lowercase(),
        }
    }
}

type SharedFetch<V> = Shared<BoxFuture<'static, Result<V>>>;

struct Stored<V> {
    value: V,
    inserted_at: Instant,
    read_at: Instant,
}

struct Slot<V> {
    value: Option<Stored<V>>,
    inflight: Option<SharedFetch<V>>,
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Self {
            value: None,
            inflight: None,
        }
    }
}

struct Inner<V> {
    slots: HashMap<CacheKey, Slot<V>>,
    last_sweep: Instant,
}

impl<V> Inner<V> {
    /// Drop slots with no fetch running whose value went unread for `retention`
    fn sweep(&mut self, now: Instant, retention: Duration) {
        if now.duration_since(self.last_sweep) < retention {
            return;
        }
        self.last_sweep = now;

        let before = self.slots.len();
        self.slots.retain(|_, slot| {
            slot.inflight.is_some()
                || slot
                    .value
                    .as_ref()
                    .is_some_and(|stored| now.duration_since(stored.read_at) < retention)
        });

        let evicted = before - self.slots.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.slots.len(), "Evicted idle cache entries");
        }
    }
}

type Shelf<V> = Arc<Mutex<Inner<V>>>;

pub struct StaleCache<V> {
    ttl: Duration,
    retention: Duration,
    inner: Shelf<V>,
}

impl<V> Clone for StaleCache<V> {
    fn clone(&self) -> Self {
        Self {
            ttl: self.ttl,
            retention: self.retention,
            inner: Arc::clone(&self.inner),
        }
    }
}

fn lock<V>(inner: &Shelf<V>) -> MutexGuard<'_, Inner<V>> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<V> StaleCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self::with_retention(ttl, DEFAULT_RETENTION)
    }

    /// Cache whose unread entries are dropped after `retention`
    pub fn with_retention(ttl: Duration, retention: Duration) -> Self {
        Self {
            ttl,
            retention,
            inner: Arc::new(Mutex::new(Inner {
                slots: HashMap::new(),
                last_sweep: Instant::now(),
            })),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Read `key`, fetching with `fetch` when there is no usable value.
    ///
    /// `fetch` is only called when a new request actually has to be issued.
    pub async fn get_or_fetch<F, Fut>(&self, key: CacheKey, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let shared = {
            let now = Instant::now();
            let mut inner = lock(&self.inner);
            inner.sweep(now, self.retention);
            let slot = inner.slots.entry(key.clone()).or_default();

            if let Some(stored) = slot.value.as_mut() {
                stored.read_at = now;
                let value = stored.value.clone();
                let stale = now.duration_since(stored.inserted_at) >= self.ttl;
                if stale && slot.inflight.is_none() {
                    tracing::debug!(kind = ?key.kind, input = %key.input, "Revalidating stale entry");
                    let refresh = self.start(key, fetch());
                    slot.inflight = Some(refresh.clone());
                    tokio::spawn(refresh);
                }
                return Ok(value);
            }

            if let Some(inflight) = slot.inflight.clone() {
                tracing::trace!(kind = ?key.kind, input = %key.input, "Joining in-flight fetch");
                inflight
            } else {
                let fetch = self.start(key, fetch());
                slot.inflight = Some(fetch.clone());
                fetch
            }
        };

        shared.await
    }

    /// Wrap a fetch so that its completion updates the slot
    fn start<Fut>(&self, key: CacheKey, fetch: Fut) -> SharedFetch<V>
    where
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        async move {
            let result = fetch.await;

            let mut inner = lock(&inner);
            match &result {
                Ok(value) => {
                    let now = Instant::now();
                    let slot = inner.slots.entry(key).or_default();
                    slot.inflight = None;
                    slot.value = Some(Stored {
                        value: value.clone(),
                        inserted_at: now,
                        read_at: now,
                    });
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Fetch failed, not caching");
                    let orphaned = match inner.slots.get_mut(&key) {
                        Some(slot) => {
                            slot.inflight = None;
                            slot.value.is_none()
                        }
                        None => false,
                    };
                    if orphaned {
                        inner.slots.remove(&key);
                    }
                }
            }

            result
        }
        .boxed()
        .shared()
    }

    /// Snapshot of the cached value, fresh or stale
    pub fn peek(&self, key: &CacheKey) -> Option<V> {
        lock(&self.inner)
            .slots
            .get(key)
            .and_then(|slot| slot.value.as_ref())
            .map(|stored| stored.value.clone())
    }

    /// Number of keys holding a value
    pub fn len(&self) -> usize {
        lock(&self.inner)
            .slots
            .values()
            .filter(|slot| slot.value.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        lock(&self.inner).slots.clear();
    }
}
