//! Two-tier resolver: local cache first, remote store on miss.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::cache::{CacheSweeper, LocalCache};
use crate::config::PermgateConfig;
use crate::decision::Decision;
use crate::error::PermResult;
use crate::remote::RemoteLookup;

/// Composes a [`LocalCache`] with a [`RemoteLookup`].
///
/// Only successful remote lookups populate the cache; errors, including
/// not-found, are never cached. Dropping the resolver stops its sweeper.
pub struct Resolver {
    cache: Arc<LocalCache>,
    remote: RemoteLookup,
    sweeper: Option<CacheSweeper>,
}

impl Resolver {
    /// Compose an existing cache and lookup. No sweeper is started.
    pub fn new(cache: Arc<LocalCache>, remote: RemoteLookup) -> Self {
        Self {
            cache,
            remote,
            sweeper: None,
        }
    }

    /// Create a fresh cache with `ttl` and start its sweeper.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_sweeper(remote: RemoteLookup, ttl: Duration, sweep_interval: Duration) -> Self {
        let cache = Arc::new(LocalCache::new(ttl));
        let sweeper = CacheSweeper::start(Arc::clone(&cache), sweep_interval);
        Self {
            cache,
            remote,
            sweeper: Some(sweeper),
        }
    }

    /// Connect to the configured store and build a resolver with a running
    /// sweeper.
    pub async fn connect(config: &PermgateConfig) -> PermResult<Self> {
        config.validate()?;
        let remote = RemoteLookup::connect(&config.redis).await?;
        Ok(Self::with_sweeper(
            remote,
            config.cache.ttl(),
            config.cache.sweep_interval(),
        ))
    }

    /// Resolve `key` to its decision payload.
    pub async fn resolve(&self, cancel: &CancellationToken, key: &str) -> PermResult<String> {
        if let Some(value) = self.cache.get(key) {
            tracing::debug!(key = %key, "cache hit");
            return Ok(value);
        }

        let value = self.remote.get(cancel, key).await?;
        self.cache.set(key, value.clone());
        Ok(value)
    }

    /// Resolve `key` and map the payload to a [`Decision`].
    pub async fn decide(&self, cancel: &CancellationToken, key: &str) -> PermResult<Decision> {
        let payload = self.resolve(cancel, key).await?;
        Decision::from_payload(key, &payload)
    }

    pub fn cache(&self) -> &Arc<LocalCache> {
        &self.cache
    }

    pub fn remote(&self) -> &RemoteLookup {
        &self.remote
    }

    /// Stop the sweeper and close the store connections.
    pub async fn shutdown(mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.shutdown().await;
        }
        self.remote.close().await;
    }
}
