//! Remote permission lookup against the key-value store.
//!
//! ## Lookup Order
//!
//! ```text
//! HGETALL key ──ok, fields──→ decode ──→ data | Decode error
//!     │        └─ok, empty──→ NotFound
//!     └─transport error──→ GET key ──→ raw value | NotFound | Transport error
//! ```
//!
//! Records written before the hash schema existed are plain strings; a hash
//! read against them fails with a wrong-type error, which is what routes them
//! to the legacy read. Any other transport failure of the hash read takes the
//! same route. A hash reply that arrives but cannot be decoded does not.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::RedisSettings;
use crate::driver::{KvDriver, RedisDriver};
use crate::error::{PermError, PermResult};
use crate::metrics;
use crate::record::{HashShape, decode_hash};

const CONNECTED_REPLICAS_FIELD: &str = "connected_slaves:";

/// Resolves keys to decision payloads against the remote store.
///
/// Owns the driver handle; clones share it.
#[derive(Clone)]
pub struct RemoteLookup {
    driver: Arc<dyn KvDriver>,
    replicas: u32,
}

impl std::fmt::Debug for RemoteLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteLookup")
            .field("replicas", &self.replicas)
            .finish_non_exhaustive()
    }
}

impl RemoteLookup {
    /// Build a Redis driver from settings and initialize a lookup over it.
    pub async fn connect(settings: &RedisSettings) -> PermResult<Self> {
        let driver = RedisDriver::connect(settings)?;
        tracing::info!(addr = %driver.addr(), "Connecting to Redis");
        Self::init(Arc::new(driver)).await
    }

    /// Probe the store and take ownership of the driver.
    ///
    /// Runs a liveness probe and the replication topology probe. If either
    /// fails the driver is closed before the error is returned.
    pub async fn init(driver: Arc<dyn KvDriver>) -> PermResult<Self> {
        if let Err(e) = driver.ping().await {
            driver.close().await;
            return Err(PermError::Connection(format!("error connecting to redis: {e}")));
        }

        tracing::debug!("checking redis replica connections");
        let replicas = match Self::probe_replicas(driver.as_ref()).await {
            Ok(replicas) => replicas,
            Err(e) => {
                driver.close().await;
                return Err(e);
            }
        };

        tracing::info!(replicas, "redis lookup initialized");
        Ok(Self { driver, replicas })
    }

    async fn probe_replicas(driver: &dyn KvDriver) -> PermResult<u32> {
        let info = driver
            .replication_info()
            .await
            .map_err(|e| PermError::Topology(format!("error getting connected replicas: {e}")))?;
        parse_connected_replicas(&info).map_err(PermError::Topology)
    }

    /// Number of replicas connected when the lookup was initialized.
    ///
    /// Diagnostic only.
    pub fn replicas(&self) -> u32 {
        self.replicas
    }

    /// Resolve `key` to its decision payload.
    ///
    /// Returns [`PermError::Cancelled`] as soon as `cancel` fires, even if a
    /// store read is in flight. No retries are attempted.
    pub async fn get(&self, cancel: &CancellationToken, key: &str) -> PermResult<String> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(key = %key, "remote lookup cancelled");
                Err(PermError::Cancelled)
            }
            result = self.fetch(key) => result,
        }
    }

    async fn fetch(&self, key: &str) -> PermResult<String> {
        tracing::debug!(key = %key, "getting key from redis");

        let fields = match self.driver.hash_fields(key).await {
            Ok(fields) => fields,
            Err(e @ PermError::Decode { .. }) => {
                metrics::record_remote_lookup("error");
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "hash read failed, falling back to plain read");
                metrics::record_legacy_fallback();
                return self.legacy_get(key).await;
            }
        };

        match decode_hash(&fields) {
            HashShape::Decoded(record) => {
                tracing::debug!(key = %key, data = %record.data, version = %record.version, "key found in redis");
                metrics::record_remote_lookup("hash");
                Ok(record.data)
            }
            HashShape::Empty => {
                metrics::record_remote_lookup("not_found");
                Err(PermError::NotFound(key.to_string()))
            }
            HashShape::Malformed { missing } => {
                metrics::record_remote_lookup("error");
                Err(PermError::decode(
                    key,
                    format!("required hash field '{missing}' not found"),
                ))
            }
        }
    }

    async fn legacy_get(&self, key: &str) -> PermResult<String> {
        tracing::debug!(key = %key, "getting key from redis in plain mode");

        match self.driver.scalar(key).await {
            Ok(Some(data)) => {
                tracing::debug!(key = %key, data = %data, "key found in redis");
                metrics::record_remote_lookup("legacy");
                Ok(data)
            }
            Ok(None) => {
                metrics::record_remote_lookup("not_found");
                Err(PermError::NotFound(key.to_string()))
            }
            Err(e) => {
                metrics::record_remote_lookup("error");
                Err(e)
            }
        }
    }

    /// Close the driver's connections.
    pub async fn close(&self) {
        self.driver.close().await;
    }
}

/// Extract the connected replica count from replication info text.
///
/// A missing line counts as zero replicas; an unparsable count is an error.
pub fn parse_connected_replicas(info: &str) -> Result<u32, String> {
    for line in info.lines() {
        if let Some(count) = line.trim().strip_prefix(CONNECTED_REPLICAS_FIELD) {
            return count
                .trim()
                .parse::<u32>()
                .map_err(|e| format!("invalid replica count {count:?}: {e}"));
        }
    }
    Ok(0)
}
