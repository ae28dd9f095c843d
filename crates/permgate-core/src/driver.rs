//! Key-value driver seam between [`RemoteLookup`](crate::RemoteLookup) and
//! the store.
//!
//! [`RedisDriver`] is the production implementation over a `deadpool-redis`
//! pool. Tests substitute an in-memory driver.

use async_trait::async_trait;
use deadpool_redis::{Pool, PoolConfig, Runtime};
use redis::IntoConnectionInfo;

use crate::config::RedisSettings;
use crate::error::{PermError, PermResult};
use crate::record::pair_fields;

/// The handful of store reads the lookup path needs.
///
/// Every method reports protocol or connection failures as
/// [`PermError::Transport`]. A reply that arrives intact but cannot be
/// decoded (e.g. non-UTF-8 bytes) is a [`PermError::Decode`].
#[async_trait]
pub trait KvDriver: Send + Sync {
    /// Liveness probe.
    async fn ping(&self) -> PermResult<()>;

    /// Raw text of the store's replication info section.
    async fn replication_info(&self) -> PermResult<String>;

    /// All field/value pairs of the hash stored under `key`.
    ///
    /// A missing key yields an empty vector. A key holding a non-hash value
    /// yields an error.
    async fn hash_fields(&self, key: &str) -> PermResult<Vec<(String, String)>>;

    /// The plain string stored under `key`, `None` if the key is absent.
    async fn scalar(&self, key: &str) -> PermResult<Option<String>>;

    /// Release the underlying connections.
    ///
    /// Default implementation is a no-op.
    async fn close(&self) {}
}

/// Redis driver backed by a `deadpool-redis` connection pool.
pub struct RedisDriver {
    pool: Pool,
    addr: String,
}

impl RedisDriver {
    /// Parse the configured URL and build the pool.
    ///
    /// No connection is opened here; the first command does that.
    pub fn connect(settings: &RedisSettings) -> PermResult<Self> {
        let url = settings
            .url
            .as_deref()
            .ok_or_else(|| PermError::Config("redis.url is required".into()))?;

        let info = url
            .into_connection_info()
            .map_err(|e| PermError::Config(format!("error parsing redis url: {e}")))?;
        let addr = info.addr.to_string();
        tracing::debug!(addr = %addr, db = info.redis.db, "parsed redis url");

        let timeout = settings.timeout();
        let mut pool_config = PoolConfig::new(settings.pool_size);
        pool_config.timeouts.wait = Some(timeout);
        pool_config.timeouts.create = Some(timeout);
        pool_config.timeouts.recycle = Some(timeout);

        let mut redis_config = deadpool_redis::Config::from_url(url);
        redis_config.pool = Some(pool_config);

        let pool = redis_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| PermError::Config(format!("error creating redis pool for {addr}: {e}")))?;

        Ok(Self { pool, addr })
    }

    /// Host and port of the configured server, without credentials.
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl KvDriver for RedisDriver {
    async fn ping(&self) -> PermResult<()> {
        let mut conn = self.pool.get().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn replication_info(&self) -> PermResult<String> {
        let mut conn = self.pool.get().await?;
        let info: String = redis::cmd("INFO")
            .arg("replication")
            .query_async(&mut conn)
            .await?;
        Ok(info)
    }

    async fn hash_fields(&self, key: &str) -> PermResult<Vec<(String, String)>> {
        let mut conn = self.pool.get().await?;
        let flat: Vec<Vec<u8>> = redis::cmd("HGETALL")
            .arg(key)
            .query_async(&mut conn)
            .await?;
        pair_fields(flat)
            .map_err(|e| PermError::decode(key, format!("hash reply is not valid UTF-8: {e}")))
    }

    async fn scalar(&self, key: &str) -> PermResult<Option<String>> {
        let mut conn = self.pool.get().await?;
        let value: Option<Vec<u8>> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        value
            .map(String::from_utf8)
            .transpose()
            .map_err(|e| PermError::decode(key, format!("value is not valid UTF-8: {e}")))
    }

    async fn close(&self) {
        self.pool.close();
        tracing::debug!(addr = %self.addr, "redis pool closed");
    }
}
