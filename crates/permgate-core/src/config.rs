use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::cache::{MAX_SWEEP_INTERVAL, MAX_TTL, MIN_SWEEP_INTERVAL};
use crate::error::{PermError, PermResult};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PermgateConfig {
    /// Remote store connection
    #[serde(default)]
    pub redis: RedisSettings,
    /// Local decision cache
    #[serde(default)]
    pub cache: CacheSettings,
    /// Lookup key construction
    #[serde(default)]
    pub lookup: LookupSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PermgateConfig {
    pub fn validate(&self) -> PermResult<()> {
        match self.redis.url.as_deref() {
            None => return Err(PermError::Config("redis.url is required".into())),
            Some(url) if url.trim().is_empty() => {
                return Err(PermError::Config("redis.url must not be empty".into()));
            }
            Some(_) => {}
        }
        if self.redis.pool_size == 0 {
            return Err(PermError::Config("redis.pool_size must be > 0".into()));
        }
        if self.redis.timeout_ms == 0 {
            return Err(PermError::Config("redis.timeout_ms must be > 0".into()));
        }
        let max_ttl_secs = MAX_TTL.as_secs();
        if self.cache.ttl_secs > 0 && self.cache.ttl_secs as u64 > max_ttl_secs {
            return Err(PermError::Config(format!(
                "cache.ttl_secs must be <= {max_ttl_secs}"
            )));
        }
        let max_sweep_secs = MAX_SWEEP_INTERVAL.as_secs();
        if self.cache.sweep_interval_secs == 0 || self.cache.sweep_interval_secs > max_sweep_secs {
            return Err(PermError::Config(format!(
                "cache.sweep_interval_secs must be between 1 and {max_sweep_secs}"
            )));
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(PermError::Config(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }
        Ok(())
    }
}

/// Redis connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisSettings {
    /// Redis connection URL (e.g., "redis://:secret@localhost:6379/2").
    /// Required; there is no default.
    #[serde(default)]
    pub url: Option<String>,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in milliseconds
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    5000
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: None,
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

impl RedisSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// TTL of cached decisions in seconds. Zero or negative means the default.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: i64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_cache_ttl_secs() -> i64 {
    60
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        if self.ttl_secs > 0 {
            Duration::from_secs(self.ttl_secs as u64).min(MAX_TTL)
        } else {
            crate::cache::DEFAULT_TTL
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs).clamp(MIN_SWEEP_INTERVAL, MAX_SWEEP_INTERVAL)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupSettings {
    /// Prefix joined with the request host to build the lookup key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_key_prefix() -> String {
    "perm".into()
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::PermgateConfig;
    use crate::error::{PermError, PermResult};
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Load configuration from an optional TOML file plus environment overrides.
    ///
    /// Without an explicit path, `permgate.toml` in the working directory is
    /// used if it exists.
    pub fn load_config(path: Option<&str>) -> PermResult<PermgateConfig> {
        let cfg = load_unvalidated(path)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Same as [`load_config`] without running validation, so callers can
    /// apply overrides (e.g. command-line flags) first.
    pub fn load_unvalidated(path: Option<&str>) -> PermResult<PermgateConfig> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if !pathbuf.exists() {
                    return Err(PermError::Config(format!("config file not found: {p}")));
                }
                builder = builder.add_source(File::from(pathbuf));
            }
            None => {
                let default_path = PathBuf::from("permgate.toml");
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., PERMGATE__REDIS__URL=redis://...
        builder = builder.add_source(
            Environment::with_prefix("PERMGATE")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| PermError::Config(format!("config build error: {e}")))?;
        cfg.try_deserialize()
            .map_err(|e| PermError::Config(format!("config deserialize error: {e}")))
    }
}
