//! Process-local permission cache with a single default TTL.
//!
//! Entries expire lazily: a `get` that observes an expired entry removes it
//! and reports a miss. A [`CacheSweeper`] task additionally prunes expired
//! entries on a fixed interval so that keys which are never read again do
//! not accumulate.
//!
//! All access goes through one exclusive lock, reads included, because a
//! read may delete.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval_at};

use crate::metrics;

/// Default time-to-live for cached decisions.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Default cadence of the background sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Longest TTL an entry can carry. Larger TTLs are capped to this.
pub const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Shortest sweep cadence; shorter (including zero) intervals are raised to it.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Longest sweep cadence; longer intervals are lowered to it.
pub const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// A cached payload with its absolute expiry.
#[derive(Clone, Debug)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of entries currently stored, expired or not.
    pub size: usize,
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries removed because their TTL passed.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// In-memory key/value cache with a fixed default TTL.
///
/// Thread-safe; share it behind an `Arc`.
pub struct LocalCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl LocalCache {
    /// Create a cache whose entries live for `default_ttl` after each `set`.
    ///
    /// TTLs above [`MAX_TTL`] are capped.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl: default_ttl.min(MAX_TTL),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// The TTL stamped onto every entry.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Look up a key.
    ///
    /// Returns `None` if the key is absent or its entry has expired. An
    /// expired entry is removed before returning.
    pub fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let expired = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                metrics::record_cache_hit();
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.remove(key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(key = %key, "expired cache entry removed on read");
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::record_cache_miss();
        None
    }

    /// Insert or replace a value, stamping a fresh expiry.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let now = Instant::now();
        let expires_at = now
            .checked_add(self.default_ttl)
            .unwrap_or_else(|| now + DEFAULT_TTL);
        let entry = CacheEntry {
            value: value.into(),
            expires_at,
        };
        self.entries.lock().insert(key.into(), entry);
    }

    /// Remove a key. No-op if it is not present.
    pub fn delete(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    /// Remove every expired entry, leaving live ones untouched.
    ///
    /// Returns the number of entries removed.
    pub fn clear_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - entries.len();
        drop(entries);

        if removed > 0 {
            self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
        }
        removed
    }

    /// Number of stored entries, including expired ones not yet pruned.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache statistics for monitoring.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl Default for LocalCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

/// Background task that periodically calls [`LocalCache::clear_expired`].
///
/// The task stops when [`CacheSweeper::shutdown`] is awaited or when the
/// sweeper is dropped.
pub struct CacheSweeper {
    shutdown_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl CacheSweeper {
    /// Spawn the sweep loop on the current tokio runtime.
    ///
    /// The first sweep happens one full `every` after start. `every` is
    /// clamped to [`MIN_SWEEP_INTERVAL`]..=[`MAX_SWEEP_INTERVAL`].
    pub fn start(cache: Arc<LocalCache>, every: Duration) -> Self {
        let requested = every;
        let every = every.clamp(MIN_SWEEP_INTERVAL, MAX_SWEEP_INTERVAL);
        if every != requested {
            tracing::warn!(
                requested_ms = requested.as_millis() as u64,
                interval_ms = every.as_millis() as u64,
                "cache sweep interval out of range, clamped"
            );
        }

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let first_tick = tokio::time::Instant::now() + every;

        let handle = tokio::spawn(async move {
            tracing::debug!(interval_ms = every.as_millis() as u64, "cache sweeper started");

            let mut ticker = interval_at(first_tick, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = cache.clear_expired();
                        if removed > 0 {
                            tracing::debug!(removed, remaining = cache.len(), "swept expired cache entries");
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            tracing::debug!("cache sweeper stopped");
        });

        Self {
            shutdown_tx,
            handle: Some(handle),
        }
    }

    /// Whether the sweep task is still running.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal the task to stop and wait for it to exit.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "cache sweeper task failed");
            }
        }
    }
}

impl Drop for CacheSweeper {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}
