//! Metric names and recording helpers.
//!
//! Recording goes through the `metrics` facade; without an installed
//! recorder every call is a no-op.

use metrics::counter;

/// Metric names as constants for consistency.
pub mod names {
    pub const CACHE_HITS_TOTAL: &str = "permgate_cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "permgate_cache_misses_total";
    pub const REMOTE_LOOKUPS_TOTAL: &str = "permgate_remote_lookups_total";
    pub const REMOTE_FALLBACKS_TOTAL: &str = "permgate_remote_fallbacks_total";
}

/// Record a local cache hit.
pub fn record_cache_hit() {
    counter!(names::CACHE_HITS_TOTAL).increment(1);
}

/// Record a local cache miss.
pub fn record_cache_miss() {
    counter!(names::CACHE_MISSES_TOTAL).increment(1);
}

/// Record a remote lookup by outcome ("hash", "legacy", "not_found", "error").
pub fn record_remote_lookup(outcome: &'static str) {
    counter!(names::REMOTE_LOOKUPS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record a fallback from the hash read to the legacy scalar read.
pub fn record_legacy_fallback() {
    counter!(names::REMOTE_FALLBACKS_TOTAL).increment(1);
}
