//! Host permission lookups with a local cache in front of Redis.
//!
//! ## Lookup Path
//!
//! ```text
//! resolve(key) → LocalCache ──hit──→ value
//!                    │
//!                   miss
//!                    ↓
//!              RemoteLookup → HGETALL (data + version) ──transport error──→ GET
//!                    ↓
//!              LocalCache.set(key, data) → value
//! ```
//!
//! The caller maps the returned payload with [`Decision::from_payload`]:
//! `"1"` allows, `"0"` denies, anything else is an error.

pub mod cache;
pub mod config;
pub mod decision;
pub mod driver;
pub mod error;
pub mod metrics;
pub mod observability;
pub mod record;
pub mod remote;
pub mod resolver;

pub use cache::{CacheStats, CacheSweeper, LocalCache};
pub use config::{CacheSettings, LookupSettings, PermgateConfig, RedisSettings};
pub use decision::{Decision, lookup_key};
pub use driver::{KvDriver, RedisDriver};
pub use error::{PermError, PermResult};
pub use observability::{init_tracing, init_tracing_with_level};
pub use record::{HashShape, RemoteRecord};
pub use remote::RemoteLookup;
pub use resolver::Resolver;

pub use tokio_util::sync::CancellationToken;
