//! Error types for permission lookups.

use thiserror::Error;

/// Result type for permission lookups
pub type PermResult<T> = Result<T, PermError>;

/// Errors that can occur while initializing or querying the lookup path.
///
/// `Config`, `Connection` and `Topology` are startup failures and abort
/// initialization. The remaining variants are per-call outcomes returned to
/// the caller, which must never translate them into an allow or deny.
#[derive(Debug, Error)]
pub enum PermError {
    /// Malformed connection or service configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The store could not be reached or did not answer the liveness probe
    #[error("Connection error: {0}")]
    Connection(String),

    /// The replication info probe failed
    #[error("Topology error: {0}")]
    Topology(String),

    /// A single fetch attempt failed at the protocol level
    #[error("Transport error: {0}")]
    Transport(String),

    /// No record stored under the key
    #[error("No data found for key: {0}")]
    NotFound(String),

    /// A hash record was found but is missing a required field
    #[error("Decode error for key {key}: {message}")]
    Decode {
        /// The key whose record failed to decode.
        key: String,
        /// What was wrong with the record.
        message: String,
    },

    /// The caller cancelled the lookup while it was in flight
    #[error("Lookup cancelled")]
    Cancelled,

    /// The decision payload is neither "1" nor "0"
    #[error("Permission data invalid for key {key}: {payload:?}")]
    InvalidPayload {
        /// The key that was resolved.
        key: String,
        /// The payload that could not be mapped to a decision.
        payload: String,
    },
}

impl PermError {
    /// Creates a new `Decode` error.
    #[must_use]
    pub fn decode(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for errors that are fatal at startup.
    #[must_use]
    pub fn is_init_error(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Connection(_) | Self::Topology(_)
        )
    }

    /// Returns `true` if the key simply has no record.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<redis::RedisError> for PermError {
    fn from(err: redis::RedisError) -> Self {
        PermError::Transport(err.to_string())
    }
}

impl From<deadpool_redis::PoolError> for PermError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        PermError::Transport(format!("failed to get Redis connection: {err}"))
    }
}
