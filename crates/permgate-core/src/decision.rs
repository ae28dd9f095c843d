//! Mapping of decision payloads to allow/deny.

use std::fmt;

use crate::error::{PermError, PermResult};

/// An explicit permission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    /// Map a payload: `"1"` allows, `"0"` denies, anything else is invalid.
    ///
    /// Invalid payloads are errors rather than denials so that callers fail
    /// the request instead of guessing.
    pub fn from_payload(key: &str, payload: &str) -> PermResult<Self> {
        match payload {
            "1" => Ok(Decision::Allow),
            "0" => Ok(Decision::Deny),
            other => Err(PermError::InvalidPayload {
                key: key.to_string(),
                payload: other.to_string(),
            }),
        }
    }

    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Allow => f.write_str("allow"),
            Decision::Deny => f.write_str("deny"),
        }
    }
}

/// Build the lookup key for a request host: `"<prefix>/<host>"`.
///
/// The host is lowercased and any port suffix is dropped.
pub fn lookup_key(prefix: &str, host: &str) -> String {
    let host = strip_port(host.trim()).to_ascii_lowercase();
    format!("{prefix}/{host}")
}

fn strip_port(host: &str) -> &str {
    // Bracketed IPv6 literal, e.g. "[::1]:8443"
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split_once(']').map_or(host, |(addr, _)| addr);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') && port.chars().all(|c| c.is_ascii_digit()) => {
            name
        }
        _ => host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_payload() {
        assert_eq!(Decision::from_payload("k", "1").unwrap(), Decision::Allow);
        assert_eq!(Decision::from_payload("k", "0").unwrap(), Decision::Deny);
        assert!(matches!(
            Decision::from_payload("k", "yes"),
            Err(PermError::InvalidPayload { .. })
        ));
        assert!(Decision::from_payload("k", "").is_err());
    }

    #[test]
    fn test_lookup_key() {
        assert_eq!(lookup_key("perm", "Example.COM"), "perm/example.com");
        assert_eq!(lookup_key("perm", "example.com:8080"), "perm/example.com");
        assert_eq!(lookup_key("perm", "[::1]:8443"), "perm/::1");
        assert_eq!(lookup_key("perm", "::1"), "perm/::1");
    }
}
