//! Store client abstraction shared by every backend

/// Namespace prefix of every versioned entry key
pub const KEY_NAMESPACE: &str = "ip";

/// Builds the store key of `id` under generation `version`, e.g. `ip:v23:10.0.0.1`
#[must_use]
pub fn versioned_key(version: &str, id: &str) -> String {
    format!("{KEY_NAMESPACE}:{version}:{id}")
}

/// Result of a single `GET` against the store
///
/// Transport failures are values, not errors: callers decide how a
/// `TransientError` is accounted for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetOutcome {
    /// The key holds this value
    Found(String),
    /// The key does not exist (never written, expired or evicted)
    Absent,
    /// The lookup could not be completed (connection, timeout, protocol)
    TransientError(String),
}

impl GetOutcome {
    /// Returns the value if one was found and it is non-empty
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Found(v) if !v.is_empty() => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_transient_error(&self) -> bool {
        matches!(self, Self::TransientError(_))
    }
}

/// Read access to a key-value store
///
/// Implementations must be shareable across worker threads; every call may
/// block on network I/O.
pub trait StoreClient: Send + Sync {
    /// Looks up a single key
    fn get(&self, key: &str) -> GetOutcome;

    /// Looks up several keys, returning one outcome per key in order
    ///
    /// Backends that can pipeline requests override this; the default issues
    /// sequential `get` calls.
    fn get_many(&self, keys: &[String]) -> Vec<GetOutcome> {
        keys.iter().map(|k| self.get(k)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versioned_key() {
        assert_eq!(versioned_key("v23", "10.0.0.1"), "ip:v23:10.0.0.1");
        assert_eq!(versioned_key("v22", "203.0.113.7"), "ip:v22:203.0.113.7");
    }

    #[test]
    fn test_outcome_value() {
        assert_eq!(GetOutcome::Found("x".into()).value(), Some("x"));
        assert_eq!(GetOutcome::Found(String::new()).value(), None);
        assert_eq!(GetOutcome::Absent.value(), None);
        assert_eq!(GetOutcome::TransientError("down".into()).value(), None);
        assert!(GetOutcome::TransientError("down".into()).is_transient_error());
        assert!(!GetOutcome::Absent.is_transient_error());
    }
}
