//! Error types for pool operations
use std::sync::Arc;

use thiserror::Error;

use crate::resource::ResourceId;

/// Boxed error returned by [`ResourceFactory`](crate::ResourceFactory) implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared error source; cloning an [`Error`] shares the same underlying failure.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type for pool operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for pool and registry operations.
///
/// `Clone` so the registry can replay a memoized construction failure to
/// every later caller; clones share the same `source`.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Capacity below the minimum of one
    #[error("Invalid pool capacity {capacity}: capacity must be at least 1")]
    InvalidCapacity {
        /// The rejected capacity
        capacity: usize,
    },

    /// Pool configuration is invalid
    #[error("Configuration error: {message}")]
    Configuration {
        /// The error message
        message: String,
    },

    /// The resource factory failed to create a resource
    #[error("Failed to construct resource for pool '{pool}': {source}")]
    Construction {
        /// The pool name
        pool: String,
        /// The factory error
        #[source]
        source: SharedError,
    },

    /// The resource is not currently idle in the pool
    #[error("Resource {id} is not idle in pool '{pool}'")]
    NotInPool {
        /// The pool name
        pool: String,
        /// The resource identity that was looked up
        id: ResourceId,
    },

    /// No resource became available before the deadline
    #[error("Acquire timed out after {timeout_ms}ms for pool '{pool}'")]
    AcquireTimeout {
        /// The pool name
        pool: String,
        /// The timeout in milliseconds
        timeout_ms: u64,
    },

    /// Operation attempted on a disabled pool under `DisabledPolicy::Reject`
    #[error("Pool '{pool}' is disabled, rejected {operation}")]
    PoolDisabled {
        /// The pool name
        pool: String,
        /// The rejected operation
        operation: &'static str,
    },
}

impl Error {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Wrap a factory error as a construction failure for `pool`.
    pub fn construction(pool: impl Into<String>, source: BoxError) -> Self {
        Self::Construction {
            pool: pool.into(),
            source: Arc::from(source),
        }
    }

    /// Check if this error is retryable.
    ///
    /// Construction failures are not retryable: the pool never retries them
    /// and the registry replays them until cleared.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::AcquireTimeout { .. })
    }

    /// Get the pool name associated with this error (if any)
    #[must_use]
    pub fn pool(&self) -> Option<&str> {
        match self {
            Self::InvalidCapacity { .. } | Self::Configuration { .. } => None,
            Self::Construction { pool, .. }
            | Self::NotInPool { pool, .. }
            | Self::AcquireTimeout { pool, .. }
            | Self::PoolDisabled { pool, .. } => Some(pool),
        }
    }

    /// The shared factory error behind a construction failure.
    #[must_use]
    pub fn construction_source(&self) -> Option<&SharedError> {
        match self {
            Self::Construction { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_shares_construction_source() {
        let err = Error::construction("db", "connection refused".into());
        let replay = err.clone();

        let (Some(a), Some(b)) = (err.construction_source(), replay.construction_source()) else {
            panic!("expected construction errors");
        };
        assert!(Arc::ptr_eq(a, b));
        assert_eq!(
            replay.to_string(),
            "Failed to construct resource for pool 'db': connection refused"
        );
    }

    #[test]
    fn only_timeouts_are_retryable() {
        let timeout = Error::AcquireTimeout {
            pool: "db".into(),
            timeout_ms: 10,
        };
        assert!(timeout.is_retryable());
        assert!(!Error::InvalidCapacity { capacity: 0 }.is_retryable());
        assert!(!Error::construction("db", "boom".into()).is_retryable());
    }

    #[test]
    fn pool_name_is_exposed() {
        let err = Error::NotInPool {
            pool: "cache".into(),
            id: ResourceId::new(7),
        };
        assert_eq!(err.pool(), Some("cache"));
        assert_eq!(Error::configuration("bad").pool(), None);
    }
}
