//! Pool configuration types

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// What a disabled pool does with `release`, `create_and_add` and `acquire`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisabledPolicy {
    /// Log an error and carry on without signalling the caller.
    #[default]
    Log,
    /// Fail the call with [`Error::PoolDisabled`].
    Reject,
}

impl fmt::Display for DisabledPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Log => write!(f, "log"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// Configuration for a [`BoundedPool`](crate::BoundedPool).
///
/// This is the serializable half of a pool. A live pool is never serialized:
/// export it with [`BoundedPool::config`](crate::BoundedPool::config) and
/// rebuild with [`BoundedPool::new`](crate::BoundedPool::new).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Label used in logs and errors
    pub name: String,
    /// Maximum number of resources the pool tracks (idle plus checked out)
    pub capacity: usize,
    /// Resources created eagerly when the pool is constructed
    pub min_idle: usize,
    /// How long `acquire` waits; `None` waits forever, logging every `wait_window`
    #[serde(with = "humantime_serde")]
    pub acquire_timeout: Option<Duration>,
    /// Length of one wait iteration inside `acquire`
    #[serde(with = "humantime_serde")]
    pub wait_window: Duration,
    /// Passed through to the factory, not interpreted by the pool
    #[serde(with = "humantime_serde")]
    pub construct_timeout: Option<Duration>,
    /// Behavior of operations attempted while the pool is disabled
    pub disabled_policy: DisabledPolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: "pool".to_string(),
            capacity: 10,
            min_idle: 0,
            acquire_timeout: None,
            wait_window: Duration::from_secs(60),
            construct_timeout: None,
            disabled_policy: DisabledPolicy::Log,
        }
    }
}

impl PoolConfig {
    /// Default configuration with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the capacity
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the number of resources created at construction
    #[must_use]
    pub fn with_min_idle(mut self, min_idle: usize) -> Self {
        self.min_idle = min_idle;
        self
    }

    /// Bound `acquire` by a deadline
    #[must_use]
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    /// Set the wait/log window used while `acquire` blocks
    #[must_use]
    pub fn with_wait_window(mut self, window: Duration) -> Self {
        self.wait_window = window;
        self
    }

    /// Set the construction timeout passed to the factory
    #[must_use]
    pub fn with_construct_timeout(mut self, timeout: Duration) -> Self {
        self.construct_timeout = Some(timeout);
        self
    }

    /// Set the disabled-state policy
    #[must_use]
    pub fn with_disabled_policy(mut self, policy: DisabledPolicy) -> Self {
        self.disabled_policy = policy;
        self
    }

    /// Validate pool configuration, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::InvalidCapacity {
                capacity: self.capacity,
            });
        }
        if self.min_idle > self.capacity {
            return Err(Error::configuration(format!(
                "min_idle ({}) must not exceed capacity ({})",
                self.min_idle, self.capacity
            )));
        }
        if self.wait_window.is_zero() {
            return Err(Error::configuration(
                "wait_window must be greater than zero",
            ));
        }
        Ok(())
    }
}
