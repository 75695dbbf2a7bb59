//! Context handed to the resource factory

use std::fmt;
use std::time::Duration;

/// Why the pool is asking the factory for a new resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreateReason {
    /// Pre-filling `min_idle` resources while the pool is constructed.
    WarmUp,
    /// An acquirer found the idle store empty with capacity to spare.
    OnDemand,
    /// A caller invoked `create_and_add`.
    Explicit,
    /// Re-creating a resource parked by `disable`.
    Reenable,
}

impl fmt::Display for CreateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WarmUp => write!(f, "warm-up"),
            Self::OnDemand => write!(f, "on-demand"),
            Self::Explicit => write!(f, "explicit"),
            Self::Reenable => write!(f, "re-enable"),
        }
    }
}

/// Context for resource creation.
///
/// The pool does not interpret `construct_timeout`; it only passes it through
/// so factories can bound their own connect step.
#[derive(Debug, Clone)]
pub struct Context {
    /// Name of the pool requesting the resource.
    pub pool: String,
    /// Upper bound the factory should apply to a single `create` call.
    pub construct_timeout: Option<Duration>,
    /// Why the resource is being created.
    pub reason: CreateReason,
}

impl Context {
    /// Create a new context for `pool`.
    pub fn new(pool: impl Into<String>, reason: CreateReason) -> Self {
        Self {
            pool: pool.into(),
            construct_timeout: None,
            reason,
        }
    }

    /// Set the construction timeout passed to the factory.
    pub fn with_construct_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.construct_timeout = timeout;
        self
    }
}
