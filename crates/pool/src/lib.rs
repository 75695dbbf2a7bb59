//! # Nebula Pool
//!
//! Thread-safe, bounded, keyed resource pools.
//!
//! - [`BoundedPool`] hands out exclusive-use resources in LIFO order, never
//!   keeping more than `capacity` alive, and can be disabled and re-enabled.
//! - [`PoolRegistry`] memoizes one pool (or its construction failure) per key,
//!   constructing at most once per key under concurrent first access.
//! - [`Pools`] is the facade: it derives a key per call site when the caller
//!   does not supply one.
//!
//! Resources come from a [`ResourceFactory`]; the pool never looks inside them.
//!
//! ```
//! use nebula_pool::testing::CountingFactory;
//! use nebula_pool::{PoolConfig, Pools};
//!
//! let pools = Pools::new();
//! let config = PoolConfig::named("numbers").with_capacity(2);
//! let first = pools.acquire(Some("numbers"), CountingFactory::new(), config.clone())?;
//! assert_eq!(*first, 1);
//! drop(first);
//!
//! // Same key, same pool: the released resource is handed out again.
//! let again = pools.acquire(Some("numbers"), CountingFactory::new(), config)?;
//! assert_eq!(*again, 1);
//! # Ok::<(), nebula_pool::Error>(())
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod facade;
pub mod factory;
pub mod guard;
pub mod pool;
pub mod registry;
pub mod resource;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{DisabledPolicy, PoolConfig};
pub use context::{Context, CreateReason};
pub use error::{BoxError, Error, Result, SharedError};
pub use facade::{PoolKey, Pools};
pub use factory::ResourceFactory;
pub use guard::Checkout;
pub use pool::{Admission, BoundedPool, PoolState, PoolStats};
pub use registry::PoolRegistry;
pub use resource::{Pooled, ResourceId};
