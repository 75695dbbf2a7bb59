//! Pool facade with default key derivation

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use crate::config::PoolConfig;
use crate::error::Result;
use crate::factory::ResourceFactory;
use crate::guard::Checkout;
use crate::pool::BoundedPool;
use crate::registry::PoolRegistry;

/// Registry key used by [`Pools`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PoolKey {
    /// Key supplied by the caller.
    Named(String),
    /// Key derived from the factory type and the requesting call site.
    Derived {
        /// `std::any::type_name` of the factory.
        factory: &'static str,
        /// Source location of the call that asked for the pool.
        site: &'static Location<'static>,
    },
}

impl PoolKey {
    /// An explicit key.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Derive a key for factory type `F` from the caller's location.
    #[track_caller]
    #[must_use]
    pub fn derive<F: ResourceFactory>() -> Self {
        Self::Derived {
            factory: std::any::type_name::<F>(),
            site: Location::caller(),
        }
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::Derived { factory, site } => write!(f, "{factory}@{site}"),
        }
    }
}

/// Entry point composing a [`PoolRegistry`] with key derivation.
///
/// Callers that pass no key get one pool per call site and factory type, so
/// two unrelated call sites never share a pool by accident.
pub struct Pools<F: ResourceFactory> {
    registry: PoolRegistry<PoolKey, F>,
}

impl<F: ResourceFactory> Default for Pools<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ResourceFactory> fmt::Debug for Pools<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pools")
            .field("registry", &self.registry)
            .finish()
    }
}

impl<F: ResourceFactory> Pools<F> {
    /// Create a facade over an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: PoolRegistry::new(),
        }
    }

    /// The underlying registry.
    #[must_use]
    pub fn registry(&self) -> &PoolRegistry<PoolKey, F> {
        &self.registry
    }

    /// Get or construct the pool for `key`, deriving a key when `None`.
    ///
    /// `factory` and `config` are only used when the pool does not exist yet.
    #[track_caller]
    pub fn pool(
        &self,
        key: Option<&str>,
        factory: F,
        config: PoolConfig,
    ) -> Result<Arc<BoundedPool<F>>> {
        let key = match key {
            Some(name) => PoolKey::named(name),
            None => PoolKey::derive::<F>(),
        };
        self.registry.get_or_create_with(key, factory, config)
    }

    /// Check out a resource from the pool for `key`.
    #[track_caller]
    pub fn acquire(&self, key: Option<&str>, factory: F, config: PoolConfig) -> Result<Checkout<F>> {
        self.pool(key, factory, config)?.checkout()
    }

    /// Disable every live pool.
    pub fn disable_all(&self) {
        for pool in self.registry.pools() {
            pool.disable();
        }
    }

    /// Enable every live pool, returning the first re-creation failure.
    pub fn enable_all(&self) -> Result<()> {
        let mut first_error = None;
        for pool in self.registry.pools() {
            if let Err(error) = pool.enable() {
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Close idle resources in every live pool; entries stay registered.
    pub fn close_all(&self) {
        for pool in self.registry.pools() {
            pool.close_all();
        }
    }

    /// Close every pool and drop all entries, cached failures included.
    pub fn clear(&self) {
        self.registry.clear();
    }
}
