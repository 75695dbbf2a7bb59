//! Keyed pool registry.
//!
//! `PoolRegistry<K, F>` memoizes one [`BoundedPool`] per key, or the error
//! that constructing it produced. Construction runs at most once per key
//! until [`clear`](PoolRegistry::clear), however many threads ask at once.
//! Callers only wait on builds of their own key.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::config::PoolConfig;
use crate::error::{Error, Result};
use crate::factory::ResourceFactory;
use crate::pool::BoundedPool;

/// A registry slot: a live pool or the failure that replaced it.
enum Entry<F: ResourceFactory> {
    Pool(Arc<BoundedPool<F>>),
    Failed(Error),
}

impl<F: ResourceFactory> Entry<F> {
    fn resolve(&self) -> Result<Arc<BoundedPool<F>>> {
        match self {
            Self::Pool(pool) => Ok(Arc::clone(pool)),
            // Replayed verbatim: a broken backend is not retried until `clear`.
            Self::Failed(error) => Err(error.clone()),
        }
    }
}

/// Process-wide cache of pools by key.
///
/// Hold one instance at the composition root and share it by reference or
/// `Arc`. The map is read without locking; a per-key construction lock is
/// only taken on a miss.
pub struct PoolRegistry<K, F: ResourceFactory> {
    entries: DashMap<K, Entry<F>>,
    /// Construction locks for keys with a build in flight.
    construction: DashMap<K, Arc<Mutex<()>>>,
}

impl<K, F> Default for PoolRegistry<K, F>
where
    K: Eq + Hash + Clone + fmt::Debug,
    F: ResourceFactory,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, F> fmt::Debug for PoolRegistry<K, F>
where
    K: Eq + Hash + Clone + fmt::Debug,
    F: ResourceFactory,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (pools, failed) = self.entries.iter().fold((0usize, 0usize), |(p, e), entry| {
            match entry.value() {
                Entry::Pool(_) => (p + 1, e),
                Entry::Failed(_) => (p, e + 1),
            }
        });
        f.debug_struct("PoolRegistry")
            .field("pools", &pools)
            .field("failed", &failed)
            .finish()
    }
}

impl<K, F> PoolRegistry<K, F>
where
    K: Eq + Hash + Clone + fmt::Debug,
    F: ResourceFactory,
{
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            construction: DashMap::new(),
        }
    }

    /// Get the pool for `key`, running `build` if no entry exists yet.
    ///
    /// A cached failure is returned again without calling `build`; the clone
    /// shares its source with the original error.
    pub fn get_or_create<B>(&self, key: K, build: B) -> Result<Arc<BoundedPool<F>>>
    where
        B: FnOnce() -> Result<BoundedPool<F>>,
    {
        if let Some(found) = self.get(&key) {
            return found;
        }

        let slot = Arc::clone(self.construction.entry(key.clone()).or_default().value());
        let _construction = slot.lock();
        // Another thread may have finished while we waited for the lock.
        if let Some(found) = self.get(&key) {
            return found;
        }

        let result = match build() {
            Ok(pool) => {
                let pool = Arc::new(pool);
                tracing::debug!(?key, pool = %pool.name(), "Registered pool");
                self.entries.insert(key.clone(), Entry::Pool(Arc::clone(&pool)));
                Ok(pool)
            }
            Err(error) => {
                tracing::warn!(?key, %error, "Pool construction failed, caching failure");
                self.entries.insert(key.clone(), Entry::Failed(error.clone()));
                Err(error)
            }
        };
        // The entry is in place, so later callers never reach the slot again;
        // ones already queued on it re-check and find the entry.
        self.construction.remove_if(&key, |_, current| Arc::ptr_eq(current, &slot));
        result
    }

    /// [`get_or_create`](Self::get_or_create) building with [`BoundedPool::new`].
    pub fn get_or_create_with(
        &self,
        key: K,
        factory: F,
        config: PoolConfig,
    ) -> Result<Arc<BoundedPool<F>>> {
        self.get_or_create(key, || BoundedPool::new(factory, config))
    }

    /// Look up `key` without constructing anything.
    pub fn get(&self, key: &K) -> Option<Result<Arc<BoundedPool<F>>>> {
        self.entries.get(key).map(|entry| entry.value().resolve())
    }

    /// Whether `key` has a pool or a cached failure.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries, failures included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys of all entries, failures included.
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// All live pools.
    #[must_use]
    pub fn pools(&self) -> Vec<Arc<BoundedPool<F>>> {
        self.entries
            .iter()
            .filter_map(|entry| match entry.value() {
                Entry::Pool(pool) => Some(Arc::clone(pool)),
                Entry::Failed(_) => None,
            })
            .collect()
    }

    /// Close every live pool and forget all entries, failures included.
    ///
    /// Pools still held elsewhere stay usable but start empty. A build that is
    /// in flight during the call lands in the emptied registry.
    pub fn clear(&self) {
        let keys = self.keys();
        let entries = keys.len();
        let pools: Vec<_> = keys
            .iter()
            .filter_map(|key| match self.entries.remove(key) {
                Some((_, Entry::Pool(pool))) => Some(pool),
                Some((_, Entry::Failed(_))) | None => None,
            })
            .collect();

        for pool in &pools {
            pool.close_all();
        }
        tracing::info!(entries, closed = pools.len(), "Pool registry cleared");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::testing::CountingFactory;

    fn registry() -> PoolRegistry<&'static str, CountingFactory> {
        PoolRegistry::new()
    }

    #[test]
    fn same_key_returns_same_pool() {
        let registry = registry();
        let a = registry
            .get_or_create_with("db", CountingFactory::new(), PoolConfig::default())
            .unwrap();
        let b = registry
            .get_or_create_with("db", CountingFactory::new(), PoolConfig::default())
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn distinct_keys_get_distinct_pools() {
        let registry = registry();
        let a = registry
            .get_or_create_with("a", CountingFactory::new(), PoolConfig::default())
            .unwrap();
        let b = registry
            .get_or_create_with("b", CountingFactory::new(), PoolConfig::default())
            .unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn invalid_config_is_memoized() {
        let registry = registry();
        let builds = AtomicUsize::new(0);
        let build = || {
            builds.fetch_add(1, Ordering::SeqCst);
            BoundedPool::new(CountingFactory::new(), PoolConfig::default().with_capacity(0))
        };

        assert!(matches!(
            registry.get_or_create("bad", build),
            Err(Error::InvalidCapacity { capacity: 0 })
        ));
        assert!(matches!(
            registry.get_or_create("bad", build),
            Err(Error::InvalidCapacity { capacity: 0 })
        ));
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn get_does_not_construct() {
        let registry = registry();
        assert!(registry.get(&"missing").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn clear_closes_pools() {
        let registry = registry();
        let pool = registry
            .get_or_create_with(
                "warm",
                CountingFactory::new(),
                PoolConfig::default().with_min_idle(2),
            )
            .unwrap();
        assert_eq!(pool.idle_count(), 2);

        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(pool.factory().destroyed(), 2);
    }
}
