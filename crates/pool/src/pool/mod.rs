//! Bounded resource pool.
//!
//! `BoundedPool<F>` keeps at most `capacity` resources alive for one logical
//! target. Idle resources sit on a LIFO stack so the most recently released
//! one is handed out first; blocked acquirers park on a condition variable.
//! The factory is never called while the state lock is held.

mod lifecycle;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use serde::{Deserialize, Serialize};

use crate::config::{DisabledPolicy, PoolConfig};
use crate::context::{Context, CreateReason};
use crate::error::{Error, Result};
use crate::factory::ResourceFactory;
use crate::guard::Checkout;
use crate::resource::{Pooled, ResourceId};

// ---------------------------------------------------------------------------
// Public value types
// ---------------------------------------------------------------------------

/// Lifecycle state of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolState {
    /// Resources are handed out and taken back.
    Enabled,
    /// The idle store is drained; see [`BoundedPool::disable`].
    Disabled,
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enabled => write!(f, "enabled"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

/// Outcome of [`BoundedPool::create_and_add`].
#[derive(Debug)]
pub enum Admission<R> {
    /// The new resource was pushed onto the idle store.
    Idle(ResourceId),
    /// The pool was full; the resource is handed to the caller and not tracked.
    Surplus(Pooled<R>),
    /// The pool is disabled and nothing was created.
    Refused,
}

/// Pool statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    /// Current capacity.
    pub capacity: usize,
    /// Current lifecycle state.
    pub state: PoolState,
    /// Idle resources.
    pub idle: usize,
    /// Resources currently checked out.
    pub checked_out: usize,
    /// Entries in the disabled-list awaiting re-creation.
    pub parked: usize,
    /// Total resources ever created.
    pub created: u64,
    /// Total resources ever destroyed.
    pub destroyed: u64,
    /// Total successful acquisitions.
    pub acquisitions: u64,
    /// Total releases accepted back into the idle store.
    pub releases: u64,
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

/// Bookkeeping record for a resource drained by `disable`.
#[derive(Debug, Clone, Copy)]
struct Parked {
    id: ResourceId,
    parked_at: Instant,
}

/// Structural state guarded by the pool mutex.
struct State<R> {
    /// LIFO stack; the top is the last element.
    idle: Vec<Pooled<R>>,
    parked: Vec<Parked>,
    checked_out: HashSet<ResourceId>,
    /// Slots reserved by creations running outside the lock.
    pending: usize,
    enabled: bool,
    capacity: usize,
}

impl<R> State<R> {
    fn tracked(&self) -> usize {
        self.idle.len() + self.checked_out.len() + self.pending
    }

    fn has_room(&self) -> bool {
        self.tracked() < self.capacity
    }

    fn is_idle(&self, id: ResourceId) -> bool {
        self.idle.iter().any(|pooled| pooled.id() == id)
    }
}

#[derive(Debug, Default)]
struct Counters {
    created: AtomicU64,
    destroyed: AtomicU64,
    acquisitions: AtomicU64,
    releases: AtomicU64,
}

// ---------------------------------------------------------------------------
// BoundedPool<F>
// ---------------------------------------------------------------------------

/// Capacity-bounded, thread-safe pool of resources produced by `F`.
///
/// Resources are created lazily by [`acquire`](Self::acquire) while fewer than
/// `capacity` are alive, reused in LIFO order, and parked by
/// [`disable`](Self::disable) until [`enable`](Self::enable).
pub struct BoundedPool<F: ResourceFactory> {
    factory: F,
    config: PoolConfig,
    state: Mutex<State<F::Resource>>,
    available: Condvar,
    next_id: AtomicU64,
    counters: Counters,
}

impl<F: ResourceFactory> fmt::Debug for BoundedPool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedPool")
            .field("name", &self.config.name)
            .field("stats", &self.stats())
            .finish()
    }
}

impl<F: ResourceFactory> BoundedPool<F> {
    /// Create a new pool, pre-filling `config.min_idle` resources.
    ///
    /// # Errors
    /// Returns [`Error::InvalidCapacity`] or [`Error::Configuration`] for an
    /// invalid config, and [`Error::Construction`] if warm-up fails. Resources
    /// created before a warm-up failure are destroyed.
    pub fn new(factory: F, config: PoolConfig) -> Result<Self> {
        config.validate()?;
        let pool = Self {
            factory,
            state: Mutex::new(State {
                idle: Vec::with_capacity(config.capacity),
                parked: Vec::new(),
                checked_out: HashSet::new(),
                pending: 0,
                enabled: true,
                capacity: config.capacity,
            }),
            config,
            available: Condvar::new(),
            next_id: AtomicU64::new(1),
            counters: Counters::default(),
        };

        let mut warm = Vec::with_capacity(pool.config.min_idle);
        for _ in 0..pool.config.min_idle {
            match pool.create(CreateReason::WarmUp) {
                Ok(pooled) => warm.push(pooled),
                Err(error) => {
                    pool.destroy_all(warm);
                    return Err(error);
                }
            }
        }
        pool.state.lock().idle.extend(warm);

        tracing::debug!(
            pool = %pool.config.name,
            capacity = pool.config.capacity,
            warm = pool.config.min_idle,
            "Pool constructed"
        );
        Ok(pool)
    }

    /// Pool name from the configuration.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The factory backing this pool.
    #[must_use]
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Snapshot of the configuration, with the current capacity.
    ///
    /// This is the only export path for a pool; rebuild with [`BoundedPool::new`].
    #[must_use]
    pub fn config(&self) -> PoolConfig {
        PoolConfig {
            capacity: self.state.lock().capacity,
            ..self.config.clone()
        }
    }

    /// Current capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.state.lock().capacity
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PoolState {
        if self.state.lock().enabled {
            PoolState::Enabled
        } else {
            PoolState::Disabled
        }
    }

    /// Whether the pool is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    /// Number of idle resources.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.state.lock().idle.len()
    }

    /// Number of entries in the disabled-list.
    #[must_use]
    pub fn parked_count(&self) -> usize {
        self.state.lock().parked.len()
    }

    /// Identities of idle resources, next to be handed out first.
    #[must_use]
    pub fn idle_ids(&self) -> Vec<ResourceId> {
        self.state
            .lock()
            .idle
            .iter()
            .rev()
            .map(Pooled::id)
            .collect()
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            capacity: state.capacity,
            state: if state.enabled {
                PoolState::Enabled
            } else {
                PoolState::Disabled
            },
            idle: state.idle.len(),
            checked_out: state.checked_out.len(),
            parked: state.parked.len(),
            created: self.counters.created.load(Ordering::Relaxed),
            destroyed: self.counters.destroyed.load(Ordering::Relaxed),
            acquisitions: self.counters.acquisitions.load(Ordering::Relaxed),
            releases: self.counters.releases.load(Ordering::Relaxed),
        }
    }

    // -----------------------------------------------------------------------
    // Checkout
    // -----------------------------------------------------------------------

    /// Acquire a resource, waiting as long as `acquire_timeout` allows.
    ///
    /// With no configured timeout this blocks until a resource frees up,
    /// logging every `wait_window` while it waits.
    pub fn acquire(&self) -> Result<Pooled<F::Resource>> {
        self.acquire_inner(self.config.acquire_timeout)
    }

    /// Acquire a resource, failing with [`Error::AcquireTimeout`] after `timeout`.
    pub fn acquire_timeout(&self, timeout: Duration) -> Result<Pooled<F::Resource>> {
        self.acquire_inner(Some(timeout))
    }

    /// Like [`acquire`](Self::acquire), returning a guard that releases on drop.
    pub fn checkout(self: &Arc<Self>) -> Result<Checkout<F>> {
        let pooled = self.acquire()?;
        Ok(Checkout::new(Arc::clone(self), pooled))
    }

    /// Like [`acquire_timeout`](Self::acquire_timeout), returning a guard.
    pub fn checkout_timeout(self: &Arc<Self>, timeout: Duration) -> Result<Checkout<F>> {
        let pooled = self.acquire_timeout(timeout)?;
        Ok(Checkout::new(Arc::clone(self), pooled))
    }

    fn acquire_inner(&self, timeout: Option<Duration>) -> Result<Pooled<F::Resource>> {
        let started = Instant::now();
        // A deadline past the end of `Instant` is no deadline at all.
        let deadline = timeout.and_then(|timeout| started.checked_add(timeout));
        let mut warned_disabled = false;

        let mut state = self.state.lock();
        loop {
            if state.enabled {
                if let Some(pooled) = state.idle.pop() {
                    state.checked_out.insert(pooled.id());
                    self.counters.acquisitions.fetch_add(1, Ordering::Relaxed);
                    return Ok(pooled);
                }

                if state.has_room() {
                    state.pending += 1;
                    let created =
                        MutexGuard::unlocked(&mut state, || self.create(CreateReason::OnDemand));
                    state.pending -= 1;
                    return match created {
                        Ok(pooled) => {
                            state.checked_out.insert(pooled.id());
                            self.counters.acquisitions.fetch_add(1, Ordering::Relaxed);
                            Ok(pooled)
                        }
                        Err(error) => {
                            drop(state);
                            self.available.notify_one();
                            Err(error)
                        }
                    };
                }
            } else {
                match self.config.disabled_policy {
                    DisabledPolicy::Reject => return Err(self.disabled_error("acquire")),
                    DisabledPolicy::Log if !warned_disabled => {
                        tracing::warn!(
                            pool = %self.config.name,
                            "Acquire on disabled pool, waiting for enable"
                        );
                        warned_disabled = true;
                    }
                    DisabledPolicy::Log => {}
                }
            }

            let window = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(Error::AcquireTimeout {
                            pool: self.config.name.clone(),
                            timeout_ms: timeout.map_or(0, duration_ms),
                        });
                    }
                    (deadline - now).min(self.config.wait_window)
                }
                None => self.config.wait_window,
            };

            let waited = self.available.wait_for(&mut state, window);
            if waited.timed_out() && deadline.is_none() {
                tracing::info!(
                    pool = %self.config.name,
                    waited_secs = started.elapsed().as_secs(),
                    "Still waiting for an idle resource"
                );
            }
        }
    }

    /// Return a resource to the pool.
    ///
    /// Releasing a resource that is already idle is a silent no-op. A release
    /// that would overflow the pool destroys the resource instead. While the
    /// pool is disabled the resource is destroyed and the call follows
    /// `disabled_policy`.
    pub fn release(&self, resource: Pooled<F::Resource>) -> Result<()> {
        let id = resource.id();
        let mut state = self.state.lock();

        if state.is_idle(id) {
            tracing::debug!(pool = %self.config.name, resource = %id, "Duplicate release ignored");
            return Ok(());
        }
        state.checked_out.remove(&id);

        if !state.enabled {
            drop(state);
            self.destroy(resource);
            return self.disabled_violation("release");
        }

        if !state.has_room() {
            drop(state);
            tracing::debug!(pool = %self.config.name, resource = %id, "Pool full, dropping release");
            self.destroy(resource);
            return Ok(());
        }

        state.idle.push(resource);
        self.counters.releases.fetch_add(1, Ordering::Relaxed);
        drop(state);
        self.available.notify_one();
        Ok(())
    }

    /// Destroy a checked-out resource instead of returning it, freeing its slot.
    ///
    /// Use this for resources that turned out broken, or before keeping a
    /// resource for good with [`Pooled::into_inner`]. Discarding an id the
    /// pool does not count as checked out still destroys the resource.
    pub fn discard(&self, resource: Pooled<F::Resource>) {
        let id = resource.id();
        let freed = self.state.lock().checked_out.remove(&id);
        self.destroy(resource);
        if freed {
            tracing::debug!(
                pool = %self.config.name,
                resource = %id,
                "Discarded checked-out resource"
            );
            self.available.notify_one();
        }
    }

    /// Stop counting a checked-out resource against capacity, without touching it.
    ///
    /// For a resource the caller already consumed or dropped. Returns whether
    /// `id` was checked out.
    pub fn forget(&self, id: ResourceId) -> bool {
        let freed = self.state.lock().checked_out.remove(&id);
        if freed {
            tracing::debug!(
                pool = %self.config.name,
                resource = %id,
                "Forgot checked-out resource"
            );
            self.available.notify_one();
        }
        freed
    }

    /// Take an idle resource out of the pool without destroying it.
    ///
    /// # Errors
    /// Returns [`Error::NotInPool`] if `id` is not currently idle.
    pub fn remove(&self, id: ResourceId) -> Result<Pooled<F::Resource>> {
        let mut state = self.state.lock();
        let position = state
            .idle
            .iter()
            .position(|pooled| pooled.id() == id)
            .ok_or_else(|| Error::NotInPool {
                pool: self.config.name.clone(),
                id,
            })?;
        let pooled = state.idle.remove(position);
        drop(state);

        tracing::debug!(pool = %self.config.name, resource = %id, "Removed idle resource");
        self.available.notify_one();
        Ok(pooled)
    }

    /// Create one resource and add it to the idle store if there is room.
    ///
    /// # Errors
    /// Returns [`Error::Construction`] if the factory fails, or
    /// [`Error::PoolDisabled`] on a disabled pool under `DisabledPolicy::Reject`.
    pub fn create_and_add(&self) -> Result<Admission<F::Resource>> {
        let reserved = {
            let mut state = self.state.lock();
            if !state.enabled {
                drop(state);
                self.disabled_violation("create_and_add")?;
                return Ok(Admission::Refused);
            }
            let room = state.has_room();
            if room {
                state.pending += 1;
            }
            room
        };

        let created = self.create(CreateReason::Explicit);

        let mut state = self.state.lock();
        if reserved {
            state.pending -= 1;
        }
        let pooled = match created {
            Ok(pooled) => pooled,
            Err(error) => {
                drop(state);
                if reserved {
                    self.available.notify_one();
                }
                return Err(error);
            }
        };

        if reserved && state.enabled {
            let id = pooled.id();
            state.idle.push(pooled);
            drop(state);
            self.available.notify_one();
            Ok(Admission::Idle(id))
        } else {
            Ok(Admission::Surplus(pooled))
        }
    }

    /// Change the capacity.
    ///
    /// Shrinking below the idle count destroys the least recently used idle
    /// resources; checked-out resources are destroyed on release until the
    /// pool is back under capacity.
    ///
    /// # Errors
    /// Returns [`Error::InvalidCapacity`] if `capacity` is zero.
    pub fn set_capacity(&self, capacity: usize) -> Result<()> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity { capacity });
        }

        let evicted: Vec<_> = {
            let mut state = self.state.lock();
            state.capacity = capacity;
            let excess = state.idle.len().saturating_sub(capacity);
            state.idle.drain(..excess).collect()
        };

        tracing::info!(
            pool = %self.config.name,
            capacity,
            evicted = evicted.len(),
            "Pool capacity changed"
        );
        self.destroy_all(evicted);
        self.available.notify_all();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Factory plumbing
    // -----------------------------------------------------------------------

    fn create(&self, reason: CreateReason) -> Result<Pooled<F::Resource>> {
        let ctx = Context::new(self.config.name.clone(), reason)
            .with_construct_timeout(self.config.construct_timeout);
        let resource = self
            .factory
            .create(&ctx)
            .map_err(|source| Error::construction(self.config.name.clone(), source))?;

        let id = ResourceId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.counters.created.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(pool = %self.config.name, resource = %id, %reason, "Created resource");
        Ok(Pooled::new(id, resource))
    }

    fn destroy(&self, pooled: Pooled<F::Resource>) {
        let id = pooled.id();
        self.counters.destroyed.fetch_add(1, Ordering::Relaxed);
        match self.factory.destroy(pooled.into_inner()) {
            Ok(()) => tracing::debug!(pool = %self.config.name, resource = %id, "Destroyed resource"),
            Err(error) => tracing::error!(
                pool = %self.config.name,
                resource = %id,
                %error,
                "Failed to destroy resource"
            ),
        }
    }

    fn destroy_all(&self, resources: Vec<Pooled<F::Resource>>) {
        for pooled in resources {
            self.destroy(pooled);
        }
    }

    fn disabled_error(&self, operation: &'static str) -> Error {
        Error::PoolDisabled {
            pool: self.config.name.clone(),
            operation,
        }
    }

    /// Apply `disabled_policy` to an operation attempted while disabled.
    fn disabled_violation(&self, operation: &'static str) -> Result<()> {
        match self.config.disabled_policy {
            DisabledPolicy::Log => {
                tracing::error!(
                    pool = %self.config.name,
                    operation,
                    "Operation on disabled pool ignored"
                );
                Ok(())
            }
            DisabledPolicy::Reject => Err(self.disabled_error(operation)),
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CountingFactory;
    use pretty_assertions::assert_eq;

    fn pool(capacity: usize) -> BoundedPool<CountingFactory> {
        BoundedPool::new(
            CountingFactory::new(),
            PoolConfig::named("test").with_capacity(capacity),
        )
        .unwrap()
    }

    #[test]
    fn acquire_creates_lazily_up_to_capacity() {
        let pool = pool(2);
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert_eq!((*a, *b), (1, 2));

        let err = pool.acquire_timeout(Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, Error::AcquireTimeout { timeout_ms: 20, .. }));
        assert_eq!(pool.factory().created(), 2);
    }

    #[test]
    fn released_resource_is_reused() {
        let pool = pool(3);
        let a = pool.acquire().unwrap();
        let id = a.id();
        pool.release(a).unwrap();

        let again = pool.acquire().unwrap();
        assert_eq!(again.id(), id);
        assert_eq!(pool.factory().created(), 1);
    }

    #[test]
    fn release_into_full_pool_destroys() {
        let pool = pool(1);
        assert!(matches!(pool.create_and_add().unwrap(), Admission::Idle(_)));
        let Admission::Surplus(extra) = pool.create_and_add().unwrap() else {
            panic!("second create_and_add should overflow");
        };

        pool.release(extra).unwrap();
        assert_eq!(pool.idle_count(), 1);
        assert_eq!(pool.factory().destroyed(), 1);
    }

    #[test]
    fn remove_transfers_ownership_without_destroy() {
        let pool = pool(2);
        let Admission::Idle(id) = pool.create_and_add().unwrap() else {
            panic!("expected idle admission");
        };

        let removed = pool.remove(id).unwrap();
        assert_eq!(removed.id(), id);
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(pool.factory().destroyed(), 0);
    }

    #[test]
    fn shrinking_capacity_evicts_least_recently_used() {
        let pool = pool(3);
        let resources: Vec<_> = (0..3).map(|_| pool.acquire().unwrap()).collect();
        let ids: Vec<_> = resources.iter().map(Pooled::id).collect();
        for pooled in resources {
            pool.release(pooled).unwrap();
        }

        pool.set_capacity(1).unwrap();
        assert_eq!(pool.idle_ids(), vec![ids[2]]);
        assert_eq!(pool.factory().destroyed(), 2);
    }

    #[test]
    fn factory_failure_frees_the_reserved_slot() {
        let pool = pool(1);
        pool.factory().set_failing(true);
        assert!(matches!(pool.acquire(), Err(Error::Construction { .. })));

        pool.factory().set_failing(false);
        assert!(pool.acquire_timeout(Duration::from_millis(50)).is_ok());
    }

    #[test]
    fn warm_up_fills_min_idle() {
        let pool = BoundedPool::new(
            CountingFactory::new(),
            PoolConfig::named("warm").with_capacity(4).with_min_idle(2),
        )
        .unwrap();
        assert_eq!(pool.idle_count(), 2);
        assert_eq!(pool.stats().created, 2);
    }

    #[test]
    fn config_export_reflects_capacity_changes() {
        let pool = pool(2);
        pool.set_capacity(5).unwrap();
        assert_eq!(pool.config().capacity, 5);
        assert_eq!(pool.config().name, "test");
    }
}
