//! RAII guard for checked-out resources

use std::sync::Arc;

use crate::factory::ResourceFactory;
use crate::pool::BoundedPool;
use crate::resource::{Pooled, ResourceId};

/// RAII guard around a checked-out resource.
///
/// Dropping the guard releases the resource back to its pool. Use
/// [`detach`](Self::detach) to take the [`Pooled`] handle and release it
/// yourself (or never).
pub struct Checkout<F: ResourceFactory> {
    pool: Arc<BoundedPool<F>>,
    resource: Option<Pooled<F::Resource>>,
}

impl<F: ResourceFactory> Checkout<F> {
    pub(crate) fn new(pool: Arc<BoundedPool<F>>, resource: Pooled<F::Resource>) -> Self {
        Self {
            pool,
            resource: Some(resource),
        }
    }

    /// Identity of the checked-out resource.
    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.pooled().id()
    }

    /// The pool this resource goes back to.
    #[must_use]
    pub fn pool(&self) -> &Arc<BoundedPool<F>> {
        &self.pool
    }

    /// Take the resource out of the guard, preventing the release on drop.
    ///
    /// The resource still counts against capacity until it is released,
    /// discarded or forgotten.
    #[must_use]
    pub fn detach(mut self) -> Pooled<F::Resource> {
        self.resource.take().expect("checkout used after detach")
    }

    /// Destroy the resource instead of returning it to the pool.
    pub fn discard(mut self) {
        let pooled = self.resource.take().expect("checkout used after detach");
        self.pool.discard(pooled);
    }

    fn pooled(&self) -> &Pooled<F::Resource> {
        self.resource.as_ref().expect("checkout used after detach")
    }
}

impl<F: ResourceFactory> std::ops::Deref for Checkout<F> {
    type Target = F::Resource;

    fn deref(&self) -> &F::Resource {
        &**self.pooled()
    }
}

impl<F: ResourceFactory> std::ops::DerefMut for Checkout<F> {
    fn deref_mut(&mut self) -> &mut F::Resource {
        &mut **self.resource.as_mut().expect("checkout used after detach")
    }
}

impl<F: ResourceFactory> Drop for Checkout<F> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take()
            && let Err(error) = self.pool.release(resource)
        {
            tracing::warn!(pool = %self.pool.name(), %error, "Release on drop failed");
        }
    }
}

impl<F: ResourceFactory> std::fmt::Debug for Checkout<F>
where
    F::Resource: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checkout")
            .field("pool", &self.pool.name())
            .field("resource", &self.resource)
            .finish()
    }
}
