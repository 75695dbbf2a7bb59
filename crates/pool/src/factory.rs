//! The resource factory trait
//!
//! A [`ResourceFactory`] is the only thing the pool knows about the resources
//! it holds: how to make one and how to get rid of one.

use crate::context::Context;
use crate::error::BoxError;

/// Creates and destroys pooled resources.
///
/// Both methods are called from whichever thread triggered them and never
/// while the pool's internal lock is held, so they may block on I/O.
pub trait ResourceFactory: Send + Sync + 'static {
    /// The resource type produced by this factory.
    type Resource: Send + 'static;

    /// Create a new resource.
    ///
    /// A failure surfaces as [`Error::Construction`](crate::Error::Construction)
    /// and is never retried by the pool.
    fn create(&self, ctx: &Context) -> Result<Self::Resource, BoxError>;

    /// Destroy a resource that is leaving the pool for good.
    ///
    /// Best effort: the pool logs a returned error and carries on.
    fn destroy(&self, resource: Self::Resource) -> Result<(), BoxError> {
        drop(resource);
        Ok(())
    }
}

impl<F: ResourceFactory> ResourceFactory for std::sync::Arc<F> {
    type Resource = F::Resource;

    fn create(&self, ctx: &Context) -> Result<Self::Resource, BoxError> {
        (**self).create(ctx)
    }

    fn destroy(&self, resource: Self::Resource) -> Result<(), BoxError> {
        (**self).destroy(resource)
    }
}
