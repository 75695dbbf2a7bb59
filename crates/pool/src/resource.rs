//! Resource identity and the checked-out resource wrapper

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Pool-assigned identity of a resource.
///
/// Unique within one [`BoundedPool`](crate::BoundedPool). Identities are never
/// reused, so a re-created resource gets a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(u64);

impl ResourceId {
    /// Wrap a raw identity value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identity value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A resource owned by the pool or by whoever checked it out.
///
/// Hand it back with [`BoundedPool::release`](crate::BoundedPool::release) or
/// destroy it with [`BoundedPool::discard`](crate::BoundedPool::discard). The
/// pool counts a checked-out resource against capacity until one of those
/// happens; dropping it, or keeping it via [`into_inner`](Self::into_inner),
/// holds the slot until [`BoundedPool::forget`](crate::BoundedPool::forget).
pub struct Pooled<R> {
    id: ResourceId,
    resource: R,
    created_at: Instant,
}

impl<R> Pooled<R> {
    pub(crate) fn new(id: ResourceId, resource: R) -> Self {
        Self {
            id,
            resource,
            created_at: Instant::now(),
        }
    }

    /// The pool-assigned identity.
    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Time since the factory created this resource.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Take the raw resource, dropping its pool identity.
    ///
    /// The pool is not told; call
    /// [`BoundedPool::forget`](crate::BoundedPool::forget) with the id first
    /// if this resource was checked out.
    #[must_use]
    pub fn into_inner(self) -> R {
        self.resource
    }
}

impl<R: Clone> Clone for Pooled<R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            resource: self.resource.clone(),
            created_at: self.created_at,
        }
    }
}

impl<R> std::ops::Deref for Pooled<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.resource
    }
}

impl<R> std::ops::DerefMut for Pooled<R> {
    fn deref_mut(&mut self) -> &mut R {
        &mut self.resource
    }
}

impl<R: fmt::Debug> fmt::Debug for Pooled<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("id", &self.id)
            .field("resource", &self.resource)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deref_reaches_resource() {
        let mut pooled = Pooled::new(ResourceId::new(1), String::from("conn"));
        pooled.push_str("-1");
        assert_eq!(*pooled, "conn-1");
        assert_eq!(pooled.id(), ResourceId::new(1));
    }

    #[test]
    fn clone_keeps_identity() {
        let pooled = Pooled::new(ResourceId::new(3), 42u32);
        let copy = pooled.clone();
        assert_eq!(copy.id(), pooled.id());
        assert_eq!(copy.into_inner(), 42);
    }

    #[test]
    fn id_displays_with_hash() {
        assert_eq!(ResourceId::new(12).to_string(), "#12");
    }
}
