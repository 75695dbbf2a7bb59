//! Testing utilities for pools

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::context::Context;
use crate::error::BoxError;
use crate::factory::ResourceFactory;

/// Factory producing sequential `u64` resources: 1, 2, 3, …
///
/// Counts creations and destructions, and can be switched to fail so tests
/// can drive construction errors.
#[derive(Debug)]
pub struct CountingFactory {
    next: AtomicU64,
    destroyed: AtomicU64,
    failing: AtomicBool,
    /// Creations left before failing; `u64::MAX` means unlimited.
    budget: AtomicU64,
    delay: Duration,
}

impl CountingFactory {
    /// A factory that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
            destroyed: AtomicU64::new(0),
            failing: AtomicBool::new(false),
            budget: AtomicU64::new(u64::MAX),
            delay: Duration::ZERO,
        }
    }

    /// A factory that always fails.
    #[must_use]
    pub fn failing() -> Self {
        let factory = Self::new();
        factory.set_failing(true);
        factory
    }

    /// Sleep for `delay` inside every `create` call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Switch failure mode on or off.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Succeed `successes` more times, then fail.
    pub fn fail_after(&self, successes: u64) {
        self.budget.store(successes, Ordering::SeqCst);
    }

    /// Number of resources created.
    #[must_use]
    pub fn created(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }

    /// Number of resources destroyed.
    #[must_use]
    pub fn destroyed(&self) -> u64 {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl Default for CountingFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceFactory for CountingFactory {
    type Resource = u64;

    fn create(&self, ctx: &Context) -> Result<u64, BoxError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(format!("factory for '{}' is failing", ctx.pool).into());
        }
        let within_budget = self
            .budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                u64::MAX => Some(u64::MAX),
                0 => None,
                left => Some(left - 1),
            })
            .is_ok();
        if !within_budget {
            return Err(format!("factory for '{}' exhausted its budget", ctx.pool).into());
        }
        Ok(self.next.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn destroy(&self, _resource: u64) -> Result<(), BoxError> {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
