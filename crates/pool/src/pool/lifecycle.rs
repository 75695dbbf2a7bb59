//! Enable / disable / close for [`BoundedPool`].

use std::time::Instant;

use super::{BoundedPool, Parked, duration_ms};
use crate::context::CreateReason;
use crate::error::Result;
use crate::factory::ResourceFactory;

impl<F: ResourceFactory> BoundedPool<F> {
    /// Pause the pool.
    ///
    /// Drains the idle store, destroys every drained resource and records it
    /// in the disabled-list so [`enable`](Self::enable) can re-create it.
    /// Checked-out resources are destroyed when they come back. Calling this
    /// on a disabled pool only logs a warning.
    pub fn disable(&self) {
        let drained: Vec<_> = {
            let mut state = self.state.lock();
            if !state.enabled {
                tracing::warn!(pool = %self.config.name, "Pool is already disabled");
                return;
            }
            state.enabled = false;

            let drained: Vec<_> = state.idle.drain(..).collect();
            let parked_at = Instant::now();
            state.parked.extend(drained.iter().map(|pooled| Parked {
                id: pooled.id(),
                parked_at,
            }));
            drained
        };

        tracing::info!(
            pool = %self.config.name,
            parked = drained.len(),
            "Pool disabled"
        );
        self.destroy_all(drained);
    }

    /// Resume a disabled pool.
    ///
    /// Re-creates one resource per disabled-list entry (as far as capacity
    /// allows) and pushes it onto the idle store. Calling this on an enabled
    /// pool only logs a warning.
    ///
    /// # Errors
    /// Returns the first [`Error::Construction`](crate::Error::Construction)
    /// hit while re-creating. The pool is enabled regardless and keeps every
    /// resource that was re-created; missing ones are created on demand.
    pub fn enable(&self) -> Result<()> {
        let (reserved, parked) = {
            let mut state = self.state.lock();
            if state.enabled {
                tracing::warn!(pool = %self.config.name, "Pool is already enabled");
                return Ok(());
            }
            state.enabled = true;

            let parked = std::mem::take(&mut state.parked);
            let reserved = parked
                .len()
                .min(state.capacity.saturating_sub(state.tracked()));
            state.pending += reserved;
            (reserved, parked)
        };

        let mut restored = Vec::with_capacity(reserved);
        let mut first_error = None;
        for entry in parked.iter().take(reserved) {
            match self.create(CreateReason::Reenable) {
                Ok(pooled) => restored.push(pooled),
                Err(error) => {
                    tracing::error!(
                        pool = %self.config.name,
                        replaces = %entry.id,
                        parked_for_ms = duration_ms(entry.parked_at.elapsed()),
                        %error,
                        "Failed to re-create parked resource"
                    );
                    first_error.get_or_insert(error);
                }
            }
        }

        let restored_count = restored.len();
        let leftover = {
            let mut state = self.state.lock();
            state.pending -= reserved;
            if state.enabled {
                state.idle.extend(restored);
                Vec::new()
            } else {
                // Disabled again while re-creating.
                restored
            }
        };
        self.destroy_all(leftover);
        self.available.notify_all();

        tracing::info!(
            pool = %self.config.name,
            restored = restored_count,
            dropped = parked.len() - reserved,
            "Pool enabled"
        );
        first_error.map_or(Ok(()), Err)
    }

    /// Destroy every idle resource and forget the disabled-list.
    ///
    /// Valid in either state and leaves the enabled flag untouched.
    /// Checked-out resources are unaffected until released.
    pub fn close_all(&self) {
        let (drained, forgotten) = {
            let mut state = self.state.lock();
            let forgotten = state.parked.len();
            state.parked.clear();
            (state.idle.drain(..).collect::<Vec<_>>(), forgotten)
        };

        tracing::info!(
            pool = %self.config.name,
            closed = drained.len(),
            forgotten,
            "Closed pool resources"
        );
        self.destroy_all(drained);
        self.available.notify_all();
    }
}
