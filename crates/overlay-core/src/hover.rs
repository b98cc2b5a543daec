//! Single-flight guard for hover queries.

use tokio::sync::{Semaphore, SemaphorePermit};

/// Held for the duration of one hover query.
pub type HoverPermit<'a> = SemaphorePermit<'a>;

/// Allows at most one hover query in flight.
///
/// Events that arrive while a query is running are dropped, not queued.
#[derive(Debug)]
pub struct HoverGuard {
    slot: Semaphore,
}

impl HoverGuard {
    pub fn new() -> Self {
        Self {
            slot: Semaphore::new(1),
        }
    }

    /// Claim the slot, or `None` if a query is already running. The slot is
    /// released when the permit drops, including on error or cancellation.
    pub fn try_acquire(&self) -> Option<HoverPermit<'_>> {
        self.slot.try_acquire().ok()
    }

    pub fn is_busy(&self) -> bool {
        self.slot.available_permits() == 0
    }
}

impl Default for HoverGuard {
    fn default() -> Self {
        Self::new()
    }
}
