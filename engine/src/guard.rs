//! Single-flight gate shared by the manual trigger and the driving loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Busy/idle flag with an atomic test-and-set.
///
/// Acquisition never blocks: the loser is told no and returns.
#[derive(Debug, Default)]
pub struct DispatchGuard {
    busy: AtomicBool,
}

impl DispatchGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the caller now holds the guard.
    pub fn try_acquire(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn release(&self) {
        self.busy.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Scoped acquisition; the permit releases the guard when dropped.
    #[must_use]
    pub fn try_permit(self: &Arc<Self>) -> Option<DispatchPermit> {
        self.try_acquire().then(|| DispatchPermit {
            guard: Arc::clone(self),
        })
    }
}

/// Proof that the dispatch guard is held. Movable across tasks.
#[derive(Debug)]
pub struct DispatchPermit {
    guard: Arc<DispatchGuard>,
}

impl Drop for DispatchPermit {
    fn drop(&mut self) {
        self.guard.release();
    }
}
