use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Caps on the amount of work an optimizer performs. `None` means unlimited.
///
/// Running out of budget is not an error: the optimizer stops and returns the
/// best partition found so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Budget {
    /// Maximum number of full node sweeps per local-search pass.
    pub max_sweeps: Option<usize>,
    /// Maximum number of community merges performed by the greedy optimizer.
    pub max_merges: Option<usize>,
}

impl Budget {
    /// No limits.
    pub fn unlimited() -> Self {
        Budget::default()
    }

    pub(crate) fn sweeps_exhausted(&self, sweeps: usize) -> bool {
        self.max_sweeps.is_some_and(|max| sweeps >= max)
    }

    pub(crate) fn merges_exhausted(&self, merges: usize) -> bool {
        self.max_merges.is_some_and(|max| merges >= max)
    }
}

/// Cooperative cancellation, polled between sweeps and between queue pops.
pub trait Cancel: Send + Sync {
    /// true if the computation should stop, false if not.
    fn is_cancelled(&self) -> bool;

    /// Returns `Err(Error::Cancelled)` if the computation should stop.
    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

/// Never cancels.
#[derive(Debug, Default, Copy, Clone)]
pub struct NeverCancel;

impl Cancel for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Cancellation flag that can be shared with, and triggered from, another thread.
#[derive(Debug, Default, Clone)]
pub struct AtomicCancel {
    cancelled: Arc<AtomicBool>,
}

impl AtomicCancel {
    /// A fresh, un-cancelled flag.
    pub fn new() -> Self {
        Default::default()
    }

    /// Request cancellation. All clones of this flag observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

impl Cancel for AtomicCancel {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
