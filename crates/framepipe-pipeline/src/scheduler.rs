//! Issue-order bookkeeping for prefetch requests.

use framepipe_core::FrameIndex;
use std::ops::Range;

/// Hands out frame indices to request, strictly increasing, until the stream
/// is exhausted.
///
/// The scheduler only reserves indices; the caller issues the request to the
/// source after dropping any lock it holds.
#[derive(Debug, Clone)]
pub struct PrefetchScheduler {
    requested: usize,
    total: usize,
}

impl PrefetchScheduler {
    pub fn new(total: usize) -> Self {
        Self {
            requested: 0,
            total,
        }
    }

    /// Reserve the first `min(window, total)` indices for the startup burst.
    pub fn initial_burst(&mut self, window: usize) -> Range<usize> {
        let start = self.requested;
        let end = (start + window).min(self.total);
        self.requested = end;
        start..end
    }

    /// Reserve the next index, or `None` once every frame has been requested.
    pub fn reserve_next(&mut self) -> Option<FrameIndex> {
        if self.requested < self.total {
            let index = FrameIndex(self.requested);
            self.requested += 1;
            Some(index)
        } else {
            None
        }
    }

    /// Number of indices handed out so far.
    #[inline]
    pub fn requested(&self) -> usize {
        self.requested
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Whether `index` has been handed out.
    #[inline]
    pub fn was_requested(&self, index: FrameIndex) -> bool {
        index.0 < self.requested
    }
}
