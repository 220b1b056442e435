//! Shared pipeline state and the two wait/notify channels guarding it.
//!
//! Both condition variables pair with the single mutex around
//! [`PipelineState`], so every predicate is evaluated against one consistent
//! snapshot and a notify can never slip between a check and its wait.

use crate::cancel::CancelToken;
use crate::reorder::ReorderBuffer;
use crate::scheduler::PrefetchScheduler;
use framepipe_core::{FrameIndex, FramePipeError};
use parking_lot::{Condvar, MutexGuard};
use serde::Serialize;
use tracing::warn;

/// A stream-fatal condition, recorded once and reported by every later read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFault {
    Duplicate(FrameIndex),
    Unexpected(FrameIndex),
    Source { index: FrameIndex, message: String },
}

impl StreamFault {
    pub fn to_error(&self) -> FramePipeError {
        match self {
            Self::Duplicate(index) => FramePipeError::DuplicateCompletion(*index),
            Self::Unexpected(index) => FramePipeError::UnexpectedCompletion(*index),
            Self::Source { index, message } => FramePipeError::SourceFailed {
                index: *index,
                message: message.clone(),
            },
        }
    }
}

/// Counters and buffered frames shared by the reader and completion handlers.
///
/// Invariant: `consumed <= scheduler.requested() <= scheduler.total()`.
#[derive(Debug)]
pub struct PipelineState<F> {
    pub scheduler: PrefetchScheduler,
    /// Next index the reader expects; every index below it has been consumed.
    pub consumed: usize,
    pub buffer: ReorderBuffer<F>,
    pub fault: Option<StreamFault>,
    pub peak_backlog: usize,
    /// Completion handlers currently blocked on the producer throttle.
    pub throttled: usize,
}

impl<F> PipelineState<F> {
    pub fn new(total: usize) -> Self {
        Self {
            scheduler: PrefetchScheduler::new(total),
            consumed: 0,
            buffer: ReorderBuffer::new(),
            fault: None,
            peak_backlog: 0,
            throttled: 0,
        }
    }

    /// Frames requested but not yet consumed (in flight or buffered).
    #[inline]
    pub fn backlog(&self) -> usize {
        self.scheduler.requested() - self.consumed
    }

    /// Record the current backlog in the high-water statistic.
    #[inline]
    pub fn note_backlog(&mut self) {
        self.peak_backlog = self.peak_backlog.max(self.backlog());
    }

    /// Keep the first fault; later ones are consequences of it.
    pub fn record_fault(&mut self, fault: StreamFault) {
        if self.fault.is_none() {
            self.fault = Some(fault);
        }
    }

    /// Whether the stream can make progress.
    #[inline]
    pub fn is_live(&self, cancel: &CancelToken) -> bool {
        self.fault.is_none() && !cancel.is_cancelled()
    }

    /// Error a reader should see instead of a frame, if any.
    pub fn halt_error(&self, cancel: &CancelToken) -> Option<FramePipeError> {
        if let Some(fault) = &self.fault {
            return Some(fault.to_error());
        }
        cancel.is_cancelled().then_some(FramePipeError::Cancelled)
    }

    pub fn stats(&self, high_water: usize, low_water: usize) -> PipelineStats {
        PipelineStats {
            total: self.scheduler.total(),
            requested: self.scheduler.requested(),
            consumed: self.consumed,
            buffered: self.buffer.len(),
            peak_backlog: self.peak_backlog,
            throttled: self.throttled,
            high_water,
            low_water,
        }
    }
}

/// Point-in-time view of the pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub total: usize,
    pub requested: usize,
    pub consumed: usize,
    pub buffered: usize,
    pub peak_backlog: usize,
    pub throttled: usize,
    pub high_water: usize,
    pub low_water: usize,
}

impl PipelineStats {
    #[inline]
    pub fn backlog(&self) -> usize {
        self.requested - self.consumed
    }
}

/// Producer throttle and consumer arrival wait.
#[derive(Debug)]
pub struct BackpressureGate {
    /// Waited on by completion handlers while the backlog is too large.
    throttle: Condvar,
    /// Waited on by the reader until its frame is buffered.
    arrival: Condvar,
    high_water: usize,
    low_water: usize,
}

impl BackpressureGate {
    pub fn new(high_water: usize, low_water: usize) -> Self {
        Self {
            throttle: Condvar::new(),
            arrival: Condvar::new(),
            high_water,
            low_water,
        }
    }

    #[inline]
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    #[inline]
    pub fn low_water(&self) -> usize {
        self.low_water
    }

    /// Block a completion handler while the backlog exceeds the high-water
    /// mark, until it drains to the low-water mark.
    ///
    /// Returns `false` if the stream faulted or was cancelled meanwhile.
    pub fn throttle_producer<F>(
        &self,
        state: &mut MutexGuard<'_, PipelineState<F>>,
        cancel: &CancelToken,
    ) -> bool {
        if state.backlog() > self.high_water {
            warn!(
                backlog = state.backlog(),
                high_water = self.high_water,
                low_water = self.low_water,
                "Throttling frame producer"
            );
            state.throttled += 1;
            while state.backlog() > self.low_water && state.is_live(cancel) {
                self.throttle.wait(state);
            }
            state.throttled -= 1;
        }
        state.is_live(cancel)
    }

    /// Consumption advanced; let throttled producers re-check the backlog.
    #[inline]
    pub fn release_producer(&self) {
        self.throttle.notify_all();
    }

    /// Block the reader until `index` is buffered.
    ///
    /// Returns `false` if the stream faulted, was cancelled, or another
    /// reader consumed `index` first.
    pub fn wait_arrival<F>(
        &self,
        state: &mut MutexGuard<'_, PipelineState<F>>,
        index: FrameIndex,
        cancel: &CancelToken,
    ) -> bool {
        while !state.buffer.contains(index) && state.consumed <= index.0 && state.is_live(cancel) {
            self.arrival.wait(state);
        }
        state.buffer.contains(index)
    }

    /// A frame was buffered. The reader cannot know which handler will
    /// satisfy its wait, so every waiter is woken.
    #[inline]
    pub fn announce_arrival(&self) {
        self.arrival.notify_all();
    }

    /// Wake both sides, e.g. after a fault or cancellation.
    pub fn wake_all(&self) {
        self.throttle.notify_all();
        self.arrival.notify_all();
    }
}
