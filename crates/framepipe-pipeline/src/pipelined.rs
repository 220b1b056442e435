//! Windowed pipelined reader.
//!
//! Keeps `window` requests in flight ahead of the reader. Every completion
//! buffers its frame, wakes the reader, and (unless the backlog is too large)
//! issues the next request, so the source stays busy while the reader copies
//! frames out in strict index order.

use crate::cancel::CancelToken;
use crate::config::PipelineConfig;
use crate::deliver::deliver;
use crate::gate::{BackpressureGate, PipelineState, PipelineStats, StreamFault};
use crate::source::{FrameSource, RenderError};
use framepipe_core::{FrameIndex, FramePipeError, Picture, Result};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

struct Shared<S: FrameSource> {
    source: Arc<S>,
    state: Mutex<PipelineState<S::Frame>>,
    gate: BackpressureGate,
    cancel: CancelToken,
}

/// Sequential reader over an asynchronous source with prefetch and reordering.
pub struct PipelinedReader<S: FrameSource> {
    shared: Arc<Shared<S>>,
    total: usize,
    window: usize,
}

impl<S: FrameSource> PipelinedReader<S> {
    /// Start the pipeline and issue the initial burst of requests.
    pub fn start(source: Arc<S>, config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        let info = source.info();
        let total = info.num_frames;
        let window = config.window_for(info.concurrency);
        let (high_water, low_water) = config.water_marks(window);

        let cancel = CancelToken::new();
        let shared = Arc::new(Shared {
            source,
            state: Mutex::new(PipelineState::new(total)),
            gate: BackpressureGate::new(high_water, low_water),
            cancel: cancel.clone(),
        });

        let weak = Arc::downgrade(&shared);
        cancel.on_cancel(move || {
            if let Some(shared) = weak.upgrade() {
                // Taking the lock orders this wake after any in-progress
                // predicate check.
                let _state = shared.state.lock();
                shared.gate.wake_all();
            }
        });

        let burst = {
            let mut state = shared.state.lock();
            let burst = state.scheduler.initial_burst(window);
            state.note_backlog();
            burst
        };
        info!(
            total,
            window,
            high_water,
            low_water,
            "Starting pipelined frame reader"
        );
        for index in burst {
            issue(&shared, FrameIndex(index));
        }

        Ok(Self {
            shared,
            total,
            window,
        })
    }

    /// Copy frame `index` into `picture`.
    ///
    /// Frames must be read in increasing order starting at 0. Blocks until
    /// the frame has been rendered.
    pub fn read(&self, index: FrameIndex, picture: &mut Picture) -> Result<()> {
        let shared = &self.shared;
        // Keep throttled producers moving even if this call blocks.
        shared.gate.release_producer();

        if index.0 >= self.total {
            return Err(FramePipeError::OutOfRange {
                index,
                total: self.total,
            });
        }

        let frame = {
            let mut state = shared.state.lock();
            if let Some(err) = state.halt_error(&shared.cancel) {
                return Err(err);
            }
            if index.0 != state.consumed {
                return Err(FramePipeError::NonSequential {
                    index,
                    expected: FrameIndex(state.consumed),
                });
            }
            if !state.buffer.contains(index) {
                debug!(%index, backlog = state.backlog(), "Waiting for frame");
                shared.gate.wait_arrival(&mut state, index, &shared.cancel);
            }
            match state.buffer.take(index) {
                Some(frame) => {
                    state.consumed = index.0 + 1;
                    frame
                }
                None => return Err(halted_read(&state, index, &shared.cancel)),
            }
        };
        shared.gate.release_producer();

        let delivered = deliver(&frame, picture);
        shared.source.release_frame(frame);
        delivered
    }

    /// Number of frames in the stream.
    #[inline]
    pub fn total_frames(&self) -> usize {
        self.total
    }

    /// Requests kept in flight ahead of the reader.
    #[inline]
    pub fn window(&self) -> usize {
        self.window
    }

    pub fn source(&self) -> &Arc<S> {
        &self.shared.source
    }

    /// Token that aborts both the reader's wait and throttled producers.
    pub fn cancel_token(&self) -> CancelToken {
        self.shared.cancel.clone()
    }

    pub fn stats(&self) -> PipelineStats {
        self.shared.state.lock().stats(
            self.shared.gate.high_water(),
            self.shared.gate.low_water(),
        )
    }
}

impl<S: FrameSource> Drop for PipelinedReader<S> {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
        let buffered: Vec<_> = {
            let mut state = self.shared.state.lock();
            state.buffer.drain().map(|(_, frame)| frame).collect()
        };
        if !buffered.is_empty() {
            debug!(count = buffered.len(), "Releasing unread frames");
        }
        for frame in buffered {
            self.shared.source.release_frame(frame);
        }
    }
}

/// Error for a read whose wait ended without the frame.
fn halted_read<F>(state: &PipelineState<F>, index: FrameIndex, cancel: &CancelToken) -> FramePipeError {
    if let Some(err) = state.halt_error(cancel) {
        return err;
    }
    // Another caller consumed the frame while this one waited.
    FramePipeError::NonSequential {
        index,
        expected: FrameIndex(state.consumed),
    }
}

fn issue<S: FrameSource>(shared: &Arc<Shared<S>>, index: FrameIndex) {
    debug!(%index, "Requesting frame");
    let handler = Arc::clone(shared);
    shared.source.request_frame(
        index,
        shared.cancel.clone(),
        Box::new(move |completed, result| on_complete(&handler, completed, result)),
    );
}

/// Runs on a source worker thread for every finished request.
fn on_complete<S: FrameSource>(
    shared: &Arc<Shared<S>>,
    index: FrameIndex,
    result: std::result::Result<S::Frame, RenderError>,
) {
    let frame = match result {
        Ok(frame) => frame,
        Err(_) if shared.cancel.is_cancelled() => {
            debug!(%index, "Request abandoned after cancel");
            return;
        }
        Err(err) => {
            let mut state = shared.state.lock();
            state.record_fault(StreamFault::Source {
                index,
                message: err.to_string(),
            });
            drop(state);
            warn!(%index, error = %err, "Frame source failed; aborting stream");
            shared.gate.wake_all();
            return;
        }
    };

    let mut state = shared.state.lock();
    if !state.is_live(&shared.cancel) {
        drop(state);
        shared.source.release_frame(frame);
        return;
    }

    if !state.scheduler.was_requested(index) {
        abort(shared, state, StreamFault::Unexpected(index), frame);
        return;
    }
    if index.0 < state.consumed {
        abort(shared, state, StreamFault::Duplicate(index), frame);
        return;
    }
    if let Err(frame) = state.buffer.insert(index, frame) {
        abort(shared, state, StreamFault::Duplicate(index), frame);
        return;
    }
    debug!(%index, buffered = state.buffer.len(), "Frame completed");

    // Wake the reader before any throttle wait, so a blocked handler never
    // holds back the frame the reader needs.
    shared.gate.announce_arrival();

    if !shared.gate.throttle_producer(&mut state, &shared.cancel) {
        return;
    }
    // Checked and reserved under one lock: the backlog tops out at HWM + 1.
    let next = state.scheduler.reserve_next();
    state.note_backlog();
    drop(state);

    if let Some(next) = next {
        issue(shared, next);
    }
}

/// Record a protocol violation, release the offending frame, and wake
/// everyone so the stream stops instead of hanging.
fn abort<S: FrameSource>(
    shared: &Arc<Shared<S>>,
    mut state: MutexGuard<'_, PipelineState<S::Frame>>,
    fault: StreamFault,
    frame: S::Frame,
) {
    error!(fault = ?fault, "Frame source broke the completion protocol; aborting stream");
    state.record_fault(fault);
    drop(state);
    shared.source.release_frame(frame);
    shared.gate.wake_all();
}
