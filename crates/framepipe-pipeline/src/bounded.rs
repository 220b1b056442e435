//! Bounded-synchronous reader: one request per read.

use crate::cancel::CancelToken;
use crate::config::PipelineConfig;
use crate::deliver::deliver;
use crate::gate::PipelineStats;
use crate::permits::PermitGate;
use crate::source::{FrameSource, RenderError};
use crossbeam_channel::{bounded, select, Receiver};
use framepipe_core::{FrameIndex, FramePipeError, Picture, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

type Delivery<F> = (FrameIndex, std::result::Result<F, RenderError>);

/// Reader that renders each frame on demand.
///
/// Any index order is accepted and several threads may read at once; the
/// number of renders in flight never exceeds the source's concurrency.
pub struct BoundedReader<S: FrameSource> {
    source: Arc<S>,
    permits: PermitGate,
    cancel: CancelToken,
    total: usize,
    requested: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl<S: FrameSource> BoundedReader<S> {
    pub fn start(source: Arc<S>, config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        let info = source.info();
        let total = info.num_frames;
        let capacity = info.concurrency.max(1);
        let cancel = CancelToken::new();
        let permits = PermitGate::new(capacity, &cancel);
        info!(total, capacity, "Starting bounded frame reader");

        Ok(Self {
            source,
            permits,
            cancel,
            total,
            requested: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        })
    }

    /// Render frame `index` and copy it into `picture`.
    pub fn read(&self, index: FrameIndex, picture: &mut Picture) -> Result<()> {
        if index.0 >= self.total {
            return Err(FramePipeError::OutOfRange {
                index,
                total: self.total,
            });
        }
        if self.cancel.is_cancelled() {
            return Err(FramePipeError::Cancelled);
        }

        let frame = {
            let _permit = self
                .permits
                .acquire(&self.cancel)
                .ok_or(FramePipeError::Cancelled)?;
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            let fetched = self.fetch(index);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            fetched?
        };

        let result = deliver(&frame, picture);
        self.source.release_frame(frame);
        result
    }

    /// Issue one request and wait for its completion or cancellation.
    fn fetch(&self, index: FrameIndex) -> Result<S::Frame> {
        let (tx, rx) = bounded(1);
        // Set once the reader stops listening. Completions check it and send
        // under the same lock, so no frame is left behind in the channel.
        let abandoned = Arc::new(Mutex::new(false));
        let handoff = Arc::clone(&abandoned);
        let source = Arc::clone(&self.source);
        self.requested.fetch_add(1, Ordering::SeqCst);
        debug!(%index, "Requesting frame");
        self.source.request_frame(
            index,
            self.cancel.clone(),
            Box::new(move |completed, result| {
                let gone = handoff.lock();
                let unsent = if *gone {
                    Some(result)
                } else {
                    tx.try_send((completed, result))
                        .err()
                        .map(|err| err.into_inner().1)
                };
                drop(gone);
                if let Some(Ok(frame)) = unsent {
                    source.release_frame(frame);
                }
            }),
        );

        let cancelled = self.cancel.channel();
        let message = select! {
            recv(rx) -> message => message.ok(),
            recv(cancelled) -> _ => None,
        };
        self.abandon(&abandoned, &rx);
        let Some((completed, result)) = message else {
            return Err(self.halt_error(index));
        };

        match result {
            Ok(frame) if completed == index => Ok(frame),
            Ok(frame) => {
                warn!(%index, %completed, "Source completed a different frame than requested");
                self.source.release_frame(frame);
                Err(FramePipeError::UnexpectedCompletion(completed))
            }
            Err(RenderError::Cancelled) => Err(FramePipeError::Cancelled),
            Err(RenderError::Failed(message)) => Err(FramePipeError::SourceFailed { index, message }),
        }
    }

    /// Stop listening for completions of one request and release whatever
    /// is still queued. Later completions release their own frames.
    fn abandon(&self, abandoned: &Mutex<bool>, rx: &Receiver<Delivery<S::Frame>>) {
        let late: Vec<_> = {
            let mut gone = abandoned.lock();
            *gone = true;
            rx.try_iter().collect()
        };
        for (completed, result) in late {
            if let Ok(frame) = result {
                debug!(%completed, "Releasing frame nobody is waiting for");
                self.source.release_frame(frame);
            }
        }
    }

    /// Error for a wait that ended without a completion.
    fn halt_error(&self, index: FrameIndex) -> FramePipeError {
        if self.cancel.is_cancelled() {
            FramePipeError::Cancelled
        } else {
            FramePipeError::SourceFailed {
                index,
                message: "completion dropped without a result".to_string(),
            }
        }
    }

    #[inline]
    pub fn total_frames(&self) -> usize {
        self.total
    }

    /// Maximum renders in flight.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.permits.capacity()
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn stats(&self) -> PipelineStats {
        let in_flight = self.in_flight.load(Ordering::SeqCst);
        PipelineStats {
            total: self.total,
            requested: self.requested.load(Ordering::SeqCst),
            consumed: self.requested.load(Ordering::SeqCst).saturating_sub(in_flight),
            buffered: 0,
            peak_backlog: self.peak_in_flight.load(Ordering::SeqCst),
            throttled: 0,
            high_water: self.capacity(),
            low_water: self.capacity(),
        }
    }
}

impl<S: FrameSource> Drop for BoundedReader<S> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
