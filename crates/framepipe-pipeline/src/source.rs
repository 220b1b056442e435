//! The boundary to the asynchronous frame-producing engine.

use crate::cancel::CancelToken;
use framepipe_core::{FrameIndex, PlaneRef, StreamInfo, VideoFormat};
use thiserror::Error;

/// Why the engine could not produce a frame.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("{0}")]
    Failed(String),
    #[error("request cancelled")]
    Cancelled,
}

/// Callback invoked exactly once per request, from an engine worker thread.
pub type Completion<F> = Box<dyn FnOnce(FrameIndex, Result<F, RenderError>) + Send + 'static>;

/// A rendered frame owned by the engine until released.
pub trait SourceFrame: Send + 'static {
    fn format(&self) -> &VideoFormat;

    /// Plane `index` in the engine's natural order.
    fn plane(&self, index: usize) -> Option<PlaneRef<'_>>;
}

/// An engine that renders frames asynchronously on its own worker threads.
///
/// Completions may arrive in any order and on any thread. At most
/// [`StreamInfo::concurrency`] requests are rendered at once.
pub trait FrameSource: Send + Sync + 'static {
    type Frame: SourceFrame;

    /// Stream metadata, constant for the lifetime of the source.
    fn info(&self) -> &StreamInfo;

    /// Begin rendering `index`. `done` is invoked once the frame is ready,
    /// failed, or the request was abandoned because `cancel` fired.
    fn request_frame(&self, index: FrameIndex, cancel: CancelToken, done: Completion<Self::Frame>);

    /// Hand a frame back to the engine once its pixels have been copied out.
    fn release_frame(&self, frame: Self::Frame) {
        drop(frame);
    }
}
