//! Stream metadata reported to the caller at open.

use framepipe_core::{Csp, FrameRate, StreamInfo};
use serde::Serialize;

/// What an opened input looks like to its consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps_num: u32,
    pub fps_den: u32,
    pub num_frames: usize,
    /// Colorspace pictures must be allocated with.
    pub csp: Csp,
    /// Reads may come from any thread.
    pub thread_safe: bool,
    /// Frames the engine renders in parallel.
    pub concurrency: usize,
}

impl VideoInfo {
    pub fn new(info: &StreamInfo, csp: Csp) -> Self {
        Self {
            width: info.width,
            height: info.height,
            fps_num: info.frame_rate.numerator,
            fps_den: info.frame_rate.denominator,
            num_frames: info.num_frames,
            csp,
            thread_safe: true,
            concurrency: info.concurrency,
        }
    }

    pub fn frame_rate(&self) -> FrameRate {
        FrameRate::new(self.fps_num, self.fps_den)
    }
}
