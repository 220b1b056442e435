//! FramePipe Core - Foundation types for the frame pipeline
//!
//! This crate provides the fundamental types used throughout FramePipe:
//! - Frame indices, borrowed source planes, and reusable pictures
//! - Video formats and destination colorspaces
//! - Frame rates
//! - Sample depth normalization
//! - The shared error type

pub mod depth;
pub mod error;
pub mod format;
pub mod frame;
pub mod time;

pub use depth::{depth_shift, normalize_depth};
pub use error::{ErrorCategory, FramePipeError, Result};
pub use format::{ColorFamily, Csp, CspKind, PlaneRole, SampleType, StreamInfo, VideoFormat};
pub use frame::{FrameIndex, Picture, PicturePlane, PlaneRef};
pub use time::FrameRate;

/// Backlog thresholds, as multiples of the source's parallelism.
pub mod backlog {
    /// Producer throttling starts above this many frames per worker.
    pub const HIGH_WATER_FACTOR: usize = 32;

    /// Throttled producers resume at or below this many frames per worker.
    pub const LOW_WATER_FACTOR: usize = 4;
}
