//! FramePipe Pipeline - Asynchronous frame source to sequential reader
//!
//! This crate turns an engine that renders frames out of order on its own
//! worker threads into a blocking, in-order reader:
//! - Windowed prefetch with a reorder buffer
//! - High/low-water producer throttling
//! - A bounded-synchronous mode for random access
//! - Cancellation that ends every wait
//! - Plane copy-out with RGB reordering and depth normalization

pub mod bounded;
pub mod cancel;
pub mod config;
pub mod deliver;
pub mod gate;
pub mod permits;
pub mod pipelined;
pub mod reader;
pub mod reorder;
pub mod scheduler;
pub mod source;

pub use bounded::BoundedReader;
pub use cancel::CancelToken;
pub use config::{PipelineConfig, ReadMode};
pub use deliver::{deliver, RGB_REMAP};
pub use gate::{BackpressureGate, PipelineState, PipelineStats, StreamFault};
pub use permits::PermitGate;
pub use pipelined::PipelinedReader;
pub use reader::FrameReader;
pub use reorder::ReorderBuffer;
pub use scheduler::PrefetchScheduler;
pub use source::{Completion, FrameSource, RenderError, SourceFrame};
