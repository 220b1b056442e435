//! Error types for FramePipe.

use crate::frame::FrameIndex;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for FramePipe operations.
#[derive(Error, Debug)]
pub enum FramePipeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("input is not a regular file: {}", .0.display())]
    NotRegularFile(PathBuf),

    #[error("script evaluation failed: {0}")]
    ScriptEvaluation(String),

    #[error("failed to retrieve output node: {0}")]
    NoOutput(String),

    #[error("unsupported color family: {0}")]
    UnsupportedColorFamily(String),

    #[error("cannot output clips with varying dimensions or format")]
    VariableFormat,

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("frame {index} out of range (stream has {total} frames)")]
    OutOfRange { index: FrameIndex, total: usize },

    #[error("frame {index} requested out of sequence (next frame is {expected})")]
    NonSequential { index: FrameIndex, expected: FrameIndex },

    #[error("frame {0} completed more than once")]
    DuplicateCompletion(FrameIndex),

    #[error("completion for frame {0} which was never requested")]
    UnexpectedCompletion(FrameIndex),

    #[error("source failed to render frame {index}: {message}")]
    SourceFailed { index: FrameIndex, message: String },

    #[error("plane layout mismatch: {0}")]
    PlaneMismatch(String),

    #[error("stream cancelled")]
    Cancelled,
}

/// Coarse failure classes, one diagnostic and exit code per class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The stream never started.
    Setup,
    /// A read addressed a frame outside the stream, or out of order.
    OutOfRange,
    /// The frame source broke its contract; the stream is aborted.
    Protocol,
    /// The stream was cancelled by the consumer.
    Cancelled,
}

impl ErrorCategory {
    /// Process exit code used by the command line front end.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Setup => 1,
            Self::OutOfRange => 2,
            Self::Protocol => 3,
            Self::Cancelled => 130,
        }
    }
}

impl FramePipeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Io(_)
            | Self::NotRegularFile(_)
            | Self::ScriptEvaluation(_)
            | Self::NoOutput(_)
            | Self::UnsupportedColorFamily(_)
            | Self::VariableFormat
            | Self::UnsupportedFormat(_)
            | Self::InvalidParameter(_) => ErrorCategory::Setup,
            Self::OutOfRange { .. } | Self::NonSequential { .. } => ErrorCategory::OutOfRange,
            Self::DuplicateCompletion(_)
            | Self::UnexpectedCompletion(_)
            | Self::SourceFailed { .. }
            | Self::PlaneMismatch(_) => ErrorCategory::Protocol,
            Self::Cancelled => ErrorCategory::Cancelled,
        }
    }
}

/// Result type alias for FramePipe operations.
pub type Result<T> = std::result::Result<T, FramePipeError>;
