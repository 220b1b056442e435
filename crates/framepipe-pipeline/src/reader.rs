//! Mode-selecting front end over the two readers.

use crate::bounded::BoundedReader;
use crate::cancel::CancelToken;
use crate::config::{PipelineConfig, ReadMode};
use crate::gate::PipelineStats;
use crate::pipelined::PipelinedReader;
use crate::source::FrameSource;
use framepipe_core::{FrameIndex, Picture, Result, StreamInfo};
use std::sync::Arc;

/// A started reader in either mode.
pub enum FrameReader<S: FrameSource> {
    Pipelined(PipelinedReader<S>),
    Bounded(BoundedReader<S>),
}

impl<S: FrameSource> FrameReader<S> {
    /// Start the reader `config` selects for `source`.
    pub fn start(source: Arc<S>, config: &PipelineConfig) -> Result<Self> {
        Ok(match config.mode_for(source.info().concurrency) {
            ReadMode::Pipelined => Self::Pipelined(PipelinedReader::start(source, config)?),
            ReadMode::Bounded => Self::Bounded(BoundedReader::start(source, config)?),
        })
    }

    pub fn read(&self, index: FrameIndex, picture: &mut Picture) -> Result<()> {
        match self {
            Self::Pipelined(reader) => reader.read(index, picture),
            Self::Bounded(reader) => reader.read(index, picture),
        }
    }

    pub fn mode(&self) -> ReadMode {
        match self {
            Self::Pipelined(_) => ReadMode::Pipelined,
            Self::Bounded(_) => ReadMode::Bounded,
        }
    }

    pub fn info(&self) -> &StreamInfo {
        self.source().info()
    }

    pub fn source(&self) -> &Arc<S> {
        match self {
            Self::Pipelined(reader) => reader.source(),
            Self::Bounded(reader) => reader.source(),
        }
    }

    pub fn total_frames(&self) -> usize {
        match self {
            Self::Pipelined(reader) => reader.total_frames(),
            Self::Bounded(reader) => reader.total_frames(),
        }
    }

    pub fn cancel_token(&self) -> CancelToken {
        match self {
            Self::Pipelined(reader) => reader.cancel_token(),
            Self::Bounded(reader) => reader.cancel_token(),
        }
    }

    /// Abort pending and future reads.
    pub fn cancel(&self) {
        self.cancel_token().cancel();
    }

    pub fn stats(&self) -> PipelineStats {
        match self {
            Self::Pipelined(reader) => reader.stats(),
            Self::Bounded(reader) => reader.stats(),
        }
    }

    /// Stop the stream and release every frame still held.
    pub fn close(self) {
        drop(self);
    }
}
