//! Open a script as a sequential video input.

use crate::host::ScriptHost;
use crate::info::VideoInfo;
use framepipe_core::{Csp, FrameIndex, FramePipeError, Picture, Result};
use framepipe_pipeline::{CancelToken, FrameReader, FrameSource, PipelineConfig, PipelineStats, ReadMode};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Opens script files through a [`ScriptHost`].
#[derive(Debug, Clone)]
pub struct ScriptInput<H> {
    host: H,
    config: PipelineConfig,
}

impl<H: ScriptHost> ScriptInput<H> {
    pub fn new(host: H) -> Self {
        Self::with_config(host, PipelineConfig::default())
    }

    pub fn with_config(host: H, config: PipelineConfig) -> Self {
        Self { host, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Evaluate `path`, validate its output, and start reading.
    ///
    /// Nothing started here outlives a failed open.
    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<(VideoInfo, InputHandle<H::Source>)> {
        let path = path.as_ref();
        self.config.validate()?;

        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => {}
            _ => return Err(FramePipeError::NotRegularFile(path.to_path_buf())),
        }

        let source = self.host.evaluate(path)?;
        let stream = source.info().clone();
        info!(
            host = self.host.name(),
            threads = stream.concurrency,
            "Script evaluated"
        );

        let format = match stream.format {
            Some(format) if stream.is_constant_format() => format,
            _ => return Err(FramePipeError::VariableFormat),
        };
        let csp = Csp::from_format(&format)?;

        let (ss_w, ss_h) = csp.sub_sampling();
        if stream.width % (1 << ss_w) != 0 || stream.height % (1 << ss_h) != 0 {
            return Err(FramePipeError::UnsupportedFormat(format!(
                "{}x{} is not divisible by the {csp} chroma subsampling",
                stream.width, stream.height
            )));
        }
        if !stream.frame_rate.is_valid() {
            return Err(FramePipeError::InvalidParameter(format!(
                "frame rate {} is invalid",
                stream.frame_rate
            )));
        }

        let video = VideoInfo::new(&stream, csp);
        let reader = FrameReader::start(Arc::new(source), &self.config)?;
        info!(
            width = video.width,
            height = video.height,
            frames = video.num_frames,
            fps = %stream.frame_rate,
            csp = %csp,
            mode = ?reader.mode(),
            "Opened {}",
            path.display()
        );

        Ok((video, InputHandle { reader, info: video }))
    }
}

/// An open input. Dropping it is equivalent to [`InputHandle::close`].
pub struct InputHandle<S: FrameSource> {
    reader: FrameReader<S>,
    info: VideoInfo,
}

impl<S: FrameSource> InputHandle<S> {
    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    pub fn mode(&self) -> ReadMode {
        self.reader.mode()
    }

    pub fn source(&self) -> &Arc<S> {
        self.reader.source()
    }

    /// Allocate a picture to read frames into.
    pub fn allocate_picture(&self, csp: Csp, width: u32, height: u32) -> Result<Picture> {
        if width == 0 || height == 0 {
            return Err(FramePipeError::InvalidParameter(format!(
                "cannot allocate a {width}x{height} picture"
            )));
        }
        Ok(Picture::new(csp, width, height))
    }

    /// Fill `picture` with frame `index`.
    ///
    /// An index past the end is `OutOfRange` whatever picture is passed.
    pub fn read_frame(&self, picture: &mut Picture, index: usize) -> Result<()> {
        if index >= self.info.num_frames {
            return Err(FramePipeError::OutOfRange {
                index: FrameIndex(index),
                total: self.info.num_frames,
            });
        }
        if picture.csp() != self.info.csp
            || picture.width != self.info.width
            || picture.height != self.info.height
        {
            return Err(FramePipeError::InvalidParameter(format!(
                "picture is {} {}x{}, stream is {} {}x{}",
                picture.csp(),
                picture.width,
                picture.height,
                self.info.csp,
                self.info.width,
                self.info.height
            )));
        }
        self.reader.read(FrameIndex(index), picture)
    }

    pub fn release_picture(&self, picture: Picture) {
        debug!(bytes = picture.memory_size(), "Releasing picture");
        drop(picture);
    }

    pub fn stats(&self) -> PipelineStats {
        self.reader.stats()
    }

    /// Token that aborts pending and future reads.
    pub fn cancel_token(&self) -> CancelToken {
        self.reader.cancel_token()
    }

    /// Stop the stream and release every frame still held.
    pub fn close(self) {
        let stats = self.reader.stats();
        debug!(
            consumed = stats.consumed,
            requested = stats.requested,
            peak_backlog = stats.peak_backlog,
            "Closing input"
        );
        self.reader.close();
    }
}
