//! Clip description files.

use framepipe_core::{
    ColorFamily, FramePipeError, FrameRate, Result, SampleType, StreamInfo, VideoFormat,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Description of a synthetic clip, read from a JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipSpec {
    pub width: u32,
    pub height: u32,
    /// Number of frames in the clip.
    pub frames: usize,
    pub fps: FrameRate,
    pub family: ColorFamily,
    pub sample_type: SampleType,
    /// Significant bits per sample.
    pub bits: u8,
    /// Log2 chroma subsampling, horizontal then vertical.
    pub subsampling: [u8; 2],
    /// Worker threads; 0 uses one per CPU.
    pub threads: usize,
    /// Extra bytes at the end of every source row.
    pub padding: usize,
    /// Upper bound on the per-frame render delay, in milliseconds.
    pub jitter_ms: u64,
    /// Frame whose render fails.
    pub fail_at: Option<usize>,
    /// Report dimensions and format as varying between frames.
    pub variable_format: bool,
}

impl Default for ClipSpec {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            frames: 24,
            fps: FrameRate::FPS_24,
            family: ColorFamily::Yuv,
            sample_type: SampleType::Integer,
            bits: 8,
            subsampling: [1, 1],
            threads: 0,
            padding: 0,
            jitter_ms: 0,
            fail_at: None,
            variable_format: false,
        }
    }
}

impl ClipSpec {
    /// Read and parse a clip file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
            .map_err(|e| FramePipeError::ScriptEvaluation(format!("{}: {e}", path.display())))
    }

    /// Parse a clip description.
    pub fn parse(text: &str) -> Result<Self> {
        let spec: Self = serde_json::from_str(text)
            .map_err(|e| FramePipeError::ScriptEvaluation(e.to_string()))?;
        spec.validate()?;
        Ok(spec)
    }

    /// Reject descriptions the engine cannot render.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(FramePipeError::ScriptEvaluation(format!(
                "clip dimensions {}x{} are empty",
                self.width, self.height
            )));
        }
        if self.bits == 0 || self.bits > 32 {
            return Err(FramePipeError::ScriptEvaluation(format!(
                "{} bits per sample",
                self.bits
            )));
        }
        if self.subsampling.iter().any(|&s| s > 4) {
            return Err(FramePipeError::ScriptEvaluation(format!(
                "subsampling {:?} is too large",
                self.subsampling
            )));
        }
        if !self.fps.is_valid() {
            return Err(FramePipeError::ScriptEvaluation(format!(
                "frame rate {} is invalid",
                self.fps
            )));
        }
        Ok(())
    }

    /// Format every rendered frame carries.
    pub fn format(&self) -> VideoFormat {
        let mut format =
            VideoFormat::new(self.family, self.bits, self.subsampling[0], self.subsampling[1]);
        format.sample_type = self.sample_type;
        format
    }

    /// Worker thread count after resolving the "one per CPU" default.
    pub fn resolved_threads(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get().max(1)
        } else {
            self.threads
        }
    }

    /// Stream metadata as the engine reports it.
    pub fn stream_info(&self) -> StreamInfo {
        let (width, height, format) = if self.variable_format {
            (0, 0, None)
        } else {
            (self.width, self.height, Some(self.format()))
        };
        StreamInfo {
            width,
            height,
            frame_rate: self.fps,
            num_frames: self.frames,
            format,
            concurrency: self.resolved_threads(),
        }
    }

    /// Render delay for `index`, deterministic and bounded by `jitter_ms`.
    pub fn jitter_for(&self, index: usize) -> Duration {
        if self.jitter_ms == 0 {
            return Duration::ZERO;
        }
        // xorshift64* over the index
        let mut x = (index as u64).wrapping_add(0x9E37_79B9_7F4A_7C15);
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        let r = x.wrapping_mul(0x2545_F491_4F6C_DD1D);
        Duration::from_micros(r % (self.jitter_ms * 1000 + 1))
    }
}
