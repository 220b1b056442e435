//! Video format description and output colorspace mapping.

use crate::error::{FramePipeError, Result};
use crate::time::FrameRate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Color family of a stream as reported by the rendering engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorFamily {
    #[default]
    Yuv,
    Rgb,
    Gray,
    /// Packed legacy formats the engine may expose.
    Compat,
}

impl fmt::Display for ColorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Yuv => "YUV",
            Self::Rgb => "RGB",
            Self::Gray => "Gray",
            Self::Compat => "Compat",
        };
        f.write_str(name)
    }
}

/// How a sample is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    #[default]
    Integer,
    Float,
}

/// What a plane carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaneRole {
    Luma,
    ChromaBlue,
    ChromaRed,
    Red,
    Green,
    Blue,
    Gray,
}

/// Per-frame sample format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoFormat {
    pub color_family: ColorFamily,
    pub sample_type: SampleType,
    /// Significant bits per sample.
    pub bits_per_sample: u8,
    /// Storage bytes per sample (1 for 8-bit, 2 for 9..=16-bit).
    pub bytes_per_sample: u8,
    /// Horizontal chroma subsampling as a log2 shift.
    pub sub_sampling_w: u8,
    /// Vertical chroma subsampling as a log2 shift.
    pub sub_sampling_h: u8,
    pub num_planes: u8,
}

impl VideoFormat {
    /// Planar integer format with storage width derived from `bits`.
    pub fn new(color_family: ColorFamily, bits: u8, sub_sampling_w: u8, sub_sampling_h: u8) -> Self {
        let num_planes = if color_family == ColorFamily::Gray { 1 } else { 3 };
        Self {
            color_family,
            sample_type: SampleType::Integer,
            bits_per_sample: bits,
            bytes_per_sample: if bits > 8 { 2 } else { 1 },
            sub_sampling_w,
            sub_sampling_h,
            num_planes,
        }
    }

    pub fn yuv420(bits: u8) -> Self {
        Self::new(ColorFamily::Yuv, bits, 1, 1)
    }

    pub fn yuv422(bits: u8) -> Self {
        Self::new(ColorFamily::Yuv, bits, 1, 0)
    }

    pub fn yuv444(bits: u8) -> Self {
        Self::new(ColorFamily::Yuv, bits, 0, 0)
    }

    pub fn rgb(bits: u8) -> Self {
        Self::new(ColorFamily::Rgb, bits, 0, 0)
    }

    /// Role of plane `index` in this format's natural plane order.
    pub fn plane_role(&self, index: usize) -> Option<PlaneRole> {
        if index >= self.num_planes as usize {
            return None;
        }
        let role = match (self.color_family, index) {
            (ColorFamily::Rgb, 0) => PlaneRole::Red,
            (ColorFamily::Rgb, 1) => PlaneRole::Green,
            (ColorFamily::Rgb, _) => PlaneRole::Blue,
            (ColorFamily::Gray, _) => PlaneRole::Gray,
            (_, 0) => PlaneRole::Luma,
            (_, 1) => PlaneRole::ChromaBlue,
            (_, _) => PlaneRole::ChromaRed,
        };
        Some(role)
    }

    /// Whether samples are stored in 16-bit slots but not byte aligned (9..=15 bits).
    #[inline]
    pub fn needs_depth_normalization(&self) -> bool {
        self.bits_per_sample > 8 && self.bits_per_sample % 8 != 0
    }
}

/// Destination plane layout family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CspKind {
    I420,
    I422,
    I444,
    /// Planar RGB, stored in G, B, R plane order.
    Rgb,
}

/// Colorspace of the consumer-owned picture buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Csp {
    pub kind: CspKind,
    /// Samples are 16-bit (depth above 8).
    pub high_depth: bool,
}

impl Csp {
    pub const fn new(kind: CspKind, high_depth: bool) -> Self {
        Self { kind, high_depth }
    }

    /// Map an engine format onto a destination colorspace.
    pub fn from_format(format: &VideoFormat) -> Result<Self> {
        if format.sample_type != SampleType::Integer {
            return Err(FramePipeError::UnsupportedFormat(
                "floating point samples".to_string(),
            ));
        }
        if !(8..=16).contains(&format.bits_per_sample) {
            return Err(FramePipeError::UnsupportedFormat(format!(
                "{} bits per sample",
                format.bits_per_sample
            )));
        }

        let kind = match format.color_family {
            ColorFamily::Yuv => match (format.sub_sampling_w, format.sub_sampling_h) {
                (1, 1) => CspKind::I420,
                (1, 0) => CspKind::I422,
                (0, 0) => CspKind::I444,
                (w, h) => {
                    return Err(FramePipeError::UnsupportedFormat(format!(
                        "chroma subsampling {w}x{h}"
                    )))
                }
            },
            ColorFamily::Rgb => {
                if format.sub_sampling_w != 0 || format.sub_sampling_h != 0 {
                    return Err(FramePipeError::UnsupportedFormat(
                        "subsampled RGB".to_string(),
                    ));
                }
                CspKind::Rgb
            }
            other => return Err(FramePipeError::UnsupportedColorFamily(other.to_string())),
        };

        Ok(Self::new(kind, format.bits_per_sample > 8))
    }

    pub fn plane_count(self) -> usize {
        3
    }

    #[inline]
    pub fn bytes_per_sample(self) -> usize {
        if self.high_depth {
            2
        } else {
            1
        }
    }

    /// Log2 chroma subsampling (horizontal, vertical).
    pub fn sub_sampling(self) -> (u8, u8) {
        match self.kind {
            CspKind::I420 => (1, 1),
            CspKind::I422 => (1, 0),
            CspKind::I444 | CspKind::Rgb => (0, 0),
        }
    }

    /// Dimensions in samples of plane `index` for a `width` x `height` picture.
    pub fn plane_dimensions(self, index: usize, width: u32, height: u32) -> (u32, u32) {
        if index == 0 {
            return (width, height);
        }
        let (sw, sh) = self.sub_sampling();
        (width >> sw, height >> sh)
    }
}

impl fmt::Display for Csp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.kind {
            CspKind::I420 => "i420",
            CspKind::I422 => "i422",
            CspKind::I444 => "i444",
            CspKind::Rgb => "rgb",
        };
        if self.high_depth {
            write!(f, "{name} (16-bit)")
        } else {
            f.write_str(name)
        }
    }
}

/// Stream metadata read once when the stream is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Frame width, or 0 if it varies between frames.
    pub width: u32,
    /// Frame height, or 0 if it varies between frames.
    pub height: u32,
    pub frame_rate: FrameRate,
    pub num_frames: usize,
    /// `None` if the format varies between frames.
    pub format: Option<VideoFormat>,
    /// Number of frames the engine can render in parallel.
    pub concurrency: usize,
}

impl StreamInfo {
    /// Same dimensions and format on every frame.
    pub fn is_constant_format(&self) -> bool {
        self.format.is_some() && self.width > 0 && self.height > 0
    }
}
