//! Frame indices, borrowed source planes, and consumer-owned pictures.
//!
//! A [`Picture`] is allocated once per stream and reused for every read. Its
//! planes are tightly packed (stride equals row size) and backed by 16-bit
//! storage so high-depth samples can be addressed as `u16` without
//! realignment.

use crate::error::{FramePipeError, Result};
use crate::format::{Csp, PlaneRole};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Position of a frame in the stream. Keys requests, completions and reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FrameIndex(pub usize);

impl fmt::Display for FrameIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<usize> for FrameIndex {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

/// A read-only view of one plane of a source frame.
#[derive(Debug, Clone, Copy)]
pub struct PlaneRef<'a> {
    /// Raw pixel data starting at the first row
    pub data: &'a [u8],
    /// Width in samples
    pub width: u32,
    /// Height in rows
    pub height: u32,
    /// Bytes per row, may include padding
    pub stride: usize,
    pub bytes_per_sample: usize,
    pub role: PlaneRole,
}

impl<'a> PlaneRef<'a> {
    /// Bytes of sample data in one row, excluding padding.
    #[inline]
    pub fn row_size(&self) -> usize {
        self.width as usize * self.bytes_per_sample
    }

    /// Whether rows are packed without padding.
    #[inline]
    pub fn is_tight(&self) -> bool {
        self.stride == self.row_size()
    }

    /// Get a row of sample data, padding excluded.
    #[inline]
    pub fn row(&self, y: u32) -> &'a [u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.row_size()]
    }

    /// Check that the declared layout fits in `data`.
    pub fn validate(&self) -> Result<()> {
        let row_size = self.row_size();
        if self.stride < row_size {
            return Err(FramePipeError::PlaneMismatch(format!(
                "stride {} smaller than row size {}",
                self.stride, row_size
            )));
        }
        let needed = match self.height {
            0 => 0,
            h => self.stride * (h as usize - 1) + row_size,
        };
        if self.data.len() < needed {
            return Err(FramePipeError::PlaneMismatch(format!(
                "plane holds {} bytes, layout needs {}",
                self.data.len(),
                needed
            )));
        }
        Ok(())
    }
}

/// One tightly packed plane of a [`Picture`].
#[derive(Debug, Clone)]
pub struct PicturePlane {
    /// Width in samples
    pub width: u32,
    /// Height in rows
    pub height: u32,
    bytes_per_sample: usize,
    storage: Vec<u16>,
}

impl PicturePlane {
    /// Create a zeroed plane.
    pub fn new(width: u32, height: u32, bytes_per_sample: usize) -> Self {
        let len = width as usize * height as usize * bytes_per_sample;
        Self {
            width,
            height,
            bytes_per_sample,
            storage: vec![0u16; len.div_ceil(2)],
        }
    }

    #[inline]
    pub fn bytes_per_sample(&self) -> usize {
        self.bytes_per_sample
    }

    /// Bytes per row. Destination planes carry no padding.
    #[inline]
    pub fn row_size(&self) -> usize {
        self.width as usize * self.bytes_per_sample
    }

    #[inline]
    pub fn len_bytes(&self) -> usize {
        self.row_size() * self.height as usize
    }

    /// Sample data as bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u16, u8>(self.storage.as_slice())[..self.len_bytes()]
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        let len = self.len_bytes();
        &mut bytemuck::cast_slice_mut::<u16, u8>(self.storage.as_mut_slice())[..len]
    }

    /// 16-bit samples, if this plane stores two bytes per sample.
    pub fn samples(&self) -> Option<&[u16]> {
        (self.bytes_per_sample == 2)
            .then(|| &self.storage[..self.width as usize * self.height as usize])
    }

    pub fn samples_mut(&mut self) -> Option<&mut [u16]> {
        let count = self.width as usize * self.height as usize;
        (self.bytes_per_sample == 2).then(|| &mut self.storage[..count])
    }

    /// Get a row of sample data.
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let row_size = self.row_size();
        let start = y as usize * row_size;
        &self.as_bytes()[start..start + row_size]
    }

    /// Copy `src` into this plane, dropping any stride padding.
    pub fn copy_from(&mut self, src: &PlaneRef<'_>) -> Result<()> {
        src.validate()?;
        if src.width != self.width
            || src.height != self.height
            || src.bytes_per_sample != self.bytes_per_sample
        {
            return Err(FramePipeError::PlaneMismatch(format!(
                "source plane {}x{}@{}B does not match destination {}x{}@{}B",
                src.width,
                src.height,
                src.bytes_per_sample,
                self.width,
                self.height,
                self.bytes_per_sample
            )));
        }

        let row_size = self.row_size();
        let dst = self.as_bytes_mut();
        if src.is_tight() {
            dst.copy_from_slice(&src.data[..dst.len()]);
        } else if row_size > 0 {
            for (y, dst_row) in dst.chunks_exact_mut(row_size).enumerate() {
                dst_row.copy_from_slice(src.row(y as u32));
            }
        }
        Ok(())
    }
}

/// Consumer-owned output buffer, reused across reads.
#[derive(Debug, Clone)]
pub struct Picture {
    csp: Csp,
    /// Picture width in pixels
    pub width: u32,
    /// Picture height in pixels
    pub height: u32,
    planes: SmallVec<[PicturePlane; 3]>,
}

impl Picture {
    /// Allocate a picture laid out for `csp`.
    pub fn new(csp: Csp, width: u32, height: u32) -> Self {
        let bps = csp.bytes_per_sample();
        let planes = (0..csp.plane_count())
            .map(|i| {
                let (w, h) = csp.plane_dimensions(i, width, height);
                PicturePlane::new(w, h, bps)
            })
            .collect();
        Self {
            csp,
            width,
            height,
            planes,
        }
    }

    #[inline]
    pub fn csp(&self) -> Csp {
        self.csp
    }

    #[inline]
    pub fn planes(&self) -> &[PicturePlane] {
        &self.planes
    }

    #[inline]
    pub fn planes_mut(&mut self) -> &mut [PicturePlane] {
        &mut self.planes
    }

    pub fn plane(&self, index: usize) -> Option<&PicturePlane> {
        self.planes.get(index)
    }

    pub fn plane_mut(&mut self, index: usize) -> Option<&mut PicturePlane> {
        self.planes.get_mut(index)
    }

    /// Total bytes of sample data across planes.
    pub fn memory_size(&self) -> usize {
        self.planes.iter().map(|p| p.len_bytes()).sum()
    }
}
