//! Deterministic test pattern frames.

use framepipe_core::{FrameIndex, PlaneRef, VideoFormat};
use framepipe_pipeline::SourceFrame;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Byte written into row padding, never part of a sample.
pub const PADDING_BYTE: u8 = 0xAA;

/// Sample value at `(x, y)` of `plane` in frame `index`, masked to `bits`.
///
/// Every plane and frame gets a distinct ramp, so misordered frames or
/// swapped planes show up in the output.
pub fn pattern_sample(index: usize, plane: usize, x: u32, y: u32, bits: u8) -> u16 {
    let value = (index as u64)
        .wrapping_mul(31)
        .wrapping_add(plane as u64 * 1021)
        .wrapping_add(u64::from(x) * 7)
        .wrapping_add(u64::from(y) * 13);
    let bits = bits.min(16);
    let mask = if bits == 16 {
        u16::MAX
    } else {
        (1u16 << bits) - 1
    };
    value as u16 & mask
}

/// Counts frames rendered but not yet released.
#[derive(Debug)]
pub(crate) struct FrameLease {
    outstanding: Arc<AtomicUsize>,
}

impl FrameLease {
    pub(crate) fn take(outstanding: &Arc<AtomicUsize>) -> Self {
        outstanding.fetch_add(1, Ordering::SeqCst);
        Self {
            outstanding: Arc::clone(outstanding),
        }
    }
}

impl Drop for FrameLease {
    fn drop(&mut self) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
struct PatternPlane {
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

/// A rendered pattern frame with padded rows.
#[derive(Debug)]
pub struct PatternFrame {
    index: FrameIndex,
    format: VideoFormat,
    planes: Vec<PatternPlane>,
    _lease: FrameLease,
}

impl PatternFrame {
    pub(crate) fn render(
        index: FrameIndex,
        format: VideoFormat,
        width: u32,
        height: u32,
        padding: usize,
        lease: FrameLease,
    ) -> Self {
        let bps = format.bytes_per_sample as usize;
        let planes = (0..format.num_planes as usize)
            .map(|p| {
                let (pw, ph) = if p == 0 {
                    (width, height)
                } else {
                    (width >> format.sub_sampling_w, height >> format.sub_sampling_h)
                };
                let stride = pw as usize * bps + padding;
                let mut data = vec![PADDING_BYTE; stride * ph as usize];
                for y in 0..ph {
                    let row = &mut data[y as usize * stride..][..pw as usize * bps];
                    for (x, sample) in row.chunks_exact_mut(bps).enumerate() {
                        let v = pattern_sample(index.0, p, x as u32, y, format.bits_per_sample);
                        if bps == 2 {
                            sample.copy_from_slice(&v.to_ne_bytes());
                        } else {
                            sample[0] = v as u8;
                        }
                    }
                }
                PatternPlane {
                    width: pw,
                    height: ph,
                    stride,
                    data,
                }
            })
            .collect();

        Self {
            index,
            format,
            planes,
            _lease: lease,
        }
    }

    pub fn index(&self) -> FrameIndex {
        self.index
    }
}

impl SourceFrame for PatternFrame {
    fn format(&self) -> &VideoFormat {
        &self.format
    }

    fn plane(&self, index: usize) -> Option<PlaneRef<'_>> {
        let role = self.format.plane_role(index)?;
        self.planes.get(index).map(|plane| PlaneRef {
            data: &plane.data,
            width: plane.width,
            height: plane.height,
            stride: plane.stride,
            bytes_per_sample: self.format.bytes_per_sample as usize,
            role,
        })
    }
}
