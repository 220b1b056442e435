//! Sample depth normalization.
//!
//! Engines store 9..=15-bit samples right-justified in 16-bit slots, while the
//! encoder expects them left-justified. Normalizing is a left shift of every
//! sample by `16 - bit_depth`.

/// Samples processed per vector step.
pub const LANES: usize = 8;

/// Shift applied to samples of `bit_depth`, or `None` if the depth is stored
/// as-is (8 or 16 bits) or is outside the 16-bit slot range.
#[inline]
pub fn depth_shift(bit_depth: u8) -> Option<u32> {
    match bit_depth {
        9..=15 => Some(16 - bit_depth as u32),
        _ => None,
    }
}

/// Left-justify every sample of a 16-bit plane declared at `bit_depth`.
///
/// Planes at 8 or 16 bits are left untouched. Returns whether a shift was
/// applied.
pub fn normalize_depth(samples: &mut [u16], bit_depth: u8) -> bool {
    match depth_shift(bit_depth) {
        Some(shift) => {
            shift_left(samples, shift);
            true
        }
        None => false,
    }
}

/// Shift every sample left by `shift` bits.
///
/// Runs in fixed [`LANES`]-wide chunks the compiler can vectorize, then a
/// scalar loop over the remainder `[aligned_count, count)`.
pub fn shift_left(samples: &mut [u16], shift: u32) {
    let mut chunks = samples.chunks_exact_mut(LANES);
    for chunk in &mut chunks {
        for sample in chunk.iter_mut() {
            *sample <<= shift;
        }
    }
    for sample in chunks.into_remainder() {
        *sample <<= shift;
    }
}
