//! Copy a source frame into the consumer's picture.

use crate::source::SourceFrame;
use framepipe_core::{normalize_depth, ColorFamily, FramePipeError, Picture, Result};

/// Destination plane `i` is filled from source plane `RGB_REMAP[i]`, giving
/// the G, B, R plane order planar RGB pictures use.
pub const RGB_REMAP: [usize; 3] = [1, 2, 0];

/// Source plane feeding destination plane `dest` for `family`.
#[inline]
pub fn source_plane_for(family: ColorFamily, dest: usize) -> usize {
    match family {
        ColorFamily::Rgb => RGB_REMAP.get(dest).copied().unwrap_or(dest),
        _ => dest,
    }
}

/// Copy every plane of `frame` into `picture`, then left-justify samples of
/// 9..=15-bit formats.
pub fn deliver<F: SourceFrame>(frame: &F, picture: &mut Picture) -> Result<()> {
    let format = *frame.format();
    let num_planes = format.num_planes as usize;
    if num_planes > picture.planes().len() {
        return Err(FramePipeError::PlaneMismatch(format!(
            "frame has {} planes, picture has {}",
            num_planes,
            picture.planes().len()
        )));
    }

    for dest in 0..num_planes {
        let src_index = source_plane_for(format.color_family, dest);
        let src = frame.plane(src_index).ok_or_else(|| {
            FramePipeError::PlaneMismatch(format!("frame is missing plane {src_index}"))
        })?;
        let expected = format.plane_role(src_index);
        if expected != Some(src.role) {
            return Err(FramePipeError::PlaneMismatch(format!(
                "plane {src_index} carries {:?}, expected {:?}",
                src.role, expected
            )));
        }
        let dst = picture
            .plane_mut(dest)
            .ok_or_else(|| FramePipeError::PlaneMismatch(format!("picture is missing plane {dest}")))?;
        dst.copy_from(&src)?;

        if format.needs_depth_normalization() {
            let samples = dst.samples_mut().ok_or_else(|| {
                FramePipeError::PlaneMismatch(format!(
                    "{}-bit samples need 16-bit storage",
                    format.bits_per_sample
                ))
            })?;
            normalize_depth(samples, format.bits_per_sample);
        }
    }
    Ok(())
}
