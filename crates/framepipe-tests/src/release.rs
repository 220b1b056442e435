//! Every frame a source hands out goes back exactly once.

use crate::support::{clip_file, eventually, ManualSource};
use framepipe_core::FrameIndex;
use framepipe_input::{PatternHost, ScriptInput};
use framepipe_pipeline::{FrameReader, PipelineConfig};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn read_frames_are_released_after_copy_out() {
    let source = ManualSource::new(3, 3);
    let reader = FrameReader::start(Arc::clone(&source), &PipelineConfig::default()).unwrap();
    for i in 0..3 {
        source.complete(i);
    }
    assert_eq!(source.live_frames(), 3);

    let mut pic = source.picture();
    reader.read(FrameIndex(0), &mut pic).unwrap();
    assert_eq!(source.released(), 1);
    assert_eq!(source.live_frames(), 2);
}

#[test]
fn close_releases_buffered_frames() {
    let source = ManualSource::new(5, 5);
    let reader = FrameReader::start(Arc::clone(&source), &PipelineConfig::default()).unwrap();
    for i in 0..5 {
        source.complete(i);
    }
    let mut pic = source.picture();
    reader.read(FrameIndex(0), &mut pic).unwrap();
    reader.read(FrameIndex(1), &mut pic).unwrap();

    reader.close();
    assert_eq!(source.released(), 5);
    assert_eq!(source.live_frames(), 0);
}

#[test]
fn full_read_leaves_nothing_outstanding() {
    let file = clip_file(r#"{ "width": 32, "height": 16, "frames": 25, "threads": 3, "jitter_ms": 2 }"#);
    let (info, handle) = ScriptInput::new(PatternHost).open(file.path()).unwrap();
    let engine = Arc::clone(handle.source());
    let mut pic = handle
        .allocate_picture(info.csp, info.width, info.height)
        .unwrap();
    for i in 0..info.num_frames {
        handle.read_frame(&mut pic, i).unwrap();
    }
    assert_eq!(engine.outstanding(), 0);
    assert_eq!(engine.rendered(), 25);

    handle.release_picture(pic);
    handle.close();
}

#[test]
fn early_close_leaves_nothing_outstanding() {
    let file = clip_file(r#"{ "width": 32, "height": 16, "frames": 200, "threads": 4, "jitter_ms": 1 }"#);
    let (info, handle) = ScriptInput::new(PatternHost).open(file.path()).unwrap();
    let engine = Arc::clone(handle.source());
    let mut pic = handle
        .allocate_picture(info.csp, info.width, info.height)
        .unwrap();
    for i in 0..3 {
        handle.read_frame(&mut pic, i).unwrap();
    }

    handle.close();
    assert!(eventually(Duration::from_secs(5), || engine.outstanding() == 0));
}
