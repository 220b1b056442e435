//! Frames come out in index order whatever order the source finishes them.

use crate::support::{assert_yuv8_frame, clip_file, ManualSource};
use framepipe_core::{FrameIndex, FramePipeError};
use framepipe_input::{PatternHost, ScriptInput};
use framepipe_pipeline::{FrameReader, PipelineConfig};
use std::sync::Arc;
use std::thread;

// ── Hand-ordered completions ───────────────────────────────────

#[test]
fn shuffled_completions_are_read_in_order() {
    let source = ManualSource::new(5, 5);
    let reader = FrameReader::start(Arc::clone(&source), &PipelineConfig::default()).unwrap();
    assert_eq!(source.request_log(), vec![0, 1, 2, 3, 4]);

    for i in [2, 0, 4, 1, 3] {
        source.complete(i);
    }

    let mut pic = source.picture();
    for i in 0..5 {
        reader.read(FrameIndex(i), &mut pic).unwrap();
        assert_yuv8_frame(&pic, i);
    }
}

#[test]
fn initial_burst_is_capped_by_stream_length() {
    let source = ManualSource::new(3, 8);
    let _reader = FrameReader::start(Arc::clone(&source), &PipelineConfig::default()).unwrap();
    assert_eq!(source.request_log(), vec![0, 1, 2]);
}

#[test]
fn each_completion_issues_one_request() {
    let source = ManualSource::new(6, 2);
    let _reader = FrameReader::start(Arc::clone(&source), &PipelineConfig::default()).unwrap();
    assert_eq!(source.pending(), vec![0, 1]);

    source.complete(1);
    assert_eq!(source.pending(), vec![0, 2]);
    source.complete(0);
    assert_eq!(source.pending(), vec![2, 3]);
    assert_eq!(source.request_log(), vec![0, 1, 2, 3]);
}

#[test]
fn reader_waits_while_newest_requests_finish_first() {
    let source = ManualSource::new(5, 2);
    let reader = Arc::new(
        FrameReader::start(Arc::clone(&source), &PipelineConfig::default()).unwrap(),
    );

    let consumer = {
        let reader = Arc::clone(&reader);
        let mut pic = source.picture();
        thread::spawn(move || {
            for i in 0..5 {
                reader.read(FrameIndex(i), &mut pic)?;
                assert_yuv8_frame(&pic, i);
            }
            Ok::<_, FramePipeError>(())
        })
    };

    // Always finish the newest outstanding request: 1, 2, 3, 4, then 0.
    let mut arrivals = Vec::new();
    while let Some(&newest) = source.pending().last() {
        source.complete(newest);
        arrivals.push(newest);
    }
    assert_eq!(arrivals, vec![1, 2, 3, 4, 0]);
    consumer.join().unwrap().unwrap();
    assert_eq!(reader.stats().consumed, 5);
}

// ── Real engine ────────────────────────────────────────────────

#[test]
fn jittered_engine_delivers_every_frame_in_order() {
    let file = clip_file(
        r#"{ "width": 16, "height": 8, "frames": 60, "family": "yuv",
             "subsampling": [0, 0], "threads": 4, "jitter_ms": 3 }"#,
    );
    let (info, handle) = ScriptInput::new(PatternHost).open(file.path()).unwrap();
    let mut pic = handle
        .allocate_picture(info.csp, info.width, info.height)
        .unwrap();
    for i in 0..info.num_frames {
        handle.read_frame(&mut pic, i).unwrap();
        assert_yuv8_frame(&pic, i);
    }
    handle.close();
}

#[test]
fn counters_stay_ordered_throughout() {
    let file = clip_file(r#"{ "width": 8, "height": 8, "frames": 40, "threads": 3, "jitter_ms": 1 }"#);
    let (info, handle) = ScriptInput::new(PatternHost).open(file.path()).unwrap();
    let mut pic = handle
        .allocate_picture(info.csp, info.width, info.height)
        .unwrap();
    for i in 0..info.num_frames {
        handle.read_frame(&mut pic, i).unwrap();
        let stats = handle.stats();
        assert!(stats.consumed <= stats.requested);
        assert!(stats.requested <= stats.total);
        assert_eq!(stats.consumed, i + 1);
    }
}
