//! Open failures, bad reads, and source protocol violations.

use crate::support::{assert_yuv8_frame, clip_file, ManualSource};
use framepipe_core::{ErrorCategory, FrameIndex, FramePipeError};
use framepipe_input::{PatternHost, ScriptInput};
use framepipe_media::{ClipSpec, PatternEngine};
use framepipe_pipeline::{FrameReader, PipelineConfig};
use std::sync::Arc;

fn open_err(json: &str) -> FramePipeError {
    let file = clip_file(json);
    match ScriptInput::new(PatternHost).open(file.path()) {
        Ok(_) => panic!("open should fail for {json}"),
        Err(e) => e,
    }
}

// ── Open failures ──────────────────────────────────────────────

#[test]
fn directory_is_rejected_before_evaluation() {
    let dir = tempfile::tempdir().unwrap();
    let err = ScriptInput::new(PatternHost).open(dir.path()).err().unwrap();
    assert!(matches!(err, FramePipeError::NotRegularFile(_)));
    assert_eq!(err.category(), ErrorCategory::Setup);
    assert_eq!(err.category().exit_code(), 1);
}

#[test]
fn missing_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let err = ScriptInput::new(PatternHost)
        .open(dir.path().join("missing.json"))
        .err()
        .unwrap();
    assert!(matches!(err, FramePipeError::NotRegularFile(_)));
}

#[test]
fn malformed_script_fails_evaluation() {
    assert!(matches!(
        open_err(r#"{ "width": 64, "#),
        FramePipeError::ScriptEvaluation(_)
    ));
}

#[test]
fn gray_clip_is_unsupported_family() {
    let err = open_err(r#"{ "family": "gray", "threads": 1 }"#);
    assert!(matches!(err, FramePipeError::UnsupportedColorFamily(_)));
    assert_eq!(err.category(), ErrorCategory::Setup);
}

#[test]
fn compat_clip_is_unsupported_family() {
    assert!(matches!(
        open_err(r#"{ "family": "compat", "threads": 1 }"#),
        FramePipeError::UnsupportedColorFamily(_)
    ));
}

#[test]
fn variable_format_is_rejected() {
    assert!(matches!(
        open_err(r#"{ "variable_format": true, "threads": 1 }"#),
        FramePipeError::VariableFormat
    ));
}

#[test]
fn unsupported_sample_formats_are_rejected() {
    for json in [
        r#"{ "sample_type": "float", "bits": 32, "threads": 1 }"#,
        r#"{ "bits": 20, "threads": 1 }"#,
        r#"{ "bits": 6, "threads": 1 }"#,
        r#"{ "subsampling": [2, 2], "threads": 1 }"#,
        r#"{ "family": "rgb", "subsampling": [1, 1], "threads": 1 }"#,
    ] {
        assert!(
            matches!(open_err(json), FramePipeError::UnsupportedFormat(_)),
            "{json}"
        );
    }
}

// ── Reads ──────────────────────────────────────────────────────

#[test]
fn read_past_end_is_out_of_range_without_side_effects() {
    let source = ManualSource::new(5, 2);
    let reader = FrameReader::start(Arc::clone(&source), &PipelineConfig::default()).unwrap();
    source.complete(0);

    let before = reader.stats();
    let mut pic = source.picture();
    let err = reader.read(FrameIndex(5), &mut pic).err().unwrap();
    assert!(matches!(
        err,
        FramePipeError::OutOfRange {
            index: FrameIndex(5),
            total: 5
        }
    ));
    assert_eq!(err.category(), ErrorCategory::OutOfRange);
    assert_eq!(reader.stats(), before);
    assert_eq!(source.pending(), vec![1, 2]);

    reader.read(FrameIndex(0), &mut pic).unwrap();
    assert_yuv8_frame(&pic, 0);
}

#[test]
fn skipping_ahead_is_rejected_without_side_effects() {
    let source = ManualSource::new(5, 2);
    let reader = FrameReader::start(Arc::clone(&source), &PipelineConfig::default()).unwrap();
    source.complete(1);

    let before = reader.stats();
    let mut pic = source.picture();
    assert!(matches!(
        reader.read(FrameIndex(1), &mut pic),
        Err(FramePipeError::NonSequential {
            index: FrameIndex(1),
            expected: FrameIndex(0)
        })
    ));
    assert_eq!(reader.stats(), before);

    source.complete(0);
    reader.read(FrameIndex(0), &mut pic).unwrap();
    reader.read(FrameIndex(1), &mut pic).unwrap();
    assert_yuv8_frame(&pic, 1);
}

#[test]
fn empty_stream_issues_nothing() {
    let engine = Arc::new(
        PatternEngine::new(ClipSpec {
            frames: 0,
            threads: 1,
            ..ClipSpec::default()
        })
        .unwrap(),
    );
    let reader = FrameReader::start(Arc::clone(&engine), &PipelineConfig::default()).unwrap();
    let mut pic = framepipe_core::Picture::new(
        framepipe_core::Csp::new(framepipe_core::CspKind::I420, false),
        640,
        360,
    );
    assert!(matches!(
        reader.read(FrameIndex(0), &mut pic),
        Err(FramePipeError::OutOfRange { total: 0, .. })
    ));
    assert_eq!(reader.stats().requested, 0);
    assert_eq!(engine.rendered(), 0);
}

// ── Source faults ──────────────────────────────────────────────

#[test]
fn source_failure_surfaces_on_every_later_read() {
    let source = ManualSource::new(4, 2);
    let reader = FrameReader::start(Arc::clone(&source), &PipelineConfig::default()).unwrap();
    source.fail(0, "decoder exploded");

    let mut pic = source.picture();
    for _ in 0..2 {
        match reader.read(FrameIndex(0), &mut pic) {
            Err(FramePipeError::SourceFailed { index, message }) => {
                assert_eq!(index, FrameIndex(0));
                assert!(message.contains("decoder exploded"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    // Frames finishing after the fault go straight back to the source.
    source.complete(1);
    assert_eq!(source.released(), 1);
    assert_eq!(source.live_frames(), 0);
}

#[test]
fn duplicate_completion_aborts_the_stream() {
    let source = ManualSource::new(4, 2);
    let reader = FrameReader::start(Arc::clone(&source), &PipelineConfig::default()).unwrap();
    source.complete(0);
    source.complete_as(1, 0);

    let mut pic = source.picture();
    let err = reader.read(FrameIndex(0), &mut pic).err().unwrap();
    assert!(matches!(err, FramePipeError::DuplicateCompletion(FrameIndex(0))));
    assert_eq!(err.category(), ErrorCategory::Protocol);
    assert_eq!(err.category().exit_code(), 3);

    drop(reader);
    assert_eq!(source.live_frames(), 0);
    assert_eq!(source.released(), 2);
}

#[test]
fn completion_for_consumed_frame_is_duplicate() {
    let source = ManualSource::new(4, 2);
    let reader = FrameReader::start(Arc::clone(&source), &PipelineConfig::default()).unwrap();
    source.complete(0);
    let mut pic = source.picture();
    reader.read(FrameIndex(0), &mut pic).unwrap();

    source.complete_as(1, 0);
    assert!(matches!(
        reader.read(FrameIndex(1), &mut pic),
        Err(FramePipeError::DuplicateCompletion(FrameIndex(0)))
    ));
}

#[test]
fn completion_for_unrequested_frame_is_unexpected() {
    let source = ManualSource::new(10, 2);
    let reader = FrameReader::start(Arc::clone(&source), &PipelineConfig::default()).unwrap();
    source.complete_as(0, 7);

    let mut pic = source.picture();
    assert!(matches!(
        reader.read(FrameIndex(0), &mut pic),
        Err(FramePipeError::UnexpectedCompletion(FrameIndex(7)))
    ));
    assert_eq!(source.live_frames(), 0);
}
