//! Cancellation releases both blocking points and every held frame.

use crate::support::{clip_file, eventually, ManualSource};
use framepipe_core::{FrameIndex, FramePipeError};
use framepipe_input::{PatternHost, ScriptInput};
use framepipe_pipeline::{FrameReader, PipelineConfig};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn cancel_wakes_reader_waiting_for_arrival() {
    let source = ManualSource::new(3, 2);
    let reader = FrameReader::start(Arc::clone(&source), &PipelineConfig::default()).unwrap();
    let cancel = reader.cancel_token();

    thread::scope(|s| {
        let waiting = s.spawn(|| {
            let mut pic = source.picture();
            reader.read(FrameIndex(0), &mut pic)
        });
        thread::sleep(Duration::from_millis(20));
        assert!(!waiting.is_finished());
        cancel.cancel();
        assert!(matches!(
            waiting.join().unwrap(),
            Err(FramePipeError::Cancelled)
        ));
    });

    let mut pic = source.picture();
    let err = reader.read(FrameIndex(0), &mut pic).err().unwrap();
    assert!(matches!(err, FramePipeError::Cancelled));
    assert_eq!(err.category().exit_code(), 130);

    // The engine finishing afterwards gets its frame straight back.
    source.complete(0);
    assert_eq!(source.live_frames(), 0);
}

#[test]
fn cancel_wakes_throttled_producers() {
    let file = clip_file(r#"{ "width": 16, "height": 8, "frames": 5000, "threads": 2 }"#);
    let input = ScriptInput::with_config(
        PatternHost,
        PipelineConfig::default().with_water_factors(2, 1),
    );
    let (_, handle) = input.open(file.path()).unwrap();
    let engine = Arc::clone(handle.source());

    assert!(eventually(Duration::from_secs(5), || handle.stats().throttled == 2));
    handle.cancel_token().cancel();
    assert!(eventually(Duration::from_secs(5), || handle.stats().throttled == 0));

    handle.close();
    assert!(eventually(Duration::from_secs(5), || engine.outstanding() == 0));
    assert!(engine.rendered() <= 4 + 1);
}

#[test]
fn pending_requests_see_the_cancelled_token() {
    let file = clip_file(
        r#"{ "width": 16, "height": 8, "frames": 100, "threads": 2, "jitter_ms": 50 }"#,
    );
    let (_, handle) = ScriptInput::new(PatternHost).open(file.path()).unwrap();
    let engine = Arc::clone(handle.source());

    handle.cancel_token().cancel();
    handle.close();
    // Cancelled completions issue nothing further.
    assert!(eventually(Duration::from_secs(5), || engine.outstanding() == 0));
    assert!(engine.rendered() <= 2);
}

#[test]
fn dropping_reader_cancels_it() {
    let source = ManualSource::new(4, 2);
    let reader = FrameReader::start(Arc::clone(&source), &PipelineConfig::default()).unwrap();
    let cancel = reader.cancel_token();
    drop(reader);
    assert!(cancel.is_cancelled());

    source.cancel_pending();
    assert_eq!(source.live_frames(), 0);
}
