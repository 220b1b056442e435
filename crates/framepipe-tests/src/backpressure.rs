//! A slow reader must not let the backlog grow without bound.

use crate::support::{assert_yuv8_frame, eventually, ManualSource};
use framepipe_core::FrameIndex;
use framepipe_media::{ClipSpec, PatternEngine};
use framepipe_pipeline::{FrameReader, FrameSource, PipelineConfig};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn fast_engine(frames: usize, threads: usize) -> Arc<PatternEngine> {
    Arc::new(
        PatternEngine::new(ClipSpec {
            width: 16,
            height: 8,
            frames,
            threads,
            ..ClipSpec::default()
        })
        .unwrap(),
    )
}

#[test]
fn backlog_never_exceeds_high_water_plus_one() {
    let engine = fast_engine(300, 2);
    let config = PipelineConfig::default().with_water_factors(4, 1);
    let reader = FrameReader::start(Arc::clone(&engine), &config).unwrap();
    let (high, low) = config.water_marks(2);
    assert_eq!((high, low), (8, 2));

    let info = engine.info().clone();
    let format = info.format.unwrap();
    let csp = framepipe_core::Csp::from_format(&format).unwrap();
    let mut pic = framepipe_core::Picture::new(csp, info.width, info.height);

    for i in 0..300 {
        if i < 50 {
            thread::sleep(Duration::from_millis(1));
        }
        reader.read(FrameIndex(i), &mut pic).unwrap();
        let stats = reader.stats();
        assert!(stats.backlog() <= high + 1, "backlog {} at frame {i}", stats.backlog());
    }

    let stats = reader.stats();
    assert!(stats.peak_backlog <= high + 1);
    assert!(stats.peak_backlog > low, "producer never got ahead");
    assert_eq!(stats.high_water, high);
    assert_eq!(stats.low_water, low);
}

#[test]
fn idle_reader_parks_producers_at_the_bound() {
    let engine = fast_engine(10_000, 2);
    let config = PipelineConfig::default().with_water_factors(3, 1);
    let reader = FrameReader::start(Arc::clone(&engine), &config).unwrap();

    assert!(eventually(Duration::from_secs(5), || reader.stats().throttled > 0));
    thread::sleep(Duration::from_millis(20));

    let stats = reader.stats();
    assert!(stats.requested <= 6 + 1);
    assert!(engine.outstanding() <= 6 + 1);
    assert!(engine.rendered() <= 6 + 1);
}

#[test]
fn throttled_handlers_never_withhold_the_next_frame() {
    let source = ManualSource::new(40, 2);
    // High water 4, low water 2.
    let config = PipelineConfig::default()
        .with_window(2)
        .with_water_factors(2, 1);
    let reader = FrameReader::start(Arc::clone(&source), &config).unwrap();
    for i in 1..=3 {
        source.complete(i);
    }
    assert_eq!(reader.stats().backlog(), 5);

    thread::scope(|s| {
        let src = &source;
        // Both completions land above high water and block in the throttle.
        s.spawn(move || src.complete(4));
        assert!(eventually(Duration::from_secs(5), || reader.stats().throttled == 1));
        s.spawn(move || src.complete(0));
        assert!(eventually(Duration::from_secs(5), || reader.stats().throttled == 2));
        assert_eq!(reader.stats().requested, 5);

        // Frame 0 was announced before its handler blocked.
        let mut pic = source.picture();
        for i in 0..4 {
            reader.read(FrameIndex(i), &mut pic).unwrap();
            assert_yuv8_frame(&pic, i);
        }
    });

    // Each released handler issued exactly one more request.
    let stats = reader.stats();
    assert_eq!(stats.throttled, 0);
    assert_eq!(stats.requested, 7);
    assert_eq!(source.pending(), vec![5, 6]);
}
