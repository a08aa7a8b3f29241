use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use brickcast::{
    playback, AppConfig, Display, DisplayError, FramePipeline, FrameSource, PlaybackError,
    SourceError,
};
use image::{Rgb, RgbImage};

const SPACE: i32 = 32;
const ESCAPE: i32 = 27;

/// Yields `remaining` blank frames and counts `release` calls.
struct MockSource {
    remaining: usize,
    read: Rc<Cell<usize>>,
    released: Rc<Cell<usize>>,
    fail_at: Option<usize>,
}

impl MockSource {
    fn new(frames: usize) -> (Self, Rc<Cell<usize>>, Rc<Cell<usize>>) {
        let read = Rc::new(Cell::new(0));
        let released = Rc::new(Cell::new(0));
        let src = Self {
            remaining: frames,
            read: read.clone(),
            released: released.clone(),
            fail_at: None,
        };
        (src, read, released)
    }
}

impl FrameSource for MockSource {
    fn read_frame(&mut self) -> Result<Option<RgbImage>, SourceError> {
        if self.fail_at == Some(self.read.get()) {
            return Err(SourceError::Open {
                path: "mock".into(),
            });
        }
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        self.read.set(self.read.get() + 1);
        Ok(Some(RgbImage::from_pixel(64, 48, Rgb([120, 120, 120]))))
    }

    fn release(&mut self) {
        self.released.set(self.released.get() + 1);
    }
}

/// Replays scripted key results, one per `wait_key` call.
#[derive(Default)]
struct ScriptedDisplay {
    keys: VecDeque<Option<i32>>,
    timeouts: Vec<Option<Duration>>,
    shown: Vec<RgbImage>,
    closed: usize,
    fail_show_at: Option<usize>,
}

impl ScriptedDisplay {
    fn with_keys(keys: &[Option<i32>]) -> Self {
        Self {
            keys: keys.iter().copied().collect(),
            ..Self::default()
        }
    }
}

impl Display for ScriptedDisplay {
    fn show(&mut self, _title: &str, frame: &RgbImage) -> Result<(), DisplayError> {
        if self.fail_show_at == Some(self.shown.len()) {
            return Err(DisplayError::Write {
                path: "window".into(),
                source: image::ImageError::IoError(std::io::Error::other("window gone")),
            });
        }
        self.shown.push(frame.clone());
        Ok(())
    }

    fn wait_key(&mut self, timeout: Option<Duration>) -> Result<Option<i32>, DisplayError> {
        self.timeouts.push(timeout);
        Ok(self.keys.pop_front().flatten())
    }

    fn close(&mut self) {
        self.closed += 1;
    }
}

fn pipeline() -> (FramePipeline, AppConfig) {
    let config = AppConfig::default();
    (FramePipeline::new(&config).unwrap(), config)
}

#[test]
fn plays_to_the_end_of_the_stream() {
    let (pipeline, config) = pipeline();
    let (source, read, released) = MockSource::new(3);
    let mut display = ScriptedDisplay::default();

    let summary = playback::run(&pipeline, &config.playback, source, &mut display).unwrap();
    assert_eq!(summary.frames, 3);
    assert_eq!(summary.not_detected, 3);
    assert!(!summary.stopped_by_key);
    assert_eq!(read.get(), 3);
    assert_eq!(released.get(), 1);
    assert_eq!(display.closed, 1);
    assert_eq!(display.shown.len(), 3);
    assert!(display
        .timeouts
        .iter()
        .all(|t| *t == Some(Duration::from_millis(10))));
}

#[test]
fn stop_key_mid_stream_releases_once() {
    let (pipeline, config) = pipeline();
    let (source, read, released) = MockSource::new(10);
    let mut display = ScriptedDisplay::with_keys(&[None, Some(ESCAPE)]);

    let summary = playback::run(&pipeline, &config.playback, source, &mut display).unwrap();
    assert!(summary.stopped_by_key);
    assert_eq!(summary.frames, 2);
    assert_eq!(read.get(), 2);
    assert_eq!(released.get(), 1);
    assert_eq!(display.closed, 1);
}

#[test]
fn pause_waits_for_any_key_then_resumes() {
    let (pipeline, config) = pipeline();
    let (source, _, released) = MockSource::new(3);
    let mut display = ScriptedDisplay::with_keys(&[Some(SPACE), Some(b'a' as i32)]);

    let summary = playback::run(&pipeline, &config.playback, source, &mut display).unwrap();
    assert_eq!(summary.pauses, 1);
    assert_eq!(summary.frames, 3);
    assert!(!summary.stopped_by_key);
    // the second wait is the indefinite pause wait
    assert_eq!(display.timeouts[1], None);
    assert_eq!(released.get(), 1);
}

#[test]
fn stop_key_while_paused_stops() {
    let (pipeline, config) = pipeline();
    let (source, read, released) = MockSource::new(5);
    let mut display = ScriptedDisplay::with_keys(&[Some(SPACE), Some(ESCAPE)]);

    let summary = playback::run(&pipeline, &config.playback, source, &mut display).unwrap();
    assert!(summary.stopped_by_key);
    assert_eq!(read.get(), 1);
    assert_eq!(released.get(), 1);
}

#[test]
fn other_keys_are_ignored() {
    let (pipeline, config) = pipeline();
    let (source, _, _) = MockSource::new(2);
    let mut display = ScriptedDisplay::with_keys(&[Some(b'q' as i32), Some(13)]);

    let summary = playback::run(&pipeline, &config.playback, source, &mut display).unwrap();
    assert_eq!(summary.frames, 2);
    assert_eq!(summary.pauses, 0);
    assert!(!summary.stopped_by_key);
}

#[test]
fn frames_without_a_board_are_shown_unmodified() {
    let (pipeline, config) = pipeline();
    let (source, _, _) = MockSource::new(1);
    let mut display = ScriptedDisplay::default();

    playback::run(&pipeline, &config.playback, source, &mut display).unwrap();
    assert_eq!(
        display.shown[0],
        RgbImage::from_pixel(64, 48, Rgb([120, 120, 120]))
    );
}

#[test]
fn read_error_still_releases_the_source() {
    let (pipeline, config) = pipeline();
    let (mut source, _, released) = MockSource::new(5);
    source.fail_at = Some(2);
    let mut display = ScriptedDisplay::default();

    let err = playback::run(&pipeline, &config.playback, source, &mut display).unwrap_err();
    assert!(matches!(err, PlaybackError::Source(_)));
    assert_eq!(released.get(), 1);
    assert_eq!(display.closed, 1);
}

#[test]
fn display_error_closes_display_and_releases_source() {
    let (pipeline, config) = pipeline();
    let (source, _, released) = MockSource::new(3);
    let mut display = ScriptedDisplay {
        fail_show_at: Some(1),
        ..ScriptedDisplay::default()
    };

    let err = playback::run(&pipeline, &config.playback, source, &mut display).unwrap_err();
    assert!(matches!(err, PlaybackError::Display(_)));
    assert_eq!(display.shown.len(), 1);
    assert_eq!(released.get(), 1);
    assert_eq!(display.closed, 1);
}
