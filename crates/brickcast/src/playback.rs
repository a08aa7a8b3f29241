//! Frame-by-frame playback state machine.

use crate::config::PlaybackConfig;
use crate::display::{Display, DisplayError};
use crate::pipeline::{FrameOutcome, FramePipeline};
use crate::source::{FrameSource, SourceError, SourceGuard};
use brickcast_board::DetectedBoard;
use image::RgbImage;
use log::{debug, info};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug)]
pub enum PlaybackError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Display(#[from] DisplayError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Reading,
    Detected,
    NotDetected,
    Paused,
    Stopped,
}

/// Per-run counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlaybackSummary {
    pub frames: usize,
    pub detected: usize,
    pub not_detected: usize,
    pub count_mismatch: usize,
    pub pose_failed: usize,
    pub pauses: usize,
    /// The stop key ended the run before the stream did.
    pub stopped_by_key: bool,
}

impl PlaybackSummary {
    fn record(&mut self, outcome: &FrameOutcome) {
        match outcome {
            FrameOutcome::Detected { .. } => self.detected += 1,
            FrameOutcome::NotDetected => self.not_detected += 1,
            FrameOutcome::CountMismatch { .. } => self.count_mismatch += 1,
            FrameOutcome::PoseFailed(_) => self.pose_failed += 1,
        }
    }
}

/// Drives a source through the pipeline into a display.
pub struct Player<'a, D: Display> {
    pipeline: &'a FramePipeline,
    config: &'a PlaybackConfig,
    display: &'a mut D,
}

impl<'a, D: Display> Player<'a, D> {
    pub fn new(pipeline: &'a FramePipeline, config: &'a PlaybackConfig, display: &'a mut D) -> Self {
        Self {
            pipeline,
            config,
            display,
        }
    }

    /// Play `source` to the end or until the stop key.
    ///
    /// The source is released exactly once and the display is closed, also
    /// when a read or a display call fails midway.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
    pub fn run<S: FrameSource>(&mut self, source: S) -> Result<PlaybackSummary, PlaybackError> {
        let mut guard = SourceGuard::new(source);
        let mut summary = PlaybackSummary::default();
        let played = self.play(&mut guard, &mut summary);

        guard.release();
        self.display.close();
        played?;

        info!(
            "playback finished: {} frames, {} with pose, {} without board, {} count mismatches, {} pose failures",
            summary.frames,
            summary.detected,
            summary.not_detected,
            summary.count_mismatch,
            summary.pose_failed
        );
        Ok(summary)
    }

    fn play<S: FrameSource>(
        &mut self,
        guard: &mut SourceGuard<S>,
        summary: &mut PlaybackSummary,
    ) -> Result<(), PlaybackError> {
        let mut frame: Option<RgbImage> = None;
        let mut board: Option<DetectedBoard> = None;
        let mut state = PlaybackState::Reading;

        while state != PlaybackState::Stopped {
            state = match state {
                PlaybackState::Reading => match guard.read_frame()? {
                    None => PlaybackState::Stopped,
                    Some(img) => {
                        summary.frames += 1;
                        board = self.pipeline.detect(&img);
                        frame = Some(img);
                        if board.is_some() {
                            PlaybackState::Detected
                        } else {
                            summary.record(&FrameOutcome::NotDetected);
                            PlaybackState::NotDetected
                        }
                    }
                },
                PlaybackState::Detected => {
                    if let (Some(img), Some(b)) = (frame.as_mut(), board.take()) {
                        let outcome = self.pipeline.overlay(img, &b);
                        summary.record(&outcome);
                    }
                    self.show_and_poll(frame.take(), summary)?
                }
                PlaybackState::NotDetected => self.show_and_poll(frame.take(), summary)?,
                PlaybackState::Paused => {
                    summary.pauses += 1;
                    let key = self.display.wait_key(None)?;
                    debug!("resumed by key {key:?}");
                    self.stop_or(key, PlaybackState::Reading, summary)
                }
                PlaybackState::Stopped => PlaybackState::Stopped,
            };
        }

        Ok(())
    }

    fn show_and_poll(
        &mut self,
        frame: Option<RgbImage>,
        summary: &mut PlaybackSummary,
    ) -> Result<PlaybackState, PlaybackError> {
        if let Some(img) = frame {
            self.display.show(&self.config.window_title, &img)?;
        }
        let key = self.display.wait_key(Some(self.config.poll_interval()))?;
        if key == Some(self.config.pause_key) {
            return Ok(PlaybackState::Paused);
        }
        Ok(self.stop_or(key, PlaybackState::Reading, summary))
    }

    fn stop_or(
        &self,
        key: Option<i32>,
        otherwise: PlaybackState,
        summary: &mut PlaybackSummary,
    ) -> PlaybackState {
        if key == Some(self.config.stop_key) {
            summary.stopped_by_key = true;
            PlaybackState::Stopped
        } else {
            otherwise
        }
    }
}

/// Play `source` through `pipeline` into `display` with the given keys.
pub fn run<S: FrameSource, D: Display>(
    pipeline: &FramePipeline,
    config: &PlaybackConfig,
    source: S,
    display: &mut D,
) -> Result<PlaybackSummary, PlaybackError> {
    Player::new(pipeline, config, display).run(source)
}
