//! Checkerboard pose estimation with a LEGO-brick overlay.
//!
//! Each frame goes through
//! 1. checkerboard detection ([`brickcast_board`]),
//! 2. planar PnP against the calibrated camera ([`brickcast_pose`]),
//! 3. brick projection and painting plus the camera-position readout
//!    ([`brickcast_render`]).
//!
//! [`playback`] runs that pipeline over a [`FrameSource`] into a
//! [`Display`], with a pause key and a stop key.
//!
//! ```no_run
//! use brickcast::{AppConfig, FramePipeline, HeadlessDisplay, ImageSequenceSource};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let pipeline = FramePipeline::new(&config)?;
//! let source = ImageSequenceSource::open("frames/")?;
//! let mut display = HeadlessDisplay::with_output_dir("out/")?;
//! let summary = brickcast::playback::run(&pipeline, &config.playback, source, &mut display)?;
//! println!("{} of {} frames posed", summary.detected, summary.frames);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod display;
#[cfg(feature = "opencv")]
pub mod opencv_io;
pub mod pipeline;
pub mod playback;
pub mod source;

pub use config::{AppConfig, CameraConfig, ConfigError, PlaybackConfig, DEFAULT_INPUT};
pub use display::{Display, DisplayError, HeadlessDisplay};
pub use pipeline::{FrameOutcome, FramePipeline};
pub use playback::{PlaybackError, PlaybackState, PlaybackSummary, Player};
pub use source::{open_source, FrameSource, ImageSequenceSource, SourceError, SourceGuard};
