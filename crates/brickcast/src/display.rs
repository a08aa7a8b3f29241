//! Frame sinks.

use image::RgbImage;
use log::debug;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum DisplayError {
    #[error("failed to create output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write frame {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[cfg(feature = "opencv")]
    #[error(transparent)]
    OpenCv(#[from] opencv::Error),
}

/// Where processed frames go, and where key presses come from.
pub trait Display {
    fn show(&mut self, title: &str, frame: &RgbImage) -> Result<(), DisplayError>;

    /// Wait for a key press. `None` as timeout waits indefinitely; `Ok(None)`
    /// means no key arrived.
    fn wait_key(&mut self, timeout: Option<Duration>) -> Result<Option<i32>, DisplayError>;

    fn close(&mut self);
}

/// Windowless display. Never yields a key; optionally writes every shown
/// frame as `frame_NNNNNN.png`.
#[derive(Debug, Default)]
pub struct HeadlessDisplay {
    output_dir: Option<PathBuf>,
    shown: usize,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_dir(dir: impl AsRef<Path>) -> Result<Self, DisplayError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|source| DisplayError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            output_dir: Some(dir.to_path_buf()),
            shown: 0,
        })
    }

    /// Frames shown so far.
    pub fn shown(&self) -> usize {
        self.shown
    }
}

impl Display for HeadlessDisplay {
    fn show(&mut self, _title: &str, frame: &RgbImage) -> Result<(), DisplayError> {
        if let Some(dir) = &self.output_dir {
            let path = dir.join(format!("frame_{:06}.png", self.shown));
            frame
                .save_with_format(&path, image::ImageFormat::Png)
                .map_err(|source| DisplayError::Write { path, source })?;
        }
        self.shown += 1;
        Ok(())
    }

    fn wait_key(&mut self, _timeout: Option<Duration>) -> Result<Option<i32>, DisplayError> {
        Ok(None)
    }

    fn close(&mut self) {
        debug!("headless display closed after {} frames", self.shown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_numbered_pngs() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut display = HeadlessDisplay::with_output_dir(&out).unwrap();
        let frame = RgbImage::new(8, 6);
        display.show("t", &frame).unwrap();
        display.show("t", &frame).unwrap();
        assert_eq!(display.shown(), 2);
        assert!(out.join("frame_000000.png").is_file());
        assert!(out.join("frame_000001.png").is_file());
        assert_eq!(display.wait_key(None).unwrap(), None);
    }
}
