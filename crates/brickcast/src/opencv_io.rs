//! OpenCV-backed video input and window output.

use crate::display::{Display, DisplayError};
use crate::source::{FrameSource, SourceError};
use image::RgbImage;
use log::{debug, info};
use opencv::core::{Mat, MatTraitConst, MatTraitConstManual};
use opencv::videoio::{self, VideoCapture, VideoCaptureTrait, VideoCaptureTraitConst};
use opencv::{highgui, imgproc};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Frames of a video file decoded by `videoio::VideoCapture`.
pub struct VideoFileSource {
    cap: VideoCapture,
    path: PathBuf,
}

impl VideoFileSource {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let open_err = || SourceError::Open {
            path: path.to_path_buf(),
        };
        let name = path.to_str().ok_or_else(open_err)?;
        let cap = VideoCapture::from_file(name, videoio::CAP_ANY)?;
        if !cap.is_opened()? {
            return Err(open_err());
        }
        let fps = cap.get(videoio::CAP_PROP_FPS).unwrap_or(0.0);
        info!("{}: opened video at {fps:.1} fps", path.display());
        Ok(Self {
            cap,
            path: path.to_path_buf(),
        })
    }
}

fn bgr_mat_to_rgb(mat: &Mat) -> Result<Option<RgbImage>, opencv::Error> {
    let mut rgb = Mat::default();
    imgproc::cvt_color_def(mat, &mut rgb, imgproc::COLOR_BGR2RGB)?;
    let rgb = if rgb.is_continuous() { rgb } else { rgb.try_clone()? };
    let (w, h) = (rgb.cols() as u32, rgb.rows() as u32);
    Ok(RgbImage::from_raw(w, h, rgb.data_bytes()?.to_vec()))
}

impl FrameSource for VideoFileSource {
    fn read_frame(&mut self) -> Result<Option<RgbImage>, SourceError> {
        if !self.cap.is_opened()? {
            return Ok(None);
        }
        let mut mat = Mat::default();
        if !self.cap.read(&mut mat)? || mat.empty() {
            return Ok(None);
        }
        Ok(bgr_mat_to_rgb(&mat)?)
    }

    fn release(&mut self) {
        debug!("releasing {}", self.path.display());
        if let Err(err) = self.cap.release() {
            log::warn!("failed to release {}: {err}", self.path.display());
        }
    }
}

/// A `highgui` window.
#[derive(Debug, Default)]
pub struct HighGuiDisplay {
    opened: bool,
}

impl HighGuiDisplay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Display for HighGuiDisplay {
    fn show(&mut self, title: &str, frame: &RgbImage) -> Result<(), DisplayError> {
        let flat = Mat::from_slice(frame.as_raw())?;
        let rgb = flat.reshape(3, frame.height() as i32)?;
        let mut bgr = Mat::default();
        imgproc::cvt_color_def(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR)?;
        highgui::imshow(title, &bgr)?;
        self.opened = true;
        Ok(())
    }

    fn wait_key(&mut self, timeout: Option<Duration>) -> Result<Option<i32>, DisplayError> {
        // 0 blocks until a key arrives
        let ms = timeout.map_or(0, |t| t.as_millis().clamp(1, i32::MAX as u128) as i32);
        let key = highgui::wait_key(ms)?;
        Ok((key >= 0).then_some(key & 0xFF))
    }

    fn close(&mut self) {
        if self.opened {
            if let Err(err) = highgui::destroy_all_windows() {
                log::warn!("failed to close windows: {err}");
            }
            self.opened = false;
        }
    }
}
