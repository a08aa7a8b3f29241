//! Frame sources.

use image::RgbImage;
use log::{debug, info};
use std::path::{Path, PathBuf};

/// File extensions accepted by [`ImageSequenceSource`].
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("Cannot read the given input, {}", path.display())]
    Open { path: PathBuf },
    #[error("failed to decode frame {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("{} is a video file; rebuild with the `opencv` feature to read it", path.display())]
    VideoUnsupported { path: PathBuf },
    #[cfg(feature = "opencv")]
    #[error(transparent)]
    OpenCv(#[from] opencv::Error),
}

/// A stream of RGB frames.
pub trait FrameSource {
    /// Next frame, or `None` at the end of the stream.
    fn read_frame(&mut self) -> Result<Option<RgbImage>, SourceError>;

    /// Free the underlying resource. Later reads return `None`.
    fn release(&mut self);
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn read_frame(&mut self) -> Result<Option<RgbImage>, SourceError> {
        (**self).read_frame()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Owns a source and releases it exactly once: explicitly through
/// [`SourceGuard::release`], or on drop.
pub struct SourceGuard<S: FrameSource> {
    source: S,
    released: bool,
}

impl<S: FrameSource> SourceGuard<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            released: false,
        }
    }

    pub fn read_frame(&mut self) -> Result<Option<RgbImage>, SourceError> {
        if self.released {
            return Ok(None);
        }
        self.source.read_frame()
    }

    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.source.release();
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl<S: FrameSource> Drop for SourceGuard<S> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Image files of one directory, read in file-name order.
#[derive(Debug)]
pub struct ImageSequenceSource {
    frames: Vec<PathBuf>,
    next: usize,
}

fn is_image(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

impl ImageSequenceSource {
    /// List the images in `dir`. Fails when the directory cannot be read or
    /// holds no images.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SourceError> {
        let dir = dir.as_ref();
        let open_err = || SourceError::Open {
            path: dir.to_path_buf(),
        };
        let mut frames: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|_| open_err())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| is_image(p))
            .collect();
        if frames.is_empty() {
            return Err(open_err());
        }
        frames.sort();
        info!("{}: {} frames", dir.display(), frames.len());
        Ok(Self { frames, next: 0 })
    }
}

impl FrameSource for ImageSequenceSource {
    fn read_frame(&mut self) -> Result<Option<RgbImage>, SourceError> {
        let Some(path) = self.frames.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;
        let img = image::open(path).map_err(|source| SourceError::Decode {
            path: path.clone(),
            source,
        })?;
        Ok(Some(img.to_rgb8()))
    }

    fn release(&mut self) {
        debug!("releasing image sequence after {} frames", self.next);
        self.frames.clear();
        self.next = 0;
    }
}

/// Open `input`: a directory becomes an [`ImageSequenceSource`], a file a
/// video source (feature `opencv`).
pub fn open_source(input: &Path) -> Result<Box<dyn FrameSource>, SourceError> {
    if input.is_dir() {
        return Ok(Box::new(ImageSequenceSource::open(input)?));
    }
    if !input.is_file() {
        return Err(SourceError::Open {
            path: input.to_path_buf(),
        });
    }
    open_video(input)
}

#[cfg(feature = "opencv")]
fn open_video(input: &Path) -> Result<Box<dyn FrameSource>, SourceError> {
    Ok(Box::new(crate::opencv_io::VideoFileSource::open(input)?))
}

#[cfg(not(feature = "opencv"))]
fn open_video(input: &Path) -> Result<Box<dyn FrameSource>, SourceError> {
    Err(SourceError::VideoUnsupported {
        path: input.to_path_buf(),
    })
}
