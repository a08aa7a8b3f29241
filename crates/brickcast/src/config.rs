//! Application configuration.
//!
//! Every field defaults to the values of the shipped calibration, so an
//! empty JSON object is a complete configuration.

use brickcast_board::BoardDetectParams;
use brickcast_core::{BoardGeometry, BrickSpec, BrownConrady5, CameraError, Intrinsics, PinholeCamera};
use brickcast_pose::PnpParams;
use brickcast_render::OverlayStyle;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Input used when none is given on the command line.
pub const DEFAULT_INPUT: &str = "chessboard.avi";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error("invalid board: {0}")]
    InvalidBoard(String),
}

/// Camera matrix and distortion as stored on disk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Row-major 3×3 camera matrix.
    pub matrix: [[f64; 3]; 3],
    /// `k1, k2, p1, p2, k3`.
    pub distortion: [f64; 5],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            matrix: [
                [1436.488, 0.0, 929.57],
                [0.0, 1438.959, 520.83],
                [0.0, 0.0, 1.1626],
            ],
            distortion: [
                -0.285_275_490_415_287_4,
                0.101_646_645_991_907_5,
                -0.000_442_019_614_633_917_5,
                0.000_114_990_986_843_751_7,
                -0.018_039_787_855_851_94,
            ],
        }
    }
}

impl CameraConfig {
    pub fn camera(&self) -> Result<PinholeCamera, CameraError> {
        let intrinsics = Intrinsics::from_rows(self.matrix)?;
        Ok(PinholeCamera::new(
            intrinsics,
            BrownConrady5::from_coeffs(self.distortion),
        ))
    }
}

/// Key bindings and window settings for the playback loop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub pause_key: i32,
    pub stop_key: i32,
    /// Key poll after each displayed frame, milliseconds.
    pub poll_interval_ms: u64,
    pub window_title: String,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            pause_key: 32,
            stop_key: 27,
            poll_interval_ms: 10,
            window_title: "Pose Estimation (LEGO Block)".to_string(),
        }
    }
}

impl PlaybackConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Everything the pipeline and the playback loop need.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub camera: CameraConfig,
    pub board: BoardGeometry,
    pub brick: BrickSpec,
    /// Detector flags. The pattern size is always taken from `board`.
    pub detector: BoardDetectParams,
    pub pnp: PnpParams,
    pub style: OverlayStyle,
    pub playback: PlaybackConfig,
}

impl AppConfig {
    /// Read a JSON config; missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.board;
        if b.cols < 2 || b.rows < 2 {
            return Err(ConfigError::InvalidBoard(format!(
                "need at least 2×2 inner corners, got {}×{}",
                b.cols, b.rows
            )));
        }
        if !(b.cell_size.is_finite() && b.cell_size > 0.0) {
            return Err(ConfigError::InvalidBoard(format!(
                "cell size must be positive, got {}",
                b.cell_size
            )));
        }
        self.camera.camera()?;
        Ok(())
    }

    /// Detector parameters with the pattern size of `board`.
    pub fn detector_params(&self) -> BoardDetectParams {
        BoardDetectParams {
            cols: self.board.cols,
            rows: self.board.rows,
            ..self.detector.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults_match_shipped_calibration() {
        let cfg = AppConfig::default();
        let cam = cfg.camera.camera().unwrap();
        assert_relative_eq!(cam.intrinsics.fx, 1436.488);
        assert_relative_eq!(cam.intrinsics.cy, 520.83);
        assert_relative_eq!(cam.distortion.k1, -0.2852754904152874);
        assert_eq!(cfg.board.corner_count(), 48);
        assert!(cfg.detector.adaptive_threshold);
        assert!(cfg.detector.normalize_image);
        assert!(cfg.detector.fast_check);
        assert_eq!(cfg.playback.pause_key, 32);
        assert_eq!(cfg.playback.stop_key, 27);
        assert_eq!(cfg.playback.poll_interval(), Duration::from_millis(10));
        assert_eq!(cfg.playback.window_title, "Pose Estimation (LEGO Block)");
    }

    #[test]
    fn json_roundtrip() {
        let cfg = AppConfig::default();
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        let back: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: AppConfig =
            serde_json::from_str(r#"{ "board": { "cols": 9 }, "playback": { "stop_key": 113 } }"#)
                .unwrap();
        assert_eq!(cfg.board.cols, 9);
        assert_eq!(cfg.board.rows, 6);
        assert_relative_eq!(cfg.board.cell_size, 0.025);
        assert_eq!(cfg.playback.stop_key, 113);
        assert_eq!(cfg.playback.pause_key, 32);
        assert_eq!(cfg.detector_params().cols, 9);
        assert_eq!(cfg.detector_params().expected_corners(), 54);
    }

    #[test]
    fn rejects_bad_board_and_camera() {
        let mut cfg = AppConfig::default();
        cfg.board.cell_size = 0.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidBoard(_))));

        let mut cfg = AppConfig::default();
        cfg.camera.matrix[0][1] = 3.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Camera(_))));
    }

    #[test]
    fn load_reports_path() {
        let err = AppConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
