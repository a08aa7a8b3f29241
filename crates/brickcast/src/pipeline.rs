use crate::config::{AppConfig, ConfigError};
use brickcast_board::{BoardDetector, DetectedBoard};
use brickcast_core::{camera_position, BoardGeometry, BrickModel, PinholeCamera, Pose};
use brickcast_pose::{solve_planar_pnp, PnpParams, PoseError};
use brickcast_render::{draw_brick, draw_position, OverlayStyle, ProjectedBrick};
use image::RgbImage;
use log::{debug, warn};
use nalgebra::{Point3, Vector3};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// What happened to one frame.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameOutcome {
    /// No complete board was found; the frame is untouched.
    NotDetected,
    /// A board was found with the wrong number of corners; the frame is
    /// untouched.
    CountMismatch { found: usize, expected: usize },
    /// The pose solver rejected the correspondences; the frame is untouched.
    PoseFailed(PoseError),
    /// The brick and the position readout were drawn.
    Detected {
        pose: Pose,
        /// Camera centre in board coordinates.
        position: Vector3<f64>,
        reproj_rmse: f64,
    },
}

impl FrameOutcome {
    pub fn is_detected(&self) -> bool {
        matches!(self, FrameOutcome::Detected { .. })
    }
}

/// Per-frame work: detect the board, solve the pose, draw the overlay.
///
/// Built once from an [`AppConfig`]; holds every derived constant so frames
/// never re-read the configuration.
#[derive(Clone, Debug)]
pub struct FramePipeline {
    camera: PinholeCamera,
    board: BoardGeometry,
    object_points: Vec<Point3<f64>>,
    detector: BoardDetector,
    brick: BrickModel,
    pnp: PnpParams,
    style: OverlayStyle,
}

impl FramePipeline {
    pub fn new(config: &AppConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let camera = config.camera.camera()?;
        let board = config.board;
        let brick = BrickModel::new(&config.brick, board.cell_size);
        debug!(
            "pipeline: {}×{} board, cell {} m, brick with {} nubs",
            board.cols,
            board.rows,
            board.cell_size,
            brick.nub_count()
        );
        Ok(Self {
            camera,
            board,
            object_points: board.object_points(),
            detector: BoardDetector::new(config.detector_params()),
            brick,
            pnp: config.pnp.clone(),
            style: config.style.clone(),
        })
    }

    pub fn camera(&self) -> &PinholeCamera {
        &self.camera
    }

    pub fn brick(&self) -> &BrickModel {
        &self.brick
    }

    /// Look for the board in an RGB frame.
    pub fn detect(&self, frame: &RgbImage) -> Option<DetectedBoard> {
        let gray = image::imageops::grayscale(frame);
        self.detector.detect(&gray)
    }

    /// Solve the pose for a detected board and draw onto `frame`.
    ///
    /// The frame is only modified when the outcome is
    /// [`FrameOutcome::Detected`].
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(corners = board.corner_count()))
    )]
    pub fn overlay(&self, frame: &mut RgbImage, board: &DetectedBoard) -> FrameOutcome {
        let expected = self.board.corner_count();
        let found = board.corner_count();
        if found != expected {
            warn!("detected {found} corners, expected {expected}; skipping pose");
            return FrameOutcome::CountMismatch { found, expected };
        }

        let image_points = board.image_points();
        let estimate =
            match solve_planar_pnp(&self.object_points, &image_points, &self.camera, &self.pnp) {
                Ok(estimate) => estimate,
                Err(err) => {
                    warn!("pose solve failed: {err}");
                    return FrameOutcome::PoseFailed(err);
                }
            };

        let projected = ProjectedBrick::project(&self.brick, &estimate.pose, &self.camera);
        draw_brick(frame, &projected, &self.style);

        let position = camera_position(&estimate.pose);
        draw_position(frame, &position, &self.style);
        debug!(
            "pose rvec={:?} tvec={:?} rmse={:.3}px",
            estimate.pose.rvec.as_slice(),
            estimate.pose.tvec.as_slice(),
            estimate.reproj_rmse
        );

        FrameOutcome::Detected {
            pose: estimate.pose,
            position,
            reproj_rmse: estimate.reproj_rmse,
        }
    }

    /// Detect and overlay in one step.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(width = frame.width(), height = frame.height()))
    )]
    pub fn process(&self, frame: &mut RgbImage) -> FrameOutcome {
        match self.detect(frame) {
            Some(board) => self.overlay(frame, &board),
            None => FrameOutcome::NotDetected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brickcast_core::project_points;
    use image::Rgb;
    use nalgebra::Point2;

    fn frontal_pose() -> Pose {
        // board centred in front of the camera, 0.5 m away
        Pose::new(Vector3::zeros(), Vector3::new(-0.0875, -0.0625, 0.5))
    }

    fn synthetic_board(pipeline: &FramePipeline, pose: &Pose) -> DetectedBoard {
        let pts = project_points(&pipeline.object_points, pose, &pipeline.camera);
        DetectedBoard {
            cols: pipeline.board.cols,
            rows: pipeline.board.rows,
            corners: pts.iter().map(|p| Point2::new(p.x as f32, p.y as f32)).collect(),
            raw_corner_count: pts.len(),
            threshold_rel: 0.2,
        }
    }

    #[test]
    fn blank_frame_is_left_unmodified() {
        let pipeline = FramePipeline::new(&AppConfig::default()).unwrap();
        let mut frame = RgbImage::from_pixel(320, 240, Rgb([90, 90, 90]));
        let before = frame.clone();
        assert_eq!(pipeline.process(&mut frame), FrameOutcome::NotDetected);
        assert_eq!(frame, before);
    }

    #[test]
    fn count_mismatch_blocks_pose() {
        let pipeline = FramePipeline::new(&AppConfig::default()).unwrap();
        let mut board = synthetic_board(&pipeline, &frontal_pose());
        board.corners.truncate(40);
        let mut frame = RgbImage::new(1920, 1080);
        let before = frame.clone();
        let outcome = pipeline.overlay(&mut frame, &board);
        assert_eq!(
            outcome,
            FrameOutcome::CountMismatch {
                found: 40,
                expected: 48
            }
        );
        assert_eq!(frame, before);
    }

    #[test]
    fn pose_failure_is_recoverable() {
        let pipeline = FramePipeline::new(&AppConfig::default()).unwrap();
        let mut board = synthetic_board(&pipeline, &frontal_pose());
        for c in board.corners.iter_mut() {
            *c = Point2::new(500.0, 400.0);
        }
        let mut frame = RgbImage::new(1920, 1080);
        let before = frame.clone();
        assert!(matches!(
            pipeline.overlay(&mut frame, &board),
            FrameOutcome::PoseFailed(_)
        ));
        assert_eq!(frame, before);
    }

    #[test]
    fn frontal_pose_draws_brick_over_its_footprint() {
        let pipeline = FramePipeline::new(&AppConfig::default()).unwrap();
        let pose = frontal_pose();
        let board = synthetic_board(&pipeline, &pose);
        let mut frame = RgbImage::from_pixel(1920, 1080, Rgb([255, 255, 255]));

        let outcome = pipeline.overlay(&mut frame, &board);
        let FrameOutcome::Detected { position, pose: solved, .. } = outcome else {
            panic!("expected a pose, got {outcome:?}");
        };
        assert!((solved.tvec - pose.tvec).norm() < 1e-4);
        assert!((position - camera_position(&pose)).norm() < 1e-4);

        // footprint cell (4,2)-(6,4) on the board plane
        let s = pipeline.board.cell_size;
        let footprint = [
            Point3::new(4.0 * s, 2.0 * s, 0.0),
            Point3::new(6.0 * s, 2.0 * s, 0.0),
            Point3::new(6.0 * s, 4.0 * s, 0.0),
            Point3::new(4.0 * s, 4.0 * s, 0.0),
        ];
        let px = project_points(&footprint, &pose, &pipeline.camera);
        let fx = px.iter().map(|p| p.x).sum::<f64>() / 4.0;
        let fy = px.iter().map(|p| p.y).sum::<f64>() / 4.0;
        let footprint_size = (px[1] - px[0]).norm();

        let centroid = ProjectedBrick::project(&pipeline.brick, &solved, &pipeline.camera).centroid();
        assert!(centroid.x > 0.0 && centroid.x < 1920.0);
        assert!(centroid.y > 0.0 && centroid.y < 1080.0);
        let offset = ((centroid.x - fx).powi(2) + (centroid.y - fy).powi(2)).sqrt();
        assert!(offset < footprint_size, "offset {offset} vs {footprint_size}");

        let fill = frame.pixels().filter(|p| **p == Rgb([255, 140, 0])).count();
        assert!(fill > 1000);
        let cx = centroid.x.round() as u32;
        let cy = centroid.y.round() as u32;
        assert_ne!(*frame.get_pixel(cx, cy), Rgb([255, 255, 255]));
    }
}
