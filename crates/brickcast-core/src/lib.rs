//! Core types for checkerboard pose estimation and AR overlays.
//!
//! This crate is purely geometric. It knows how a calibrated camera maps
//! board-local 3D points into pixels, what the board and the brick look
//! like, and how to turn a rotation vector into a camera position. It does
//! *not* depend on any corner detector, image type or renderer.

mod camera;
mod corner;
mod geometry;
mod homography;
mod logger;
mod pose;
mod projection;

pub use camera::{BrownConrady5, CameraError, Intrinsics, PinholeCamera};
pub use corner::Corner;
pub use geometry::{BoardGeometry, BrickFace, BrickModel, BrickSpec, NUB_RING_POINTS};
pub use homography::{estimate_homography, Homography};
pub use pose::{camera_position, Pose};
pub use projection::{project_point, project_points};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{filter_directives, LOG_TARGETS};
