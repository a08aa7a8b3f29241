//! Planar perspective-n-point solver.
//!
//! Given board-local object points on `Z = 0` and their observed pixels, the
//! solver
//! 1. undistorts the pixels to normalized image coordinates,
//! 2. estimates the board → normalized-plane homography (normalized DLT),
//! 3. decomposes it into an initial `R, t`,
//! 4. refines `(rvec, t)` with Levenberg–Marquardt on the pixel reprojection
//!    error through the full distortion model.

mod planar;
mod refine;

pub use planar::pose_from_homography;
pub use refine::{refine_pose_lm, LmParams, LmReport};

use brickcast_core::{estimate_homography, PinholeCamera, Pose};
use log::debug;
use nalgebra::{Matrix2, Point2, Point3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by [`solve_planar_pnp`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PoseError {
    #[error("mismatched correspondences: {object} object points vs {image} image points")]
    MismatchedLengths { object: usize, image: usize },

    #[error("need at least {required} correspondences, got {actual}")]
    InsufficientCorrespondences { required: usize, actual: usize },

    #[error("object points are not on the plane Z = 0 (max |Z| = {max_abs_z})")]
    NonPlanarObject { max_abs_z: f64 },

    #[error("degenerate configuration: {0}")]
    Degenerate(&'static str),

    #[error("pose estimate is not finite")]
    NotFinite,
}

/// Solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PnpParams {
    /// Run the Levenberg–Marquardt stage after the homography initialisation.
    pub refine: bool,
    pub lm: LmParams,
    /// Relative tolerance for the planarity and collinearity checks.
    pub degeneracy_eps: f64,
}

impl Default for PnpParams {
    fn default() -> Self {
        Self {
            refine: true,
            lm: LmParams::default(),
            degeneracy_eps: 1e-9,
        }
    }
}

/// Pose with solver diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseEstimate {
    pub pose: Pose,
    /// Root-mean-square pixel reprojection error per coordinate.
    pub reproj_rmse: f64,
    pub iterations: usize,
    pub converged: bool,
}

const MIN_CORRESPONDENCES: usize = 4;

/// Ratio of the smaller to the larger eigenvalue of the 2D scatter matrix.
/// Zero for collinear (or coincident) points.
fn spread_ratio<I: Iterator<Item = (f64, f64)> + Clone>(pts: I) -> f64 {
    let n = pts.clone().count() as f64;
    let (sx, sy) = pts.clone().fold((0.0, 0.0), |(ax, ay), (x, y)| (ax + x, ay + y));
    let (mx, my) = (sx / n, sy / n);
    let mut cov = Matrix2::<f64>::zeros();
    for (x, y) in pts {
        let (dx, dy) = (x - mx, y - my);
        cov[(0, 0)] += dx * dx;
        cov[(0, 1)] += dx * dy;
        cov[(1, 1)] += dy * dy;
    }
    cov[(1, 0)] = cov[(0, 1)];
    let eig = cov.symmetric_eigenvalues();
    let (lo, hi) = (eig.min(), eig.max());
    if hi <= 0.0 {
        0.0
    } else {
        lo.max(0.0) / hi
    }
}

fn validate(
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    params: &PnpParams,
) -> Result<(), PoseError> {
    if object.len() != image.len() {
        return Err(PoseError::MismatchedLengths {
            object: object.len(),
            image: image.len(),
        });
    }
    if object.len() < MIN_CORRESPONDENCES {
        return Err(PoseError::InsufficientCorrespondences {
            required: MIN_CORRESPONDENCES,
            actual: object.len(),
        });
    }

    let extent = object
        .iter()
        .map(|p| p.x.abs().max(p.y.abs()))
        .fold(1e-12, f64::max);
    let max_abs_z = object.iter().map(|p| p.z.abs()).fold(0.0, f64::max);
    if max_abs_z > params.degeneracy_eps * extent.max(1.0) {
        return Err(PoseError::NonPlanarObject { max_abs_z });
    }

    if spread_ratio(object.iter().map(|p| (p.x, p.y))) <= params.degeneracy_eps {
        return Err(PoseError::Degenerate("object points are collinear"));
    }
    if spread_ratio(image.iter().map(|p| (p.x, p.y))) <= params.degeneracy_eps {
        return Err(PoseError::Degenerate("image points are collinear"));
    }
    Ok(())
}

/// Estimate the board → camera pose from planar correspondences.
///
/// `object` must lie on `Z = 0`; `image` holds the matching distorted pixels
/// in the same order.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(object, image, camera, params), fields(n = object.len()))
)]
pub fn solve_planar_pnp(
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    camera: &PinholeCamera,
    params: &PnpParams,
) -> Result<PoseEstimate, PoseError> {
    validate(object, image, params)?;

    let plane: Vec<Point2<f64>> = object.iter().map(|p| Point2::new(p.x, p.y)).collect();
    let normalized: Vec<Point2<f64>> = image
        .iter()
        .map(|p| Point2::from(camera.undistort_pixel(p)))
        .collect();

    let h = estimate_homography(&plane, &normalized)
        .ok_or(PoseError::Degenerate("homography estimation failed"))?;
    let initial = pose_from_homography(&h)?;
    if !initial.is_finite() {
        return Err(PoseError::NotFinite);
    }

    let estimate = if params.refine {
        let report = refine_pose_lm(object, image, camera, &initial, &params.lm)?;
        debug!(
            "pnp: {} iterations, rmse {:.4} px, converged={}",
            report.iterations, report.rmse, report.converged
        );
        PoseEstimate {
            pose: report.pose,
            reproj_rmse: report.rmse,
            iterations: report.iterations,
            converged: report.converged,
        }
    } else {
        let reproj = brickcast_core::project_points(object, &initial, camera);
        let sum_sq: f64 = reproj
            .iter()
            .zip(image.iter())
            .map(|(a, b)| (a - b).norm_squared())
            .sum();
        PoseEstimate {
            pose: initial,
            reproj_rmse: (sum_sq / (2.0 * object.len() as f64)).sqrt(),
            iterations: 0,
            converged: true,
        }
    };

    if !estimate.pose.is_finite() || !estimate.reproj_rmse.is_finite() {
        return Err(PoseError::NotFinite);
    }
    Ok(estimate)
}
