//! Levenberg–Marquardt pose refinement on pixel reprojection error.

use crate::PoseError;
use brickcast_core::{PinholeCamera, Pose};
use nalgebra::{Matrix6, Point2, Point3, Rotation3, Vector3, Vector6};
use serde::{Deserialize, Serialize};

/// Parameters controlling the LM pose refinement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmParams {
    /// Maximum number of LM iterations.
    pub max_iters: usize,
    /// Stop when the squared error decreases by less than this.
    pub eps: f64,
    /// Initial damping factor (lambda).
    pub lambda_init: f64,
    /// Multiplicative factor to increase/decrease lambda.
    pub lambda_mul: f64,
}

impl Default for LmParams {
    fn default() -> Self {
        Self {
            max_iters: 30,
            eps: 1e-12,
            lambda_init: 1e-3,
            lambda_mul: 10.0,
        }
    }
}

/// Outcome of [`refine_pose_lm`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmReport {
    pub pose: Pose,
    pub rmse: f64,
    pub iterations: usize,
    pub converged: bool,
}

fn params_of(pose: &Pose) -> Vector6<f64> {
    Vector6::new(
        pose.rvec.x,
        pose.rvec.y,
        pose.rvec.z,
        pose.tvec.x,
        pose.tvec.y,
        pose.tvec.z,
    )
}

fn pose_of(x: &Vector6<f64>) -> Pose {
    Pose::new(
        Vector3::new(x[0], x[1], x[2]),
        Vector3::new(x[3], x[4], x[5]),
    )
}

/// Write residuals `projected - observed` into `out`; returns the squared sum.
fn residuals(
    x: &Vector6<f64>,
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    camera: &PinholeCamera,
    out: &mut [f64],
) -> f64 {
    let r = Rotation3::from_scaled_axis(Vector3::new(x[0], x[1], x[2]));
    let t = Vector3::new(x[3], x[4], x[5]);

    let mut sum_sq = 0.0;
    for (i, (pw, uv)) in object.iter().zip(image.iter()).enumerate() {
        let p = camera.project(&(r * pw.coords + t));
        let du = p.x - uv.x;
        let dv = p.y - uv.y;
        out[2 * i] = du;
        out[2 * i + 1] = dv;
        sum_sq += du * du + dv * dv;
    }
    sum_sq
}

/// Refine `(rvec, t)` to minimise pixel reprojection error through the full
/// camera model, using a central-difference Jacobian.
///
/// `object` and `image` must be non-empty and of equal length.
pub fn refine_pose_lm(
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    camera: &PinholeCamera,
    initial: &Pose,
    params: &LmParams,
) -> Result<LmReport, PoseError> {
    if object.len() != image.len() {
        return Err(PoseError::MismatchedLengths {
            object: object.len(),
            image: image.len(),
        });
    }
    let n = object.len();
    if n == 0 {
        return Err(PoseError::InsufficientCorrespondences {
            required: 1,
            actual: 0,
        });
    }

    let mut x = params_of(initial);
    let mut res = vec![0.0; 2 * n];
    let mut res_p = vec![0.0; 2 * n];
    let mut res_m = vec![0.0; 2 * n];
    let mut jac = vec![Vector6::<f64>::zeros(); 2 * n];

    let mut lambda = params.lambda_init;
    let mut err_sq = residuals(&x, object, image, camera, &mut res);
    let mut iters = 0usize;
    let mut converged = err_sq < params.eps;

    while !converged && iters < params.max_iters {
        iters += 1;

        const H_ROT: f64 = 1e-6;
        let t_scale = x[3].abs().max(x[4].abs()).max(x[5].abs()).max(1.0);
        let h_trans = 1e-6 * t_scale;
        for k in 0..6 {
            let h = if k < 3 { H_ROT } else { h_trans };
            let mut x_plus = x;
            let mut x_minus = x;
            x_plus[k] += h;
            x_minus[k] -= h;
            residuals(&x_plus, object, image, camera, &mut res_p);
            residuals(&x_minus, object, image, camera, &mut res_m);
            for i in 0..2 * n {
                jac[i][k] = (res_p[i] - res_m[i]) / (2.0 * h);
            }
        }

        // (JᵀJ + λ·diag) δ = -Jᵀr
        let mut a = Matrix6::<f64>::zeros();
        let mut b = Vector6::<f64>::zeros();
        for (j, r) in jac.iter().zip(res.iter()) {
            a += j * j.transpose();
            b += j * *r;
        }
        for d in 0..6 {
            a[(d, d)] += lambda * a[(d, d)].max(1e-12);
        }

        let Some(delta) = a.lu().solve(&(-b)) else {
            lambda *= params.lambda_mul;
            continue;
        };

        let x_new = x + delta;
        let err_new = residuals(&x_new, object, image, camera, &mut res_p);
        if err_new.is_finite() && err_new < err_sq {
            x = x_new;
            std::mem::swap(&mut res, &mut res_p);
            let gain = err_sq - err_new;
            err_sq = err_new;
            lambda = (lambda / params.lambda_mul).max(1e-15);
            if gain < params.eps || err_sq < params.eps {
                converged = true;
            }
        } else {
            lambda *= params.lambda_mul;
            if lambda > 1e12 {
                // no descent direction left: we are at a minimum
                converged = true;
            }
        }
    }

    Ok(LmReport {
        pose: pose_of(&x),
        rmse: (err_sq / (2.0 * n as f64)).sqrt(),
        iterations: iters,
        converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use brickcast_core::{project_points, BoardGeometry, BrownConrady5, Intrinsics};
    use approx::assert_relative_eq;

    fn camera() -> PinholeCamera {
        PinholeCamera::new(
            Intrinsics::new(1436.488, 1438.959, 929.57, 520.83).unwrap(),
            BrownConrady5::from_coeffs([-0.285, 0.1016, -0.00044, 0.000115, -0.018]),
        )
    }

    #[test]
    fn converges_from_perturbed_start() {
        let cam = camera();
        let object = BoardGeometry::default().object_points();
        let truth = Pose::new(Vector3::new(0.25, -0.15, 0.05), Vector3::new(-0.09, -0.06, 0.5));
        let image = project_points(&object, &truth, &cam);

        let start = Pose::new(
            truth.rvec + Vector3::new(0.02, -0.01, 0.015),
            truth.tvec + Vector3::new(0.004, -0.003, 0.01),
        );
        let report = refine_pose_lm(&object, &image, &cam, &start, &LmParams::default()).unwrap();
        assert!(report.converged);
        assert!(report.rmse < 1e-5, "rmse {}", report.rmse);
        assert_relative_eq!(report.pose.rvec, truth.rvec, epsilon = 1e-6);
        assert_relative_eq!(report.pose.tvec, truth.tvec, epsilon = 1e-7);
    }

    #[test]
    fn exact_start_needs_no_iterations() {
        let cam = camera();
        let object = BoardGeometry::default().object_points();
        let truth = Pose::new(Vector3::new(0.1, 0.1, 0.0), Vector3::new(0.0, 0.0, 0.4));
        let image = project_points(&object, &truth, &cam);
        let report = refine_pose_lm(&object, &image, &cam, &truth, &LmParams::default()).unwrap();
        assert!(report.converged);
        assert_eq!(report.iterations, 0);
    }

    #[test]
    fn unequal_correspondences_are_rejected() {
        let cam = camera();
        let object = BoardGeometry::default().object_points();
        let truth = Pose::new(Vector3::new(0.1, 0.1, 0.0), Vector3::new(0.0, 0.0, 0.4));
        let image = project_points(&object, &truth, &cam);

        let err = refine_pose_lm(&object, &image[..40], &cam, &truth, &LmParams::default())
            .unwrap_err();
        assert_eq!(
            err,
            PoseError::MismatchedLengths {
                object: 48,
                image: 40
            }
        );
        let err = refine_pose_lm(&[], &[], &cam, &truth, &LmParams::default()).unwrap_err();
        assert!(matches!(err, PoseError::InsufficientCorrespondences { actual: 0, .. }));
    }
}
