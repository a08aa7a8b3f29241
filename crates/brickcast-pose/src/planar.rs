//! Pose initialisation from a plane-induced homography.

use crate::PoseError;
use brickcast_core::{Homography, Pose};
use nalgebra::{Matrix3, Rotation3, Vector3};

/// Decompose a homography from the board plane `Z = 0` to normalized image
/// coordinates into a board → camera pose.
///
/// The intrinsics are already removed, so `H ~ [r1 r2 t]`. The rotation is
/// projected onto SO(3) and the sign is chosen so the board lies in front of
/// the camera (`t.z > 0`).
pub fn pose_from_homography(h: &Homography) -> Result<Pose, PoseError> {
    let h1 = h.h.column(0).into_owned();
    let h2 = h.h.column(1).into_owned();
    let h3 = h.h.column(2).into_owned();

    let norm1 = h1.norm();
    let norm2 = h2.norm();
    if norm1 <= 1e-12 || norm2 <= 1e-12 {
        return Err(PoseError::Degenerate("homography columns vanish"));
    }
    // average the two column norms for the scale
    let lambda = 2.0 / (norm1 + norm2);

    let mut r1: Vector3<f64> = lambda * h1;
    let mut r2: Vector3<f64> = lambda * h2;
    let mut t: Vector3<f64> = lambda * h3;
    if t.z < 0.0 {
        r1 = -r1;
        r2 = -r2;
        t = -t;
    }
    let r3 = r1.cross(&r2);
    if r3.norm() <= 1e-12 {
        return Err(PoseError::Degenerate("homography columns are parallel"));
    }

    let mut r = Matrix3::<f64>::zeros();
    r.set_column(0, &r1);
    r.set_column(1, &r2);
    r.set_column(2, &r3);

    // closest rotation (polar decomposition)
    let svd = r.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(PoseError::Degenerate("svd failed during planar pose extraction"));
    };
    let mut r_orth = u * v_t;
    if r_orth.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        r_orth = u_flipped * v_t;
    }

    Ok(Pose::from_rotation(
        &Rotation3::from_matrix_unchecked(r_orth),
        t,
    ))
}
