use nalgebra::{Isometry3, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Rigid transform from board-local coordinates to camera coordinates.
///
/// The rotation is stored as a rotation vector (axis × angle, radians); the
/// rotation matrix is obtained through Rodrigues' formula.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub rvec: Vector3<f64>,
    pub tvec: Vector3<f64>,
}

impl Pose {
    pub fn new(rvec: Vector3<f64>, tvec: Vector3<f64>) -> Self {
        Self { rvec, tvec }
    }

    pub fn from_rotation(rotation: &Rotation3<f64>, tvec: Vector3<f64>) -> Self {
        Self::new(rotation.scaled_axis(), tvec)
    }

    pub fn from_isometry(iso: &Isometry3<f64>) -> Self {
        Self::new(iso.rotation.scaled_axis(), iso.translation.vector)
    }

    /// Rodrigues: rotation vector → rotation matrix.
    pub fn rotation(&self) -> Rotation3<f64> {
        Rotation3::from_scaled_axis(self.rvec)
    }

    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::from(self.tvec),
            UnitQuaternion::from_scaled_axis(self.rvec),
        )
    }

    /// Board-local point → camera coordinates.
    #[inline]
    pub fn transform_point(&self, p: &Point3<f64>) -> Vector3<f64> {
        self.rotation() * p.coords + self.tvec
    }

    pub fn is_finite(&self) -> bool {
        self.rvec.iter().chain(self.tvec.iter()).all(|v| v.is_finite())
    }
}

/// Camera centre expressed in board coordinates: `-Rᵀ·t`.
pub fn camera_position(pose: &Pose) -> Vector3<f64> {
    -(pose.rotation().transpose() * pose.tvec)
}
