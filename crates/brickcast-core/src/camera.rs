use nalgebra::{Matrix3, Point2, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Errors raised while building a camera model.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("focal lengths must be finite and non-zero (fx={fx}, fy={fy})")]
    InvalidFocalLength { fx: f64, fy: f64 },
    #[error("camera matrix must have zero skew and zero bottom row (got {0:?})")]
    NotPinhole([[f64; 3]; 3]),
}

/// Pinhole intrinsics `fx, fy, cx, cy` (pixels).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl Intrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Result<Self, CameraError> {
        if !fx.is_finite() || !fy.is_finite() || fx == 0.0 || fy == 0.0 {
            return Err(CameraError::InvalidFocalLength { fx, fy });
        }
        Ok(Self { fx, fy, cx, cy })
    }

    /// Build intrinsics from a row-major 3×3 camera matrix.
    ///
    /// Only `fx`, `fy`, `cx`, `cy` are read. The bottom-right element is
    /// ignored: projection always divides by depth, never by `K[2][2]`.
    pub fn from_rows(rows: [[f64; 3]; 3]) -> Result<Self, CameraError> {
        if rows[0][1] != 0.0 || rows[1][0] != 0.0 || rows[2][0] != 0.0 || rows[2][1] != 0.0 {
            return Err(CameraError::NotPinhole(rows));
        }
        Self::new(rows[0][0], rows[1][1], rows[0][2], rows[1][2])
    }

    /// Canonical `K` with a unit bottom-right element.
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, 0.0, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }

    #[inline]
    pub fn to_pixel(&self, n: &Vector2<f64>) -> Point2<f64> {
        Point2::new(self.fx * n.x + self.cx, self.fy * n.y + self.cy)
    }

    #[inline]
    pub fn to_normalized(&self, p: &Point2<f64>) -> Vector2<f64> {
        Vector2::new((p.x - self.cx) / self.fx, (p.y - self.cy) / self.fy)
    }
}

fn default_undistort_iters() -> u32 {
    8
}

/// Five-coefficient Brown-Conrady lens distortion.
///
/// Field order on the wire is the conventional `k1, k2, p1, p2, k3`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BrownConrady5 {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
    /// Fixed-point iterations used by [`BrownConrady5::undistort`].
    #[serde(default = "default_undistort_iters")]
    pub iters: u32,
}

impl BrownConrady5 {
    /// Coefficients in `[k1, k2, p1, p2, k3]` order.
    pub fn from_coeffs(c: [f64; 5]) -> Self {
        Self {
            k1: c[0],
            k2: c[1],
            p1: c[2],
            p2: c[3],
            k3: c[4],
            iters: default_undistort_iters(),
        }
    }

    pub fn coeffs(&self) -> [f64; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }

    fn distort_impl(&self, x: f64, y: f64) -> (f64, f64) {
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;
        let radial = 1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6;

        let xy = x * y;
        let x_tan = 2.0 * self.p1 * xy + self.p2 * (r2 + 2.0 * x * x);
        let y_tan = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * xy;

        (x * radial + x_tan, y * radial + y_tan)
    }

    /// Map ideal normalized coordinates to distorted normalized coordinates.
    pub fn distort(&self, n: &Vector2<f64>) -> Vector2<f64> {
        let (xd, yd) = self.distort_impl(n.x, n.y);
        Vector2::new(xd, yd)
    }

    /// Invert [`BrownConrady5::distort`] by fixed-point iteration.
    pub fn undistort(&self, n_dist: &Vector2<f64>) -> Vector2<f64> {
        let mut x = n_dist.x;
        let mut y = n_dist.y;
        let iters = if self.iters == 0 {
            default_undistort_iters()
        } else {
            self.iters
        };
        for _ in 0..iters {
            let (xd, yd) = self.distort_impl(x, y);
            x -= xd - n_dist.x;
            y -= yd - n_dist.y;
        }
        Vector2::new(x, y)
    }
}

/// Calibrated camera: pinhole intrinsics plus lens distortion.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PinholeCamera {
    pub intrinsics: Intrinsics,
    #[serde(default)]
    pub distortion: BrownConrady5,
}

impl PinholeCamera {
    pub fn new(intrinsics: Intrinsics, distortion: BrownConrady5) -> Self {
        Self {
            intrinsics,
            distortion,
        }
    }

    /// Camera without lens distortion.
    pub fn ideal(intrinsics: Intrinsics) -> Self {
        Self::new(intrinsics, BrownConrady5::default())
    }

    /// Project a point given in camera coordinates.
    ///
    /// No depth check is made: a point behind the camera is divided by its
    /// negative depth like any other.
    #[inline]
    pub fn project(&self, pc: &Vector3<f64>) -> Point2<f64> {
        let n = Vector2::new(pc.x / pc.z, pc.y / pc.z);
        self.intrinsics.to_pixel(&self.distortion.distort(&n))
    }

    /// Pixel → undistorted normalized coordinates on the `Z = 1` plane.
    pub fn undistort_pixel(&self, p: &Point2<f64>) -> Vector2<f64> {
        self.distortion
            .undistort(&self.intrinsics.to_normalized(p))
    }
}
