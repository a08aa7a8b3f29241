use crate::{PinholeCamera, Pose};
use nalgebra::{Point2, Point3};

/// Project one board-local point into pixel coordinates.
#[inline]
pub fn project_point(p: &Point3<f64>, pose: &Pose, camera: &PinholeCamera) -> Point2<f64> {
    camera.project(&pose.transform_point(p))
}

/// Project board-local points into pixels through pose, distortion and
/// intrinsics.
///
/// The output has exactly one pixel per input point, in input order. The
/// rotation matrix is evaluated once per call.
pub fn project_points(
    points: &[Point3<f64>],
    pose: &Pose,
    camera: &PinholeCamera,
) -> Vec<Point2<f64>> {
    let r = pose.rotation();
    points
        .iter()
        .map(|p| camera.project(&(r * p.coords + pose.tvec)))
        .collect()
}
