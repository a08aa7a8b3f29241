use crate::primitives::{draw_polyline, draw_thick_line, fill_convex};
use crate::OverlayStyle;
use brickcast_core::{project_points, BrickModel, PinholeCamera, Pose};
use image::RgbImage;
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Brick geometry projected into one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectedBrick {
    pub body: [Point2<f64>; 8],
    /// Nub rings, flattened like [`BrickModel::nubs`].
    pub nubs: Vec<Point2<f64>>,
    pub nub_segments: usize,
}

impl ProjectedBrick {
    /// Project the body vertices and the nub rings with the frame's pose.
    pub fn project(model: &BrickModel, pose: &Pose, camera: &PinholeCamera) -> Self {
        let body_px = project_points(&model.body, pose, camera);
        let body = std::array::from_fn(|i| body_px[i]);
        let nubs = project_points(&model.nubs, pose, camera);
        Self {
            body,
            nubs,
            nub_segments: model.nub_segments,
        }
    }

    pub fn nub_rings(&self) -> impl Iterator<Item = &[Point2<f64>]> {
        self.nubs.chunks_exact(self.nub_segments.max(1))
    }

    /// Mean of the eight body vertices.
    pub fn centroid(&self) -> Point2<f64> {
        let sum = self
            .body
            .iter()
            .fold(nalgebra::Vector2::zeros(), |acc, p| acc + p.coords);
        Point2::from(sum / 8.0)
    }
}

/// Paint the brick onto `img`.
///
/// Faces are filled in the fixed order of [`BrickModel::FACES`], then every
/// body edge is stroked, then each nub ring is filled and outlined. No depth
/// test is made.
#[cfg_attr(feature = "tracing", instrument(level = "trace", skip_all))]
pub fn draw_brick(img: &mut RgbImage, brick: &ProjectedBrick, style: &OverlayStyle) {
    let fill = style.fill_rgb();
    let edge = style.edge_rgb();

    for face in BrickModel::FACES.iter() {
        let quad = face.indices.map(|i| brick.body[i]);
        fill_convex(img, &quad, fill);
    }

    for (a, b) in BrickModel::EDGES {
        draw_thick_line(img, &brick.body[a], &brick.body[b], style.edge_thickness, edge);
    }

    for ring in brick.nub_rings() {
        fill_convex(img, ring, fill);
        draw_polyline(img, ring, true, style.edge_thickness, edge);
    }
}
