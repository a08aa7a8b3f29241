use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Raw corner candidate in pixel coordinates.
///
/// This is the thing you obtain by adapting the output of a ChESS detector.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Corner {
    /// Corner position in pixel coordinates (sub-pixel).
    pub position: Point2<f32>,

    /// Strength / response of the corner detector.
    pub strength: f32,
}

impl Corner {
    pub fn new(x: f32, y: f32, strength: f32) -> Self {
        Self {
            position: Point2::new(x, y),
            strength,
        }
    }

    /// Convenience accessor for (x, y) as a vector.
    pub fn as_vec2(&self) -> Vector2<f32> {
        Vector2::new(self.position.x, self.position.y)
    }
}
