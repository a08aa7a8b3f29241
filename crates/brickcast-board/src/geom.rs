use nalgebra::Vector2;

/// Dominant direction of a set of edge vectors, modulo 90°.
///
/// Grid edges point along ±u and ±v, four directions that collapse to a single
/// one when the angle is multiplied by four. Each vector is weighted by
/// `weight`. Returns the axis angle in `[-π/4, π/4)`, or `None` when the
/// directions cancel out.
pub fn dominant_axis_angle<I>(edges: I) -> Option<f32>
where
    I: IntoIterator<Item = (Vector2<f32>, f32)>,
{
    let mut sum = Vector2::<f32>::zeros();
    let mut weight_sum = 0.0f32;

    for (e, w) in edges {
        if w <= 0.0 || e.norm_squared() <= f32::EPSILON {
            continue;
        }
        let four_theta = 4.0 * e.y.atan2(e.x);
        sum += w * Vector2::new(four_theta.cos(), four_theta.sin());
        weight_sum += w;
    }

    if weight_sum <= 0.0 {
        return None;
    }

    let mean = sum / weight_sum;
    if mean.norm_squared() < 1e-6 {
        return None;
    }
    Some(0.25 * mean.y.atan2(mean.x))
}

/// Unit vector at angle `theta`.
pub fn angle_to_unit(theta: f32) -> Vector2<f32> {
    Vector2::new(theta.cos(), theta.sin())
}

/// z-component of `a × b`; positive when `b` is clockwise from `a` in
/// image coordinates (y down).
#[inline]
pub fn cross2(a: &Vector2<f32>, b: &Vector2<f32>) -> f32 {
    a.x * b.y - a.y * b.x
}
