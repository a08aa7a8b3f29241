//! Raster primitives on top of `imageproc::drawing`.
//!
//! Every primitive takes sub-pixel float coordinates, rounds them to integer
//! pixels and clips against the canvas. Non-finite input draws nothing.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point;
use nalgebra::Point2;

/// Projected coordinates beyond this are clamped before rounding.
const COORD_LIMIT: f64 = 1.0e6;

/// Round a sub-pixel point to integer pixels.
#[inline]
pub fn to_pixel(p: &Point2<f64>) -> Option<Point<i32>> {
    if !p.x.is_finite() || !p.y.is_finite() {
        return None;
    }
    Some(Point::new(
        p.x.clamp(-COORD_LIMIT, COORD_LIMIT).round() as i32,
        p.y.clamp(-COORD_LIMIT, COORD_LIMIT).round() as i32,
    ))
}

/// Drop consecutive duplicates, including a closing point equal to the first.
fn dedup_ring(mut pts: Vec<Point<i32>>) -> Vec<Point<i32>> {
    pts.dedup();
    while pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    pts
}

fn put_pixel_checked(img: &mut RgbImage, p: Point<i32>, color: Rgb<u8>) {
    if p.x >= 0 && p.y >= 0 && (p.x as u32) < img.width() && (p.y as u32) < img.height() {
        img.put_pixel(p.x as u32, p.y as u32, color);
    }
}

/// Fill a convex polygon.
///
/// Polygons that collapse to two distinct pixels become a segment, and to
/// one pixel a dot, so degenerate projections never panic the rasteriser.
pub fn fill_convex(img: &mut RgbImage, pts: &[Point2<f64>], color: Rgb<u8>) {
    let Some(ring) = pts.iter().map(to_pixel).collect::<Option<Vec<_>>>() else {
        return;
    };
    let ring = dedup_ring(ring);
    match ring.len() {
        0 => {}
        1 => put_pixel_checked(img, ring[0], color),
        2 => draw_line_segment_mut(
            img,
            (ring[0].x as f32, ring[0].y as f32),
            (ring[1].x as f32, ring[1].y as f32),
            color,
        ),
        _ => draw_polygon_mut(img, &ring, color),
    }
}

/// Draw a segment `thickness` pixels wide.
///
/// Thick segments are rasterised as a filled quad plus round caps.
pub fn draw_thick_line(
    img: &mut RgbImage,
    a: &Point2<f64>,
    b: &Point2<f64>,
    thickness: u32,
    color: Rgb<u8>,
) {
    let (Some(pa), Some(pb)) = (to_pixel(a), to_pixel(b)) else {
        return;
    };
    if thickness <= 1 {
        draw_line_segment_mut(
            img,
            (pa.x as f32, pa.y as f32),
            (pb.x as f32, pb.y as f32),
            color,
        );
        return;
    }

    let half = thickness as f64 / 2.0;
    let a = Point2::new(pa.x as f64, pa.y as f64);
    let b = Point2::new(pb.x as f64, pb.y as f64);
    let d = b - a;
    let len = d.norm();
    if len > 0.0 {
        let n = nalgebra::Vector2::new(-d.y, d.x) * (half / len);
        fill_convex(img, &[a + n, b + n, b - n, a - n], color);
    }
    let radius = (half - 0.5).round().max(0.0) as i32;
    if radius > 0 {
        draw_filled_circle_mut(img, (pa.x, pa.y), radius, color);
        draw_filled_circle_mut(img, (pb.x, pb.y), radius, color);
    } else {
        put_pixel_checked(img, pa, color);
        put_pixel_checked(img, pb, color);
    }
}

/// Draw `pts` as a polyline, closing it back to the first point if `closed`.
pub fn draw_polyline(
    img: &mut RgbImage,
    pts: &[Point2<f64>],
    closed: bool,
    thickness: u32,
    color: Rgb<u8>,
) {
    for w in pts.windows(2) {
        draw_thick_line(img, &w[0], &w[1], thickness, color);
    }
    if closed && pts.len() > 2 {
        if let (Some(first), Some(last)) = (pts.first(), pts.last()) {
            draw_thick_line(img, last, first, thickness, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb<u8> = Rgb([255, 0, 0]);

    fn count(img: &RgbImage, color: Rgb<u8>) -> usize {
        img.pixels().filter(|p| **p == color).count()
    }

    #[test]
    fn fills_square() {
        let mut img = RgbImage::new(20, 20);
        let sq = [
            Point2::new(5.0, 5.0),
            Point2::new(14.0, 5.0),
            Point2::new(14.0, 14.0),
            Point2::new(5.0, 14.0),
        ];
        fill_convex(&mut img, &sq, RED);
        assert_eq!(*img.get_pixel(10, 10), RED);
        assert_eq!(*img.get_pixel(2, 2), Rgb([0, 0, 0]));
        assert!(count(&img, RED) >= 81);
    }

    #[test]
    fn collapsed_polygons_do_not_panic() {
        let mut img = RgbImage::new(10, 10);
        let p = Point2::new(3.2, 3.4);
        fill_convex(&mut img, &[p, p, p, p], RED);
        assert_eq!(*img.get_pixel(3, 3), RED);

        let q = Point2::new(7.0, 3.0);
        fill_convex(&mut img, &[p, q, q, p], RED);
        assert_eq!(*img.get_pixel(7, 3), RED);

        fill_convex(&mut img, &[], RED);
    }

    #[test]
    fn non_finite_and_far_points_are_safe() {
        let mut img = RgbImage::new(10, 10);
        let nan = Point2::new(f64::NAN, 1.0);
        fill_convex(&mut img, &[nan, Point2::new(1.0, 1.0), Point2::new(5.0, 5.0)], RED);
        assert_eq!(count(&img, RED), 0);

        draw_thick_line(
            &mut img,
            &Point2::new(-1e12, 5.0),
            &Point2::new(1e12, 5.0),
            2,
            RED,
        );
        assert_eq!(*img.get_pixel(5, 5), RED);
    }

    #[test]
    fn thick_line_is_wider_than_thin_line() {
        let mut thin = RgbImage::new(40, 40);
        let mut thick = RgbImage::new(40, 40);
        let a = Point2::new(5.0, 20.0);
        let b = Point2::new(35.0, 20.0);
        draw_thick_line(&mut thin, &a, &b, 1, RED);
        draw_thick_line(&mut thick, &a, &b, 3, RED);
        assert!(count(&thick, RED) > 2 * count(&thin, RED));
    }

    #[test]
    fn closed_polyline_draws_closing_edge() {
        let mut img = RgbImage::new(30, 30);
        let tri = [
            Point2::new(5.0, 5.0),
            Point2::new(25.0, 5.0),
            Point2::new(5.0, 25.0),
        ];
        draw_polyline(&mut img, &tri, true, 1, RED);
        assert_eq!(*img.get_pixel(15, 15), RED);
        assert_eq!(*img.get_pixel(5, 15), RED);
        assert_eq!(*img.get_pixel(10, 10), Rgb([0, 0, 0]));
    }
}
