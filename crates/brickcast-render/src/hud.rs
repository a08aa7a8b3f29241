//! Text drawing for the position readout.
//!
//! Glyphs come from the embedded DejaVu Sans face and are rasterized with
//! `imageproc`'s anti-aliased text renderer.

use ab_glyph::{Font, FontRef, InvalidFont, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};

static DEJAVU_SANS: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Pixel height (ascent to descent) at scale 1.0.
const LINE_HEIGHT_PX: f32 = 30.0;

/// The embedded readout face.
pub fn readout_font() -> Result<FontRef<'static>, InvalidFont> {
    FontRef::try_from_slice(DEJAVU_SANS)
}

fn px_scale(scale: f32) -> PxScale {
    PxScale::from(LINE_HEIGHT_PX * scale)
}

/// Whether every character of `text` has a glyph in `font`.
pub fn is_renderable(font: &FontRef<'_>, text: &str) -> bool {
    text.chars().all(|c| c == ' ' || font.glyph_id(c).0 != 0)
}

/// Rendered width of `text` in pixels.
pub fn text_width(font: &FontRef<'_>, text: &str, scale: f32) -> u32 {
    text_size(px_scale(scale), font, text).0
}

/// Draw `text` with its baseline-left corner at `origin`.
///
/// A `thickness` above 1 overstrikes the text shifted right by one pixel
/// per extra unit.
pub fn draw_text(
    img: &mut RgbImage,
    font: &FontRef<'_>,
    text: &str,
    origin: (i32, i32),
    scale: f32,
    thickness: u32,
    color: Rgb<u8>,
) {
    let px = px_scale(scale);
    let ascent = font.as_scaled(px).ascent().round() as i32;
    let top = origin.1 - ascent;
    for dx in 0..thickness.max(1) as i32 {
        draw_text_mut(img, color, origin.0 + dx, top, px, font, text);
    }
}
