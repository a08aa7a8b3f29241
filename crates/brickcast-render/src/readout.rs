use crate::hud::{draw_text, readout_font};
use crate::OverlayStyle;
use image::RgbImage;
use log::warn;
use nalgebra::Vector3;

/// `XYZ: [x y z]` with three decimals.
pub fn format_position(p: &Vector3<f64>) -> String {
    format!("XYZ: [{:.3} {:.3} {:.3}]", p.x, p.y, p.z)
}

/// Draw the camera position readout at the style's text origin.
pub fn draw_position(img: &mut RgbImage, position: &Vector3<f64>, style: &OverlayStyle) {
    let font = match readout_font() {
        Ok(font) => font,
        Err(err) => {
            warn!("readout font unavailable: {err}");
            return;
        }
    };
    let text = format_position(position);
    draw_text(
        img,
        &font,
        &text,
        (style.text_origin[0], style.text_origin[1]),
        style.text_scale,
        style.text_thickness,
        style.text_rgb(),
    );
}
