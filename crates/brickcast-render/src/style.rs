use image::Rgb;
use serde::{Deserialize, Serialize};

/// Colours and sizes of the overlay. Colours are RGB.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    pub fill: [u8; 3],
    pub edge: [u8; 3],
    pub edge_thickness: u32,
    pub text_color: [u8; 3],
    pub text_scale: f32,
    pub text_thickness: u32,
    /// Baseline-left corner of the position readout, pixels.
    pub text_origin: [i32; 2],
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            fill: [255, 140, 0],
            edge: [0, 0, 0],
            edge_thickness: 2,
            text_color: [0, 255, 0],
            text_scale: 0.6,
            text_thickness: 1,
            text_origin: [10, 25],
        }
    }
}

impl OverlayStyle {
    pub fn fill_rgb(&self) -> Rgb<u8> {
        Rgb(self.fill)
    }

    pub fn edge_rgb(&self) -> Rgb<u8> {
        Rgb(self.edge)
    }

    pub fn text_rgb(&self) -> Rgb<u8> {
        Rgb(self.text_color)
    }
}
