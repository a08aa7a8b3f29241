//! Overlay rendering for RGB frames.
//!
//! The brick is painted without a depth buffer: faces in a fixed order,
//! then edges, then nubs. The position readout uses an embedded TrueType face.

mod brick;
pub mod hud;
pub mod primitives;
mod readout;
mod style;

pub use brick::{draw_brick, ProjectedBrick};
pub use readout::{draw_position, format_position};
pub use style::OverlayStyle;
