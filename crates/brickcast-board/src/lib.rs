//! Checkerboard inner-corner detector built on top of ChESS corners.
//!
//! Pipeline:
//! 1. Optionally equalize the frame histogram.
//! 2. Run the ChESS detector (`chess-corners`) at a relative threshold.
//! 3. Estimate the grid axes and spacing from nearest-neighbour edges.
//! 4. Link each corner to at most one neighbour per axis direction; keep
//!    mutual links only.
//! 5. BFS each connected component and assign integer coordinates.
//! 6. Keep the complete component matching `cols × rows` (up to swap).
//! 7. Order it row-major with a right-handed, upper-first labelling.
//! 8. With adaptive thresholding, retry 2–7 at lower thresholds.

mod detector;
mod geom;
mod gridgraph;
mod params;

pub use detector::{chess_config, detect_corners, BoardDetector, DetectedBoard};
pub use gridgraph::{GridAxes, GridGraph, NeighborDirection};
pub use params::{BoardDetectParams, GridGraphParams};
