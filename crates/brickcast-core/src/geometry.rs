//! Board and brick geometry in board-local coordinates.
//!
//! All coordinates are metres on the board plane `Z = 0`. Negative `Z`
//! points out of the board toward the camera.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Points per nub ring.
pub const NUB_RING_POINTS: usize = 8;

/// Inner-corner layout of a planar checkerboard.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardGeometry {
    /// Inner corners along the long axis.
    pub cols: u32,
    /// Inner corners along the short axis.
    pub rows: u32,
    /// Edge length of one square, metres.
    pub cell_size: f64,
}

impl Default for BoardGeometry {
    fn default() -> Self {
        Self {
            cols: 8,
            rows: 6,
            cell_size: 0.025,
        }
    }
}

impl BoardGeometry {
    pub fn corner_count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    /// Object points in row-major order: index `r * cols + c` is
    /// `(c * cell_size, r * cell_size, 0)`.
    pub fn object_points(&self) -> Vec<Point3<f64>> {
        let s = self.cell_size;
        (0..self.rows)
            .flat_map(|r| (0..self.cols).map(move |c| Point3::new(c as f64 * s, r as f64 * s, 0.0)))
            .collect()
    }
}

/// Brick dimensions, all in board cells.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrickSpec {
    /// Footprint corner with the smallest `(x, y)`.
    pub origin: [f64; 2],
    /// Footprint extent along `x` and `y`.
    pub footprint: [f64; 2],
    /// Body height; the top face sits at `Z = -height`.
    pub height: f64,
    /// Nub ring height; rings sit at `Z = -nub_height`.
    pub nub_height: f64,
    pub nub_radius: f64,
    /// Nub centre offsets from `origin`, applied on both axes.
    pub nub_offsets: Vec<f64>,
    pub nub_segments: usize,
}

impl Default for BrickSpec {
    fn default() -> Self {
        Self {
            origin: [4.0, 2.0],
            footprint: [2.0, 2.0],
            height: 0.5,
            nub_height: 0.6,
            nub_radius: 0.2,
            nub_offsets: vec![0.5, 1.5],
            nub_segments: NUB_RING_POINTS,
        }
    }
}

/// One face of the brick body as indices into [`BrickModel::body`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BrickFace {
    pub name: &'static str,
    pub indices: [usize; 4],
}

/// Brick scene geometry, ready for projection.
#[derive(Clone, Debug, PartialEq)]
pub struct BrickModel {
    /// Bottom face `0..4` at `Z = 0`, top face `4..8`; vertex `i + 4` sits
    /// above vertex `i`.
    pub body: [Point3<f64>; 8],
    /// Nub rings, flattened: ring `n` occupies `n * nub_segments..`.
    pub nubs: Vec<Point3<f64>>,
    pub nub_segments: usize,
}

impl BrickModel {
    /// Body edges: bottom loop, top loop, then the four verticals.
    pub const EDGES: [(usize, usize); 12] = [
        (0, 1),
        (1, 2),
        (2, 3),
        (3, 0),
        (4, 5),
        (5, 6),
        (6, 7),
        (7, 4),
        (0, 4),
        (1, 5),
        (2, 6),
        (3, 7),
    ];

    /// Faces in painter's order. The bottom face lies on the board and is
    /// never drawn.
    pub const FACES: [BrickFace; 5] = [
        BrickFace {
            name: "top",
            indices: [4, 5, 6, 7],
        },
        BrickFace {
            name: "back",
            indices: [3, 2, 6, 7],
        },
        BrickFace {
            name: "front",
            indices: [0, 1, 5, 4],
        },
        BrickFace {
            name: "right",
            indices: [1, 2, 6, 5],
        },
        BrickFace {
            name: "left",
            indices: [0, 3, 7, 4],
        },
    ];

    /// Build the model for a board with the given cell size.
    pub fn new(spec: &BrickSpec, cell_size: f64) -> Self {
        let s = cell_size;
        let [x0, y0] = spec.origin;
        let [w, d] = spec.footprint;
        let footprint = [(x0, y0), (x0 + w, y0), (x0 + w, y0 + d), (x0, y0 + d)];

        let mut body = [Point3::origin(); 8];
        for (i, &(x, y)) in footprint.iter().enumerate() {
            body[i] = Point3::new(x * s, y * s, 0.0);
            body[i + 4] = Point3::new(x * s, y * s, -spec.height * s);
        }

        let segments = spec.nub_segments.max(1);
        let mut nubs =
            Vec::with_capacity(spec.nub_offsets.len() * spec.nub_offsets.len() * segments);
        for &dx in &spec.nub_offsets {
            for &dy in &spec.nub_offsets {
                let cx = (x0 + dx) * s;
                let cy = (y0 + dy) * s;
                let r = spec.nub_radius * s;
                let z = -spec.nub_height * s;
                for k in 0..segments {
                    let a = std::f64::consts::TAU * k as f64 / segments as f64;
                    nubs.push(Point3::new(cx + r * a.cos(), cy + r * a.sin(), z));
                }
            }
        }

        Self {
            body,
            nubs,
            nub_segments: segments,
        }
    }

    pub fn nub_count(&self) -> usize {
        self.nubs.len() / self.nub_segments
    }

    /// Iterate nub rings as slices of `nub_segments` points.
    pub fn nub_rings(&self) -> impl Iterator<Item = &[Point3<f64>]> {
        self.nubs.chunks_exact(self.nub_segments)
    }
}

impl Default for BrickModel {
    fn default() -> Self {
        Self::new(&BrickSpec::default(), BoardGeometry::default().cell_size)
    }
}
