use crate::geom::cross2;
use crate::gridgraph::{assign_grid_coordinates, connected_components, GridGraph};
use crate::params::BoardDetectParams;
use brickcast_core::Corner;
use chess_corners::{find_chess_corners_image, ChessConfig, CornerDescriptor, ThresholdMode};
use image::GrayImage;
use log::{debug, info, warn};
use nalgebra::{Point2, Vector2};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Inner corners of one checkerboard in row-major order.
///
/// Index `r * cols + c` corresponds to the object point at column `c`,
/// row `r` of the board.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedBoard {
    pub cols: u32,
    pub rows: u32,
    pub corners: Vec<Point2<f32>>,
    /// Raw ChESS candidates seen by the successful pass.
    pub raw_corner_count: usize,
    /// Relative response threshold of the successful pass.
    pub threshold_rel: f32,
}

impl DetectedBoard {
    pub fn corner_count(&self) -> usize {
        self.corners.len()
    }

    pub fn image_points(&self) -> Vec<Point2<f64>> {
        self.corners
            .iter()
            .map(|p| Point2::new(p.x as f64, p.y as f64))
            .collect()
    }
}

/// ChESS settings for one detection pass.
pub fn chess_config(threshold_rel: f32, nms_radius: u32) -> ChessConfig {
    let mut cfg = ChessConfig::single_scale();
    cfg.threshold_mode = ThresholdMode::Relative;
    cfg.threshold_value = threshold_rel;
    cfg.nms_radius = nms_radius;
    cfg
}

fn adapt_chess_corner(c: &CornerDescriptor) -> Corner {
    Corner::new(c.x, c.y, c.response)
}

/// Detect ChESS corners and adapt them into [`Corner`].
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(img, cfg), fields(width = img.width(), height = img.height()))
)]
pub fn detect_corners(img: &GrayImage, cfg: &ChessConfig) -> Vec<Corner> {
    match find_chess_corners_image(img, cfg) {
        Ok(found) => found.iter().map(adapt_chess_corner).collect(),
        Err(err) => {
            warn!("ChESS detection failed: {err}");
            Vec::new()
        }
    }
}

/// Checkerboard detector: ChESS corners, grid graph, row-major ordering.
#[derive(Clone, Debug, Default)]
pub struct BoardDetector {
    pub params: BoardDetectParams,
}

impl BoardDetector {
    pub fn new(params: BoardDetectParams) -> Self {
        Self { params }
    }

    /// Find the board in a grayscale frame.
    ///
    /// Returns `None` when no complete `cols × rows` grid is found after all
    /// threshold passes.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, img),
            fields(width = img.width(), height = img.height(), cols = self.params.cols, rows = self.params.rows)
        )
    )]
    pub fn detect(&self, img: &GrayImage) -> Option<DetectedBoard> {
        let equalized;
        let gray = if self.params.normalize_image {
            equalized = imageproc::contrast::equalize_histogram(img);
            &equalized
        } else {
            img
        };

        for (pass, threshold_rel) in self.params.threshold_schedule().into_iter().enumerate() {
            let cfg = chess_config(threshold_rel, self.params.nms_radius);
            let corners = detect_corners(gray, &cfg);
            debug!(
                "pass {pass}: {} ChESS corners at threshold_rel={threshold_rel:.3}",
                corners.len()
            );
            if let Some(mut board) = self.detect_from_corners(&corners) {
                board.threshold_rel = threshold_rel;
                return Some(board);
            }
        }
        None
    }

    /// Find the board among precomputed corner candidates.
    pub fn detect_from_corners(&self, corners: &[Corner]) -> Option<DetectedBoard> {
        let cols = self.params.cols as usize;
        let rows = self.params.rows as usize;
        let expected = self.params.expected_corners();
        if expected == 0 {
            return None;
        }

        let strong: Vec<Corner> = corners
            .iter()
            .copied()
            .filter(|c| c.strength >= self.params.min_strength)
            .collect();

        if self.params.fast_check && strong.len() < expected {
            debug!(
                "fast check: {} corners, need at least {expected}",
                strong.len()
            );
            return None;
        }

        let graph = GridGraph::new(&strong, &self.params.graph)?;

        let mut best: Option<(f32, Vec<Point2<f32>>)> = None;
        for component in connected_components(&graph) {
            if component.len() != expected {
                continue;
            }
            let Some(coords) = assign_grid_coordinates(&graph, &component) else {
                debug!("component of {} corners has conflicting links", component.len());
                continue;
            };
            let Some(grid) = layout_grid(&strong, &coords, cols, rows) else {
                continue;
            };
            let strength: f32 = component.iter().map(|&i| strong[i].strength).sum();
            if best.as_ref().is_none_or(|(s, _)| strength > *s) {
                best = Some((strength, grid));
            }
        }

        let (_, grid) = best?;
        let ordered = canonical_order(grid, cols, rows);
        info!("checkerboard {cols}x{rows} found among {} corners", strong.len());

        Some(DetectedBoard {
            cols: self.params.cols,
            rows: self.params.rows,
            corners: ordered,
            raw_corner_count: corners.len(),
            threshold_rel: self.params.threshold_rel,
        })
    }
}

/// Arrange BFS coordinates into a row-major `cols × rows` grid.
///
/// The BFS frame may have its long axis along `j`; it is transposed so that
/// rows have `cols` entries. `None` unless the extents match the pattern.
fn layout_grid(
    corners: &[Corner],
    coords: &[(usize, i32, i32)],
    cols: usize,
    rows: usize,
) -> Option<Vec<Point2<f32>>> {
    let min_i = coords.iter().map(|c| c.1).min()?;
    let max_i = coords.iter().map(|c| c.1).max()?;
    let min_j = coords.iter().map(|c| c.2).min()?;
    let max_j = coords.iter().map(|c| c.2).max()?;
    let w = (max_i - min_i + 1) as usize;
    let h = (max_j - min_j + 1) as usize;

    let transpose = if (w, h) == (cols, rows) {
        false
    } else if (w, h) == (rows, cols) {
        true
    } else {
        debug!("component extent {w}x{h} does not match {cols}x{rows}");
        return None;
    };

    let mut grid = vec![None; cols * rows];
    for &(node, i, j) in coords {
        let (i, j) = ((i - min_i) as usize, (j - min_j) as usize);
        let (c, r) = if transpose { (j, i) } else { (i, j) };
        grid[r * cols + c] = Some(corners[node].position);
    }
    grid.into_iter().collect()
}

/// Fix the labelling ambiguity of a row-major grid.
///
/// Mirrors columns so that the column axis crossed with the row axis is
/// positive in image coordinates, then rotates by 180° if needed so the first
/// corner is above the last one (left of it on a tie).
fn canonical_order(mut grid: Vec<Point2<f32>>, cols: usize, rows: usize) -> Vec<Point2<f32>> {
    let at = |g: &[Point2<f32>], c: usize, r: usize| g[r * cols + c];

    let mut col_dir = Vector2::<f32>::zeros();
    let mut row_dir = Vector2::<f32>::zeros();
    for r in 0..rows {
        for c in 0..cols {
            if c + 1 < cols {
                col_dir += at(&grid, c + 1, r) - at(&grid, c, r);
            }
            if r + 1 < rows {
                row_dir += at(&grid, c, r + 1) - at(&grid, c, r);
            }
        }
    }

    if cross2(&col_dir, &row_dir) < 0.0 {
        for row in grid.chunks_exact_mut(cols) {
            row.reverse();
        }
    }

    if let (Some(first), Some(last)) = (grid.first(), grid.last()) {
        let dy = last.y - first.y;
        if dy < -0.5 || (dy.abs() <= 0.5 && last.x < first.x) {
            grid.reverse();
        }
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chess_config_uses_relative_threshold() {
        let cfg = chess_config(0.15, 3);
        assert_eq!(cfg.threshold_mode, ThresholdMode::Relative);
        assert_eq!(cfg.threshold_value, 0.15);
        assert_eq!(cfg.nms_radius, 3);
    }

    fn grid_corners(cols: usize, rows: usize, map: impl Fn(f32, f32) -> (f32, f32)) -> Vec<Corner> {
        let mut out = Vec::new();
        for r in 0..rows {
            for c in 0..cols {
                let (x, y) = map(c as f32, r as f32);
                out.push(Corner::new(x, y, 1.0));
            }
        }
        out
    }

    fn assert_canonical(board: &DetectedBoard) {
        let cols = board.cols as usize;
        let rows = board.rows as usize;
        let p = &board.corners;
        let col = p[1] - p[0];
        let row = p[cols] - p[0];
        assert!(cross2(&col, &row) > 0.0, "left-handed ordering");
        assert!(p[0].y <= p[cols * rows - 1].y, "first corner is not the upper one");
    }

    #[test]
    fn orders_axis_aligned_grid_row_major() {
        let corners = grid_corners(8, 6, |c, r| (100.0 + 30.0 * c, 80.0 + 30.0 * r));
        let det = BoardDetector::default();
        let board = det.detect_from_corners(&corners).unwrap();
        assert_eq!(board.corner_count(), 48);
        for (k, p) in board.corners.iter().enumerate() {
            assert_eq!(*p, corners[k].position);
        }
    }

    #[test]
    fn transposes_portrait_board() {
        // 6 wide, 8 tall in the image
        let corners = grid_corners(6, 8, |c, r| (50.0 + 25.0 * c, 40.0 + 25.0 * r));
        let board = BoardDetector::default().detect_from_corners(&corners).unwrap();
        assert_eq!(board.corner_count(), 48);
        assert_canonical(&board);
        // rows of the result run along image y
        let d = board.corners[1] - board.corners[0];
        assert!(d.y.abs() > d.x.abs());
    }

    #[test]
    fn upside_down_board_is_rotated_back() {
        let corners = grid_corners(8, 6, |c, r| (400.0 - 30.0 * c, 300.0 - 30.0 * r));
        let board = BoardDetector::default().detect_from_corners(&corners).unwrap();
        assert_canonical(&board);
        assert_eq!(board.corners[0], Point2::new(190.0, 150.0));
    }

    #[test]
    fn scattered_corners_are_not_a_board() {
        let corners: Vec<Corner> = (0..60)
            .map(|k| {
                let k = k as f32;
                Corner::new((k * 37.3) % 500.0, (k * 91.7) % 400.0, 1.0)
            })
            .collect();
        assert!(BoardDetector::default().detect_from_corners(&corners).is_none());
    }

    #[test]
    fn fast_check_rejects_too_few_corners() {
        let corners = grid_corners(8, 5, |c, r| (30.0 * c, 30.0 * r));
        assert!(BoardDetector::default().detect_from_corners(&corners).is_none());
    }

    #[test]
    fn missing_corner_blocks_detection() {
        let mut corners = grid_corners(8, 6, |c, r| (100.0 + 30.0 * c, 80.0 + 30.0 * r));
        corners.remove(20);
        corners.push(Corner::new(900.0, 900.0, 1.0));
        assert!(BoardDetector::default().detect_from_corners(&corners).is_none());
    }
}
