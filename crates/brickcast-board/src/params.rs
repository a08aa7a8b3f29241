use serde::{Deserialize, Serialize};

/// Neighbour search parameters of the grid graph.
///
/// Spacings are relative to the median nearest-neighbour distance so the
/// same parameters work across image resolutions and board distances.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GridGraphParams {
    pub min_spacing_rel: f32,
    pub max_spacing_rel: f32,
    pub k_neighbors: usize,
    /// Maximum angle between an edge and the closest grid axis.
    pub axis_tolerance_deg: f32,
}

impl Default for GridGraphParams {
    fn default() -> Self {
        Self {
            min_spacing_rel: 0.5,
            max_spacing_rel: 1.8,
            k_neighbors: 9,
            axis_tolerance_deg: 22.5,
        }
    }
}

/// Parameters of the checkerboard detector.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BoardDetectParams {
    /// Expected inner corners along the long axis.
    pub cols: u32,
    /// Expected inner corners along the short axis.
    pub rows: u32,

    /// Retry with a lowered response threshold when a pass fails.
    pub adaptive_threshold: bool,
    /// Equalize the histogram before running the corner detector.
    pub normalize_image: bool,
    /// Give up early when fewer raw corners than `cols * rows` are found.
    pub fast_check: bool,

    /// ChESS response threshold relative to the strongest response.
    pub threshold_rel: f32,
    /// Threshold factor applied on every adaptive retry.
    pub threshold_decay: f32,
    pub adaptive_passes: u32,
    pub nms_radius: u32,

    /// Minimal corner strength to consider. ChESS responses of true
    /// X-junctions are positive.
    pub min_strength: f32,

    pub graph: GridGraphParams,
}

impl Default for BoardDetectParams {
    fn default() -> Self {
        Self {
            cols: 8,
            rows: 6,
            adaptive_threshold: true,
            normalize_image: true,
            fast_check: true,
            threshold_rel: 0.2,
            threshold_decay: 0.5,
            adaptive_passes: 3,
            nms_radius: 2,
            min_strength: 1e-3,
            graph: GridGraphParams::default(),
        }
    }
}

impl BoardDetectParams {
    pub fn for_pattern(cols: u32, rows: u32) -> Self {
        Self {
            cols,
            rows,
            ..Self::default()
        }
    }

    pub fn expected_corners(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    /// Relative thresholds tried in order, one per detection pass.
    pub fn threshold_schedule(&self) -> Vec<f32> {
        let passes = if self.adaptive_threshold {
            self.adaptive_passes.max(1)
        } else {
            1
        };
        (0..passes)
            .map(|i| self.threshold_rel * self.threshold_decay.powi(i as i32))
            .collect()
    }
}
