use crate::geom::{angle_to_unit, dominant_axis_angle};
use crate::params::GridGraphParams;
use brickcast_core::Corner;
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Vector2;
use std::collections::{HashMap, VecDeque};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NeighborDirection {
    Right,
    Left,
    Up,
    Down,
}

impl NeighborDirection {
    pub fn opposite(self) -> Self {
        match self {
            Self::Right => Self::Left,
            Self::Left => Self::Right,
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }

    /// Grid step `(di, dj)` taken along this direction.
    pub fn step(self) -> (i32, i32) {
        match self {
            Self::Right => (1, 0),
            Self::Left => (-1, 0),
            Self::Up => (0, -1),
            Self::Down => (0, 1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeNeighbor {
    pub direction: NeighborDirection,
    pub index: usize,
    pub distance: f32,
    pub score: f32,
}

/// Global grid frame estimated from nearest-neighbour edges.
///
/// `u` is the axis closest to image `+x`, `v` is `u` turned by +90°
/// (toward image `+y`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridAxes {
    pub u: Vector2<f32>,
    pub v: Vector2<f32>,
    /// Median nearest-neighbour distance, pixels.
    pub spacing: f32,
}

/// Estimate grid axes and spacing from each corner's nearest neighbour.
///
/// On a checkerboard the nearest neighbour of an inner corner is one of its
/// four grid neighbours, so the edge directions cluster around ±u and ±v.
pub fn estimate_grid_axes(corners: &[Corner], tree: &KdTree<f32, 2>) -> Option<GridAxes> {
    if corners.len() < 2 {
        return None;
    }

    let mut edges = Vec::with_capacity(corners.len());
    for (i, corner) in corners.iter().enumerate() {
        let query = [corner.position.x, corner.position.y];
        let nearest = tree
            .nearest_n::<SquaredEuclidean>(&query, 2)
            .into_iter()
            .find(|nn| nn.item as usize != i && nn.distance > 0.0);
        if let Some(nn) = nearest {
            let e = corners[nn.item as usize].position - corner.position;
            edges.push(e);
        }
    }
    if edges.is_empty() {
        return None;
    }

    let mut distances: Vec<f32> = edges.iter().map(|e| e.norm()).collect();
    distances.sort_by(|a, b| a.total_cmp(b));
    let spacing = distances[distances.len() / 2];
    if spacing <= 0.0 {
        return None;
    }

    let theta = dominant_axis_angle(edges.iter().map(|e| (*e, 1.0)))?;
    let u = angle_to_unit(theta);
    let v = Vector2::new(-u.y, u.x);
    Some(GridAxes { u, v, spacing })
}

fn classify_neighbor(
    corner: &Corner,
    neighbor: &Corner,
    neighbor_index: usize,
    axes: &GridAxes,
    params: &GridGraphParams,
) -> Option<NodeNeighbor> {
    let vec_to_neighbor = neighbor.position - corner.position;
    let distance = vec_to_neighbor.norm();

    let min = params.min_spacing_rel * axes.spacing;
    let max = params.max_spacing_rel * axes.spacing;
    if distance < min || distance > max {
        return None;
    }

    let e = vec_to_neighbor / distance;
    let a = e.dot(&axes.u);
    let b = e.dot(&axes.v);
    let alignment = a.abs().max(b.abs());
    if alignment < params.axis_tolerance_deg.to_radians().cos() {
        return None;
    }

    let direction = if a.abs() >= b.abs() {
        if a >= 0.0 {
            NeighborDirection::Right
        } else {
            NeighborDirection::Left
        }
    } else if b >= 0.0 {
        NeighborDirection::Down
    } else {
        NeighborDirection::Up
    };

    // distance dominates: the second corner along an axis must never beat the first
    let score = distance * (2.0 - alignment);
    Some(NodeNeighbor {
        direction,
        index: neighbor_index,
        distance,
        score,
    })
}

/// Keep at most one neighbor per direction, choosing the lowest-score candidate.
fn select_neighbors(candidates: Vec<NodeNeighbor>) -> Vec<NodeNeighbor> {
    let mut best: [Option<NodeNeighbor>; 4] = [None, None, None, None];

    for candidate in candidates.into_iter() {
        let slot = match candidate.direction {
            NeighborDirection::Right => &mut best[0],
            NeighborDirection::Left => &mut best[1],
            NeighborDirection::Up => &mut best[2],
            NeighborDirection::Down => &mut best[3],
        };

        let replace = match slot {
            None => true,
            Some(current) => {
                candidate.score < current.score
                    || (candidate.score == current.score && candidate.distance < current.distance)
            }
        };

        if replace {
            *slot = Some(candidate);
        }
    }

    best.into_iter().flatten().collect()
}

/// 4-connected neighbour graph over corner candidates.
pub struct GridGraph {
    pub axes: GridAxes,
    /// For each node, its accepted neighbours (at most one per direction).
    pub neighbors: Vec<Vec<NodeNeighbor>>,
}

impl GridGraph {
    /// Build the graph; `None` when no grid axes can be estimated.
    ///
    /// Only mutual edges survive: `i → j` is kept when `j` also picked `i`
    /// in the opposite direction.
    pub fn new(corners: &[Corner], params: &GridGraphParams) -> Option<Self> {
        let coords = corners
            .iter()
            .map(|c| [c.position.x, c.position.y])
            .collect::<Vec<_>>();
        let tree: KdTree<f32, 2> = (&coords).into();
        let axes = estimate_grid_axes(corners, &tree)?;

        let mut neighbors = Vec::with_capacity(corners.len());
        for (i, corner) in corners.iter().enumerate() {
            let query_point = [corner.position.x, corner.position.y];
            let results = tree.nearest_n::<SquaredEuclidean>(&query_point, params.k_neighbors);

            let candidates = results
                .into_iter()
                .map(|nn| nn.item as usize)
                .filter(|&j| j != i)
                .filter_map(|j| classify_neighbor(corner, &corners[j], j, &axes, params))
                .collect();
            neighbors.push(select_neighbors(candidates));
        }

        let mutual: Vec<Vec<NodeNeighbor>> = neighbors
            .iter()
            .enumerate()
            .map(|(i, list)| {
                list.iter()
                    .filter(|n| {
                        neighbors[n.index]
                            .iter()
                            .any(|back| back.index == i && back.direction == n.direction.opposite())
                    })
                    .cloned()
                    .collect()
            })
            .collect();

        Some(Self {
            axes,
            neighbors: mutual,
        })
    }
}

pub fn connected_components(graph: &GridGraph) -> Vec<Vec<usize>> {
    let mut visited = vec![false; graph.neighbors.len()];
    let mut components = Vec::new();

    for start in 0..graph.neighbors.len() {
        if visited[start] {
            continue;
        }

        let mut component = Vec::new();
        let mut stack = vec![start];

        while let Some(node) = stack.pop() {
            if visited[node] {
                continue;
            }
            visited[node] = true;
            component.push(node);

            for neighbor in &graph.neighbors[node] {
                if !visited[neighbor.index] {
                    stack.push(neighbor.index);
                }
            }
        }

        components.push(component);
    }

    components
}

/// BFS a component and assign integer grid coordinates `(node, i, j)`.
///
/// Returns `None` when the component is inconsistent: a node reachable at
/// two different coordinates, or two nodes claiming the same cell.
pub fn assign_grid_coordinates(
    graph: &GridGraph,
    component: &[usize],
) -> Option<Vec<(usize, i32, i32)>> {
    let start = *component.first()?;
    let mut node_coords: HashMap<usize, (i32, i32)> = HashMap::with_capacity(component.len());
    let mut cells: HashMap<(i32, i32), usize> = HashMap::with_capacity(component.len());
    let mut queue = VecDeque::new();

    node_coords.insert(start, (0, 0));
    cells.insert((0, 0), start);
    queue.push_back(start);

    while let Some(node) = queue.pop_front() {
        let (i, j) = node_coords[&node];
        for neighbor in &graph.neighbors[node] {
            let (di, dj) = neighbor.direction.step();
            let expected = (i + di, j + dj);
            match node_coords.get(&neighbor.index) {
                Some(&got) if got != expected => return None,
                Some(_) => {}
                None => {
                    if cells.insert(expected, neighbor.index).is_some() {
                        return None;
                    }
                    node_coords.insert(neighbor.index, expected);
                    queue.push_back(neighbor.index);
                }
            }
        }
    }

    let mut coords: Vec<(usize, i32, i32)> = node_coords
        .into_iter()
        .map(|(node, (i, j))| (node, i, j))
        .collect();
    coords.sort_unstable_by_key(|&(_, i, j)| (j, i));
    Some(coords)
}
