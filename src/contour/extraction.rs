//! # Contour extraction
//!
//! Marching squares over a [`GridField`], one level at a time.
//!
//! Algorithm
//! -----------------
//! 1. A cell is the square between four neighbouring grid nodes. Only cells whose four
//!    corners are valid take part; on periodic grids (without padding) the column between
//!    the last and the first longitude is scanned too.
//! 2. Each corner is classified as *above* (`value > level`) or not; the 16 cases give
//!    0, 1 or 2 segments per cell. The two saddle cases are resolved with the mean of the
//!    four corners.
//! 3. Segment endpoints are crossing points on grid edges, linearly interpolated and keyed
//!    by the edge they lie on. Every edge is shared by at most two cells, so chains link
//!    exactly through their keys.
//! 4. Chains are walked in the order their first crossing was discovered. Only cycles are
//!    kept: a chain ending on the border or next to an invalid cell is open and dropped.
//! 5. Crossings that coincide (a node exactly on the level) are merged. Rings with fewer
//!    than four vertices (closing vertex included) or self-intersecting
//!    rings are discarded.
//!
//! Levels are processed lazily through [`LevelContours`], so at most one level's contours
//! are alive at a time.
use ahash::AHashMap;
use itertools::Itertools;
use tracing::debug;

use crate::constants::wrap_lon_delta;
use crate::grid::GridField;

use super::{
    geometry::{drop_repeated_vertices, is_self_intersecting},
    Contour,
};

/// Crossings closer than this (degrees) are one vertex.
const VERTEX_EPS: f64 = 1e-9;

/// Grid edge identifier: `(axis, i, j)` where axis `0` joins `(i, j)`–`(i + 1, j)` and axis
/// `1` joins `(i, j)`–`(i, j + 1)`.
type EdgeKey = (u8, usize, usize);

const NO_NEIGHBOUR: usize = usize::MAX;

/// Lazily extracted contours, one `(level, contours)` item per level.
///
/// Consumed once: a second pass needs a new call to [`extract`].
pub struct LevelContours<'a> {
    grid: &'a GridField,
    levels: std::vec::IntoIter<f64>,
    padding: usize,
}

impl Iterator for LevelContours<'_> {
    type Item = (f64, Vec<Contour>);

    fn next(&mut self) -> Option<Self::Item> {
        let level = self.levels.next()?;
        let contours = contours_at(self.grid, level, self.padding);
        debug!(level, n_contours = contours.len(), "level extracted");
        Some((level, contours))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.levels.size_hint()
    }
}

impl ExactSizeIterator for LevelContours<'_> {}

/// Prepare lazy extraction of `levels` (visited in the given order) on `grid`.
///
/// Arguments
/// -----------------
/// * `grid`: masked field.
/// * `levels`: level values, in visiting order.
/// * `padding`: number of border cells to strip on every side before scanning.
pub fn extract<'a>(
    grid: &'a GridField,
    levels: impl IntoIterator<Item = f64>,
    padding: usize,
) -> LevelContours<'a> {
    LevelContours {
        grid,
        levels: levels.into_iter().collect_vec().into_iter(),
        padding,
    }
}

/// Crossing points and their (at most two) linked neighbours.
#[derive(Default)]
struct CrossingGraph {
    index: AHashMap<EdgeKey, usize>,
    points: Vec<(f64, f64)>,
    links: Vec<[usize; 2]>,
}

impl CrossingGraph {
    fn node(&mut self, key: EdgeKey, point: impl FnOnce() -> (f64, f64)) -> usize {
        if let Some(&k) = self.index.get(&key) {
            return k;
        }
        let k = self.points.len();
        self.index.insert(key, k);
        self.points.push(point());
        self.links.push([NO_NEIGHBOUR; 2]);
        k
    }

    fn link(&mut self, a: usize, b: usize) {
        for (from, to) in [(a, b), (b, a)] {
            let slots = &mut self.links[from];
            if slots[0] == NO_NEIGHBOUR {
                slots[0] = to;
            } else if slots[1] == NO_NEIGHBOUR {
                slots[1] = to;
            }
        }
    }

    /// Walk every chain once, returning the closed ones as vertex rings.
    fn cycles(&self) -> Vec<Vec<(f64, f64)>> {
        let n = self.points.len();
        let mut visited = vec![false; n];
        let mut rings = Vec::new();

        let step = |prev: usize, cur: usize| {
            let [a, b] = self.links[cur];
            if a != prev {
                a
            } else {
                b
            }
        };

        for start in 0..n {
            if visited[start] {
                continue;
            }
            let mut ring = Vec::new();
            let mut closed = false;
            let (mut prev, mut cur) = (NO_NEIGHBOUR, start);
            loop {
                visited[cur] = true;
                ring.push(self.points[cur]);
                let next = step(prev, cur);
                if next == start {
                    closed = true;
                    break;
                }
                if next == NO_NEIGHBOUR || visited[next] {
                    break;
                }
                (prev, cur) = (cur, next);
            }

            if closed {
                rings.push(ring);
                continue;
            }
            // open chain: consume the part on the other side of `start`
            let (mut prev, mut cur) = (start, self.links[start][1]);
            while cur != NO_NEIGHBOUR && !visited[cur] {
                visited[cur] = true;
                (prev, cur) = (cur, step(prev, cur));
            }
        }
        rings
    }
}

/// Segments of one cell as pairs of edge slots: 0 bottom, 1 right, 2 top, 3 left.
fn cell_segments(case: u8, center_above: bool) -> &'static [(u8, u8)] {
    const B: u8 = 0;
    const R: u8 = 1;
    const T: u8 = 2;
    const L: u8 = 3;
    match case {
        1 | 14 => &[(L, B)],
        2 | 13 => &[(B, R)],
        3 | 12 => &[(L, R)],
        4 | 11 => &[(R, T)],
        6 | 9 => &[(B, T)],
        7 | 8 => &[(L, T)],
        5 if center_above => &[(B, R), (L, T)],
        5 => &[(L, B), (R, T)],
        10 if center_above => &[(L, B), (R, T)],
        10 => &[(B, R), (L, T)],
        _ => &[],
    }
}

fn contours_at(grid: &GridField, level: f64, padding: usize) -> Vec<Contour> {
    let (nx, ny) = grid.shape();
    if nx < 2 || ny < 2 || !level.is_finite() || 2 * padding + 2 > nx.min(ny) {
        return Vec::new();
    }
    let wrap = grid.is_periodic() && padding == 0;
    let lon = grid.lon();
    let lat = grid.lat();

    let i_cells = if wrap { nx } else { nx - 1 - padding };
    let j_cells = ny - 1 - padding;
    let mut graph = CrossingGraph::default();

    for j in padding..j_cells {
        for i in padding..i_cells {
            let ip = (i + 1) % nx;
            let corners = [
                grid.value(i, j),
                grid.value(ip, j),
                grid.value(ip, j + 1),
                grid.value(i, j + 1),
            ];
            if corners.iter().any(|v| v.is_nan()) {
                continue;
            }
            let case = corners
                .iter()
                .enumerate()
                .fold(0u8, |acc, (k, &v)| acc | (((v > level) as u8) << k));
            if case == 0 || case == 15 {
                continue;
            }
            let center_above = corners.iter().sum::<f64>() / 4.0 > level;

            // edge slot -> (key, first node, second node)
            let edge = |slot: u8| -> (EdgeKey, (usize, usize), (usize, usize)) {
                match slot {
                    0 => ((0, i, j), (i, j), (ip, j)),
                    1 => ((1, ip, j), (ip, j), (ip, j + 1)),
                    2 => ((0, i, j + 1), (i, j + 1), (ip, j + 1)),
                    _ => ((1, i, j), (i, j), (i, j + 1)),
                }
            };
            let crossing = |(a, b): ((usize, usize), (usize, usize))| -> (f64, f64) {
                let (va, vb) = (grid.value(a.0, a.1), grid.value(b.0, b.1));
                let t = (level - va) / (vb - va);
                let mut dlon = lon[b.0] - lon[a.0];
                if a.0 != b.0 && dlon <= 0.0 {
                    // seam of a periodic grid
                    dlon += 360.0;
                }
                (
                    lon[a.0] + t * dlon,
                    lat[a.1] + t * (lat[b.1] - lat[a.1]),
                )
            };

            for &(s1, s2) in cell_segments(case, center_above) {
                let (k1, a1, b1) = edge(s1);
                let (k2, a2, b2) = edge(s2);
                let n1 = graph.node(k1, || crossing((a1, b1)));
                let n2 = graph.node(k2, || crossing((a2, b2)));
                graph.link(n1, n2);
            }
        }
    }

    graph
        .cycles()
        .into_iter()
        .filter_map(|mut ring| {
            // continuous longitudes along the ring
            for k in 1..ring.len() {
                let prev = ring[k - 1].0;
                ring[k].0 = prev + wrap_lon_delta(ring[k].0 - prev);
            }
            // nodes lying on the level are reached from several edges
            drop_repeated_vertices(&mut ring, VERTEX_EPS);
            if ring.len() < 3 || is_self_intersecting(&ring) {
                return None;
            }
            Some(Contour::new(level, ring))
        })
        .collect()
}
