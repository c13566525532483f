//! River tracing by greedy steepest descent.

use std::hash::{Hash, Hasher};

use glam::DVec3;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::height_field::HeightField;
use crate::seed::hash_f64s;

use super::HydrologyParams;

const BASE_WIDTH: f64 = 0.5;
const WIDTH_GROWTH: f64 = 0.15;
const BASE_DEPTH: f64 = 0.3;
const DEPTH_GROWTH: f64 = 0.05;

/// One point of a river polyline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RiverWaypoint {
    /// World-space position; `y` is the terrain height.
    pub position: DVec3,
    /// Channel width.
    pub width: f64,
    /// Channel depth.
    pub depth: f64,
}

/// A traced river, source first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RiverNetwork {
    /// Waypoints from source to mouth.
    pub waypoints: Vec<RiverWaypoint>,
}

impl RiverNetwork {
    /// Number of waypoints.
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Returns `true` if the river has no waypoints.
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// First waypoint.
    pub fn source(&self) -> Option<&RiverWaypoint> {
        self.waypoints.first()
    }

    /// Last waypoint.
    pub fn mouth(&self) -> Option<&RiverWaypoint> {
        self.waypoints.last()
    }

    /// Whether width and depth never shrink downstream.
    pub fn is_monotonic(&self) -> bool {
        self.waypoints
            .windows(2)
            .all(|w| w[1].width >= w[0].width && w[1].depth >= w[0].depth)
    }
}

impl Hash for RiverNetwork {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.waypoints.len().hash(state);
        for w in &self.waypoints {
            hash_f64s(
                &[w.position.x, w.position.y, w.position.z, w.width, w.depth],
                state,
            );
        }
    }
}

/// Follow the steepest descent from `start` for at most `max_steps` moves.
///
/// Each step moves to the lowest of the eight neighbours that is strictly
/// lower than the current cell. Neighbours are scanned row by row
/// (`dz = -1..=1`, then `dx = -1..=1`) and a later neighbour only wins if
/// strictly lower, so ties go to the first in scan order. The trace ends on
/// reaching sea level (that cell included) or a basin.
pub fn steepest_descent(
    field: &HeightField,
    start: (usize, usize),
    max_steps: usize,
) -> Vec<(usize, usize)> {
    let resolution = field.resolution() as i64;
    let sea_level = field.sea_level();
    let (mut x, mut z) = start;
    let mut path = vec![start];

    for _ in 0..max_steps {
        let current = field.get(x, z);
        if current <= sea_level {
            break;
        }

        let mut best: Option<(usize, usize, f64)> = None;
        for dz in -1_i64..=1 {
            for dx in -1_i64..=1 {
                if dx == 0 && dz == 0 {
                    continue;
                }
                let (nx, nz) = (x as i64 + dx, z as i64 + dz);
                if nx < 0 || nz < 0 || nx >= resolution || nz >= resolution {
                    continue;
                }
                let (nx, nz) = (nx as usize, nz as usize);
                let h = field.get(nx, nz);
                let lowest = best.map_or(current, |(_, _, b)| b);
                if h < lowest {
                    best = Some((nx, nz, h));
                }
            }
        }

        let Some((nx, nz, _)) = best else {
            break;
        };
        x = nx;
        z = nz;
        path.push((x, z));
    }

    path
}

/// Candidate sources: local maxima of the sparse sample grid above the
/// minimum elevation.
fn river_sources(field: &HeightField, params: &HydrologyParams) -> Vec<(usize, usize)> {
    let resolution = field.resolution();
    let spacing = params.river_source_spacing.max(1);
    let min_height = field.sea_level() + params.river_min_source_elevation;
    let grid: Vec<usize> = (spacing / 2..resolution).step_by(spacing).collect();

    let mut sources = Vec::new();
    for (gz, &z) in grid.iter().enumerate() {
        for (gx, &x) in grid.iter().enumerate() {
            let h = field.get(x, z);
            if h <= min_height {
                continue;
            }
            let mut is_peak = true;
            'neighbours: for dz in -1_i64..=1 {
                for dx in -1_i64..=1 {
                    let (ngx, ngz) = (gx as i64 + dx, gz as i64 + dz);
                    if (dx == 0 && dz == 0)
                        || ngx < 0
                        || ngz < 0
                        || ngx as usize >= grid.len()
                        || ngz as usize >= grid.len()
                    {
                        continue;
                    }
                    if field.get(grid[ngx as usize], grid[ngz as usize]) > h {
                        is_peak = false;
                        break 'neighbours;
                    }
                }
            }
            if is_peak {
                sources.push((x, z));
            }
        }
    }
    sources
}

/// Trace rivers from gated sources.
///
/// Every candidate source draws one gate value in row-major order, so the
/// random stream does not depend on which traces are later discarded.
pub fn trace_rivers(
    field: &HeightField,
    params: &HydrologyParams,
    rng: &mut ChaCha8Rng,
) -> Vec<RiverNetwork> {
    let probability = params.river_source_probability.clamp(0.0, 1.0);
    let mut rivers = Vec::new();

    for source in river_sources(field, params) {
        if !rng.random_bool(probability) {
            continue;
        }
        let path = steepest_descent(field, source, params.river_max_steps);
        if path.len() < params.min_river_waypoints {
            continue;
        }
        let waypoints = path
            .into_iter()
            .enumerate()
            .map(|(i, (x, z))| {
                let (wx, wz) = field.world_position(x, z);
                RiverWaypoint {
                    position: DVec3::new(wx, field.get(x, z), wz),
                    width: BASE_WIDTH + WIDTH_GROWTH * i as f64,
                    depth: BASE_DEPTH + DEPTH_GROWTH * i as f64,
                }
            })
            .collect();
        rivers.push(RiverNetwork { waypoints });
    }

    rivers
}
