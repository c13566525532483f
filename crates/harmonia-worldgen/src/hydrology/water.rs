//! Water-body detection by flood fill, plus biome-specific injected water.

use std::f64::consts::TAU;
use std::hash::{Hash, Hasher};

use glam::DVec2;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::biome::{Biome, BiomeConstants};
use crate::height_field::HeightField;
use crate::seed::{det_cos, det_sin, hash_f64s};

use super::HydrologyParams;
use super::rivers::steepest_descent;

/// Kind of a water body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WaterBodyType {
    /// Large standing water.
    Lake,
    /// Flowing water; used for mountain streams.
    River,
    /// Medium standing water.
    Pond,
    /// Small standing water or spring-fed pool.
    Spring,
    /// Open sea.
    Ocean,
    /// Water suffused with harmony.
    HarmonicPool,
    /// Water tainted by dissonance.
    VoidWater,
    /// Geothermally heated pool.
    HotSpring,
}

/// Derived attributes of a water body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaterAttributes {
    /// Typical depth in world units.
    pub depth: f64,
    /// Flow speed in world units per second.
    pub flow_rate: f64,
    /// Clarity in `[0.0, 1.0]`.
    pub clarity: f64,
    /// Temperature in degrees Celsius.
    pub temperature: f64,
    /// Harmony of the water.
    pub harmony: f64,
}

impl WaterBodyType {
    /// Base attributes before biome modulation.
    fn base(self) -> WaterAttributes {
        let (depth, flow_rate, clarity, temperature, harmony) = match self {
            WaterBodyType::Lake => (8.0, 0.05, 0.8, 0.0, 1.0),
            WaterBodyType::River => (2.5, 1.5, 0.7, -1.0, 1.0),
            WaterBodyType::Pond => (2.0, 0.0, 0.6, 2.0, 1.0),
            WaterBodyType::Spring => (1.0, 0.3, 0.95, -2.0, 1.1),
            WaterBodyType::Ocean => (40.0, 0.2, 0.7, -2.0, 1.0),
            WaterBodyType::HarmonicPool => (3.0, 0.1, 1.0, 0.0, 1.8),
            WaterBodyType::VoidWater => (5.0, 0.0, 0.1, 0.0, 0.2),
            WaterBodyType::HotSpring => (1.5, 0.2, 0.75, 40.0, 1.1),
        };
        WaterAttributes {
            depth,
            flow_rate,
            clarity,
            temperature,
            harmony,
        }
    }

    /// Attributes of this type in `biome`.
    ///
    /// Clarity scales with the biome's water clarity, temperature is the
    /// biome's water temperature plus a per-type offset, and the harmony of
    /// ordinary water leans halfway toward the biome's default harmony.
    pub fn attributes(self, biome: &BiomeConstants) -> WaterAttributes {
        let base = self.base();
        let harmony = match self {
            WaterBodyType::HarmonicPool | WaterBodyType::VoidWater => base.harmony,
            _ => (base.harmony + biome.default_harmony) * 0.5,
        };
        WaterAttributes {
            clarity: (base.clarity * biome.water_clarity).clamp(0.0, 1.0),
            temperature: biome.water_temperature + base.temperature,
            harmony,
            ..base
        }
    }
}

/// A water body in world space.
#[derive(Clone, Debug, PartialEq)]
pub struct WaterBody {
    /// Kind of water.
    pub body_type: WaterBodyType,
    /// World-space `(x, z)` outline: a counter-clockwise polygon for standing
    /// water, the source-to-mouth polyline for streams.
    pub vertices: Vec<DVec2>,
    /// Grid cells the body covers (flood-filled bodies only; 0 for injected ones).
    pub cell_count: usize,
    /// Derived attributes.
    pub attributes: WaterAttributes,
}

impl Hash for WaterBody {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.body_type.hash(state);
        self.cell_count.hash(state);
        let a = &self.attributes;
        hash_f64s(
            &[a.depth, a.flow_rate, a.clarity, a.temperature, a.harmony],
            state,
        );
        self.vertices.len().hash(state);
        for v in &self.vertices {
            hash_f64s(&[v.x, v.y], state);
        }
    }
}

/// One 4-connected group of wet cells.
#[derive(Clone, Debug, PartialEq)]
pub struct WetComponent {
    /// Row-major indices of the member cells, in visit order.
    pub cells: Vec<usize>,
    /// Mean depth below sea level.
    pub mean_depth: f64,
}

/// Label every 4-connected component of wet cells.
///
/// Iterative stack-based fill; components are returned in row-major order
/// of their first cell. No size filter is applied.
pub fn label_wet_components(field: &HeightField, threshold: f64) -> Vec<WetComponent> {
    let resolution = field.resolution();
    let sea_level = field.sea_level();
    let heights = field.heights();
    let is_wet = |i: usize| heights[i] - sea_level < threshold;

    let mut visited = vec![false; heights.len()];
    let mut components = Vec::new();
    let mut stack = Vec::new();

    for start in 0..heights.len() {
        if visited[start] || !is_wet(start) {
            continue;
        }
        visited[start] = true;
        stack.push(start);
        let mut cells = Vec::new();
        let mut depth_sum = 0.0;

        while let Some(i) = stack.pop() {
            cells.push(i);
            depth_sum += sea_level - heights[i];
            let (x, z) = (i % resolution, i / resolution);

            let mut visit = |n: usize| {
                if !visited[n] && is_wet(n) {
                    visited[n] = true;
                    stack.push(n);
                }
            };
            if x > 0 {
                visit(i - 1);
            }
            if x + 1 < resolution {
                visit(i + 1);
            }
            if z > 0 {
                visit(i - resolution);
            }
            if z + 1 < resolution {
                visit(i + resolution);
            }
        }

        let mean_depth = depth_sum / cells.len() as f64;
        components.push(WetComponent { cells, mean_depth });
    }

    components
}

/// Convex hull of a point set, counter-clockwise, without repeated end point.
///
/// Andrew's monotone chain. Collinear points are dropped, so a degenerate
/// set yields fewer than three vertices.
pub fn convex_hull(points: &[DVec2]) -> Vec<DVec2> {
    let mut pts: Vec<DVec2> = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let cross = |o: DVec2, a: DVec2, b: DVec2| (a - o).perp_dot(b - o);
    let mut hull: Vec<DVec2> = Vec::with_capacity(pts.len() * 2);

    for &p in &pts {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

/// Classify a flood-filled component.
fn classify_component(cells: usize, biome: Biome, params: &HydrologyParams) -> WaterBodyType {
    match biome {
        Biome::Ocean => WaterBodyType::Ocean,
        Biome::Ethereal => WaterBodyType::HarmonicPool,
        Biome::Corrupted => WaterBodyType::VoidWater,
        _ if cells > params.lake_min_cells => WaterBodyType::Lake,
        _ if cells > params.pond_min_cells => WaterBodyType::Pond,
        _ => WaterBodyType::Spring,
    }
}

/// Detect standing water by flood fill.
///
/// Components with fewer than `min_water_cells` cells are dropped. Each
/// retained component becomes a body whose outline is the convex hull of
/// its cell positions and whose depth is the measured mean depth.
pub fn detect_water_bodies(
    field: &HeightField,
    biome: Biome,
    constants: &BiomeConstants,
    params: &HydrologyParams,
) -> Vec<WaterBody> {
    let resolution = field.resolution();
    label_wet_components(field, params.water_depth_threshold)
        .into_iter()
        .filter(|c| c.cells.len() >= params.min_water_cells)
        .map(|c| {
            let body_type = classify_component(c.cells.len(), biome, params);
            let points: Vec<DVec2> = c
                .cells
                .iter()
                .map(|&i| {
                    let (wx, wz) = field.world_position(i % resolution, i / resolution);
                    DVec2::new(wx, wz)
                })
                .collect();
            let mut attributes = body_type.attributes(constants);
            if c.mean_depth > 0.0 {
                attributes.depth = c.mean_depth;
            }
            WaterBody {
                body_type,
                vertices: convex_hull(&points),
                cell_count: c.cells.len(),
                attributes,
            }
        })
        .collect()
}

/// Regular polygon of `sides` vertices, counter-clockwise.
fn regular_polygon(center: DVec2, radius: f64, sides: usize, phase: f64) -> Vec<DVec2> {
    (0..sides)
        .map(|i| {
            let a = phase + TAU * i as f64 / sides as f64;
            center + DVec2::new(det_cos(a), det_sin(a)) * radius
        })
        .collect()
}

/// Random interior cell that is dry land.
fn random_dry_cell(field: &HeightField, rng: &mut ChaCha8Rng, attempts: usize) -> Option<(usize, usize)> {
    let last = field.resolution() - 1;
    for _ in 0..attempts {
        let x = rng.random_range(1..last);
        let z = rng.random_range(1..last);
        if field.get(x, z) > field.sea_level() {
            return Some((x, z));
        }
    }
    None
}

/// Shaped water features a biome adds independently of flood fill.
///
/// Mountains get short streams traced downhill from high points, forests
/// get small circular springs, ethereal tiles get one hexagonal harmonic
/// pool at the centre and volcanic tiles get irregular hot springs.
pub fn biome_water_features(
    field: &HeightField,
    biome: Biome,
    constants: &BiomeConstants,
    rng: &mut ChaCha8Rng,
) -> Vec<WaterBody> {
    let cell = field.cell_size();
    let last = field.resolution() - 1;
    let world = |(x, z): (usize, usize)| {
        let (wx, wz) = field.world_position(x, z);
        DVec2::new(wx, wz)
    };
    let body = |body_type: WaterBodyType, vertices: Vec<DVec2>| WaterBody {
        body_type,
        vertices,
        cell_count: 0,
        attributes: body_type.attributes(constants),
    };

    let mut bodies = Vec::new();
    match biome {
        Biome::Mountain => {
            for _ in 0..rng.random_range(1..=3) {
                let x = rng.random_range(1..last);
                let z = rng.random_range(1..last);
                if field.get(x, z) - field.sea_level() < 25.0 {
                    continue;
                }
                let trace = steepest_descent(field, (x, z), 20);
                if trace.len() >= 3 {
                    bodies.push(body(
                        WaterBodyType::River,
                        trace.into_iter().map(world).collect(),
                    ));
                }
            }
        }
        Biome::Forest => {
            for _ in 0..rng.random_range(1..=2) {
                if let Some(site) = random_dry_cell(field, rng, 8) {
                    bodies.push(body(
                        WaterBodyType::Spring,
                        regular_polygon(world(site), 3.0 * cell, 12, 0.0),
                    ));
                }
            }
        }
        Biome::Ethereal => {
            let center = world((last / 2, last / 2));
            bodies.push(body(
                WaterBodyType::HarmonicPool,
                regular_polygon(center, 6.0 * cell, 6, 0.0),
            ));
        }
        Biome::Volcanic => {
            for _ in 0..rng.random_range(1..=3) {
                let Some(site) = random_dry_cell(field, rng, 8) else {
                    continue;
                };
                let center = world(site);
                let base = 2.5 * cell;
                let vertices = (0..8)
                    .map(|i| {
                        let a = TAU * i as f64 / 8.0;
                        let r = base * rng.random_range(0.7..1.3);
                        center + DVec2::new(det_cos(a), det_sin(a)) * r
                    })
                    .collect();
                bodies.push(body(WaterBodyType::HotSpring, vertices));
            }
        }
        _ => {}
    }
    bodies
}
