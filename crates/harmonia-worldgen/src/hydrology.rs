//! Hydrology: water-body detection, river tracing and cave graphs.
//!
//! All three read the finished (eroded and shaped) height field. Every loop
//! is bounded: flood fill visits each cell once, traces and tunnels have
//! fixed step caps.

mod caves;
mod rivers;
mod water;

pub use caves::{CaveSystem, Chamber, Tunnel, TunnelWaypoint, generate_caves};
pub use rivers::{RiverNetwork, RiverWaypoint, steepest_descent, trace_rivers};
pub use water::{
    WaterAttributes, WaterBody, WaterBodyType, WetComponent, biome_water_features,
    convex_hull, detect_water_bodies, label_wet_components,
};

/// Parameters shared by the hydrology generators.
#[derive(Clone, Debug, PartialEq)]
pub struct HydrologyParams {
    /// Cells whose elevation relative to sea level is strictly below this are wet.
    pub water_depth_threshold: f64,
    /// Wet components with fewer cells are discarded.
    pub min_water_cells: usize,
    /// Components with more cells than this are lakes.
    pub lake_min_cells: usize,
    /// Components with more cells than this (and not lakes) are ponds.
    pub pond_min_cells: usize,
    /// Probability that an eligible river source is traced.
    pub river_source_probability: f64,
    /// Traces with fewer waypoints are discarded.
    pub min_river_waypoints: usize,
    /// Minimum elevation above sea level of a river source.
    pub river_min_source_elevation: f64,
    /// Cell spacing of the sparse river-source sample grid.
    pub river_source_spacing: usize,
    /// Step cap of one river trace.
    pub river_max_steps: usize,
    /// Cave systems per cubic world unit of underground volume.
    pub cave_density: f64,
    /// Depth of the underground volume below the surface.
    pub cave_depth: f64,
    /// Steps per cave tunnel.
    pub tunnel_steps: usize,
}

impl Default for HydrologyParams {
    fn default() -> Self {
        Self {
            water_depth_threshold: -1.0,
            min_water_cells: 9,
            lake_min_cells: 100,
            pond_min_cells: 25,
            river_source_probability: 0.3,
            min_river_waypoints: 10,
            river_min_source_elevation: 20.0,
            river_source_spacing: 8,
            river_max_steps: 200,
            cave_density: 5.0e-7,
            cave_depth: 64.0,
            tunnel_steps: 12,
        }
    }
}
