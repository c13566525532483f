//! Strongly-typed generator settings mapped from the persisted [`Config`].

use std::time::Duration;

use harmonia_config::Config;

use crate::biome::ClassifierThresholds;
use crate::climate::ClimateParams;
use crate::erosion::ErosionParams;
use crate::height_field::{HeightFieldParams, MIN_RESOLUTION};
use crate::hydrology::HydrologyParams;
use crate::metabolism::MetabolismParams;
use crate::placement::PlacementParams;

/// Everything a [`TileGenerator`](crate::TileGenerator) needs besides the
/// per-request inputs.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldGenConfig {
    /// Edge length of a tile in world units.
    pub tile_size: f64,
    /// Samples per tile edge at LOD 0.
    pub base_resolution: usize,
    /// Elevation of the sea surface.
    pub sea_level: f64,
    pub height: HeightFieldParams,
    pub erosion: ErosionParams,
    pub climate: ClimateParams,
    pub classifier: ClassifierThresholds,
    pub hydrology: HydrologyParams,
    pub placement: PlacementParams,
    pub metabolism: MetabolismParams,
}

impl WorldGenConfig {
    /// Map the file-level configuration onto generator parameters.
    ///
    /// Settings the file does not expose keep their built-in defaults.
    pub fn from_config(config: &Config) -> Self {
        let world = &config.world;
        let terrain = &config.terrain;
        let hydro = &config.hydrology;
        let place = &config.placement;
        let meta = &config.metabolism;

        Self {
            tile_size: world.tile_size,
            base_resolution: (world.resolution as usize).max(MIN_RESOLUTION),
            sea_level: world.sea_level,
            height: HeightFieldParams {
                octaves: terrain.octaves,
                base_frequency: terrain.base_frequency,
                height_scale: terrain.height_scale,
                shaping_exponent: terrain.shaping_exponent,
            },
            erosion: ErosionParams {
                droplets: terrain.erosion_droplets.map(|d| d as usize),
                ..Default::default()
            },
            climate: ClimateParams::default(),
            classifier: ClassifierThresholds::default(),
            hydrology: HydrologyParams {
                water_depth_threshold: hydro.water_depth_threshold,
                min_water_cells: hydro.min_water_cells as usize,
                lake_min_cells: hydro.lake_min_cells as usize,
                pond_min_cells: hydro.pond_min_cells as usize,
                river_source_probability: hydro.river_source_probability,
                min_river_waypoints: hydro.min_river_waypoints as usize,
                cave_density: hydro.cave_density,
                ..Default::default()
            },
            placement: PlacementParams {
                feature_min_distance: place.feature_min_distance,
                special_exclusion_radius: place.special_exclusion_radius,
                unique_exclusion_radius: place.unique_exclusion_radius,
                max_features_per_tile: place.max_features_per_tile as usize,
                attempts_per_feature: place.attempts_per_feature as usize,
                ..Default::default()
            },
            metabolism: MetabolismParams {
                initial_harmony: meta.initial_harmony,
                initial_dissonance: meta.initial_dissonance,
                harmony_relax_rate: meta.harmony_relax_rate,
                dissonance_decay_rate: meta.dissonance_decay_rate,
                grid_lag_rate: meta.grid_lag_rate,
                event_global_weight: meta.event_global_weight,
                tile_size: world.tile_size,
                ..Default::default()
            },
        }
    }

    /// Samples per edge at `lod`: `((base - 1) >> lod) + 1`, at least 3.
    pub fn resolution_for_lod(&self, lod: u8) -> usize {
        let intervals = (self.base_resolution.saturating_sub(1)) >> lod.min(31);
        (intervals + 1).max(MIN_RESOLUTION)
    }
}

impl Default for WorldGenConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Metabolism tick period from the configuration.
pub fn tick_interval(config: &Config) -> Duration {
    Duration::from_millis(config.metabolism.tick_interval_ms)
}
