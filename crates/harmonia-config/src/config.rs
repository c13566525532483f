//! Configuration structs with sensible defaults and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level generator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// World seed and tile geometry.
    pub world: WorldConfig,
    /// Height synthesis and erosion settings.
    pub terrain: TerrainConfig,
    /// Water detection, river tracing and cave settings.
    pub hydrology: HydrologyConfig,
    /// Vegetation and feature placement settings.
    pub placement: PlacementConfig,
    /// Harmony/dissonance simulation settings.
    pub metabolism: MetabolismConfig,
    /// Worker pool, prefetch and cache settings.
    pub streaming: StreamingConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// World seed and tile geometry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// Root seed for every generated tile.
    pub seed: u64,
    /// Edge length of one tile in world units.
    pub tile_size: f64,
    /// Samples per tile edge at the finest level of detail.
    pub resolution: u32,
    /// Elevation of the sea surface.
    pub sea_level: f64,
}

/// Height synthesis and erosion configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
    /// Number of fractal noise octaves.
    pub octaves: u32,
    /// Frequency of the broadest octave, in cycles per world unit.
    pub base_frequency: f64,
    /// Peak elevation magnitude after shaping.
    pub height_scale: f64,
    /// Exponent of the power curve applied to normalized noise.
    pub shaping_exponent: f64,
    /// Explicit droplet count. `None` scales with resolution.
    pub erosion_droplets: Option<u32>,
}

/// Hydrology configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HydrologyConfig {
    /// Cells strictly below this elevation are considered wet.
    pub water_depth_threshold: f64,
    /// Wet components smaller than this are discarded.
    pub min_water_cells: u32,
    /// Components with more cells than this become lakes.
    pub lake_min_cells: u32,
    /// Components with more cells than this (and not lakes) become ponds.
    pub pond_min_cells: u32,
    /// Probability that an eligible river source is traced.
    pub river_source_probability: f64,
    /// Traces shorter than this are discarded.
    pub min_river_waypoints: u32,
    /// Cave systems per cubic world unit of the tile's underground volume.
    pub cave_density: f64,
}

/// Placement configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlacementConfig {
    /// Minimum pairwise distance between features in a tile.
    pub feature_min_distance: f64,
    /// Exclusion radius around harmony-gated special features.
    pub special_exclusion_radius: f64,
    /// Exclusion radius around the ultra-rare unique feature.
    pub unique_exclusion_radius: f64,
    /// Hard cap on regular features per tile.
    pub max_features_per_tile: u32,
    /// Random sites tried per feature before giving up.
    pub attempts_per_feature: u32,
}

/// World metabolism configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetabolismConfig {
    /// Harmony at world start.
    pub initial_harmony: f64,
    /// Dissonance at world start.
    pub initial_dissonance: f64,
    /// Fraction of the gap to 1.0 that harmony closes per second.
    pub harmony_relax_rate: f64,
    /// Fraction of dissonance removed per second.
    pub dissonance_decay_rate: f64,
    /// First-order lag rate of per-tile metabolism, per second.
    pub grid_lag_rate: f64,
    /// Share of an event's delta that reaches the global scalars.
    pub event_global_weight: f64,
    /// Period of the metabolism tick, in milliseconds.
    pub tick_interval_ms: u64,
}

/// Worker pool, prefetch and cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamingConfig {
    /// Worker threads. `0` picks a count from the CPU cores.
    pub worker_threads: u32,
    /// Maximum tiles queued or generating at once.
    pub max_in_flight: u32,
    /// Prefetch radius around the viewer, in tiles.
    pub prefetch_radius: u32,
    /// Maximum tiles held by the cache.
    pub cache_capacity: u32,
    /// Tiles older than this are evicted, in seconds.
    pub cache_max_age_secs: u64,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Directory for PNG previews of generated tiles. Empty disables export.
    pub export_dir: String,
}

// --- Default implementations ---

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            tile_size: 256.0,
            resolution: 129,
            sea_level: 0.0,
        }
    }
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            octaves: 6,
            base_frequency: 0.004,
            height_scale: 60.0,
            shaping_exponent: 1.5,
            erosion_droplets: None,
        }
    }
}

impl Default for HydrologyConfig {
    fn default() -> Self {
        Self {
            water_depth_threshold: -1.0,
            min_water_cells: 9,
            lake_min_cells: 100,
            pond_min_cells: 25,
            river_source_probability: 0.3,
            min_river_waypoints: 10,
            cave_density: 5.0e-7,
        }
    }
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            feature_min_distance: 5.0,
            special_exclusion_radius: 15.0,
            unique_exclusion_radius: 30.0,
            max_features_per_tile: 8,
            attempts_per_feature: 10,
        }
    }
}

impl Default for MetabolismConfig {
    fn default() -> Self {
        Self {
            initial_harmony: 1.0,
            initial_dissonance: 0.0,
            harmony_relax_rate: 0.01,
            dissonance_decay_rate: 0.02,
            grid_lag_rate: 0.1,
            event_global_weight: 0.2,
            tick_interval_ms: 1000,
        }
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            max_in_flight: 64,
            prefetch_radius: 2,
            cache_capacity: 256,
            cache_max_age_secs: 300,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            export_dir: String::new(),
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let config = read_config(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::WriteError {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(|source| ConfigError::WriteError {
            path: config_path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let new_config = read_config(&config_path)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str(&contents).map_err(|source| ConfigError::ParseError {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(!ron_str.is_empty());
        assert!(ron_str.contains("resolution: 129"));
        assert!(ron_str.contains("min_water_cells: 9"));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        // No `hydrology` section at all
        let ron_str = "(world: (), terrain: (), placement: (), debug: ())";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.hydrology, HydrologyConfig::default());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let ron_str = "(world: (seed: 7))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.world.seed, 7);
        assert_eq!(config.world.resolution, 129);
        assert_eq!(config.world.tile_size, 256.0);
    }

    #[test]
    fn test_extra_field_ignored() {
        let ron_str = "(future_setting: true)";
        let result: Result<Config, _> = ron::from_str(ron_str);
        assert!(result.is_ok());
    }

    #[test]
    fn test_size_tiers_are_configurable() {
        let ron_str = "(hydrology: (lake_min_cells: 400, pond_min_cells: 60))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.hydrology.lake_min_cells, 400);
        assert_eq!(config.hydrology.pond_min_cells, 60);
        assert_eq!(config.hydrology.min_water_cells, 9);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.world.seed = 1234;
        config.terrain.erosion_droplets = Some(500);
        config.debug.export_dir = "previews".to_string();

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join("config.ron").exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.placement.feature_min_distance = 8.0;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(result.is_some());
        assert_eq!(result.unwrap().placement.feature_min_distance, 8.0);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_corrupt_file_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.ron"), "(world: (seed: \"x\"))").unwrap();
        let err = Config::load_or_create(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }), "Got {err:?}");
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let result: Result<Config, _> = ron::from_str("{{not valid}}");
        assert!(result.is_err());
    }

    #[test]
    fn test_ron_comments_preserved() {
        let ron_str = "// generator settings\n(\n  // nothing overridden\n)";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config, Config::default());
    }
}
