//! Procedural world tiles: height synthesis, erosion, biomes, hydrology,
//! vegetation and feature placement, all modulated by world metabolism.

mod async_generation;
mod cache;
mod climate;
mod config;
mod coords;
mod erosion;
mod error;
mod height_field;
mod metabolism;
mod noise_field;
mod pipeline;

pub mod biome;
pub mod debug_viz;
pub mod hydrology;
pub mod placement;
pub mod seed;

pub use async_generation::{AsyncTileGenerator, GeneratedTile, GenerationTask};
pub use biome::{Biome, BiomeAssignment, BiomeConstants, BiomeTable, ClassifierThresholds};
pub use cache::{SharedTileCache, TileCache};
pub use climate::{ClimateField, ClimateParams, ClimateSampler, latitude_effect};
pub use config::{WorldGenConfig, tick_interval};
pub use coords::TileCoordinate;
pub use erosion::{ErosionParams, ErosionStats, erode};
pub use error::WorldgenError;
pub use height_field::{HeightField, HeightFieldParams, HeightFieldSynthesizer, MIN_RESOLUTION};
pub use hydrology::{CaveSystem, HydrologyParams, RiverNetwork, WaterBody, WaterBodyType};
pub use metabolism::{
    DISSONANCE_MAX, DISSONANCE_MIN, GridMetabolism, HARMONY_MAX, HARMONY_MIN, MetabolismEvent,
    MetabolismParams, MetabolismSnapshot, MetabolismTrigger, WorldMetabolism,
};
pub use noise_field::{MAX_OCTAVES, NoiseField, NoiseKind, NoiseParams, sample};
pub use pipeline::{TileBundle, TileGenerator, TileRequest};
pub use placement::{FeaturePlacement, PlacementParams, VegetationLayer};
