//! The per-tile generation pipeline.
//!
//! synthesize → erode → classify and shape → hydrology → placement, run
//! sequentially on the calling thread. The output for a fixed
//! `(seed, coord, metabolism, lod)` is a pure function of those inputs and
//! the generator's configuration.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rustc_hash::FxHasher;
use tracing::debug;

use crate::biome::{BiomeAssignment, BiomeTable, assign_biome, shape_terrain};
use crate::climate::{ClimateField, ClimateSampler};
use crate::config::WorldGenConfig;
use crate::coords::TileCoordinate;
use crate::erosion::erode;
use crate::error::{WorldgenError, ensure_finite};
use crate::height_field::{HeightField, HeightFieldSynthesizer};
use crate::hydrology::{
    CaveSystem, RiverNetwork, WaterBody, biome_water_features, detect_water_bodies,
    generate_caves, trace_rivers,
};
use crate::metabolism::MetabolismSnapshot;
use crate::noise_field::NoiseField;
use crate::placement::{FeaturePlacement, FeaturePlacer, VegetationLayer, VegetationPlacer, WaterMask};
use crate::seed::{Salt, hash_f64s, tile_rng, world_noise_seed};

/// Inputs of one tile generation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileRequest {
    /// World seed.
    pub seed: u64,
    /// Tile to generate.
    pub coord: TileCoordinate,
    /// World health the tile is generated under.
    pub metabolism: MetabolismSnapshot,
    /// Level of detail; each step halves the sample intervals per edge.
    pub lod: u8,
}

impl TileRequest {
    /// Request at full detail.
    pub fn new(seed: u64, coord: TileCoordinate, metabolism: MetabolismSnapshot) -> Self {
        Self {
            seed,
            coord,
            metabolism,
            lod: 0,
        }
    }

    /// Same request at another level of detail.
    pub fn with_lod(self, lod: u8) -> Self {
        Self { lod, ..self }
    }
}

/// Everything generated for one tile. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct TileBundle {
    pub coord: TileCoordinate,
    pub lod: u8,
    pub metabolism: MetabolismSnapshot,
    /// Final (eroded and shaped) elevation.
    pub height_field: HeightField,
    /// Climate sampled before biome shaping.
    pub climate: ClimateField,
    pub biome: BiomeAssignment,
    pub water_bodies: Vec<WaterBody>,
    pub caves: Vec<CaveSystem>,
    pub rivers: Vec<RiverNetwork>,
    pub vegetation: VegetationLayer,
    pub features: Vec<FeaturePlacement>,
}

impl TileBundle {
    /// Samples per tile edge.
    pub fn resolution(&self) -> usize {
        self.height_field.resolution()
    }

    /// Hash of every generated artifact, for determinism checks.
    pub fn content_hash(&self) -> u64 {
        let mut h = FxHasher::default();
        self.coord.hash(&mut h);
        self.lod.hash(&mut h);
        self.metabolism.hash(&mut h);
        self.height_field.hash(&mut h);
        hash_f64s(self.climate.temperatures(), &mut h);
        hash_f64s(self.climate.moistures(), &mut h);
        self.biome.primary.hash(&mut h);
        hash_f64s(
            &[
                self.biome.temperature,
                self.biome.moisture,
                self.biome.elevation,
                self.biome.coverage,
            ],
            &mut h,
        );
        self.water_bodies.hash(&mut h);
        self.caves.hash(&mut h);
        self.rivers.hash(&mut h);
        self.vegetation.hash(&mut h);
        self.features.hash(&mut h);
        h.finish()
    }
}

/// Runs the pipeline for a configured world.
pub struct TileGenerator {
    config: WorldGenConfig,
    biomes: BiomeTable,
}

impl TileGenerator {
    /// Create a generator with the standard biome table.
    ///
    /// # Errors
    ///
    /// [`WorldgenError::InvalidArgument`] if the configuration is unusable.
    pub fn new(config: WorldGenConfig) -> Result<Self, WorldgenError> {
        Self::with_biome_table(config, BiomeTable::standard())
    }

    /// Create a generator with a custom biome table.
    ///
    /// # Errors
    ///
    /// [`WorldgenError::InvalidArgument`] if the configuration is unusable.
    pub fn with_biome_table(config: WorldGenConfig, biomes: BiomeTable) -> Result<Self, WorldgenError> {
        validate_config(&config)?;
        Ok(Self { config, biomes })
    }

    pub fn config(&self) -> &WorldGenConfig {
        &self.config
    }

    pub fn biome_table(&self) -> &BiomeTable {
        &self.biomes
    }

    /// Generate a tile.
    ///
    /// # Errors
    ///
    /// [`WorldgenError::InvalidArgument`] for a non-finite metabolism
    /// snapshot, [`WorldgenError::NonFiniteHeight`] if a stage produced a
    /// non-finite elevation. Nothing partial is returned.
    pub fn generate(&self, request: &TileRequest) -> Result<TileBundle, WorldgenError> {
        self.generate_inner(request, None)
    }

    /// Generate a tile, checking `cancelled` between stages.
    ///
    /// # Errors
    ///
    /// As [`TileGenerator::generate`], plus [`WorldgenError::Cancelled`]
    /// once the flag is observed set.
    pub fn generate_cancellable(
        &self,
        request: &TileRequest,
        cancelled: &AtomicBool,
    ) -> Result<TileBundle, WorldgenError> {
        self.generate_inner(request, Some(cancelled))
    }

    fn generate_inner(
        &self,
        request: &TileRequest,
        cancelled: Option<&AtomicBool>,
    ) -> Result<TileBundle, WorldgenError> {
        let check = || match cancelled {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(WorldgenError::Cancelled),
            _ => Ok(()),
        };

        ensure_finite("harmony", request.metabolism.harmony)?;
        ensure_finite("dissonance", request.metabolism.dissonance)?;
        let metabolism =
            MetabolismSnapshot::new(request.metabolism.harmony, request.metabolism.dissonance);
        let (seed, coord) = (request.seed, request.coord);
        let cfg = &self.config;
        let resolution = cfg.resolution_for_lod(request.lod);
        let start = Instant::now();

        // Height synthesis
        let synthesizer = HeightFieldSynthesizer::new(seed, cfg.height.clone())?;
        let mut field = synthesizer.synthesize(coord, resolution, cfg.tile_size, cfg.sea_level)?;
        debug!(%coord, resolution, lod = request.lod, "Synthesized height field");
        check()?;

        // Erosion
        let stats = erode(&mut field, &cfg.erosion, &mut tile_rng(seed, coord, Salt::Erosion));
        debug!(
            %coord,
            droplets = stats.droplets,
            eroded = stats.total_eroded,
            deposited = stats.total_deposited,
            "Eroded height field"
        );
        check()?;

        // Climate, biome and shaping
        let climate = ClimateSampler::new(seed, cfg.climate.clone()).generate(&field);
        let biome = assign_biome(&field, &climate, metabolism, &cfg.classifier);
        let shaping_noise = NoiseField::new(world_noise_seed(seed, Salt::Shaping));
        shape_terrain(&mut field, biome.primary, &self.biomes, &shaping_noise);
        if let Some((x, z)) = field.find_non_finite() {
            return Err(WorldgenError::NonFiniteHeight { x, z });
        }
        debug!(%coord, biome = %biome.primary, coverage = biome.coverage, "Classified biome");
        check()?;

        // Hydrology
        let constants = self.biomes.get(biome.primary);
        let mut water_bodies = detect_water_bodies(&field, biome.primary, constants, &cfg.hydrology);
        water_bodies.extend(biome_water_features(
            &field,
            biome.primary,
            constants,
            &mut tile_rng(seed, coord, Salt::Water),
        ));
        let rivers = trace_rivers(&field, &cfg.hydrology, &mut tile_rng(seed, coord, Salt::Rivers));
        let caves = generate_caves(&field, &cfg.hydrology, &mut tile_rng(seed, coord, Salt::Caves));
        debug!(
            %coord,
            water_bodies = water_bodies.len(),
            rivers = rivers.len(),
            caves = caves.len(),
            "Generated hydrology"
        );
        check()?;

        // Placement
        let mask = WaterMask::new(&field, &rivers, cfg.hydrology.water_depth_threshold);
        let vegetation = VegetationPlacer::new(seed, cfg.placement.clone()).place(
            &field,
            biome.primary,
            constants,
            metabolism,
            &mut tile_rng(seed, coord, Salt::Vegetation),
        );
        let features = FeaturePlacer::new(seed, cfg.placement.clone()).place(
            &field,
            biome.primary,
            metabolism,
            &mask,
            &mut tile_rng(seed, coord, Salt::Features),
        );
        debug!(
            %coord,
            vegetation = vegetation.instances.len(),
            features = features.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Placed vegetation and features"
        );
        check()?;

        Ok(TileBundle {
            coord,
            lod: request.lod,
            metabolism,
            height_field: field,
            climate,
            biome,
            water_bodies,
            caves,
            rivers,
            vegetation,
            features,
        })
    }
}

fn validate_config(cfg: &WorldGenConfig) -> Result<(), WorldgenError> {
    if !(cfg.tile_size.is_finite() && cfg.tile_size > 0.0) {
        return Err(WorldgenError::invalid(format!(
            "tile size must be positive and finite, got {}",
            cfg.tile_size
        )));
    }
    ensure_finite("sea_level", cfg.sea_level)?;
    HeightFieldSynthesizer::new(0, cfg.height.clone())?;
    for (name, p) in [
        ("river_source_probability", cfg.hydrology.river_source_probability),
        ("special_probability", cfg.placement.special_probability),
        ("unique_rarity", cfg.placement.unique_rarity),
    ] {
        if !(0.0..=1.0).contains(&p) {
            return Err(WorldgenError::invalid(format!("{name} must be in [0, 1], got {p}")));
        }
    }
    ensure_finite("cave_density", cfg.hydrology.cave_density)?;
    ensure_finite("feature_min_distance", cfg.placement.feature_min_distance)?;

    let climate = &cfg.climate;
    for (name, value) in [
        ("latitude_span", climate.latitude_span),
        ("temperature_noise_weight", climate.temperature_noise_weight),
        ("temperature_frequency", climate.temperature_frequency),
        ("seasonal_modifier", climate.seasonal_modifier),
        ("moisture_frequency", climate.moisture_frequency),
        ("elevation_dryness", climate.elevation_dryness),
        ("water_proximity_weight", climate.water_proximity_weight),
        ("water_proximity_frequency", climate.water_proximity_frequency),
    ] {
        ensure_finite(name, value)?;
    }

    let erosion = &cfg.erosion;
    for (name, value) in [
        ("inertia", erosion.inertia),
        ("gravity", erosion.gravity),
        ("capacity_factor", erosion.capacity_factor),
        ("deposition_rate", erosion.deposition_rate),
        ("erosion_rate", erosion.erosion_rate),
        ("evaporation", erosion.evaporation),
        ("min_water", erosion.min_water),
    ] {
        ensure_finite(name, value)?;
        if value < 0.0 {
            return Err(WorldgenError::invalid(format!("{name} must not be negative, got {value}")));
        }
    }
    Ok(())
}
