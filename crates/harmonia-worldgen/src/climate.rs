//! Temperature and moisture fields derived from latitude, noise and elevation.
//!
//! Temperature falls off with distance from the `z = 0` equator and is
//! perturbed by noise and a seasonal offset; it is clamped to `[-1, 1]`.
//! Elevation does not enter the temperature field itself: the biome
//! classifier applies a lapse rate when it reads the field.
//!
//! Moisture starts from noise, loses a penalty proportional to height above
//! sea level, and gains a water-proximity term. True water bodies are only
//! detected later in the pipeline, so proximity is approximated by a
//! high-frequency noise proxy rather than distances to detected water.

use crate::height_field::HeightField;
use crate::noise_field::{NoiseField, NoiseKind, NoiseParams};
use crate::seed::{Salt, world_noise_seed};

/// Parameters of the climate model.
#[derive(Clone, Debug, PartialEq)]
pub struct ClimateParams {
    /// Distance from the equator at which the latitude effect reaches 1.0.
    pub latitude_span: f64,
    /// Weight of the temperature noise term.
    pub temperature_noise_weight: f64,
    /// Frequency of the temperature noise.
    pub temperature_frequency: f64,
    /// Constant offset applied to all temperatures (seasons).
    pub seasonal_modifier: f64,
    /// Frequency of the base moisture noise.
    pub moisture_frequency: f64,
    /// Moisture lost per world unit above sea level.
    pub elevation_dryness: f64,
    /// Weight of the water-proximity proxy.
    pub water_proximity_weight: f64,
    /// Frequency of the water-proximity proxy noise.
    pub water_proximity_frequency: f64,
}

impl Default for ClimateParams {
    fn default() -> Self {
        Self {
            latitude_span: 4096.0,
            temperature_noise_weight: 0.5,
            temperature_frequency: 0.0015,
            seasonal_modifier: 0.0,
            moisture_frequency: 0.002,
            elevation_dryness: 0.005,
            water_proximity_weight: 0.25,
            water_proximity_frequency: 0.02,
        }
    }
}

/// Co-indexed temperature and moisture grids for one tile.
#[derive(Clone, Debug, PartialEq)]
pub struct ClimateField {
    resolution: usize,
    temperature: Vec<f64>,
    moisture: Vec<f64>,
}

impl ClimateField {
    /// Samples per edge, equal to the height field's.
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Temperature at cell `(x, z)`, in `[-1, 1]`.
    pub fn temperature(&self, x: usize, z: usize) -> f64 {
        self.temperature[z * self.resolution + x]
    }

    /// Moisture at cell `(x, z)`, in `[0, 1]`.
    pub fn moisture(&self, x: usize, z: usize) -> f64 {
        self.moisture[z * self.resolution + x]
    }

    /// Row-major temperature grid.
    pub fn temperatures(&self) -> &[f64] {
        &self.temperature
    }

    /// Row-major moisture grid.
    pub fn moistures(&self) -> &[f64] {
        &self.moisture
    }
}

/// Reduction of temperature with distance from the equator.
pub fn latitude_effect(abs_z: f64, latitude_span: f64) -> f64 {
    if latitude_span <= 0.0 {
        return 0.0;
    }
    (abs_z / latitude_span).min(2.0)
}

/// Produces [`ClimateField`]s from height fields.
pub struct ClimateSampler {
    temperature_noise: NoiseField,
    moisture_noise: NoiseField,
    proximity_noise: NoiseField,
    params: ClimateParams,
}

impl ClimateSampler {
    /// Create a sampler for the given world seed.
    ///
    /// The three noise fields use decorrelated seeds derived from the climate salt.
    pub fn new(world_seed: u64, params: ClimateParams) -> Self {
        let base = world_noise_seed(world_seed, Salt::Climate);
        Self {
            temperature_noise: NoiseField::new(base),
            moisture_noise: NoiseField::new(base.wrapping_add(0xDEAD_BEEF)),
            proximity_noise: NoiseField::new(base.wrapping_add(0x0BAD_CAFE)),
            params,
        }
    }

    /// Parameters this sampler was built with.
    pub fn params(&self) -> &ClimateParams {
        &self.params
    }

    /// Temperature at a world-space point.
    pub fn temperature_at(&self, world_x: f64, world_z: f64) -> f64 {
        let p = &self.params;
        let noise = self.temperature_noise.sample_unchecked(
            NoiseKind::Smooth,
            world_x,
            world_z,
            &NoiseParams {
                octaves: 3,
                frequency: p.temperature_frequency,
                ..Default::default()
            },
        ) / 1.75;
        let t = 1.0 - latitude_effect(world_z.abs(), p.latitude_span)
            + noise * p.temperature_noise_weight
            + p.seasonal_modifier;
        t.clamp(-1.0, 1.0)
    }

    /// Moisture at a world-space point with the given elevation.
    pub fn moisture_at(&self, world_x: f64, world_z: f64, elevation: f64, sea_level: f64) -> f64 {
        let p = &self.params;
        let base = self.moisture_noise.sample_unchecked(
            NoiseKind::Smooth,
            world_x,
            world_z,
            &NoiseParams {
                octaves: 3,
                frequency: p.moisture_frequency,
                ..Default::default()
            },
        ) / 1.75;
        let base = (base + 1.0) * 0.5;
        let dryness = (elevation - sea_level).max(0.0) * p.elevation_dryness;
        let proximity = self
            .proximity_noise
            .sample_unchecked(
                NoiseKind::Smooth,
                world_x,
                world_z,
                &NoiseParams::single(p.water_proximity_frequency),
            )
            .max(0.0)
            * p.water_proximity_weight;
        (base - dryness + proximity).clamp(0.0, 1.0)
    }

    /// Build the climate grids for a tile, co-indexed with `field`.
    pub fn generate(&self, field: &HeightField) -> ClimateField {
        let resolution = field.resolution();
        let mut temperature = Vec::with_capacity(resolution * resolution);
        let mut moisture = Vec::with_capacity(resolution * resolution);

        for z in 0..resolution {
            for x in 0..resolution {
                let (wx, wz) = field.world_position(x, z);
                temperature.push(self.temperature_at(wx, wz));
                moisture.push(self.moisture_at(wx, wz, field.get(x, z), field.sea_level()));
            }
        }

        ClimateField {
            resolution,
            temperature,
            moisture,
        }
    }
}
