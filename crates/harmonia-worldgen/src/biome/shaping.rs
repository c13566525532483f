//! Biome-specific terrain shaping passes.
//!
//! Applied once, after erosion, directly to the tile's height field. All
//! noise is sampled in world space; radial patterns are centred on the tile.

use std::f64::consts::PI;

use crate::height_field::HeightField;
use crate::noise_field::{NoiseField, NoiseKind, NoiseParams};
use crate::seed::{det_cos, det_exp, det_sin, det_sqrt};

use super::{Biome, BiomeTable};

/// Which shaping pass a biome applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TerrainShaping {
    /// Leave the height field as eroded.
    None,
    /// Flatten toward the sea floor and add wave undulation.
    OceanFlatten,
    /// Amplify relief and add sharp ridge peaks.
    MountainAmplify,
    /// Add jagged discordant spikes.
    CorruptedSpikes,
    /// Add a radial cone with a crater and concentric ripples.
    VolcanicRadial,
    /// Flatten toward sea level and add low mounds.
    SwampMounds,
    /// Raise crystal spires where noise exceeds a threshold.
    CrystalSpires,
}

/// Apply the shaping pass of `biome` to `field` in place.
pub fn shape_terrain(field: &mut HeightField, biome: Biome, table: &BiomeTable, noise: &NoiseField) {
    let shaping = table.get(biome).shaping;
    if shaping == TerrainShaping::None {
        return;
    }

    let resolution = field.resolution();
    let sea_level = field.sea_level();
    let tile_size = field.tile_size();
    let (origin_x, origin_z) = field.world_position(0, 0);
    let (center_x, center_z) = (origin_x + tile_size * 0.5, origin_z + tile_size * 0.5);

    for z in 0..resolution {
        for x in 0..resolution {
            let h = field.get(x, z);
            let (wx, wz) = field.world_position(x, z);
            let shaped = match shaping {
                TerrainShaping::None => h,
                TerrainShaping::OceanFlatten => {
                    let waves = det_sin(wx * 0.05) * det_cos(wz * 0.05) * 1.5;
                    h * 0.3 - 10.0 + waves
                }
                TerrainShaping::MountainAmplify => {
                    let ridge = noise.sample_unchecked(
                        NoiseKind::Ridged,
                        wx,
                        wz,
                        &NoiseParams {
                            octaves: 3,
                            frequency: 0.02,
                            ..Default::default()
                        },
                    );
                    h * 1.4 + ridge.max(0.0) * 18.0
                }
                TerrainShaping::CorruptedSpikes => {
                    let cell = noise.sample_unchecked(
                        NoiseKind::Cellular,
                        wx,
                        wz,
                        &NoiseParams::single(0.08),
                    );
                    let jitter = noise.sample_unchecked(
                        NoiseKind::Ridged,
                        wx,
                        wz,
                        &NoiseParams::single(0.05),
                    );
                    let spike = if cell > 0.5 { (cell - 0.5) * 50.0 } else { 0.0 };
                    h + spike + jitter * 3.0
                }
                TerrainShaping::VolcanicRadial => {
                    let (dx, dz) = ((wx - center_x) / tile_size, (wz - center_z) / tile_size);
                    let d = det_sqrt(dx * dx + dz * dz);
                    let cone = 35.0 * det_exp(-(2.5 * d) * (2.5 * d));
                    let crater = if d < 0.12 { -(0.12 - d) * 120.0 } else { 0.0 };
                    let ripple = det_cos(6.0 * PI * d) * 3.0;
                    h + cone + crater + ripple
                }
                TerrainShaping::SwampMounds => {
                    let mound = noise.sample_unchecked(
                        NoiseKind::Smooth,
                        wx,
                        wz,
                        &NoiseParams::single(0.06),
                    );
                    sea_level + (h - sea_level) * 0.3 + mound.max(0.0) * 2.0
                }
                TerrainShaping::CrystalSpires => {
                    let n = noise.sample_unchecked(
                        NoiseKind::Smooth,
                        wx,
                        wz,
                        &NoiseParams::single(0.04),
                    );
                    if n > 0.6 { h + (n - 0.6) * 75.0 } else { h }
                }
            };
            field.set(x, z, shaped);
        }
    }
}
