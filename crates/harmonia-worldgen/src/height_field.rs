//! Per-tile elevation grid and the fractal synthesizer that fills it.
//!
//! Sums amplitude-halving, frequency-doubling simplex octaves in world space
//! (so neighbouring tiles stitch seamlessly), then applies a sign-preserving
//! power curve to the normalized result. Exponents above 1 flatten the middle
//! of the range and push the extremes out into dramatic peaks and valleys.

use std::hash::{Hash, Hasher};

use crate::coords::TileCoordinate;
use crate::error::WorldgenError;
use crate::noise_field::{NoiseField, NoiseKind, NoiseParams};
use crate::seed::{Salt, det_pow, hash_f64s, world_noise_seed};

/// Smallest grid that still has interior cells for finite differences.
pub const MIN_RESOLUTION: usize = 3;

/// A `resolution x resolution` grid of elevations, row-major by `z`.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightField {
    coord: TileCoordinate,
    resolution: usize,
    cell_size: f64,
    sea_level: f64,
    heights: Vec<f64>,
}

impl HeightField {
    /// Create a flat field at `elevation`.
    pub fn flat(
        coord: TileCoordinate,
        resolution: usize,
        cell_size: f64,
        sea_level: f64,
        elevation: f64,
    ) -> Self {
        Self {
            coord,
            resolution,
            cell_size,
            sea_level,
            heights: vec![elevation; resolution * resolution],
        }
    }

    /// Wrap an existing row-major height buffer.
    ///
    /// # Errors
    ///
    /// [`WorldgenError::InvalidArgument`] if the buffer length is not
    /// `resolution²`, or the cell size is not a positive finite number.
    pub fn from_heights(
        coord: TileCoordinate,
        resolution: usize,
        cell_size: f64,
        sea_level: f64,
        heights: Vec<f64>,
    ) -> Result<Self, WorldgenError> {
        if heights.len() != resolution * resolution {
            return Err(WorldgenError::invalid(format!(
                "expected {} heights for resolution {resolution}, got {}",
                resolution * resolution,
                heights.len()
            )));
        }
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(WorldgenError::invalid(format!(
                "cell size must be positive and finite, got {cell_size}"
            )));
        }
        Ok(Self {
            coord,
            resolution,
            cell_size,
            sea_level,
            heights,
        })
    }

    /// Tile this field belongs to.
    pub fn coord(&self) -> TileCoordinate {
        self.coord
    }

    /// Samples per edge.
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// World-space distance between adjacent samples.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Elevation of the sea surface.
    pub fn sea_level(&self) -> f64 {
        self.sea_level
    }

    /// Row-major elevations.
    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    /// Mutable row-major elevations.
    pub fn heights_mut(&mut self) -> &mut [f64] {
        &mut self.heights
    }

    /// Flat index of cell `(x, z)`.
    #[inline]
    pub fn index(&self, x: usize, z: usize) -> usize {
        z * self.resolution + x
    }

    /// Elevation at cell `(x, z)`.
    ///
    /// # Panics
    ///
    /// Panics if the cell is outside the grid.
    #[inline]
    pub fn get(&self, x: usize, z: usize) -> f64 {
        self.heights[self.index(x, z)]
    }

    /// Set the elevation at cell `(x, z)`.
    #[inline]
    pub fn set(&mut self, x: usize, z: usize, value: f64) {
        let idx = self.index(x, z);
        self.heights[idx] = value;
    }

    /// Returns `true` if `(x, z)` lies on the outer ring of the grid.
    #[inline]
    pub fn is_border(&self, x: usize, z: usize) -> bool {
        x == 0 || z == 0 || x + 1 >= self.resolution || z + 1 >= self.resolution
    }

    /// World-space position of cell `(x, z)`.
    pub fn world_position(&self, x: usize, z: usize) -> (f64, f64) {
        let tile_size = self.tile_size();
        let (ox, oz) = self.coord.world_origin(tile_size);
        (ox + x as f64 * self.cell_size, oz + z as f64 * self.cell_size)
    }

    /// Edge length of the tile in world units.
    pub fn tile_size(&self) -> f64 {
        (self.resolution.saturating_sub(1)) as f64 * self.cell_size
    }

    /// Convert a world-space position into fractional grid coordinates.
    pub fn grid_position(&self, world_x: f64, world_z: f64) -> (f64, f64) {
        let (ox, oz) = self.coord.world_origin(self.tile_size());
        ((world_x - ox) / self.cell_size, (world_z - oz) / self.cell_size)
    }

    /// Bilinearly interpolated elevation at fractional grid coordinates,
    /// clamped to the grid.
    pub fn sample_bilinear(&self, gx: f64, gz: f64) -> f64 {
        let max = (self.resolution - 1) as f64;
        let gx = gx.clamp(0.0, max);
        let gz = gz.clamp(0.0, max);
        let x0 = gx.floor() as usize;
        let z0 = gz.floor() as usize;
        let x1 = (x0 + 1).min(self.resolution - 1);
        let z1 = (z0 + 1).min(self.resolution - 1);
        let fx = gx - x0 as f64;
        let fz = gz - z0 as f64;

        let top = self.get(x0, z0) * (1.0 - fx) + self.get(x1, z0) * fx;
        let bottom = self.get(x0, z1) * (1.0 - fx) + self.get(x1, z1) * fx;
        top * (1.0 - fz) + bottom * fz
    }

    /// Slope magnitude (rise over run) at a cell, from central differences
    /// (one-sided at the border).
    pub fn slope_at(&self, x: usize, z: usize) -> f64 {
        let last = self.resolution - 1;
        let (xl, xr) = (x.saturating_sub(1), (x + 1).min(last));
        let (zl, zr) = (z.saturating_sub(1), (z + 1).min(last));
        let dx = (self.get(xr, z) - self.get(xl, z)) / ((xr - xl).max(1) as f64 * self.cell_size);
        let dz = (self.get(x, zr) - self.get(x, zl)) / ((zr - zl).max(1) as f64 * self.cell_size);
        (dx * dx + dz * dz).sqrt()
    }

    /// `(min, max)` elevation over the grid.
    pub fn min_max(&self) -> (f64, f64) {
        self.heights
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &h| {
                (lo.min(h), hi.max(h))
            })
    }

    /// Mean elevation over the grid.
    pub fn mean(&self) -> f64 {
        if self.heights.is_empty() {
            return 0.0;
        }
        self.heights.iter().sum::<f64>() / self.heights.len() as f64
    }

    /// First cell holding a non-finite elevation, if any.
    pub fn find_non_finite(&self) -> Option<(usize, usize)> {
        self.heights
            .iter()
            .position(|h| !h.is_finite())
            .map(|i| (i % self.resolution, i / self.resolution))
    }
}

impl Hash for HeightField {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.coord.hash(state);
        self.resolution.hash(state);
        self.cell_size.to_bits().hash(state);
        self.sea_level.to_bits().hash(state);
        hash_f64s(&self.heights, state);
    }
}

/// Configuration for the fractal height synthesizer.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightFieldParams {
    /// Number of noise octaves. Typical range: 5–8.
    pub octaves: u32,
    /// Frequency of the broadest octave, in cycles per world unit.
    /// Default: 0.004 (one cycle per 250 units, about one tile).
    pub base_frequency: f64,
    /// Elevation magnitude of a fully saturated sample after shaping.
    /// Default: 60.0.
    pub height_scale: f64,
    /// Exponent of the sign-preserving power curve. Values above 1 flatten
    /// lowlands and exaggerate peaks and trenches. Default: 1.5.
    pub shaping_exponent: f64,
}

impl Default for HeightFieldParams {
    fn default() -> Self {
        Self {
            octaves: 6,
            base_frequency: 0.004,
            height_scale: 60.0,
            shaping_exponent: 1.5,
        }
    }
}

/// Builds [`HeightField`]s from layered world-space noise.
pub struct HeightFieldSynthesizer {
    noise: NoiseField,
    params: HeightFieldParams,
    noise_params: NoiseParams,
}

impl HeightFieldSynthesizer {
    /// Create a synthesizer for the given world seed.
    ///
    /// # Errors
    ///
    /// [`WorldgenError::InvalidArgument`] if the parameters are non-finite or
    /// the shaping exponent is not positive.
    pub fn new(world_seed: u64, params: HeightFieldParams) -> Result<Self, WorldgenError> {
        let noise_params = NoiseParams {
            octaves: params.octaves,
            frequency: params.base_frequency,
            amplitude: 1.0,
            lacunarity: 2.0,
            persistence: 0.5,
        };
        noise_params.validate()?;
        if !(params.shaping_exponent.is_finite() && params.shaping_exponent > 0.0) {
            return Err(WorldgenError::invalid(format!(
                "shaping exponent must be positive, got {}",
                params.shaping_exponent
            )));
        }
        if !params.height_scale.is_finite() {
            return Err(WorldgenError::invalid("height scale must be finite"));
        }
        Ok(Self {
            noise: NoiseField::new(world_noise_seed(world_seed, Salt::Height)),
            params,
            noise_params,
        })
    }

    /// Parameters this synthesizer was built with.
    pub fn params(&self) -> &HeightFieldParams {
        &self.params
    }

    /// Elevation at a world-space point.
    pub fn sample(&self, world_x: f64, world_z: f64) -> f64 {
        let max_amp = self.noise_params.max_amplitude();
        if max_amp == 0.0 {
            return 0.0;
        }
        let raw = self
            .noise
            .sample_unchecked(NoiseKind::Smooth, world_x, world_z, &self.noise_params);
        let normalized = (raw / max_amp).clamp(-1.0, 1.0);
        let shaped = normalized.signum() * det_pow(normalized.abs(), self.params.shaping_exponent);
        shaped * self.params.height_scale
    }

    /// Fill a field for one tile.
    ///
    /// # Errors
    ///
    /// [`WorldgenError::ResolutionTooSmall`] below [`MIN_RESOLUTION`], and
    /// [`WorldgenError::InvalidArgument`] for a non-positive tile size.
    pub fn synthesize(
        &self,
        coord: TileCoordinate,
        resolution: usize,
        tile_size: f64,
        sea_level: f64,
    ) -> Result<HeightField, WorldgenError> {
        if resolution < MIN_RESOLUTION {
            return Err(WorldgenError::ResolutionTooSmall { resolution });
        }
        if !(tile_size.is_finite() && tile_size > 0.0) {
            return Err(WorldgenError::invalid(format!(
                "tile size must be positive and finite, got {tile_size}"
            )));
        }
        let cell_size = tile_size / (resolution - 1) as f64;
        let mut field = HeightField::flat(coord, resolution, cell_size, sea_level, 0.0);

        for z in 0..resolution {
            for x in 0..resolution {
                let (wx, wz) = field.world_position(x, z);
                let h = self.sample(wx, wz);
                field.set(x, z, h);
            }
        }

        Ok(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synth(seed: u64) -> HeightFieldSynthesizer {
        HeightFieldSynthesizer::new(seed, HeightFieldParams::default()).unwrap()
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let coord = TileCoordinate::new(3, -2);
        let a = synth(42).synthesize(coord, 33, 256.0, 0.0).unwrap();
        let b = synth(42).synthesize(coord, 33, 256.0, 0.0).unwrap();
        assert_eq!(a, b, "Same seed and tile must produce identical fields");
    }

    #[test]
    fn test_different_seeds_produce_different_fields() {
        let coord = TileCoordinate::new(0, 0);
        let a = synth(1).synthesize(coord, 17, 256.0, 0.0).unwrap();
        let b = synth(2).synthesize(coord, 17, 256.0, 0.0).unwrap();
        assert_ne!(a.heights(), b.heights());
    }

    #[test]
    fn test_heights_within_scale() {
        let s = synth(7);
        let field = s.synthesize(TileCoordinate::new(1, 1), 33, 256.0, 0.0).unwrap();
        let scale = s.params().height_scale;
        for &h in field.heights() {
            assert!(h.abs() <= scale + 1e-9, "Height {h} exceeds scale {scale}");
        }
    }

    #[test]
    fn test_neighbouring_tiles_share_edges() {
        let s = synth(99);
        let left = s.synthesize(TileCoordinate::new(0, 0), 17, 256.0, 0.0).unwrap();
        let right = s.synthesize(TileCoordinate::new(1, 0), 17, 256.0, 0.0).unwrap();
        for z in 0..17 {
            assert_eq!(
                left.get(16, z),
                right.get(0, z),
                "Shared edge must match at row {z}"
            );
        }
    }

    #[test]
    fn test_resolution_too_small_rejected() {
        let err = synth(1)
            .synthesize(TileCoordinate::default(), 2, 256.0, 0.0)
            .unwrap_err();
        assert_eq!(err, WorldgenError::ResolutionTooSmall { resolution: 2 });
    }

    #[test]
    fn test_invalid_shaping_exponent_rejected() {
        let params = HeightFieldParams {
            shaping_exponent: 0.0,
            ..Default::default()
        };
        assert!(HeightFieldSynthesizer::new(1, params).is_err());
    }

    #[test]
    fn test_from_heights_validates_length() {
        let err = HeightField::from_heights(TileCoordinate::default(), 3, 1.0, 0.0, vec![0.0; 8]);
        assert!(matches!(err, Err(WorldgenError::InvalidArgument(_))));
    }

    #[test]
    fn test_bilinear_sampling_interpolates() {
        let mut field = HeightField::flat(TileCoordinate::default(), 3, 1.0, 0.0, 0.0);
        field.set(1, 0, 10.0);
        assert!((field.sample_bilinear(0.5, 0.0) - 5.0).abs() < 1e-12);
        assert!((field.sample_bilinear(1.0, 0.0) - 10.0).abs() < 1e-12);
        // Clamped outside the grid
        assert_eq!(field.sample_bilinear(-4.0, -4.0), 0.0);
    }

    #[test]
    fn test_slope_of_plane() {
        let mut field = HeightField::flat(TileCoordinate::default(), 5, 2.0, 0.0, 0.0);
        for z in 0..5 {
            for x in 0..5 {
                field.set(x, z, x as f64 * 2.0);
            }
        }
        // Rise of 2 per cell of size 2 -> slope 1
        assert!((field.slope_at(2, 2) - 1.0).abs() < 1e-12);
        assert!((field.slope_at(0, 0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_world_position_and_back() {
        let field = HeightField::flat(TileCoordinate::new(2, -1), 9, 4.0, 0.0, 0.0);
        let (wx, wz) = field.world_position(3, 5);
        assert_eq!((wx, wz), (64.0 + 12.0, -32.0 + 20.0));
        assert_eq!(field.grid_position(wx, wz), (3.0, 5.0));
    }

    #[test]
    fn test_find_non_finite() {
        let mut field = HeightField::flat(TileCoordinate::default(), 4, 1.0, 0.0, 1.0);
        assert_eq!(field.find_non_finite(), None);
        field.set(2, 3, f64::NAN);
        assert_eq!(field.find_non_finite(), Some((2, 3)));
    }
}
