//! Deterministic scalar noise sampler.
//!
//! Four kinds of layered noise over world-space `(x, z)`:
//!
//! - [`NoiseKind::Smooth`]: classic fBm over simplex noise.
//! - [`NoiseKind::Ridged`]: folded `1 - |n|` octaves, squared, which turns
//!   zero crossings into sharp ridgelines.
//! - [`NoiseKind::Fractal`]: additive blend of simplex and Perlin octaves.
//! - [`NoiseKind::Cellular`]: hashed lattice-point values without
//!   interpolation, producing blocky, cave-like structure.
//!
//! Sampling is a pure function of its inputs, so tiles may sample
//! concurrently and regenerate bit-identically.

use noise::{NoiseFn, Perlin, Simplex};

use crate::error::{WorldgenError, ensure_finite};
use crate::seed::{fold_seed, hash_to_signed_unit, lattice_hash};

/// Octave counts above this are rejected to keep per-sample cost bounded.
pub const MAX_OCTAVES: u32 = 24;

/// Shape of the layered noise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NoiseKind {
    /// Smooth layered simplex noise.
    Smooth,
    /// Absolute-value folded noise emphasizing ridgelines.
    Ridged,
    /// Additive multi-frequency simplex/Perlin blend.
    Fractal,
    /// Hashed lattice-point noise.
    Cellular,
}

/// Octave stack parameters shared by every [`NoiseKind`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoiseParams {
    /// Number of octaves to composite. Zero yields a constant 0.
    pub octaves: u32,
    /// Frequency of the first octave, in cycles per world unit.
    pub frequency: f64,
    /// Amplitude of the first octave.
    pub amplitude: f64,
    /// Frequency multiplier between successive octaves. Default: 2.0.
    pub lacunarity: f64,
    /// Amplitude multiplier between successive octaves. Default: 0.5.
    pub persistence: f64,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            octaves: 4,
            frequency: 0.01,
            amplitude: 1.0,
            lacunarity: 2.0,
            persistence: 0.5,
        }
    }
}

impl NoiseParams {
    /// Single-octave parameters at the given frequency and unit amplitude.
    pub fn single(frequency: f64) -> Self {
        Self {
            octaves: 1,
            frequency,
            ..Default::default()
        }
    }

    /// Reject non-finite or nonsensical parameters.
    pub fn validate(&self) -> Result<(), WorldgenError> {
        ensure_finite("frequency", self.frequency)?;
        ensure_finite("amplitude", self.amplitude)?;
        ensure_finite("lacunarity", self.lacunarity)?;
        ensure_finite("persistence", self.persistence)?;
        if self.frequency < 0.0 {
            return Err(WorldgenError::invalid(format!(
                "frequency must be non-negative, got {}",
                self.frequency
            )));
        }
        if self.lacunarity <= 0.0 {
            return Err(WorldgenError::invalid(format!(
                "lacunarity must be positive, got {}",
                self.lacunarity
            )));
        }
        if self.octaves > MAX_OCTAVES {
            return Err(WorldgenError::invalid(format!(
                "octaves must be at most {MAX_OCTAVES}, got {}",
                self.octaves
            )));
        }
        Ok(())
    }

    /// Theoretical maximum absolute output (geometric series of amplitudes).
    pub fn max_amplitude(&self) -> f64 {
        let mut sum = 0.0;
        let mut amp = self.amplitude.abs();
        for _ in 0..self.octaves {
            sum += amp;
            amp *= self.persistence.abs();
        }
        sum
    }
}

/// A seeded noise source able to sample every [`NoiseKind`].
///
/// Construction builds the permutation tables once; sampling is read-only,
/// so one field can be shared across threads.
#[derive(Clone, Debug)]
pub struct NoiseField {
    seed: u64,
    simplex: Simplex,
    perlin: Perlin,
}

impl NoiseField {
    /// Create a noise field for the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            simplex: Simplex::new(fold_seed(seed)),
            perlin: Perlin::new(fold_seed(seed.rotate_left(17) ^ 0x5EED)),
        }
    }

    /// The seed this field was built from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Sample the noise at world-space `(x, z)`.
    ///
    /// # Errors
    ///
    /// [`WorldgenError::InvalidArgument`] if a coordinate or parameter is
    /// non-finite, or the parameters are out of range.
    pub fn sample(
        &self,
        kind: NoiseKind,
        x: f64,
        z: f64,
        params: &NoiseParams,
    ) -> Result<f64, WorldgenError> {
        ensure_finite("x", x)?;
        ensure_finite("z", z)?;
        params.validate()?;
        if params.octaves == 0 {
            return Ok(0.0);
        }
        Ok(self.sample_unchecked(kind, x, z, params))
    }

    /// Sample without validation. Callers must have validated `params` and
    /// must pass finite coordinates.
    pub(crate) fn sample_unchecked(
        &self,
        kind: NoiseKind,
        x: f64,
        z: f64,
        params: &NoiseParams,
    ) -> f64 {
        let mut total = 0.0;
        let mut frequency = params.frequency;
        let mut amplitude = params.amplitude;

        for octave in 0..params.octaves {
            // Shift each octave so octaves don't share a zero at the origin.
            let shift = octave as f64 * 31.7;
            let nx = x * frequency + shift;
            let nz = z * frequency - shift;

            let value = match kind {
                NoiseKind::Smooth => self.simplex.get([nx, nz]),
                NoiseKind::Ridged => {
                    let folded = 1.0 - self.simplex.get([nx, nz]).abs();
                    folded * folded * 2.0 - 1.0
                }
                NoiseKind::Fractal => {
                    0.5 * self.simplex.get([nx, nz]) + 0.5 * self.perlin.get([nx * 1.7, nz * 1.7])
                }
                NoiseKind::Cellular => {
                    let cell_x = (x * frequency).floor() as i64;
                    let cell_z = (z * frequency).floor() as i64;
                    let octave_seed = self.seed.wrapping_add(octave as u64);
                    hash_to_signed_unit(lattice_hash(octave_seed, cell_x, cell_z))
                }
            };

            total += value.clamp(-1.0, 1.0) * amplitude;
            frequency *= params.lacunarity;
            amplitude *= params.persistence;
        }

        total
    }
}

/// Sample noise as a pure function of every input.
///
/// Builds a [`NoiseField`] for `seed` and samples it once. Prefer holding a
/// [`NoiseField`] when sampling many points with the same seed.
#[allow(clippy::too_many_arguments)]
pub fn sample(
    kind: NoiseKind,
    x: f64,
    z: f64,
    octaves: u32,
    frequency: f64,
    amplitude: f64,
    lacunarity: f64,
    persistence: f64,
    seed: u64,
) -> Result<f64, WorldgenError> {
    let params = NoiseParams {
        octaves,
        frequency,
        amplitude,
        lacunarity,
        persistence,
    };
    NoiseField::new(seed).sample(kind, x, z, &params)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: [NoiseKind; 4] = [
        NoiseKind::Smooth,
        NoiseKind::Ridged,
        NoiseKind::Fractal,
        NoiseKind::Cellular,
    ];

    #[test]
    fn test_same_inputs_same_output() {
        for kind in ALL_KINDS {
            let a = sample(kind, 123.4, -56.7, 5, 0.01, 10.0, 2.0, 0.5, 42).unwrap();
            let b = sample(kind, 123.4, -56.7, 5, 0.01, 10.0, 2.0, 0.5, 42).unwrap();
            assert_eq!(
                a.to_bits(),
                b.to_bits(),
                "{kind:?} must be bit-identical for identical inputs"
            );
        }
    }

    #[test]
    fn test_zero_octaves_returns_zero() {
        for kind in ALL_KINDS {
            let v = sample(kind, 10.0, 20.0, 0, 0.05, 100.0, 2.0, 0.5, 7).unwrap();
            assert_eq!(v, 0.0, "{kind:?} with zero octaves must return 0");
        }
    }

    #[test]
    fn test_non_finite_coordinates_rejected() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = sample(NoiseKind::Smooth, bad, 0.0, 3, 0.01, 1.0, 2.0, 0.5, 1).unwrap_err();
            assert!(matches!(err, WorldgenError::InvalidArgument(_)));
            let err = sample(NoiseKind::Ridged, 0.0, bad, 3, 0.01, 1.0, 2.0, 0.5, 1).unwrap_err();
            assert!(matches!(err, WorldgenError::InvalidArgument(_)));
        }
    }

    #[test]
    fn test_non_finite_params_rejected_even_with_zero_octaves() {
        let err =
            sample(NoiseKind::Fractal, 0.0, 0.0, 0, f64::NAN, 1.0, 2.0, 0.5, 1).unwrap_err();
        assert!(matches!(err, WorldgenError::InvalidArgument(_)));
        let err = sample(NoiseKind::Cellular, 0.0, 0.0, 2, 0.1, 1.0, 2.0, f64::INFINITY, 1)
            .unwrap_err();
        assert!(matches!(err, WorldgenError::InvalidArgument(_)));
    }

    #[test]
    fn test_out_of_range_params_rejected() {
        assert!(sample(NoiseKind::Smooth, 0.0, 0.0, 2, -0.1, 1.0, 2.0, 0.5, 1).is_err());
        assert!(sample(NoiseKind::Smooth, 0.0, 0.0, 2, 0.1, 1.0, 0.0, 0.5, 1).is_err());
        assert!(
            sample(NoiseKind::Smooth, 0.0, 0.0, MAX_OCTAVES + 1, 0.1, 1.0, 2.0, 0.5, 1).is_err()
        );
    }

    #[test]
    fn test_output_within_max_amplitude() {
        let params = NoiseParams {
            octaves: 6,
            frequency: 0.02,
            amplitude: 50.0,
            ..Default::default()
        };
        let max = params.max_amplitude();
        let field = NoiseField::new(9);
        for kind in ALL_KINDS {
            for i in 0..400 {
                let x = i as f64 * 3.3 - 500.0;
                let z = i as f64 * -1.7 + 80.0;
                let v = field.sample(kind, x, z, &params).unwrap();
                assert!(
                    v.abs() <= max + 1e-9,
                    "{kind:?} sample {v} exceeds max amplitude {max}"
                );
            }
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = sample(NoiseKind::Smooth, 333.3, 444.4, 4, 0.01, 1.0, 2.0, 0.5, 1).unwrap();
        let b = sample(NoiseKind::Smooth, 333.3, 444.4, 4, 0.01, 1.0, 2.0, 0.5, 2).unwrap();
        assert_ne!(a, b, "Different seeds should produce different noise");
    }

    #[test]
    fn test_cellular_is_blocky() {
        let field = NoiseField::new(5);
        let params = NoiseParams::single(0.1);
        // Same lattice cell (x in [0, 10)) must give identical values.
        let a = field.sample(NoiseKind::Cellular, 1.0, 1.0, &params).unwrap();
        let b = field.sample(NoiseKind::Cellular, 9.5, 9.5, &params).unwrap();
        assert_eq!(a, b, "Points in the same lattice cell must share a value");
    }

    #[test]
    fn test_ridged_differs_from_smooth() {
        let field = NoiseField::new(11);
        let params = NoiseParams::default();
        let mut differences = 0;
        for i in 0..100 {
            let x = i as f64 * 7.1;
            let s = field.sample(NoiseKind::Smooth, x, 3.0, &params).unwrap();
            let r = field.sample(NoiseKind::Ridged, x, 3.0, &params).unwrap();
            if (s - r).abs() > 1e-9 {
                differences += 1;
            }
        }
        assert!(differences > 90, "Ridged noise should not mirror smooth noise");
    }

    #[test]
    fn test_max_amplitude_calculation() {
        let params = NoiseParams {
            octaves: 4,
            amplitude: 1000.0,
            persistence: 0.5,
            ..Default::default()
        };
        assert!((params.max_amplitude() - 1875.0).abs() < 1e-12);
    }
}
