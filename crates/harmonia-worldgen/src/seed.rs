//! Deterministic seeded generation utilities.
//!
//! Provides per-tile RNG derivation from a world seed, tile coordinate and
//! subsystem salt, a stateless lattice hash for cellular noise and rarity
//! gates, and deterministic math functions via `libm` so that shaping passes
//! produce the same bits on every platform.
//!
//! Seeds are mixed with the SplitMix64 finalizer, so a world seed names the
//! same world regardless of toolchain version.

use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::coords::TileCoordinate;

// ---------------------------------------------------------------------------
// Subsystem salts
// ---------------------------------------------------------------------------

/// Salt distinguishing the random streams of each pipeline stage.
///
/// Every stage draws from its own stream so that changing how many numbers one
/// stage consumes never shifts the output of another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u64)]
pub enum Salt {
    /// Height synthesis noise.
    Height = 0x4845_4947,
    /// Erosion droplet spawn positions.
    Erosion = 0x4552_4f44,
    /// Temperature and moisture noise.
    Climate = 0x434c_494d,
    /// Biome terrain shaping noise.
    Shaping = 0x5348_4150,
    /// Biome-specific water features.
    Water = 0x5741_5445,
    /// River source gating.
    Rivers = 0x5249_5645,
    /// Cave systems.
    Caves = 0x4341_5645,
    /// Vegetation instances.
    Vegetation = 0x5645_4745,
    /// Regular and special features.
    Features = 0x4645_4154,
    /// The ultra-rare unique feature gate.
    Unique = 0x554e_4951,
}

// ---------------------------------------------------------------------------
// Seed derivation
// ---------------------------------------------------------------------------

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// SplitMix64 finalizer.
#[inline]
fn mix64(mut h: u64) -> u64 {
    h = (h ^ (h >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    h = (h ^ (h >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    h ^ (h >> 31)
}

/// Derive a u64 seed for one subsystem of one tile.
///
/// The coordinate is packed into one word before mixing, so distinct tiles
/// never share an input.
pub fn derive_tile_seed(world_seed: u64, coord: TileCoordinate, salt: Salt) -> u64 {
    let packed = ((coord.x as u32 as u64) << 32) | coord.z as u32 as u64;
    mix64(world_noise_seed(world_seed, salt) ^ mix64(packed))
}

/// Derive a deterministic RNG for one subsystem of one tile.
///
/// The returned RNG produces an identical sequence for the same
/// `(world_seed, coord, salt)` triple, regardless of thread or platform.
pub fn tile_rng(world_seed: u64, coord: TileCoordinate, salt: Salt) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(derive_tile_seed(world_seed, coord, salt))
}

/// Derive a world-wide (coordinate independent) seed for a noise field.
///
/// Noise is sampled in world space so neighbouring tiles stitch seamlessly;
/// its seed therefore must not depend on the tile.
pub fn world_noise_seed(world_seed: u64, salt: Salt) -> u64 {
    mix64(mix64(world_seed.wrapping_add(GOLDEN_GAMMA)) ^ salt as u64)
}

/// Fold a u64 seed into the u32 seed accepted by the `noise` crate.
#[inline]
pub fn fold_seed(seed: u64) -> u32 {
    (seed ^ (seed >> 32)) as u32
}

/// Stateless 64-bit hash of an integer lattice point.
///
/// SplitMix64 finalizer over the packed inputs; cheap enough to call per
/// sample inside cellular noise.
#[inline]
pub fn lattice_hash(seed: u64, ix: i64, iz: i64) -> u64 {
    mix64(
        seed ^ (ix as u64).wrapping_mul(GOLDEN_GAMMA)
            ^ (iz as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F),
    )
}

/// Map a hash to `[-1.0, 1.0]`.
#[inline]
pub fn hash_to_signed_unit(h: u64) -> f64 {
    (h >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0
}

// ---------------------------------------------------------------------------
// Deterministic math (libm)
// ---------------------------------------------------------------------------

/// Deterministic sine using libm (not platform libc).
#[inline]
pub fn det_sin(x: f64) -> f64 {
    libm::sin(x)
}

/// Deterministic cosine using libm.
#[inline]
pub fn det_cos(x: f64) -> f64 {
    libm::cos(x)
}

/// Deterministic atan2 using libm.
#[inline]
pub fn det_atan2(y: f64, x: f64) -> f64 {
    libm::atan2(y, x)
}

/// Deterministic sqrt using libm.
#[inline]
pub fn det_sqrt(x: f64) -> f64 {
    libm::sqrt(x)
}

/// Deterministic exp using libm.
#[inline]
pub fn det_exp(x: f64) -> f64 {
    libm::exp(x)
}

/// Deterministic power using libm.
#[inline]
pub fn det_pow(x: f64, y: f64) -> f64 {
    libm::pow(x, y)
}

// ---------------------------------------------------------------------------
// Content hashing
// ---------------------------------------------------------------------------

/// Feed the bit patterns of a float slice into a hasher.
pub fn hash_f64s<H: Hasher>(values: &[f64], state: &mut H) {
    values.len().hash(state);
    for v in values {
        v.to_bits().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    #[test]
    fn test_derive_tile_seed_deterministic() {
        let coord = TileCoordinate::new(42, 13);
        let seed_a = derive_tile_seed(999, coord, Salt::Height);
        let seed_b = derive_tile_seed(999, coord, Salt::Height);
        assert_eq!(seed_a, seed_b, "Same inputs must produce same derived seed");
    }

    #[test]
    fn test_derive_tile_seed_different_coordinates() {
        let seed_a = derive_tile_seed(42, TileCoordinate::new(0, 0), Salt::Features);
        let seed_b = derive_tile_seed(42, TileCoordinate::new(0, 1), Salt::Features);
        assert_ne!(
            seed_a, seed_b,
            "Adjacent tiles should produce different seeds"
        );
    }

    #[test]
    fn test_derive_tile_seed_different_salts() {
        let coord = TileCoordinate::new(5, 5);
        let seed_a = derive_tile_seed(7, coord, Salt::Vegetation);
        let seed_b = derive_tile_seed(7, coord, Salt::Features);
        assert_ne!(
            seed_a, seed_b,
            "Different subsystems must draw from different streams"
        );
    }

    #[test]
    fn test_derive_tile_seed_different_world_seeds() {
        let coord = TileCoordinate::new(5, 5);
        let seed_a = derive_tile_seed(0, coord, Salt::Caves);
        let seed_b = derive_tile_seed(1, coord, Salt::Caves);
        assert_ne!(
            seed_a, seed_b,
            "Different world seeds should produce different tile seeds"
        );
    }

    #[test]
    fn test_derived_seeds_are_pinned() {
        // Changing these values changes every generated world
        assert_eq!(
            derive_tile_seed(42, TileCoordinate::new(3, -7), Salt::Features),
            0x436d_1553_918b_082d
        );
        assert_eq!(world_noise_seed(42, Salt::Height), 0x813d_ba00_67b5_d417);
    }

    #[test]
    fn test_negative_coordinates_do_not_alias() {
        let a = derive_tile_seed(1, TileCoordinate::new(-1, 0), Salt::Height);
        let b = derive_tile_seed(1, TileCoordinate::new(0, -1), Salt::Height);
        let c = derive_tile_seed(1, TileCoordinate::new(1, 0), Salt::Height);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_chacha8_rng_deterministic() {
        let coord = TileCoordinate::new(10, 20);
        let mut rng_a = tile_rng(42, coord, Salt::Erosion);
        let mut rng_b = tile_rng(42, coord, Salt::Erosion);

        for _ in 0..1000 {
            assert_eq!(
                rng_a.next_u64(),
                rng_b.next_u64(),
                "ChaCha8Rng sequences must match for same seed"
            );
        }
    }

    #[test]
    fn test_world_noise_seed_ignores_tile() {
        assert_eq!(
            world_noise_seed(42, Salt::Height),
            world_noise_seed(42, Salt::Height)
        );
        assert_ne!(
            world_noise_seed(42, Salt::Height),
            world_noise_seed(42, Salt::Climate)
        );
    }

    #[test]
    fn test_lattice_hash_spreads_neighbours() {
        let a = lattice_hash(1, 0, 0);
        let b = lattice_hash(1, 1, 0);
        let c = lattice_hash(1, 0, 1);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
        assert_eq!(a, lattice_hash(1, 0, 0));
    }

    #[test]
    fn test_hash_to_signed_unit_range() {
        for i in 0..10_000_i64 {
            let v = hash_to_signed_unit(lattice_hash(99, i, -i));
            assert!((-1.0..=1.0).contains(&v), "Value {v} outside [-1, 1]");
        }
    }

    #[test]
    fn test_deterministic_math_functions() {
        let x = 1.234_567_890_123_4;
        assert_eq!(det_sin(x), det_sin(x), "det_sin must be deterministic");
        assert_eq!(det_cos(x), det_cos(x), "det_cos must be deterministic");
        assert_eq!(det_sqrt(x), det_sqrt(x), "det_sqrt must be deterministic");
        assert_eq!(det_exp(-x), det_exp(-x), "det_exp must be deterministic");
        assert_eq!(
            det_atan2(x, 0.5),
            det_atan2(x, 0.5),
            "det_atan2 must be deterministic"
        );
        assert!((det_pow(2.0, 10.0) - 1024.0).abs() < 1e-12);
    }
}
