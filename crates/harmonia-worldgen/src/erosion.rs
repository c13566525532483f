//! Hydraulic erosion using particle-based water droplets.
//!
//! Each droplet starts at a random cell carrying `water = 1.0` and no
//! sediment, then for at most [`ErosionParams::max_steps`] steps:
//!
//! 1. takes the downhill gradient from the four neighbours of its cell
//!    (border cells and flat cells have zero gradient, which halts it),
//! 2. updates `velocity = velocity * inertia + gradient * gravity`,
//! 3. moves by `velocity` and stops if it left the grid,
//! 4. computes `capacity = |velocity| * water * capacity_factor`,
//! 5. deposits `(sediment - capacity) * deposition_rate` bilinearly around
//!    its position when over capacity, otherwise erodes
//!    `min((capacity - sediment) * erosion_rate, height)` from its cell,
//! 6. evaporates a fixed fraction of its water and stops below
//!    `min_water`.
//!
//! Droplets run one after another against the same buffer; a later droplet
//! sees every change made by earlier ones, so a tile's erosion pass cannot
//! be split across threads.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::height_field::HeightField;

/// Tunable constants of the droplet simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct ErosionParams {
    /// Number of droplets. `None` scales with the tile: `resolution² / 2`.
    pub droplets: Option<usize>,
    /// Step cap per droplet. Default: 30.
    pub max_steps: usize,
    /// Fraction of velocity retained between steps. Default: 0.8.
    pub inertia: f64,
    /// Gradient-to-velocity factor. Default: 4.0.
    pub gravity: f64,
    /// Sediment capacity per unit speed and water. Default: 0.01.
    pub capacity_factor: f64,
    /// Fraction of excess sediment dropped per step. Default: 0.01.
    pub deposition_rate: f64,
    /// Fraction of spare capacity picked up per step. Default: 0.01.
    pub erosion_rate: f64,
    /// Fraction of water evaporated per step. Default: 0.01.
    pub evaporation: f64,
    /// Droplets with less water than this stop. Default: 0.01.
    pub min_water: f64,
}

impl Default for ErosionParams {
    fn default() -> Self {
        Self {
            droplets: None,
            max_steps: 30,
            inertia: 0.8,
            gravity: 4.0,
            capacity_factor: 0.01,
            deposition_rate: 0.01,
            erosion_rate: 0.01,
            evaporation: 0.01,
            min_water: 0.01,
        }
    }
}

impl ErosionParams {
    /// Droplet count for a tile of the given resolution.
    pub fn droplet_count(&self, resolution: usize) -> usize {
        self.droplets
            .unwrap_or_else(|| resolution * resolution / 2)
    }
}

/// Totals gathered during one erosion pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErosionStats {
    /// Droplets simulated.
    pub droplets: usize,
    /// Steps taken across all droplets.
    pub steps: usize,
    /// Material removed from the terrain.
    pub total_eroded: f64,
    /// Material added to the terrain.
    pub total_deposited: f64,
}

/// Run the droplet simulation against `field` in place.
///
/// With zero droplets the field is left untouched.
pub fn erode(field: &mut HeightField, params: &ErosionParams, rng: &mut ChaCha8Rng) -> ErosionStats {
    let resolution = field.resolution();
    let droplets = params.droplet_count(resolution);
    let mut stats = ErosionStats::default();
    if droplets == 0 || resolution < 3 {
        return stats;
    }

    let max = (resolution - 1) as f64;
    for _ in 0..droplets {
        let start_x = rng.random_range(1.0..max);
        let start_z = rng.random_range(1.0..max);
        simulate_droplet(field, params, start_x, start_z, &mut stats);
        stats.droplets += 1;
    }

    stats
}

/// Downhill gradient at the cell containing `(x, z)`. Zero on the border.
fn downhill_gradient(field: &HeightField, cx: usize, cz: usize) -> (f64, f64) {
    if field.is_border(cx, cz) {
        return (0.0, 0.0);
    }
    let gx = (field.get(cx - 1, cz) - field.get(cx + 1, cz)) * 0.5;
    let gz = (field.get(cx, cz - 1) - field.get(cx, cz + 1)) * 0.5;
    (gx, gz)
}

fn simulate_droplet(
    field: &mut HeightField,
    params: &ErosionParams,
    start_x: f64,
    start_z: f64,
    stats: &mut ErosionStats,
) {
    let max = (field.resolution() - 1) as f64;
    let (mut x, mut z) = (start_x, start_z);
    let (mut vx, mut vz) = (0.0_f64, 0.0_f64);
    let mut water = 1.0_f64;
    let mut sediment = 0.0_f64;

    for _ in 0..params.max_steps {
        let (gx, gz) = downhill_gradient(field, x as usize, z as usize);
        if gx == 0.0 && gz == 0.0 {
            break;
        }

        vx = vx * params.inertia + gx * params.gravity;
        vz = vz * params.inertia + gz * params.gravity;
        x += vx;
        z += vz;
        stats.steps += 1;

        if !(x.is_finite() && z.is_finite()) || x < 0.0 || z < 0.0 || x > max || z > max {
            break;
        }

        let speed = (vx * vx + vz * vz).sqrt();
        let capacity = speed * water * params.capacity_factor;

        if sediment > capacity {
            let amount = (sediment - capacity) * params.deposition_rate;
            deposit_bilinear(field, x, z, amount);
            sediment -= amount;
            stats.total_deposited += amount;
        } else {
            let (cx, cz) = (x as usize, z as usize);
            let current = field.get(cx, cz);
            let amount = ((capacity - sediment) * params.erosion_rate).min(current.max(0.0));
            if amount > 0.0 {
                field.set(cx, cz, current - amount);
                sediment += amount;
                stats.total_eroded += amount;
            }
        }

        water *= 1.0 - params.evaporation;
        if water < params.min_water {
            break;
        }
    }
}

/// Spread `amount` over the four cells around `(x, z)` by bilinear weight.
fn deposit_bilinear(field: &mut HeightField, x: f64, z: f64, amount: f64) {
    let last = field.resolution() - 1;
    let x0 = (x.floor() as usize).min(last);
    let z0 = (z.floor() as usize).min(last);
    let x1 = (x0 + 1).min(last);
    let z1 = (z0 + 1).min(last);
    let fx = x - x0 as f64;
    let fz = z - z0 as f64;

    let weights = [
        (x0, z0, (1.0 - fx) * (1.0 - fz)),
        (x1, z0, fx * (1.0 - fz)),
        (x0, z1, (1.0 - fx) * fz),
        (x1, z1, fx * fz),
    ];
    for (cx, cz, w) in weights {
        let h = field.get(cx, cz);
        field.set(cx, cz, h + amount * w);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::TileCoordinate;
    use rand::SeedableRng;

    fn sloped_field(resolution: usize) -> HeightField {
        let mut field = HeightField::flat(TileCoordinate::default(), resolution, 1.0, 0.0, 0.0);
        for z in 0..resolution {
            for x in 0..resolution {
                // Slope from top-left (high) to bottom-right (low)
                let h = (resolution - x) as f64 + (resolution - z) as f64 * 0.5;
                field.set(x, z, h);
            }
        }
        field
    }

    #[test]
    fn test_zero_droplets_is_identity() {
        let mut field = sloped_field(32);
        let original = field.clone();
        let params = ErosionParams {
            droplets: Some(0),
            ..Default::default()
        };
        let stats = erode(&mut field, &params, &mut ChaCha8Rng::seed_from_u64(1));
        assert_eq!(field, original, "Zero droplets must not change the field");
        assert_eq!(stats, ErosionStats::default());
    }

    #[test]
    fn test_droplets_erode_slope() {
        let mut field = sloped_field(48);
        let params = ErosionParams {
            droplets: Some(500),
            ..Default::default()
        };
        let stats = erode(&mut field, &params, &mut ChaCha8Rng::seed_from_u64(12345));
        assert!(stats.total_eroded > 0.0, "Slope should be eroded");
        assert!(stats.steps > 0);
        assert_eq!(stats.droplets, 500);
    }

    #[test]
    fn test_erosion_keeps_heights_finite() {
        let mut field = sloped_field(40);
        // Sharp spike to stress the velocity update
        field.set(20, 20, 1.0e6);
        let params = ErosionParams {
            droplets: Some(2000),
            ..Default::default()
        };
        erode(&mut field, &params, &mut ChaCha8Rng::seed_from_u64(7));
        assert_eq!(field.find_non_finite(), None, "Erosion produced NaN/inf");
    }

    #[test]
    fn test_flat_field_unchanged() {
        let mut field = HeightField::flat(TileCoordinate::default(), 16, 1.0, 0.0, 5.0);
        let original = field.clone();
        let stats = erode(&mut field, &ErosionParams::default(), &mut ChaCha8Rng::seed_from_u64(3));
        assert_eq!(field, original, "Zero gradient halts every droplet");
        assert_eq!(stats.steps, 0);
    }

    #[test]
    fn test_erosion_is_deterministic() {
        let params = ErosionParams {
            droplets: Some(300),
            ..Default::default()
        };
        let mut a = sloped_field(32);
        let mut b = sloped_field(32);
        erode(&mut a, &params, &mut ChaCha8Rng::seed_from_u64(99));
        erode(&mut b, &params, &mut ChaCha8Rng::seed_from_u64(99));
        assert_eq!(a, b);
    }

    #[test]
    fn test_never_erodes_below_zero_from_positive() {
        let mut field = sloped_field(32);
        let params = ErosionParams {
            droplets: Some(1000),
            erosion_rate: 1.0,
            capacity_factor: 10.0,
            ..Default::default()
        };
        erode(&mut field, &params, &mut ChaCha8Rng::seed_from_u64(5));
        for &h in field.heights() {
            assert!(h >= 0.0, "Erosion removed more than the cell held: {h}");
        }
    }

    #[test]
    fn test_default_droplets_scale_with_resolution() {
        let params = ErosionParams::default();
        assert_eq!(params.droplet_count(64), 2048);
        assert_eq!(params.droplet_count(128), 8192);
    }
}
