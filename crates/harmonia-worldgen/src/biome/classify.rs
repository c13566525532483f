//! Climate decision table and per-tile biome assignment.

use crate::climate::ClimateField;
use crate::height_field::HeightField;
use crate::metabolism::MetabolismSnapshot;

use super::Biome;

/// Cut points of the biome decision table.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassifierThresholds {
    /// Harmony at or above which land turns ethereal.
    pub ethereal_harmony: f64,
    /// Dissonance at or above which land may turn corrupted.
    pub corrupted_dissonance: f64,
    /// Harmony at or below which high dissonance corrupts land.
    pub corrupted_max_harmony: f64,
    /// Elevation relative to sea level below which a cell is ocean.
    pub ocean_depth: f64,
    /// Elevation relative to sea level above which a cell is high ground.
    pub mountain_elevation: f64,
    /// Temperature lost per unit of elevation above sea level.
    pub lapse_rate: f64,
    /// Adjusted temperature above which high ground is volcanic.
    pub volcanic_temperature: f64,
    /// Harmony above which cold high ground grows crystal.
    pub crystal_harmony: f64,
    /// Adjusted temperature below which high ground may grow crystal.
    pub crystal_temperature: f64,
    /// Adjusted temperature below which land is always tundra.
    pub frozen_temperature: f64,
    /// Upper bound of the cold band (tundra/taiga).
    pub cold_temperature: f64,
    /// Upper bound of the temperate band (plains/forest/swamp).
    pub temperate_temperature: f64,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            ethereal_harmony: 1.7,
            corrupted_dissonance: 1.2,
            corrupted_max_harmony: 0.6,
            ocean_depth: -8.0,
            mountain_elevation: 30.0,
            lapse_rate: 0.012,
            volcanic_temperature: 0.7,
            crystal_harmony: 1.3,
            crystal_temperature: 0.0,
            frozen_temperature: -0.3,
            cold_temperature: 0.1,
            temperate_temperature: 0.6,
        }
    }
}

/// Classify a single sample.
///
/// `elevation` is relative to sea level. World-health extremes take
/// precedence over climate; otherwise the table is keyed by elevation, then
/// by lapse-adjusted temperature band, then by moisture tier.
pub fn classify(
    temperature: f64,
    moisture: f64,
    elevation: f64,
    metabolism: MetabolismSnapshot,
    th: &ClassifierThresholds,
) -> Biome {
    if metabolism.harmony >= th.ethereal_harmony {
        return Biome::Ethereal;
    }
    if metabolism.dissonance >= th.corrupted_dissonance
        && metabolism.harmony <= th.corrupted_max_harmony
    {
        return Biome::Corrupted;
    }
    if elevation < th.ocean_depth {
        return Biome::Ocean;
    }

    let adjusted = temperature - elevation.max(0.0) * th.lapse_rate;

    if elevation > th.mountain_elevation {
        return if adjusted > th.volcanic_temperature {
            Biome::Volcanic
        } else if metabolism.harmony > th.crystal_harmony && adjusted < th.crystal_temperature {
            Biome::Crystal
        } else {
            Biome::Mountain
        };
    }

    if adjusted < th.frozen_temperature {
        Biome::Tundra
    } else if adjusted < th.cold_temperature {
        if moisture > 0.4 { Biome::Taiga } else { Biome::Tundra }
    } else if adjusted < th.temperate_temperature {
        if moisture < 0.35 {
            Biome::Plains
        } else if moisture < 0.7 {
            Biome::Forest
        } else {
            Biome::Swamp
        }
    } else if moisture < 0.3 {
        Biome::Desert
    } else if moisture < 0.6 {
        Biome::Plains
    } else {
        Biome::Forest
    }
}

/// The biome chosen for a tile plus the tile-average climate it was chosen from.
#[derive(Clone, Debug, PartialEq)]
pub struct BiomeAssignment {
    /// The tile's single primary biome.
    pub primary: Biome,
    /// Mean temperature of the sampled cells.
    pub temperature: f64,
    /// Mean moisture of the sampled cells.
    pub moisture: f64,
    /// Mean elevation (relative to sea level) of the sampled cells.
    pub elevation: f64,
    /// Fraction of sampled cells that voted for `primary`.
    pub coverage: f64,
}

/// Cell stride of the biome vote.
const VOTE_STRIDE: usize = 4;

/// Assign one primary biome to a tile by majority vote of strided samples.
///
/// Ties go to the biome that comes first in [`Biome::ALL`].
pub fn assign_biome(
    field: &HeightField,
    climate: &ClimateField,
    metabolism: MetabolismSnapshot,
    th: &ClassifierThresholds,
) -> BiomeAssignment {
    let resolution = field.resolution();
    let sea_level = field.sea_level();
    let mut votes = [0usize; Biome::ALL.len()];
    let (mut t_sum, mut m_sum, mut e_sum) = (0.0, 0.0, 0.0);
    let mut samples = 0usize;

    let mut axis: Vec<usize> = (0..resolution).step_by(VOTE_STRIDE).collect();
    if axis.last() != Some(&(resolution - 1)) {
        axis.push(resolution - 1);
    }

    for &z in &axis {
        for &x in &axis {
            let temperature = climate.temperature(x, z);
            let moisture = climate.moisture(x, z);
            let elevation = field.get(x, z) - sea_level;
            let biome = classify(temperature, moisture, elevation, metabolism, th);
            votes[biome.index()] += 1;
            t_sum += temperature;
            m_sum += moisture;
            e_sum += elevation;
            samples += 1;
        }
    }

    let mut best = 0;
    for (i, &count) in votes.iter().enumerate() {
        if count > votes[best] {
            best = i;
        }
    }

    let n = samples.max(1) as f64;
    BiomeAssignment {
        primary: Biome::ALL[best],
        temperature: t_sum / n,
        moisture: m_sum / n,
        elevation: e_sum / n,
        coverage: votes[best] as f64 / n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::climate::{ClimateParams, ClimateSampler};
    use crate::coords::TileCoordinate;

    fn neutral() -> MetabolismSnapshot {
        MetabolismSnapshot::new(1.0, 0.0)
    }

    fn classify_default(t: f64, m: f64, e: f64) -> Biome {
        classify(t, m, e, neutral(), &ClassifierThresholds::default())
    }

    #[test]
    fn test_temperature_bands() {
        assert_eq!(classify_default(-0.8, 0.5, 0.0), Biome::Tundra);
        assert_eq!(classify_default(0.0, 0.6, 0.0), Biome::Taiga);
        assert_eq!(classify_default(0.0, 0.2, 0.0), Biome::Tundra);
        assert_eq!(classify_default(0.3, 0.2, 0.0), Biome::Plains);
        assert_eq!(classify_default(0.3, 0.5, 0.0), Biome::Forest);
        assert_eq!(classify_default(0.3, 0.9, 0.0), Biome::Swamp);
        assert_eq!(classify_default(0.9, 0.1, 0.0), Biome::Desert);
        assert_eq!(classify_default(0.9, 0.5, 0.0), Biome::Plains);
        assert_eq!(classify_default(0.9, 0.8, 0.0), Biome::Forest);
    }

    #[test]
    fn test_elevation_rules() {
        assert_eq!(classify_default(0.5, 0.5, -20.0), Biome::Ocean);
        assert_eq!(classify_default(0.5, 0.5, 40.0), Biome::Mountain);
        assert_eq!(classify_default(1.0, 0.5, 35.0), Biome::Mountain);
        let th = ClassifierThresholds {
            lapse_rate: 0.0,
            ..Default::default()
        };
        assert_eq!(classify(0.9, 0.5, 35.0, neutral(), &th), Biome::Volcanic);
    }

    #[test]
    fn test_lapse_rate_cools_high_ground() {
        // 0.3 at sea level is temperate; 25 units up drops it by 0.3.
        assert_eq!(classify_default(0.3, 0.5, 0.0), Biome::Forest);
        assert_eq!(classify_default(0.3, 0.5, 25.0), Biome::Taiga);
    }

    #[test]
    fn test_crystal_needs_harmony_and_cold() {
        let th = ClassifierThresholds::default();
        let calm = MetabolismSnapshot::new(1.5, 0.0);
        assert_eq!(classify(0.2, 0.5, 40.0, calm, &th), Biome::Crystal);
        assert_eq!(classify(0.2, 0.5, 40.0, neutral(), &th), Biome::Mountain);
    }

    #[test]
    fn test_metabolism_overrides_climate() {
        let th = ClassifierThresholds::default();
        let bright = MetabolismSnapshot::new(1.9, 0.0);
        let dark = MetabolismSnapshot::new(0.4, 1.5);
        assert_eq!(classify(0.9, 0.1, -50.0, bright, &th), Biome::Ethereal);
        assert_eq!(classify(0.9, 0.1, 10.0, dark, &th), Biome::Corrupted);
        // Dissonance alone does not corrupt a healthy world.
        let tense = MetabolismSnapshot::new(1.0, 1.5);
        assert_eq!(classify(0.9, 0.1, 0.0, tense, &th), Biome::Desert);
    }

    #[test]
    fn test_assign_flat_tile_single_biome() {
        let field = HeightField::flat(TileCoordinate::new(0, 0), 33, 4.0, 0.0, -30.0);
        let climate = ClimateSampler::new(1, ClimateParams::default()).generate(&field);
        let assignment =
            assign_biome(&field, &climate, neutral(), &ClassifierThresholds::default());
        assert_eq!(assignment.primary, Biome::Ocean);
        assert_eq!(assignment.coverage, 1.0);
        assert_eq!(assignment.elevation, -30.0);
    }

    #[test]
    fn test_assign_is_deterministic() {
        let field = HeightField::flat(TileCoordinate::new(3, -2), 17, 8.0, 0.0, 5.0);
        let climate = ClimateSampler::new(9, ClimateParams::default()).generate(&field);
        let th = ClassifierThresholds::default();
        let a = assign_biome(&field, &climate, neutral(), &th);
        let b = assign_biome(&field, &climate, neutral(), &th);
        assert_eq!(a, b);
        assert!(a.coverage > 0.0 && a.coverage <= 1.0);
    }
}
