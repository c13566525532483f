//! Placement engine: vegetation and features by constrained rejection sampling.
//!
//! Every draw comes from an explicit per-tile RNG. A site that fails its
//! constraints is rejected and another is drawn; running out of attempts is
//! a silent skip, never an error.

mod features;
mod vegetation;

use std::collections::BTreeMap;
use std::fmt;

use crate::biome::Biome;
use crate::height_field::HeightField;
use crate::hydrology::RiverNetwork;

pub use features::{
    FEATURE_TABLE, FeatureDef, FeatureKind, FeaturePlacement, FeaturePlacer, FeatureTier,
    HarmonyResponse, UNIQUE_FEATURE_NAMES,
};
pub use vegetation::{
    FlowerSpecies, TreeSpecies, VegetationInstance, VegetationKind, VegetationLayer,
    VegetationPlacer,
};

/// Limits shared by the placement passes.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacementParams {
    /// Minimum pairwise distance between features.
    pub feature_min_distance: f64,
    /// No other feature within this distance of a special feature.
    pub special_exclusion_radius: f64,
    /// No other feature within this distance of the unique feature.
    pub unique_exclusion_radius: f64,
    /// Cap on regular features per tile.
    pub max_features_per_tile: usize,
    /// Random sites tried per feature before skipping it.
    pub attempts_per_feature: usize,
    /// Chance that an eligible tile spawns its harmony-gated special feature.
    pub special_probability: f64,
    /// Harmony at or above which the celestial special is eligible.
    pub celestial_harmony: f64,
    /// Harmony at or below which the void special is eligible.
    pub void_harmony: f64,
    /// Fraction of tiles whose coordinate hash admits a unique feature.
    pub unique_rarity: f64,
    /// Steepest slope (rise over run) a tree accepts.
    pub tree_max_slope: f64,
    /// Bushes accept ground this far below the water line.
    pub bush_water_margin: f64,
    /// Rejection-sampling attempts per requested vegetation instance.
    pub vegetation_attempts: usize,
    /// Cap on instances of each vegetation class per tile.
    pub max_instances_per_class: usize,
}

impl Default for PlacementParams {
    fn default() -> Self {
        Self {
            feature_min_distance: 5.0,
            special_exclusion_radius: 15.0,
            unique_exclusion_radius: 30.0,
            max_features_per_tile: 8,
            attempts_per_feature: 10,
            special_probability: 0.3,
            celestial_harmony: 1.8,
            void_harmony: 0.3,
            unique_rarity: 0.002,
            tree_max_slope: 0.6,
            bush_water_margin: 0.5,
            vegetation_attempts: 4,
            max_instances_per_class: 2048,
        }
    }
}

/// How rare a placed object is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RarityTier {
    /// Ordinary content.
    Common,
    /// Somewhat scarce content.
    Uncommon,
    /// Scarce content, including harmony-driven variants.
    Rare,
    /// Harmony-gated special features.
    Special,
    /// The ultra-rare coordinate-gated feature.
    Unique,
}

impl RarityTier {
    /// Lower-case name used in metadata.
    pub fn name(self) -> &'static str {
        match self {
            RarityTier::Common => "common",
            RarityTier::Uncommon => "uncommon",
            RarityTier::Rare => "rare",
            RarityTier::Special => "special",
            RarityTier::Unique => "unique",
        }
    }
}

impl fmt::Display for RarityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a placed object came from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Provenance {
    /// Biome of the tile it spawned in.
    pub source_biome: Biome,
    /// Harmony of the snapshot it spawned under.
    pub harmony_at_spawn: f64,
    /// Rarity tier.
    pub rarity: RarityTier,
}

impl Provenance {
    /// String map for consumers that expect untyped metadata.
    pub fn to_metadata(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("source_biome".to_string(), self.source_biome.name().to_string()),
            ("harmony_level".to_string(), format!("{:.3}", self.harmony_at_spawn)),
            ("rarity".to_string(), self.rarity.name().to_string()),
        ])
    }
}

/// Cells that count as water for adjacency checks: wet cells of the height
/// field plus cells under a river.
#[derive(Clone, Debug, PartialEq)]
pub struct WaterMask {
    resolution: usize,
    wet: Vec<bool>,
}

impl WaterMask {
    /// Build the mask from heights below the wet threshold and river waypoints.
    pub fn new(field: &HeightField, rivers: &[RiverNetwork], wet_threshold: f64) -> Self {
        let resolution = field.resolution();
        let sea_level = field.sea_level();
        let mut wet: Vec<bool> = field
            .heights()
            .iter()
            .map(|h| h - sea_level < wet_threshold)
            .collect();

        for waypoint in rivers.iter().flat_map(|r| r.waypoints.iter()) {
            let (gx, gz) = field.grid_position(waypoint.position.x, waypoint.position.z);
            let (x, z) = (gx.round(), gz.round());
            if x >= 0.0 && z >= 0.0 && (x as usize) < resolution && (z as usize) < resolution {
                wet[z as usize * resolution + x as usize] = true;
            }
        }

        Self { resolution, wet }
    }

    /// Whether cell `(x, z)` is water.
    pub fn is_wet(&self, x: usize, z: usize) -> bool {
        self.wet[z * self.resolution + x]
    }

    /// Whether any cell within `radius` cells (Chebyshev) of `(x, z)` is water.
    pub fn near(&self, x: usize, z: usize, radius: usize) -> bool {
        let last = self.resolution - 1;
        let (x0, x1) = (x.saturating_sub(radius), (x + radius).min(last));
        let (z0, z1) = (z.saturating_sub(radius), (z + radius).min(last));
        (z0..=z1).any(|cz| (x0..=x1).any(|cx| self.is_wet(cx, cz)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::TileCoordinate;

    #[test]
    fn test_provenance_metadata() {
        let p = Provenance {
            source_biome: Biome::Forest,
            harmony_at_spawn: 1.25,
            rarity: RarityTier::Rare,
        };
        let meta = p.to_metadata();
        assert_eq!(meta["source_biome"], "forest");
        assert_eq!(meta["harmony_level"], "1.250");
        assert_eq!(meta["rarity"], "rare");
        assert_eq!(meta.len(), 3);
    }

    #[test]
    fn test_water_mask_adjacency() {
        let mut field = HeightField::flat(TileCoordinate::new(0, 0), 16, 1.0, 0.0, 5.0);
        field.set(3, 3, -4.0);
        let mask = WaterMask::new(&field, &[], -1.0);
        assert!(mask.is_wet(3, 3));
        assert!(mask.near(5, 5, 2));
        assert!(!mask.near(6, 6, 2));
    }
}
