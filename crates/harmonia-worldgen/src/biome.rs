//! Biome system: constants table, climate decision table, and terrain shaping.
//!
//! A tile gets one primary [`Biome`] by majority vote of its cells through
//! the decision table in [`classify`]. Per-biome multipliers and the shaping
//! pass each biome applies to the height field live in a plain data table
//! ([`BiomeTable`]) rather than in per-variant methods.

mod classify;
mod shaping;
mod table;

use std::fmt;

pub use classify::{BiomeAssignment, ClassifierThresholds, assign_biome, classify};
pub use shaping::{TerrainShaping, shape_terrain};
pub use table::{BiomeConstants, BiomeTable};

/// Discrete biome tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Biome {
    /// Deep water covering most of the tile.
    Ocean,
    /// Temperate grassland.
    Plains,
    /// Temperate woodland.
    Forest,
    /// Waterlogged lowland.
    Swamp,
    /// Hot, dry sand and rock.
    Desert,
    /// Frozen treeless ground.
    Tundra,
    /// Cold coniferous forest.
    Taiga,
    /// High, steep terrain.
    Mountain,
    /// Hot high ground around a vent.
    Volcanic,
    /// Land twisted by dissonance.
    Corrupted,
    /// Land suffused with harmony.
    Ethereal,
    /// Cold high ground grown with crystal spires.
    Crystal,
}

impl Biome {
    /// Every biome, in table order.
    pub const ALL: [Biome; 12] = [
        Biome::Ocean,
        Biome::Plains,
        Biome::Forest,
        Biome::Swamp,
        Biome::Desert,
        Biome::Tundra,
        Biome::Taiga,
        Biome::Mountain,
        Biome::Volcanic,
        Biome::Corrupted,
        Biome::Ethereal,
        Biome::Crystal,
    ];

    /// Position in [`Biome::ALL`] and in the constants table.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Lower-case name used in logs and provenance metadata.
    pub fn name(self) -> &'static str {
        match self {
            Biome::Ocean => "ocean",
            Biome::Plains => "plains",
            Biome::Forest => "forest",
            Biome::Swamp => "swamp",
            Biome::Desert => "desert",
            Biome::Tundra => "tundra",
            Biome::Taiga => "taiga",
            Biome::Mountain => "mountain",
            Biome::Volcanic => "volcanic",
            Biome::Corrupted => "corrupted",
            Biome::Ethereal => "ethereal",
            Biome::Crystal => "crystal",
        }
    }
}

impl fmt::Display for Biome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_matches_all_order() {
        for (i, biome) in Biome::ALL.iter().enumerate() {
            assert_eq!(biome.index(), i, "{biome} out of table order");
        }
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = Biome::ALL.iter().map(|b| b.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Biome::ALL.len());
    }
}
