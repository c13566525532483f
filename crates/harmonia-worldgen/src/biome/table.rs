//! Static per-biome constants, indexed by [`Biome`].

use crate::placement::{FlowerSpecies, TreeSpecies};

use super::{Biome, TerrainShaping};

/// Constants owned by one biome.
#[derive(Clone, Debug, PartialEq)]
pub struct BiomeConstants {
    /// Human-readable name, matching [`Biome::name`].
    pub name: &'static str,
    /// Base grass coverage per cell, in `[0.0, 1.0]`.
    pub grass_density: f64,
    /// Trees per 100 cells at neutral harmony.
    pub tree_density: f64,
    /// Flower clusters per 100 cells at neutral harmony.
    pub flower_density: f64,
    /// Bushes per 100 cells at neutral harmony.
    pub bush_density: f64,
    /// Harmony level the biome is associated with.
    pub default_harmony: f64,
    /// Temperature of standing water, in degrees Celsius.
    pub water_temperature: f64,
    /// Clarity multiplier applied to water bodies, in `[0.0, 1.0]`.
    pub water_clarity: f64,
    /// Tree species eligible in this biome. Empty for treeless biomes.
    pub tree_species: &'static [TreeSpecies],
    /// Flower species eligible in this biome.
    pub flower_species: &'static [FlowerSpecies],
    /// Base RGB colour used by debug renderers.
    pub color: [u8; 3],
    /// Shaping pass applied to the height field after erosion.
    pub shaping: TerrainShaping,
}

/// Lookup table from [`Biome`] to [`BiomeConstants`].
///
/// Every biome always has an entry; [`BiomeTable::set`] replaces one.
#[derive(Clone, Debug)]
pub struct BiomeTable {
    entries: Vec<BiomeConstants>,
}

impl BiomeTable {
    /// The built-in constants for all twelve biomes.
    pub fn standard() -> Self {
        use FlowerSpecies as F;
        use TreeSpecies as T;

        let entry = |biome: Biome,
                     grass: f64,
                     trees: f64,
                     flowers: f64,
                     bushes: f64,
                     harmony: f64,
                     water: (f64, f64),
                     tree_species: &'static [TreeSpecies],
                     flower_species: &'static [FlowerSpecies],
                     color: [u8; 3],
                     shaping: TerrainShaping| BiomeConstants {
            name: biome.name(),
            grass_density: grass,
            tree_density: trees,
            flower_density: flowers,
            bush_density: bushes,
            default_harmony: harmony,
            water_temperature: water.0,
            water_clarity: water.1,
            tree_species,
            flower_species,
            color,
            shaping,
        };

        let entries = vec![
            entry(
                Biome::Ocean,
                0.0,
                0.0,
                0.0,
                0.0,
                1.0,
                (14.0, 0.7),
                &[],
                &[],
                [28, 74, 140],
                TerrainShaping::OceanFlatten,
            ),
            entry(
                Biome::Plains,
                0.8,
                0.3,
                1.2,
                0.5,
                1.0,
                (16.0, 0.8),
                &[T::Oak, T::Birch],
                &[F::Daisy, F::Poppy, F::Bluebell],
                [124, 176, 82],
                TerrainShaping::None,
            ),
            entry(
                Biome::Forest,
                0.6,
                2.0,
                0.6,
                1.0,
                1.1,
                (13.0, 0.85),
                &[T::Oak, T::Birch, T::Pine],
                &[F::Bluebell, F::Daisy],
                [46, 112, 52],
                TerrainShaping::None,
            ),
            entry(
                Biome::Swamp,
                0.5,
                0.8,
                0.4,
                1.2,
                0.9,
                (20.0, 0.35),
                &[T::Willow, T::Cypress],
                &[F::Lotus],
                [78, 98, 60],
                TerrainShaping::SwampMounds,
            ),
            entry(
                Biome::Desert,
                0.05,
                0.05,
                0.1,
                0.2,
                0.9,
                (26.0, 0.9),
                &[T::Palm, T::Cactus],
                &[F::DesertBloom],
                [214, 190, 128],
                TerrainShaping::None,
            ),
            entry(
                Biome::Tundra,
                0.2,
                0.05,
                0.2,
                0.3,
                1.0,
                (2.0, 0.95),
                &[T::Spruce],
                &[F::Frostbell, F::Heather],
                [196, 206, 210],
                TerrainShaping::None,
            ),
            entry(
                Biome::Taiga,
                0.4,
                1.5,
                0.2,
                0.6,
                1.0,
                (6.0, 0.9),
                &[T::Pine, T::Spruce],
                &[F::Heather],
                [62, 100, 84],
                TerrainShaping::None,
            ),
            entry(
                Biome::Mountain,
                0.15,
                0.2,
                0.1,
                0.2,
                1.0,
                (4.0, 0.95),
                &[T::Pine],
                &[F::Heather],
                [126, 118, 110],
                TerrainShaping::MountainAmplify,
            ),
            entry(
                Biome::Volcanic,
                0.0,
                0.05,
                0.05,
                0.05,
                0.8,
                (45.0, 0.5),
                &[T::Ashwood],
                &[F::Emberlily],
                [92, 40, 32],
                TerrainShaping::VolcanicRadial,
            ),
            entry(
                Biome::Corrupted,
                0.1,
                0.4,
                0.2,
                0.4,
                0.3,
                (18.0, 0.2),
                &[T::Dead],
                &[F::Voidbloom],
                [82, 36, 96],
                TerrainShaping::CorruptedSpikes,
            ),
            entry(
                Biome::Ethereal,
                0.9,
                0.8,
                2.0,
                0.6,
                1.8,
                (18.0, 1.0),
                &[T::Silverleaf, T::Birch],
                &[F::Moonpetal, F::Lotus],
                [186, 214, 246],
                TerrainShaping::None,
            ),
            entry(
                Biome::Crystal,
                0.1,
                0.1,
                0.3,
                0.1,
                1.4,
                (3.0, 1.0),
                &[T::Crystalline],
                &[F::Shardbloom],
                [160, 220, 230],
                TerrainShaping::CrystalSpires,
            ),
        ];

        Self { entries }
    }

    /// Constants for `biome`.
    #[inline]
    pub fn get(&self, biome: Biome) -> &BiomeConstants {
        &self.entries[biome.index()]
    }

    /// Replace the constants for `biome`.
    pub fn set(&mut self, biome: Biome, constants: BiomeConstants) {
        self.entries[biome.index()] = constants;
    }

    /// Iterate `(biome, constants)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (Biome, &BiomeConstants)> {
        Biome::ALL.iter().copied().zip(self.entries.iter())
    }
}

impl Default for BiomeTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_biome_has_matching_entry() {
        let table = BiomeTable::standard();
        for biome in Biome::ALL {
            assert_eq!(table.get(biome).name, biome.name());
        }
    }

    #[test]
    fn test_densities_are_sane() {
        for (biome, c) in BiomeTable::standard().iter() {
            assert!((0.0..=1.0).contains(&c.grass_density), "{biome} grass");
            assert!((0.0..=1.0).contains(&c.water_clarity), "{biome} clarity");
            assert!(c.tree_density >= 0.0 && c.flower_density >= 0.0 && c.bush_density >= 0.0);
            assert!((0.1..=2.0).contains(&c.default_harmony), "{biome} harmony");
        }
    }

    #[test]
    fn test_land_biomes_have_flowers() {
        let table = BiomeTable::standard();
        for biome in Biome::ALL.into_iter().filter(|b| *b != Biome::Ocean) {
            assert!(
                !table.get(biome).flower_species.is_empty(),
                "{biome} needs at least one flower species"
            );
        }
    }

    #[test]
    fn test_set_replaces_entry() {
        let mut table = BiomeTable::standard();
        let mut plains = table.get(Biome::Plains).clone();
        plains.tree_density = 9.0;
        table.set(Biome::Plains, plains);
        assert_eq!(table.get(Biome::Plains).tree_density, 9.0);
        assert_eq!(table.get(Biome::Forest).tree_density, 2.0);
    }
}
