//! Grass density and discrete vegetation instances.

use std::f64::consts::TAU;
use std::hash::{Hash, Hasher};

use glam::DVec3;
use rand::Rng;
use rand::seq::IndexedRandom;
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use crate::biome::{Biome, BiomeConstants};
use crate::height_field::HeightField;
use crate::metabolism::MetabolismSnapshot;
use crate::noise_field::{NoiseField, NoiseKind, NoiseParams};
use crate::seed::{Salt, hash_f64s, world_noise_seed};

use super::{PlacementParams, Provenance, RarityTier};

/// Tree species.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TreeSpecies {
    Oak,
    Birch,
    Pine,
    Spruce,
    Willow,
    Cypress,
    Palm,
    Cactus,
    Ashwood,
    Dead,
    Silverleaf,
    Crystalline,
    /// Grows anywhere under extreme harmony.
    HarmonyTree,
    /// Grows anywhere under extreme dissonance.
    CorruptedTree,
}

/// Flower species.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowerSpecies {
    Daisy,
    Poppy,
    Bluebell,
    Lotus,
    Heather,
    DesertBloom,
    Frostbell,
    Emberlily,
    Voidbloom,
    Moonpetal,
    Shardbloom,
    /// Blooms anywhere under extreme harmony.
    HarmonyBloom,
    /// Blooms anywhere under extreme dissonance.
    BlightBloom,
}

/// What a vegetation instance is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VegetationKind {
    Tree(TreeSpecies),
    FlowerCluster(FlowerSpecies),
    Bush,
}

/// One placed plant.
#[derive(Clone, Debug, PartialEq)]
pub struct VegetationInstance {
    /// World-space position on the terrain surface.
    pub position: DVec3,
    pub kind: VegetationKind,
    /// Yaw in radians.
    pub rotation: f64,
    pub scale: f64,
    /// Growth stage in `[0, 1]`.
    pub age: f64,
    /// Vitality in `[0, 1]`.
    pub health: f64,
    /// Flowering intensity in `[0, 1]`; zero for non-flowers.
    pub bloom: f64,
    pub provenance: Provenance,
}

impl Hash for VegetationInstance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        hash_f64s(
            &[
                self.position.x,
                self.position.y,
                self.position.z,
                self.rotation,
                self.scale,
                self.age,
                self.health,
                self.bloom,
            ],
            state,
        );
    }
}

/// Vegetation output for a tile.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VegetationLayer {
    /// Samples per edge of the grass grid.
    pub resolution: usize,
    /// Row-major grass coverage per cell, in `[0, 1]`.
    pub grass_density: Vec<f32>,
    /// Trees, then flower clusters, then bushes.
    pub instances: Vec<VegetationInstance>,
}

impl Hash for VegetationLayer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.resolution.hash(state);
        self.grass_density.len().hash(state);
        for g in &self.grass_density {
            g.to_bits().hash(state);
        }
        self.instances.hash(state);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PlantClass {
    Tree,
    Flower,
    Bush,
}

/// Places vegetation for tiles of one world.
pub struct VegetationPlacer {
    grass_noise: NoiseField,
    params: PlacementParams,
}

impl VegetationPlacer {
    pub fn new(world_seed: u64, params: PlacementParams) -> Self {
        Self {
            grass_noise: NoiseField::new(world_noise_seed(world_seed, Salt::Vegetation)),
            params,
        }
    }

    /// Harmony multiplier on densities: 1.0 at neutral harmony.
    pub fn harmony_bias(harmony: f64) -> f64 {
        0.5 + 0.5 * harmony
    }

    /// Grass coverage per cell: biome base plus noise, scaled by harmony.
    /// Underwater cells get none.
    pub fn grass_density(
        &self,
        field: &HeightField,
        constants: &BiomeConstants,
        metabolism: MetabolismSnapshot,
    ) -> Vec<f32> {
        let resolution = field.resolution();
        let bias = Self::harmony_bias(metabolism.harmony);
        let mut grass = Vec::with_capacity(resolution * resolution);
        for z in 0..resolution {
            for x in 0..resolution {
                if field.get(x, z) <= field.sea_level() {
                    grass.push(0.0);
                    continue;
                }
                let (wx, wz) = field.world_position(x, z);
                let n = self.grass_noise.sample_unchecked(
                    NoiseKind::Smooth,
                    wx,
                    wz,
                    &NoiseParams::single(0.05),
                );
                let density = ((constants.grass_density + n * 0.3) * bias).clamp(0.0, 1.0);
                grass.push(density as f32);
            }
        }
        grass
    }

    /// Grass grid plus trees, flower clusters and bushes for a tile.
    pub fn place(
        &self,
        field: &HeightField,
        biome: Biome,
        constants: &BiomeConstants,
        metabolism: MetabolismSnapshot,
        rng: &mut ChaCha8Rng,
    ) -> VegetationLayer {
        let grass_density = self.grass_density(field, constants, metabolism);
        let mut instances = Vec::new();
        for (class, per_hundred) in [
            (PlantClass::Tree, constants.tree_density),
            (PlantClass::Flower, constants.flower_density),
            (PlantClass::Bush, constants.bush_density),
        ] {
            self.place_class(
                field,
                biome,
                constants,
                metabolism,
                class,
                per_hundred,
                rng,
                &mut instances,
            );
        }
        VegetationLayer {
            resolution: field.resolution(),
            grass_density,
            instances,
        }
    }

    fn target_count(&self, field: &HeightField, per_hundred: f64, harmony: f64) -> usize {
        let cells = (field.resolution() * field.resolution()) as f64;
        let target = (per_hundred * cells / 100.0 * Self::harmony_bias(harmony)).round();
        (target.max(0.0) as usize).min(self.params.max_instances_per_class)
    }

    fn site_ok(&self, field: &HeightField, class: PlantClass, x: usize, z: usize) -> bool {
        let h = field.get(x, z);
        let water = field.sea_level();
        match class {
            PlantClass::Tree => h > water && field.slope_at(x, z) < self.params.tree_max_slope,
            PlantClass::Flower => h > water,
            PlantClass::Bush => h > water - self.params.bush_water_margin,
        }
    }

    fn pick_kind(
        &self,
        class: PlantClass,
        constants: &BiomeConstants,
        harmony: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<(VegetationKind, RarityTier)> {
        let extreme_high = harmony >= self.params.celestial_harmony;
        let extreme_low = harmony <= self.params.void_harmony;
        match class {
            PlantClass::Tree if extreme_high => {
                Some((VegetationKind::Tree(TreeSpecies::HarmonyTree), RarityTier::Rare))
            }
            PlantClass::Tree if extreme_low => {
                Some((VegetationKind::Tree(TreeSpecies::CorruptedTree), RarityTier::Rare))
            }
            PlantClass::Tree => constants
                .tree_species
                .choose(rng)
                .map(|s| (VegetationKind::Tree(*s), RarityTier::Common)),
            PlantClass::Flower if extreme_high => Some((
                VegetationKind::FlowerCluster(FlowerSpecies::HarmonyBloom),
                RarityTier::Rare,
            )),
            PlantClass::Flower if extreme_low => Some((
                VegetationKind::FlowerCluster(FlowerSpecies::BlightBloom),
                RarityTier::Rare,
            )),
            PlantClass::Flower => constants
                .flower_species
                .choose(rng)
                .map(|s| (VegetationKind::FlowerCluster(*s), RarityTier::Common)),
            PlantClass::Bush => Some((VegetationKind::Bush, RarityTier::Common)),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn place_class(
        &self,
        field: &HeightField,
        biome: Biome,
        constants: &BiomeConstants,
        metabolism: MetabolismSnapshot,
        class: PlantClass,
        per_hundred: f64,
        rng: &mut ChaCha8Rng,
        out: &mut Vec<VegetationInstance>,
    ) {
        let target = self.target_count(field, per_hundred, metabolism.harmony);
        if target == 0 {
            return;
        }
        let last = field.resolution() - 1;
        let cell = field.cell_size();
        let (min_x, min_z) = field.world_position(0, 0);
        let (max_x, max_z) = field.world_position(last, last);
        let stability = metabolism.stability_index();
        let mut placed = 0;

        for _ in 0..target * self.params.vegetation_attempts {
            if placed == target {
                break;
            }
            let x = rng.random_range(0..=last);
            let z = rng.random_range(0..=last);
            if !self.site_ok(field, class, x, z) {
                continue;
            }
            let Some((kind, rarity)) = self.pick_kind(class, constants, metabolism.harmony, rng)
            else {
                trace!(?biome, ?class, "No eligible species, skipping class");
                return;
            };

            let (wx, wz) = field.world_position(x, z);
            let jx = rng.random_range(-0.5..0.5) * cell;
            let jz = rng.random_range(-0.5..0.5) * cell;
            let scale = match class {
                PlantClass::Tree => rng.random_range(0.7..1.3),
                _ => rng.random_range(0.8..1.2),
            };
            let bloom = match class {
                PlantClass::Flower => rng.random_range(0.0..=1.0) * metabolism.energy_flow().min(1.0),
                _ => 0.0,
            };
            let health =
                (rng.random_range(0.7..=1.0) * (0.5 + 0.5 * stability)).clamp(0.0, 1.0);

            out.push(VegetationInstance {
                position: DVec3::new(
                    (wx + jx).clamp(min_x, max_x),
                    field.get(x, z),
                    (wz + jz).clamp(min_z, max_z),
                ),
                kind,
                rotation: rng.random_range(0.0..TAU),
                scale,
                age: rng.random_range(0.0..=1.0),
                health,
                bloom,
                provenance: Provenance {
                    source_biome: biome,
                    harmony_at_spawn: metabolism.harmony,
                    rarity,
                },
            });
            placed += 1;
        }

        if placed < target {
            trace!(?class, placed, target, "Ran out of vegetation attempts");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::BiomeTable;
    use crate::coords::TileCoordinate;
    use rand::SeedableRng;

    fn flat(elevation: f64) -> HeightField {
        HeightField::flat(TileCoordinate::new(0, 0), 33, 2.0, 0.0, elevation)
    }

    fn placer() -> VegetationPlacer {
        VegetationPlacer::new(42, PlacementParams::default())
    }

    #[test]
    fn test_grass_density_clamped_and_sized() {
        let table = BiomeTable::standard();
        let field = flat(5.0);
        for harmony in [0.1, 1.0, 2.0] {
            let grass = placer().grass_density(
                &field,
                table.get(Biome::Ethereal),
                MetabolismSnapshot::new(harmony, 0.0),
            );
            assert_eq!(grass.len(), 33 * 33);
            assert!(grass.iter().all(|g| (0.0..=1.0).contains(g)));
        }
    }

    #[test]
    fn test_no_grass_underwater() {
        let table = BiomeTable::standard();
        let grass = placer().grass_density(
            &flat(-3.0),
            table.get(Biome::Plains),
            MetabolismSnapshot::default(),
        );
        assert!(grass.iter().all(|&g| g == 0.0));
    }

    #[test]
    fn test_forest_places_trees_on_land() {
        let table = BiomeTable::standard();
        let field = flat(5.0);
        let layer = placer().place(
            &field,
            Biome::Forest,
            table.get(Biome::Forest),
            MetabolismSnapshot::default(),
            &mut ChaCha8Rng::seed_from_u64(1),
        );
        let trees = layer
            .instances
            .iter()
            .filter(|i| matches!(i.kind, VegetationKind::Tree(_)))
            .count();
        // 2 per 100 cells over 33² cells
        assert_eq!(trees, 22);
        for i in &layer.instances {
            assert_eq!(i.provenance.source_biome, Biome::Forest);
            assert!((0.0..=1.0).contains(&i.health));
        }
    }

    #[test]
    fn test_instances_stay_inside_tile() {
        let table = BiomeTable::standard();
        let field = HeightField::flat(TileCoordinate::new(-2, 3), 17, 2.0, 0.0, 5.0);
        let (min_x, min_z) = field.world_position(0, 0);
        let (max_x, max_z) = field.world_position(16, 16);
        for seed in 0..20 {
            let layer = placer().place(
                &field,
                Biome::Forest,
                table.get(Biome::Forest),
                MetabolismSnapshot::new(1.5, 0.0),
                &mut ChaCha8Rng::seed_from_u64(seed),
            );
            for i in &layer.instances {
                assert!(
                    (min_x..=max_x).contains(&i.position.x) && (min_z..=max_z).contains(&i.position.z),
                    "Instance at ({}, {}) left the tile",
                    i.position.x,
                    i.position.z
                );
            }
        }
    }

    #[test]
    fn test_underwater_rejects_trees_and_flowers() {
        let table = BiomeTable::standard();
        let layer = placer().place(
            &flat(-2.0),
            Biome::Plains,
            table.get(Biome::Plains),
            MetabolismSnapshot::default(),
            &mut ChaCha8Rng::seed_from_u64(2),
        );
        assert!(layer.instances.is_empty(), "Nothing grows 2 units underwater");

        let layer = placer().place(
            &flat(-0.25),
            Biome::Plains,
            table.get(Biome::Plains),
            MetabolismSnapshot::default(),
            &mut ChaCha8Rng::seed_from_u64(2),
        );
        assert!(!layer.instances.is_empty());
        assert!(layer.instances.iter().all(|i| i.kind == VegetationKind::Bush));
    }

    #[test]
    fn test_extreme_harmony_overrides_species() {
        let table = BiomeTable::standard();
        let layer = placer().place(
            &flat(5.0),
            Biome::Forest,
            table.get(Biome::Forest),
            MetabolismSnapshot::new(1.9, 0.0),
            &mut ChaCha8Rng::seed_from_u64(3),
        );
        for i in &layer.instances {
            match i.kind {
                VegetationKind::Tree(s) => assert_eq!(s, TreeSpecies::HarmonyTree),
                VegetationKind::FlowerCluster(s) => assert_eq!(s, FlowerSpecies::HarmonyBloom),
                VegetationKind::Bush => {}
            }
        }

        let layer = placer().place(
            &flat(5.0),
            Biome::Forest,
            table.get(Biome::Forest),
            MetabolismSnapshot::new(0.2, 1.0),
            &mut ChaCha8Rng::seed_from_u64(3),
        );
        assert!(layer.instances.iter().any(|i| i.kind == VegetationKind::Tree(TreeSpecies::CorruptedTree)));
    }

    #[test]
    fn test_steep_ground_rejects_trees() {
        let table = BiomeTable::standard();
        let mut field = flat(0.0);
        for z in 0..33 {
            for x in 0..33 {
                field.set(x, z, 10.0 + x as f64 * 4.0);
            }
        }
        let layer = placer().place(
            &field,
            Biome::Forest,
            table.get(Biome::Forest),
            MetabolismSnapshot::default(),
            &mut ChaCha8Rng::seed_from_u64(4),
        );
        assert!(
            !layer.instances.iter().any(|i| matches!(i.kind, VegetationKind::Tree(_))),
            "Slope 2.0 is too steep for trees"
        );
    }
}
