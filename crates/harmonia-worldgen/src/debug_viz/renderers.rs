//! Tile renderers: elevation bands, biome map and annotated overview.

use super::image::DebugImage;
use crate::biome::BiomeTable;
use crate::height_field::HeightField;
use crate::placement::{FeatureTier, VegetationKind};
use crate::pipeline::TileBundle;

const WATER_TINT: [u8; 3] = [40, 110, 230];
const RIVER_COLOR: [u8; 4] = [20, 60, 255, 255];
const TREE_COLOR: [u8; 4] = [15, 70, 25, 255];

/// Map an elevation to an RGB colour.
///
/// Bands: deep water → shallow water → beach → lowland green → rock brown →
/// snow, with `min`/`max` the tile's elevation range.
pub fn height_to_color(h: f64, sea_level: f64, min: f64, max: f64) -> [u8; 3] {
    if h < sea_level {
        // Deeper is darker
        let depth_range = (sea_level - min).max(1e-9);
        let t = ((sea_level - h) / depth_range).clamp(0.0, 1.0);
        return [
            (30.0 * (1.0 - t)) as u8,
            (80.0 * (1.0 - t)) as u8,
            (200.0 - t * 90.0) as u8,
        ];
    }
    if h < sea_level + 1.0 {
        return [220, 200, 130];
    }

    let t = ((h - sea_level) / (max - sea_level).max(1e-9)).clamp(0.0, 1.0);
    if t < 0.5 {
        let s = t / 0.5;
        [
            (30.0 + s * 80.0) as u8,
            (160.0 - s * 40.0) as u8,
            (30.0 + s * 20.0) as u8,
        ]
    } else if t < 0.8 {
        let s = (t - 0.5) / 0.3;
        [
            (110.0 + s * 40.0) as u8,
            (120.0 - s * 50.0) as u8,
            (50.0 + s * 20.0) as u8,
        ]
    } else {
        let s = ((t - 0.8) / 0.2).min(1.0);
        let base = (150.0 + s * 105.0).round() as u8;
        [base, base, base]
    }
}

/// Marker colour for a feature tier.
pub fn feature_color(tier: FeatureTier) -> [u8; 3] {
    match tier {
        FeatureTier::Regular => [230, 60, 40],
        FeatureTier::Special => [250, 240, 90],
        FeatureTier::Unique => [255, 0, 255],
    }
}

fn opaque([r, g, b]: [u8; 3]) -> [u8; 4] {
    [r, g, b, 255]
}

/// Render elevation bands, one `scale × scale` block per cell.
pub fn render_height_field(field: &HeightField, scale: u32) -> DebugImage {
    let scale = scale.max(1);
    let n = field.resolution() as u32;
    let (min, max) = field.min_max();
    let mut image = DebugImage::new(n * scale, n * scale);

    for z in 0..n {
        for x in 0..n {
            let h = field.get(x as usize, z as usize);
            let color = height_to_color(h, field.sea_level(), min, max);
            image.fill_block(x * scale, z * scale, scale, opaque(color));
        }
    }
    image
}

/// Render the tile's primary biome colour, shaded by elevation.
///
/// Cells below sea level are drawn as water regardless of biome.
pub fn render_biome_map(bundle: &TileBundle, biomes: &BiomeTable, scale: u32) -> DebugImage {
    let scale = scale.max(1);
    let field = &bundle.height_field;
    let n = field.resolution() as u32;
    let (min, max) = field.min_max();
    let base = biomes.get(bundle.biome.primary).color;
    let span = (max - min).max(1e-9);
    let mut image = DebugImage::new(n * scale, n * scale);

    for z in 0..n {
        for x in 0..n {
            let h = field.get(x as usize, z as usize);
            let color = if h < field.sea_level() {
                height_to_color(h, field.sea_level(), min, max)
            } else {
                let shade = 0.6 + 0.4 * ((h - min) / span);
                base.map(|c| (c as f64 * shade).round().min(255.0) as u8)
            };
            image.fill_block(x * scale, z * scale, scale, opaque(color));
        }
    }
    image
}

/// Render elevation with wet cells tinted, rivers as polylines, trees as
/// dots and features as tier-coloured markers.
///
/// `wet_threshold` is the depth below sea level (usually negative) under
/// which a cell counts as water.
pub fn render_tile_overview(bundle: &TileBundle, wet_threshold: f64, scale: u32) -> DebugImage {
    let scale = scale.max(1);
    let field = &bundle.height_field;
    let mut image = render_height_field(field, scale);
    let n = field.resolution() as u32;

    for z in 0..n {
        for x in 0..n {
            if field.get(x as usize, z as usize) - field.sea_level() < wet_threshold {
                for py in z * scale..(z + 1) * scale {
                    for px in x * scale..(x + 1) * scale {
                        image.blend_pixel(px, py, WATER_TINT, 0.6);
                    }
                }
            }
        }
    }

    let to_pixel = |wx: f64, wz: f64| -> (i64, i64) {
        let (gx, gz) = field.grid_position(wx, wz);
        let half = scale as f64 * 0.5;
        (
            (gx * scale as f64 + half).floor() as i64,
            (gz * scale as f64 + half).floor() as i64,
        )
    };

    for river in &bundle.rivers {
        for pair in river.waypoints.windows(2) {
            let a = to_pixel(pair[0].position.x, pair[0].position.z);
            let b = to_pixel(pair[1].position.x, pair[1].position.z);
            image.draw_line(a, b, RIVER_COLOR);
        }
    }

    for tree in bundle
        .vegetation
        .instances
        .iter()
        .filter(|v| matches!(v.kind, VegetationKind::Tree(_)))
    {
        let (px, py) = to_pixel(tree.position.x, tree.position.z);
        image.draw_marker(px, py, 0, TREE_COLOR);
    }

    let radius = (scale as i64).max(2);
    for feature in &bundle.features {
        let (px, py) = to_pixel(feature.position.x, feature.position.z);
        image.draw_marker(px, py, radius, opaque(feature_color(feature.tier)));
    }

    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::Biome;
    use crate::config::WorldGenConfig;
    use crate::coords::TileCoordinate;
    use crate::metabolism::MetabolismSnapshot;
    use crate::pipeline::{TileGenerator, TileRequest};
    use crate::placement::{
        FeatureKind, FeaturePlacement, Provenance, RarityTier, TreeSpecies, VegetationInstance,
    };
    use glam::DVec3;

    fn small_bundle() -> TileBundle {
        let generator = TileGenerator::new(WorldGenConfig {
            base_resolution: 17,
            ..Default::default()
        })
        .unwrap();
        generator
            .generate(&TileRequest::new(
                42,
                TileCoordinate::new(0, 0),
                MetabolismSnapshot::default(),
            ))
            .unwrap()
    }

    #[test]
    fn test_height_colors_are_banded() {
        let deep = height_to_color(-50.0, 0.0, -50.0, 100.0);
        let beach = height_to_color(0.5, 0.0, -50.0, 100.0);
        let peak = height_to_color(100.0, 0.0, -50.0, 100.0);
        assert!(deep[2] > deep[0], "Water should be blue");
        assert_eq!(beach, [220, 200, 130]);
        assert_eq!(peak, [255, 255, 255]);
        let near_peak = height_to_color(99.9, 0.0, -50.0, 100.0);
        assert_eq!(near_peak, [254, 254, 254]);
    }

    #[test]
    fn test_overview_marks_trees_only() {
        let mut bundle = small_bundle();
        bundle.rivers.clear();
        bundle.features.clear();
        bundle.vegetation.instances.clear();
        let provenance = Provenance {
            source_biome: bundle.biome.primary,
            harmony_at_spawn: 1.0,
            rarity: RarityTier::Common,
        };
        let plant = |gx: usize, gz: usize, kind: VegetationKind| {
            let (wx, wz) = bundle.height_field.world_position(gx, gz);
            VegetationInstance {
                position: DVec3::new(wx, 0.0, wz),
                kind,
                rotation: 0.0,
                scale: 1.0,
                age: 1.0,
                health: 1.0,
                bloom: 0.0,
                provenance,
            }
        };
        let tree = plant(4, 4, VegetationKind::Tree(TreeSpecies::Oak));
        let bush = plant(12, 12, VegetationKind::Bush);
        bundle.vegetation.instances.extend([tree, bush]);

        let image = render_tile_overview(&bundle, -1.0, 4);
        assert_eq!(image.get_pixel(4 * 4 + 2, 4 * 4 + 2), Some(TREE_COLOR));
        assert_ne!(image.get_pixel(12 * 4 + 2, 12 * 4 + 2), Some(TREE_COLOR));
    }

    #[test]
    fn test_height_image_dimensions() {
        let field = HeightField::flat(TileCoordinate::new(0, 0), 9, 8.0, 0.0, 5.0);
        let image = render_height_field(&field, 3);
        assert_eq!(image.dimensions(), (27, 27));
        assert_eq!(image.unique_color_count(), 1, "A flat field is one colour");
    }

    #[test]
    fn test_height_image_shows_relief() {
        let mut field = HeightField::flat(TileCoordinate::new(0, 0), 9, 8.0, 0.0, 5.0);
        field.set(4, 4, -20.0);
        field.set(0, 0, 60.0);
        let image = render_height_field(&field, 1);
        assert!(image.unique_color_count() >= 3);
    }

    #[test]
    fn test_biome_map_uses_biome_color() {
        let mut bundle = small_bundle();
        bundle.biome.primary = Biome::Desert;
        let sea = bundle.height_field.sea_level();
        bundle.height_field.heights_mut().fill(sea + 10.0);
        let table = BiomeTable::standard();
        let image = render_biome_map(&bundle, &table, 1);
        let expected = table.get(Biome::Desert).color.map(|c| (c as f64 * 0.6).round() as u8);
        assert_eq!(image.get_pixel(0, 0), Some([expected[0], expected[1], expected[2], 255]));
    }

    #[test]
    fn test_overview_tints_wet_cells() {
        let mut bundle = small_bundle();
        bundle.rivers.clear();
        bundle.features.clear();
        bundle.vegetation.instances.clear();
        let sea = bundle.height_field.sea_level();
        bundle.height_field.set(5, 5, sea - 30.0);
        let plain = render_height_field(&bundle.height_field, 2);
        let overview = render_tile_overview(&bundle, -1.0, 2);
        assert_ne!(plain.get_pixel(10, 10), overview.get_pixel(10, 10));
    }

    #[test]
    fn test_overview_marks_features() {
        let mut bundle = small_bundle();
        let (wx, wz) = bundle.height_field.world_position(8, 8);
        bundle.features.push(FeaturePlacement {
            position: DVec3::new(wx, 0.0, wz),
            kind: FeatureKind::Landmark,
            rotation: 0.0,
            scale: 1.0,
            tier: FeatureTier::Unique,
            name: Some("Test"),
            provenance: Provenance {
                source_biome: bundle.biome.primary,
                harmony_at_spawn: 1.0,
                rarity: RarityTier::Unique,
            },
        });
        let image = render_tile_overview(&bundle, -1.0, 4);
        assert_eq!(image.get_pixel(8 * 4 + 2, 8 * 4 + 2), Some([255, 0, 255, 255]));
    }
}
