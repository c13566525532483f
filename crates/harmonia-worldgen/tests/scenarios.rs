//! End-to-end scenarios for tile generation and its stages.

use harmonia_worldgen::hydrology::{HydrologyParams, WaterBodyType, detect_water_bodies};
use harmonia_worldgen::placement::{FeatureKind, FeaturePlacer, PlacementParams, WaterMask};
use harmonia_worldgen::seed::{Salt, tile_rng};
use harmonia_worldgen::{
    Biome, BiomeTable, ErosionParams, HeightField, MetabolismSnapshot, TileCoordinate,
    TileGenerator, TileRequest, WorldGenConfig, erode,
};

#[test]
fn scenario_a_default_tile_generates() {
    let config = WorldGenConfig::default();
    let resolution = config.base_resolution;
    let generator = TileGenerator::new(config).unwrap();
    let request = TileRequest::new(
        42,
        TileCoordinate::new(0, 0),
        MetabolismSnapshot::new(1.0, 0.0),
    );

    let bundle = generator.generate(&request).unwrap();

    assert_eq!(bundle.height_field.resolution(), resolution);
    assert_eq!(bundle.height_field.heights().len(), resolution * resolution);
    assert_eq!(bundle.height_field.find_non_finite(), None);
    assert!(Biome::ALL.contains(&bundle.biome.primary));
    assert!(
        bundle.biome.coverage > 0.0 && bundle.biome.coverage <= 1.0,
        "Coverage {} out of range",
        bundle.biome.coverage
    );
}

#[test]
fn scenario_b_celestial_frequency_matches_probability() {
    let params = PlacementParams::default();
    let expected = params.special_probability;
    let placer = FeaturePlacer::new(9, params);
    let field = HeightField::flat(TileCoordinate::new(0, 0), 33, 8.0, 0.0, 10.0);
    let mask = WaterMask::new(&field, &[], -1.0);
    let metabolism = MetabolismSnapshot::new(1.9, 0.0);

    let trials = 2000;
    let mut hits = 0;
    for trial in 0..trials {
        let mut rng = tile_rng(trial, TileCoordinate::new(0, 0), Salt::Features);
        let features = placer.place(&field, Biome::Plains, metabolism, &mask, &mut rng);
        if features.iter().any(|f| f.kind == FeatureKind::CelestialSpire) {
            hits += 1;
        }
    }

    let frequency = hits as f64 / trials as f64;
    assert!(
        (frequency - expected).abs() < 0.05,
        "Celestial frequency {frequency} should be near {expected}"
    );
}

#[test]
fn scenario_c_basin_is_one_water_body() {
    let mut field = HeightField::flat(TileCoordinate::new(0, 0), 24, 4.0, 0.0, 10.0);
    for z in 10..15 {
        for x in 6..11 {
            field.set(x, z, -2.5);
        }
    }
    let table = BiomeTable::standard();

    let bodies = detect_water_bodies(
        &field,
        Biome::Forest,
        table.get(Biome::Forest),
        &HydrologyParams::default(),
    );

    assert_eq!(bodies.len(), 1, "Expected exactly one water body");
    assert_eq!(bodies[0].cell_count, 25);
    assert_eq!(bodies[0].body_type, WaterBodyType::Spring);
}

#[test]
fn scenario_d_zero_droplets_is_identity() {
    let generator = TileGenerator::new(WorldGenConfig {
        base_resolution: 33,
        ..Default::default()
    })
    .unwrap();
    let bundle = generator
        .generate(&TileRequest::new(
            5,
            TileCoordinate::new(3, -2),
            MetabolismSnapshot::default(),
        ))
        .unwrap();
    let mut field = bundle.height_field.clone();

    let params = ErosionParams {
        droplets: Some(0),
        ..Default::default()
    };
    let stats = erode(
        &mut field,
        &params,
        &mut tile_rng(5, TileCoordinate::new(3, -2), Salt::Erosion),
    );

    assert_eq!(stats.droplets, 0);
    assert_eq!(field, bundle.height_field);
}
