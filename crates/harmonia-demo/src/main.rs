//! Command-line driver for the Harmonia tile generator.
//!
//! Loads `config.ron` (CLI flags override it), prefetches the tiles around the
//! origin on the worker pool, simulates world metabolism for `--ticks` ticks
//! and optionally exports PNG previews of the origin tile.
//!
//! Run with `cargo run -p harmonia-demo -- --seed 7 --radius 1 --ticks 30 --export out`.

mod export;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, PoisonError};
use std::time::{Duration, Instant};

use clap::Parser;
use glam::DVec2;
use harmonia_config::{CliArgs, Config};
use harmonia_worldgen::{
    AsyncTileGenerator, GeneratedTile, MetabolismEvent, TileCache, TileCoordinate, TileGenerator,
    TileRequest, WorldGenConfig, WorldMetabolism, WorldgenError, tick_interval,
};
use tracing::{error, info, warn};

/// How long to wait for the prefetch ring before giving up.
const PREFETCH_TIMEOUT: Duration = Duration::from_secs(300);

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().unwrap_or_else(|| {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("harmonia")
    });

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    harmonia_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    match run(&config, args.ticks) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config, ticks: u32) -> Result<(), WorldgenError> {
    let world = WorldGenConfig::from_config(config);
    let generator = Arc::new(TileGenerator::new(world.clone())?);
    let cache = TileCache::new(
        config.streaming.cache_capacity as usize,
        Duration::from_secs(config.streaming.cache_max_age_secs),
    )
    .shared();
    let mut metabolism = WorldMetabolism::new(world.metabolism.clone())?;
    let pool =
        AsyncTileGenerator::from_config(Arc::clone(&generator), Arc::clone(&cache), &config.streaming)?;

    let seed = config.world.seed;
    let origin = TileCoordinate::new(0, 0);
    let radius = config.streaming.prefetch_radius;
    info!(seed, radius, resolution = world.base_resolution, "Generating tiles around origin");
    prefetch(&pool, origin, radius, seed, &metabolism);

    simulate(&mut metabolism, &world, config, ticks)?;

    // Tiles generated under the new world state replace the cached ones
    let snapshot = metabolism.snapshot_at(origin);
    let request = TileRequest::new(seed, origin, snapshot);
    let regenerated = generator.generate(&request)?;
    info!(
        harmony = snapshot.harmony,
        dissonance = snapshot.dissonance,
        biome = %regenerated.biome.primary,
        features = regenerated.features.len(),
        vegetation = regenerated.vegetation.instances.len(),
        "Regenerated origin tile under current metabolism"
    );
    let bundle = {
        let mut cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.insert(regenerated);
        cache.get(origin)
    };

    if !config.debug.export_dir.is_empty()
        && let Some(bundle) = bundle
    {
        let dir = Path::new(&config.debug.export_dir);
        if let Err(e) = export::export_tile(
            &bundle,
            generator.biome_table(),
            world.hydrology.water_depth_threshold,
            dir,
        ) {
            warn!(dir = %dir.display(), "Failed to export previews: {e}");
        }
    }

    let evicted = cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .evict_expired(Instant::now());
    let pruned = metabolism.retain_grids(|coord| coord.ring_distance(origin) <= radius);
    info!(evicted, pruned, "Done");
    Ok(())
}

/// Queue every tile within `radius` of `center` and log each result as it
/// arrives. Resubmits when the bounded queue was full.
fn prefetch(
    pool: &AsyncTileGenerator,
    center: TileCoordinate,
    radius: u32,
    seed: u64,
    metabolism: &WorldMetabolism,
) {
    let expected = center.tiles_within(radius).len();
    let deadline = Instant::now() + PREFETCH_TIMEOUT;
    let mut finished = 0;
    let mut failed = 0;

    while finished + failed < expected && Instant::now() < deadline {
        if pool.in_flight_count() == 0 {
            pool.prefetch_around(center, radius, seed, metabolism.snapshot());
        }
        if let Some(tile) = pool.recv_timeout(Duration::from_millis(100)) {
            if log_tile(&tile) {
                finished += 1;
            } else {
                failed += 1;
            }
        }
    }

    let stragglers = pool.retain_within(center, radius);
    info!(finished, failed, stragglers, "Prefetch complete");
}

fn log_tile(tile: &GeneratedTile) -> bool {
    match &tile.result {
        Ok(bundle) => {
            info!(
                coord = %tile.coord,
                biome = %bundle.biome.primary,
                coverage = bundle.biome.coverage,
                water_bodies = bundle.water_bodies.len(),
                rivers = bundle.rivers.len(),
                caves = bundle.caves.len(),
                vegetation = bundle.vegetation.instances.len(),
                features = bundle.features.len(),
                time_ms = tile.generation_time_us / 1000,
                "Tile ready"
            );
            true
        }
        Err(e) => {
            warn!(coord = %tile.coord, "Tile failed: {e}");
            false
        }
    }
}

/// Apply a harmony burst at the origin, then advance the world clock.
fn simulate(
    metabolism: &mut WorldMetabolism,
    world: &WorldGenConfig,
    config: &Config,
    ticks: u32,
) -> Result<(), WorldgenError> {
    if ticks == 0 {
        return Ok(());
    }
    let (cx, cz) = TileCoordinate::new(0, 0).world_center(world.tile_size);
    metabolism.apply_event(&MetabolismEvent {
        position: DVec2::new(cx, cz),
        radius: world.tile_size * 2.0,
        harmony_delta: 1.5,
        dissonance_delta: 0.0,
    })?;

    let dt = tick_interval(config).as_secs_f64();
    for tick in 0..ticks {
        for trigger in metabolism.tick(dt)? {
            info!(tick, ?trigger, "Metabolism trigger");
        }
    }
    info!(
        ticks,
        harmony = metabolism.harmony(),
        dissonance = metabolism.dissonance(),
        energy_flow = metabolism.energy_flow(),
        stability = metabolism.stability_index(),
        grids = metabolism.grid_count(),
        "Metabolism simulated"
    );
    Ok(())
}
