//! Command-line argument parsing for the Harmonia generator.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Harmonia command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "harmonia", about = "Procedural world tile generator")]
pub struct CliArgs {
    /// World seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Samples per tile edge at the finest level of detail.
    #[arg(long)]
    pub resolution: Option<u32>,

    /// Prefetch radius around the viewer, in tiles.
    #[arg(long)]
    pub radius: Option<u32>,

    /// Worker threads (0 = auto).
    #[arg(long)]
    pub threads: Option<u32>,

    /// Number of metabolism ticks to simulate after generation.
    #[arg(long, default_value_t = 0)]
    pub ticks: u32,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Directory for PNG previews of the origin tile.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(seed) = args.seed {
            self.world.seed = seed;
        }
        if let Some(resolution) = args.resolution {
            self.world.resolution = resolution;
        }
        if let Some(radius) = args.radius {
            self.streaming.prefetch_radius = radius;
        }
        if let Some(threads) = args.threads {
            self.streaming.worker_threads = threads;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
        if let Some(ref dir) = args.export {
            self.debug.export_dir = dir.display().to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_args() -> CliArgs {
        CliArgs {
            seed: None,
            resolution: None,
            radius: None,
            threads: None,
            ticks: 0,
            log_level: None,
            export: None,
            config: None,
        }
    }

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            seed: Some(99),
            radius: Some(4),
            ..empty_args()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.world.seed, 99);
        assert_eq!(config.streaming.prefetch_radius, 4);
        // Non-overridden fields retain defaults
        assert_eq!(config.world.resolution, 129);
        assert_eq!(config.debug.log_level, "info");
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&empty_args());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::try_parse_from([
            "harmonia",
            "--seed",
            "7",
            "--resolution",
            "65",
            "--ticks",
            "12",
            "--export",
            "out",
        ])
        .unwrap();
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.resolution, Some(65));
        assert_eq!(args.ticks, 12);
        assert_eq!(args.export, Some(PathBuf::from("out")));
    }
}
