//! Configuration system for the Harmonia world generator.
//!
//! Provides generation settings that persist to disk as RON files.
//! Supports CLI overrides via clap, hot-reload detection, and forward/backward
//! compatible serialization.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    Config, DebugConfig, HydrologyConfig, MetabolismConfig, PlacementConfig, StreamingConfig,
    TerrainConfig, WorldConfig,
};
pub use error::ConfigError;
