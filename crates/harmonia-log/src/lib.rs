//! Structured logging and tracing for the Harmonia generator.
//!
//! Provides structured, span-based, filterable logging via the `tracing` ecosystem.
//! Console output carries uptime timestamps, module paths and worker thread names;
//! debug builds additionally write JSON lines to a file for post-mortem analysis of
//! tile generation runs. The configured `debug.log_level` is the fallback filter
//! when `RUST_LOG` is unset.

use harmonia_config::Config;
use std::path::Path;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config specifies one.
pub const DEFAULT_FILTER: &str = "info,harmonia_worldgen=info";

/// File name of the JSON log written in debug builds.
pub const LOG_FILE_NAME: &str = "harmonia.log";

/// Initialize the tracing subscriber.
///
/// Sets up structured logging with:
/// - Console output with timestamps, module paths, and severity levels
/// - JSON file logging in debug builds (optional)
/// - Environment-based filtering (respects RUST_LOG)
/// - Integration with config system log_level setting
///
/// # Examples
///
/// ```no_run
/// use harmonia_log::init_logging;
/// use harmonia_config::Config;
///
/// let config = Config::default();
/// init_logging(Some(std::path::Path::new("./logs")), true, Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let filter_str = filter_directive(config);

    // RUST_LOG wins over the configured level
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(true) // worker threads are named "tile-gen-worker"
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if debug_build
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(log_dir.join(LOG_FILE_NAME))
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        subscriber.with(file_layer).init();
        return;
    }

    subscriber.init();
}

/// Resolve the filter directive from an optional config.
///
/// A bare level such as `"debug"` is widened to also cover the worldgen crate
/// explicitly, so per-stage pipeline events show up without extra directives.
pub fn filter_directive(config: Option<&Config>) -> String {
    match config {
        Some(config) if !config.debug.log_level.is_empty() => {
            let level = config.debug.log_level.trim();
            if level.contains('=') || level.contains(',') {
                level.to_string()
            } else {
                format!("{level},harmonia_worldgen={level}")
            }
        }
        _ => DEFAULT_FILTER.to_string(),
    }
}

/// Create an `EnvFilter` with the default filter string.
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}
