//! Configuration error types.

use std::path::PathBuf;

/// Errors raised while loading, saving or parsing `config.ron`.
///
/// File errors carry the path involved so a bad override location shows up
/// directly in the log.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but is not valid RON for [`Config`](crate::Config).
    #[error("invalid generator settings in {}: {source}", path.display())]
    ParseError {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("cannot serialize generator settings: {0}")]
    SerializeError(#[source] ron::Error),
}
