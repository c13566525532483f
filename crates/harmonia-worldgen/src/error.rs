//! Error types for tile generation.

/// Errors raised by the generation pipeline and its building blocks.
///
/// A failed call never leaves partial output behind: the pipeline aborts and
/// the worker pool does not cache anything for that tile.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorldgenError {
    /// Malformed parameters or non-finite coordinates.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested level of detail leaves too few samples per tile edge.
    #[error("tile resolution {resolution} is below the minimum of 3")]
    ResolutionTooSmall {
        /// Resolution that was requested.
        resolution: usize,
    },

    /// A generation stage produced a non-finite elevation.
    #[error("non-finite height at cell ({x}, {z})")]
    NonFiniteHeight {
        /// Cell column.
        x: usize,
        /// Cell row.
        z: usize,
    },

    /// The tile left the interest radius before it finished.
    #[error("tile generation cancelled")]
    Cancelled,

    /// A worker thread could not be started.
    #[error("failed to spawn tile worker: {0}")]
    WorkerSpawn(String),
}

impl WorldgenError {
    /// Shorthand for [`WorldgenError::InvalidArgument`].
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Fail with [`WorldgenError::InvalidArgument`] unless `value` is finite.
pub(crate) fn ensure_finite(name: &str, value: f64) -> Result<(), WorldgenError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(WorldgenError::invalid(format!("{name} must be finite, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_finite_accepts_finite() {
        assert!(ensure_finite("x", 12.5).is_ok());
        assert!(ensure_finite("x", -0.0).is_ok());
    }

    #[test]
    fn test_ensure_finite_rejects_nan_and_inf() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = ensure_finite("frequency", bad).unwrap_err();
            assert!(
                matches!(err, WorldgenError::InvalidArgument(ref msg) if msg.contains("frequency")),
                "Expected InvalidArgument naming the parameter, got {err:?}"
            );
        }
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            WorldgenError::ResolutionTooSmall { resolution: 2 }.to_string(),
            "tile resolution 2 is below the minimum of 3"
        );
        assert_eq!(
            WorldgenError::NonFiniteHeight { x: 1, z: 4 }.to_string(),
            "non-finite height at cell (1, 4)"
        );
    }
}
