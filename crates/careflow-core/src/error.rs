//! Core error types for the attention engine.

use thiserror::Error;

/// Errors raised by the attention core.
///
/// # Design Principles
///
/// - **NO FALLBACKS**: Errors must propagate, not be silently handled
/// - **FAIL FAST**: Invalid configuration or shapes trigger immediate errors,
///   before any accumulation work starts
/// - **CONTEXTUAL**: Every variant carries the values needed to debug it
#[derive(Debug, Error)]
pub enum AttentionError {
    /// Configuration file invalid, unparseable, or carrying bad values.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// A named initializer required at construction time is absent.
    #[error("Missing required initializer: {name}")]
    MissingInitializer { name: String },

    /// Tensor shapes disagree with each other or with the declared depths.
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: &'static str,
        expected: String,
        actual: String,
    },

    /// A day-gap lookup fell outside the decay table.
    ///
    /// The table must be sized to cover the maximum elapsed time in the
    /// dataset; hitting this error means the caller violated that contract.
    #[error("Day gap {gap} is not covered by the decay table (length {table_len})")]
    GapOutOfRange { gap: usize, table_len: usize },

    /// Timestamps decreased along a sequence, producing a negative day-gap.
    #[error("Timestamp at step {later} precedes step {earlier} for batch element {batch}")]
    NonMonotonicTimestamps {
        earlier: usize,
        later: usize,
        batch: usize,
    },

    /// A tensor backend operation failed.
    #[error("Tensor error: {message}")]
    TensorError { message: String },

    /// File I/O failed (decay table, mutual-intensity matrix, config).
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for attention-core operations.
pub type AttentionResult<T> = Result<T, AttentionError>;

/// Map candle errors to [`AttentionError::TensorError`].
pub(crate) fn map_candle(e: candle_core::Error) -> AttentionError {
    AttentionError::TensorError {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_initializer_names_the_key() {
        let err = AttentionError::MissingInitializer {
            name: "mutual_intensity".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Missing required initializer: mutual_intensity"
        );
    }

    #[test]
    fn gap_out_of_range_reports_both_sides() {
        let err = AttentionError::GapOutOfRange {
            gap: 1001,
            table_len: 1000,
        };
        let msg = err.to_string();
        assert!(msg.contains("1001"), "message should name the gap: {msg}");
        assert!(msg.contains("1000"), "message should name the length: {msg}");
    }

    #[test]
    fn shape_mismatch_is_descriptive() {
        let err = AttentionError::ShapeMismatch {
            context: "features",
            expected: "[5, 2, 4]".to_string(),
            actual: "[5, 2, 3]".to_string(),
        };
        assert!(err.to_string().contains("features"));
    }
}
