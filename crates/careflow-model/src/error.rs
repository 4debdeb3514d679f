//! Error types for the sequence model and training pipeline.

use careflow_core::AttentionError;
use thiserror::Error;

/// Errors raised by the model, data, and training layers.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Attention core failure (configuration, shapes, decay lookups).
    #[error("Attention error: {0}")]
    Attention(#[from] AttentionError),

    /// Model or trainer configuration invalid.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Event-sequence data violates the declared shape parameters.
    #[error("Data error: {message}")]
    DataError { message: String },

    /// Tensor shapes disagree at a module boundary.
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: &'static str,
        expected: String,
        actual: String,
    },

    /// A tensor backend operation failed.
    #[error("Tensor error: {message}")]
    TensorError { message: String },

    /// File I/O failed (sequence files, checkpoints).
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Map candle errors to [`ModelError::TensorError`].
pub(crate) fn map_candle(e: candle_core::Error) -> ModelError {
    ModelError::TensorError {
        message: e.to_string(),
    }
}
