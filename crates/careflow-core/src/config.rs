//! Engine configuration with named, typed fields and constructor-time validation.
//!
//! The attention engine is configured through [`AttentionConfig`]: the event
//! feature width, the timestamp width, the decay table contents, and a map of
//! named weight initializers. Required initializer names are checked when the
//! engine is built, so a misconfigured run fails before any computation.
//!
//! # TOML Structure
//!
//! ```toml
//! x_depth = 100
//! t_depth = 1
//! decay = [1.0, 0.8, 0.64, 0.512]
//!
//! [initializers]
//! mutual_intensity = { type = "Xavier" }
//! combine = { type = "Xavier" }
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AttentionError, AttentionResult};

/// Initializer name for the trainable mutual parameter.
pub const MUTUAL_INTENSITY_INIT: &str = "mutual_intensity";

/// Initializer name for the combine projection consumed by the enclosing model.
pub const COMBINE_INIT: &str = "combine";

/// A named weight initialization scheme.
///
/// `Xavier` uses a deterministic low-discrepancy fill so that construction is
/// reproducible without threading an RNG through every layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Initializer {
    /// Xavier/Glorot scaling: uniform in `±sqrt(2 / (rows + cols))`.
    Xavier,
    /// All zeros (bias default).
    Zeros,
    /// Every element set to a fixed value.
    Constant { value: f64 },
}

impl Initializer {
    /// Produce `rows * cols` values for a weight matrix of the given shape.
    pub fn materialize(&self, rows: usize, cols: usize) -> Vec<f64> {
        match self {
            Initializer::Xavier => {
                let std = (2.0 / (rows + cols) as f64).sqrt();
                (0..rows * cols)
                    .map(|i| ((i as f64 * 0.618_033_988_749_895 + 0.5) % 1.0 * 2.0 - 1.0) * std)
                    .collect()
            }
            Initializer::Zeros => vec![0.0; rows * cols],
            Initializer::Constant { value } => vec![*value; rows * cols],
        }
    }
}

/// Named map of weight initializers.
///
/// Replaces the loosely-checked attribute bag of ad-hoc model configuration:
/// lookups of required names are explicit and return
/// [`AttentionError::MissingInitializer`] when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitializerMap {
    #[serde(flatten)]
    entries: HashMap<String, Initializer>,
}

impl InitializerMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    pub fn with(mut self, name: impl Into<String>, init: Initializer) -> Self {
        self.entries.insert(name.into(), init);
        self
    }

    /// Insert or replace an initializer.
    pub fn insert(&mut self, name: impl Into<String>, init: Initializer) {
        self.entries.insert(name.into(), init);
    }

    /// Look up an initializer by name.
    pub fn get(&self, name: &str) -> Option<&Initializer> {
        self.entries.get(name)
    }

    /// Whether a name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Look up a required initializer, failing with a descriptive error.
    pub fn require(&self, name: &str) -> AttentionResult<Initializer> {
        self.entries
            .get(name)
            .copied()
            .ok_or_else(|| AttentionError::MissingInitializer {
                name: name.to_string(),
            })
    }
}

/// Configuration for the Hawkes attention engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttentionConfig {
    /// Event feature width (event-type vocabulary size).
    pub x_depth: usize,

    /// Timestamp vector width. Day-gaps are formed from component 0.
    pub t_depth: usize,

    /// Decay table contents: index = integer day-gap, value = decay weight.
    /// Must cover the maximum elapsed time observable in the dataset.
    pub decay: Vec<f64>,

    /// Named weight initializers. `mutual_intensity` and `combine` are
    /// required for engine construction.
    #[serde(default)]
    pub initializers: InitializerMap,
}

impl AttentionConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// - [`AttentionError::ConfigError`] if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> AttentionResult<Self> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| AttentionError::ConfigError {
                message: format!("Failed to read config file '{}': {}", path.display(), e),
            })?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(contents: &str) -> AttentionResult<Self> {
        let config: Self = toml::from_str(contents).map_err(|e| AttentionError::ConfigError {
            message: format!("Failed to parse TOML config: {e}"),
        })?;
        Ok(config)
    }

    /// Validate all configuration values.
    ///
    /// Checks depths, decay-table contents, and the presence of the required
    /// initializer names. Returns the first error found.
    pub fn validate(&self) -> AttentionResult<()> {
        if self.x_depth == 0 {
            return Err(AttentionError::ConfigError {
                message: "x_depth must be positive".to_string(),
            });
        }
        if self.t_depth == 0 {
            return Err(AttentionError::ConfigError {
                message: "t_depth must be positive".to_string(),
            });
        }
        if self.decay.is_empty() {
            return Err(AttentionError::ConfigError {
                message: "decay table must not be empty".to_string(),
            });
        }
        for (gap, weight) in self.decay.iter().enumerate() {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(AttentionError::ConfigError {
                    message: format!("decay[{gap}] = {weight} must be finite and non-negative"),
                });
            }
        }
        self.initializers.require(MUTUAL_INTENSITY_INIT)?;
        self.initializers.require(COMBINE_INIT)?;
        Ok(())
    }
}
