//! Model configuration: attention core settings plus encoder dimensions.
//!
//! # TOML Structure
//!
//! ```toml
//! num_hidden = 64
//!
//! [attention]
//! x_depth = 100
//! t_depth = 1
//! decay = [1.0, 0.8, 0.64]
//!
//! [attention.initializers]
//! mutual_intensity = { type = "Xavier" }
//! combine = { type = "Xavier" }
//! gate_weight = { type = "Xavier" }
//! gate_bias = { type = "Zeros" }
//! candidate_weight = { type = "Xavier" }
//! candidate_bias = { type = "Zeros" }
//! ```

use std::path::Path;

use careflow_core::AttentionConfig;
use serde::{Deserialize, Serialize};

use crate::encoder::{CANDIDATE_BIAS_INIT, CANDIDATE_WEIGHT_INIT, GATE_BIAS_INIT, GATE_WEIGHT_INIT};
use crate::error::{ModelError, ModelResult};

/// Configuration for the full sequence model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Attention-core configuration, including the shared initializer map.
    pub attention: AttentionConfig,

    /// Hidden-state width of the recurrent encoder.
    pub num_hidden: usize,
}

impl ModelConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> ModelResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ModelError::ConfigError {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(contents: &str) -> ModelResult<Self> {
        let config: Self = toml::from_str(contents).map_err(|e| ModelError::ConfigError {
            message: format!("Failed to parse TOML config: {e}"),
        })?;
        Ok(config)
    }

    /// Validate the attention core settings, the encoder dimensions, and the
    /// presence of every initializer the encoder needs.
    pub fn validate(&self) -> ModelResult<()> {
        self.attention.validate()?;
        if self.num_hidden == 0 {
            return Err(ModelError::ConfigError {
                message: "num_hidden must be positive".to_string(),
            });
        }
        for name in [
            GATE_WEIGHT_INIT,
            GATE_BIAS_INIT,
            CANDIDATE_WEIGHT_INIT,
            CANDIDATE_BIAS_INIT,
        ] {
            self.attention.initializers.require(name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careflow_core::{
        AttentionError, Initializer, InitializerMap, COMBINE_INIT, MUTUAL_INTENSITY_INIT,
    };

    fn full_initializers() -> InitializerMap {
        InitializerMap::new()
            .with(MUTUAL_INTENSITY_INIT, Initializer::Xavier)
            .with(COMBINE_INIT, Initializer::Xavier)
            .with(GATE_WEIGHT_INIT, Initializer::Xavier)
            .with(GATE_BIAS_INIT, Initializer::Zeros)
            .with(CANDIDATE_WEIGHT_INIT, Initializer::Xavier)
            .with(CANDIDATE_BIAS_INIT, Initializer::Zeros)
    }

    fn valid_config() -> ModelConfig {
        ModelConfig {
            attention: AttentionConfig {
                x_depth: 4,
                t_depth: 1,
                decay: vec![1.0, 0.5, 0.25],
                initializers: full_initializers(),
            },
            num_hidden: 8,
        }
    }

    #[test]
    fn valid_config_passes() {
        valid_config().validate().unwrap();
    }

    #[test]
    fn missing_gru_initializer_is_rejected() {
        let mut config = valid_config();
        config.attention.initializers = InitializerMap::new()
            .with(MUTUAL_INTENSITY_INIT, Initializer::Xavier)
            .with(COMBINE_INIT, Initializer::Xavier);
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ModelError::Attention(AttentionError::MissingInitializer { .. })
        ));
    }

    #[test]
    fn zero_hidden_width_is_rejected() {
        let mut config = valid_config();
        config.num_hidden = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_roundtrip() {
        let toml = r#"
            num_hidden = 16

            [attention]
            x_depth = 4
            t_depth = 1
            decay = [1.0, 0.5]

            [attention.initializers]
            mutual_intensity = { type = "Xavier" }
            combine = { type = "Xavier" }
            gate_weight = { type = "Xavier" }
            gate_bias = { type = "Zeros" }
            candidate_weight = { type = "Xavier" }
            candidate_bias = { type = "Zeros" }
        "#;
        let config = ModelConfig::from_toml_str(toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.num_hidden, 16);
        assert_eq!(config.attention.x_depth, 4);
    }
}
