//! Stochastic gradient descent with polynomial learning-rate decay.

use candle_core::backprop::GradStore;
use candle_core::Var;

use crate::error::{map_candle, ModelError, ModelResult};

/// Configuration for SGD with polynomial decay.
///
/// The learning rate decays from `learning_rate` to `end_learning_rate` over
/// `decay_steps` optimizer steps and stays at the end value afterwards.
#[derive(Debug, Clone)]
pub struct SgdConfig {
    /// Starting learning rate.
    pub learning_rate: f64,
    /// Final learning rate after the decay window.
    pub end_learning_rate: f64,
    /// Steps over which to decay.
    pub decay_steps: usize,
    /// Polynomial power (1.0 = linear decay).
    pub power: f64,
}

impl Default for SgdConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            end_learning_rate: 0.001,
            decay_steps: 10_000,
            power: 1.0,
        }
    }
}

/// Plain SGD over explicit `Var` lists.
#[derive(Debug)]
pub struct Sgd {
    config: SgdConfig,
    step: usize,
}

impl Sgd {
    /// Create an optimizer, validating the schedule parameters.
    pub fn new(config: SgdConfig) -> ModelResult<Self> {
        if config.learning_rate <= 0.0 || config.end_learning_rate <= 0.0 {
            return Err(ModelError::ConfigError {
                message: "learning rates must be positive".to_string(),
            });
        }
        if config.end_learning_rate > config.learning_rate {
            return Err(ModelError::ConfigError {
                message: format!(
                    "end_learning_rate {} exceeds learning_rate {}",
                    config.end_learning_rate, config.learning_rate
                ),
            });
        }
        if config.decay_steps == 0 {
            return Err(ModelError::ConfigError {
                message: "decay_steps must be positive".to_string(),
            });
        }
        Ok(Self { config, step: 0 })
    }

    /// Learning rate for the current step.
    pub fn current_learning_rate(&self) -> f64 {
        let progress = self.step.min(self.config.decay_steps) as f64
            / self.config.decay_steps as f64;
        let range = self.config.learning_rate - self.config.end_learning_rate;
        range * (1.0 - progress).powf(self.config.power) + self.config.end_learning_rate
    }

    /// Steps taken so far.
    pub fn steps(&self) -> usize {
        self.step
    }

    /// Apply one descent step to every variable with a gradient.
    pub fn step(&mut self, vars: &[&Var], grads: &GradStore) -> ModelResult<()> {
        let lr = self.current_learning_rate();
        for var in vars {
            if let Some(grad) = grads.get(var.as_tensor()) {
                let updated = var
                    .as_tensor()
                    .sub(&grad.affine(lr, 0.0).map_err(map_candle)?)
                    .map_err(map_candle)?;
                var.set(&updated).map_err(map_candle)?;
            }
        }
        self.step += 1;
        Ok(())
    }
}
