//! Next-step contrastive loss.
//!
//! The model carries no prediction head: instead the mixed representation at
//! step `t` is trained to identify the encoder state at `t + 1` among the
//! other sequences in the batch (InfoNCE with in-batch negatives).
//!
//! L = -mean_t mean_i log( exp(sim(m_t_i, h_{t+1}_i)/τ)
//!                         / Σ_j exp(sim(m_t_i, h_{t+1}_j)/τ) )

use candle_core::{Tensor, D};

use crate::error::{map_candle, ModelError, ModelResult};

/// Configuration for the next-step contrastive loss.
#[derive(Debug, Clone)]
pub struct LossConfig {
    /// Softmax temperature.
    pub temperature: f64,
}

impl Default for LossConfig {
    fn default() -> Self {
        Self { temperature: 0.1 }
    }
}

/// InfoNCE between mixed step representations and the following encoder
/// states.
pub struct NextStepContrastiveLoss {
    config: LossConfig,
}

impl NextStepContrastiveLoss {
    /// Create a loss with the given configuration.
    pub fn new(config: LossConfig) -> Self {
        Self { config }
    }

    /// Create with default configuration.
    pub fn default_config() -> Self {
        Self::new(LossConfig::default())
    }

    /// Compute the loss over a full unroll.
    ///
    /// # Arguments
    /// * `mixed` - mixed step representations `[T, B, H]`
    /// * `hidden` - encoder states `[T, B, H]`
    ///
    /// # Returns
    /// The scalar loss tensor (differentiable) and its extracted value.
    pub fn compute(&self, mixed: &Tensor, hidden: &Tensor) -> ModelResult<(Tensor, f64)> {
        let (steps, batch, _) = mixed.dims3().map_err(map_candle)?;
        if mixed.dims() != hidden.dims() {
            return Err(ModelError::ShapeMismatch {
                context: "loss inputs",
                expected: format!("{:?}", mixed.dims()),
                actual: format!("{:?}", hidden.dims()),
            });
        }
        if steps < 2 {
            return Err(ModelError::DataError {
                message: format!(
                    "next-step loss needs at least two steps, got {steps}"
                ),
            });
        }

        let tau = self.config.temperature;
        let mut eye_data = vec![0.0f64; batch * batch];
        for i in 0..batch {
            eye_data[i * batch + i] = 1.0;
        }
        let eye =
            Tensor::from_slice(&eye_data, (batch, batch), mixed.device()).map_err(map_candle)?;
        let mut total: Option<Tensor> = None;

        for t in 0..steps - 1 {
            let query = l2_normalize(&mixed.get(t).map_err(map_candle)?)?;
            let keys = l2_normalize(&hidden.get(t + 1).map_err(map_candle)?)?;
            let logits = query
                .matmul(&keys.t().map_err(map_candle)?)
                .map_err(map_candle)?
                .affine(1.0 / tau, 0.0)
                .map_err(map_candle)?;
            let log_probs = candle_nn::ops::log_softmax(&logits, D::Minus1).map_err(map_candle)?;
            // Positive pairs sit on the diagonal.
            let step_loss = log_probs
                .mul(&eye)
                .map_err(map_candle)?
                .sum_all()
                .map_err(map_candle)?
                .affine(-1.0 / batch as f64, 0.0)
                .map_err(map_candle)?;
            total = Some(match total {
                Some(acc) => acc.add(&step_loss).map_err(map_candle)?,
                None => step_loss,
            });
        }

        let loss = total
            .expect("steps >= 2 guarantees at least one term")
            .affine(1.0 / (steps - 1) as f64, 0.0)
            .map_err(map_candle)?;
        let value = loss.to_scalar::<f64>().map_err(map_candle)?;
        Ok((loss, value))
    }

    /// The loss configuration.
    pub fn config(&self) -> &LossConfig {
        &self.config
    }
}

/// Row-wise L2 normalization of a `[B, H]` tensor.
fn l2_normalize(x: &Tensor) -> ModelResult<Tensor> {
    let norm = x
        .sqr()
        .map_err(map_candle)?
        .sum_keepdim(1)
        .map_err(map_candle)?
        .affine(1.0, 1e-12)
        .map_err(map_candle)?
        .sqrt()
        .map_err(map_candle)?;
    x.broadcast_div(&norm).map_err(map_candle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn representations(steps: usize, batch: usize, dim: usize, phase: f64) -> Tensor {
        let data: Vec<f64> = (0..steps * batch * dim)
            .map(|i| (i as f64 * 0.37 + phase).sin())
            .collect();
        Tensor::from_slice(&data, (steps, batch, dim), &Device::Cpu).unwrap()
    }

    #[test]
    fn loss_is_positive_for_generic_inputs() {
        let loss_fn = NextStepContrastiveLoss::default_config();
        let mixed = representations(4, 3, 8, 0.0);
        let hidden = representations(4, 3, 8, 1.0);
        let (_, value) = loss_fn.compute(&mixed, &hidden).unwrap();
        assert!(value > 0.0, "cross-entropy must be positive, got {value}");
    }

    #[test]
    fn perfect_alignment_scores_lower_than_mismatch() {
        let loss_fn = NextStepContrastiveLoss::default_config();
        let hidden = representations(3, 4, 8, 0.5);
        // Mixed states that exactly equal the next hidden state per sequence.
        let aligned = {
            let next = hidden.narrow(0, 1, 2).unwrap();
            let pad = hidden.narrow(0, 2, 1).unwrap();
            Tensor::cat(&[&next, &pad], 0).unwrap()
        };
        let (_, aligned_value) = loss_fn.compute(&aligned, &hidden).unwrap();
        let mismatched = representations(3, 4, 8, 2.0);
        let (_, mismatched_value) = loss_fn.compute(&mismatched, &hidden).unwrap();
        assert!(
            aligned_value < mismatched_value,
            "aligned {aligned_value} should beat mismatched {mismatched_value}"
        );
    }

    #[test]
    fn single_step_unroll_is_rejected() {
        let loss_fn = NextStepContrastiveLoss::default_config();
        let mixed = representations(1, 2, 4, 0.0);
        let hidden = representations(1, 2, 4, 0.0);
        assert!(loss_fn.compute(&mixed, &hidden).is_err());
    }

    #[test]
    fn shape_disagreement_is_rejected() {
        let loss_fn = NextStepContrastiveLoss::default_config();
        let mixed = representations(3, 2, 4, 0.0);
        let hidden = representations(3, 2, 6, 0.0);
        assert!(matches!(
            loss_fn.compute(&mixed, &hidden).unwrap_err(),
            ModelError::ShapeMismatch { .. }
        ));
    }

    #[test]
    fn l2_normalize_produces_unit_rows() {
        let x = Tensor::from_slice(&[3.0f64, 4.0, 0.0, 5.0], (2, 2), &Device::Cpu).unwrap();
        let normalized = l2_normalize(&x).unwrap();
        let values: Vec<Vec<f64>> = normalized.to_vec2().unwrap();
        for row in values {
            let norm: f64 = row.iter().map(|v| v * v).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
        }
    }
}
