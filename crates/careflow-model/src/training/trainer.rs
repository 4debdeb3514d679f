//! Training loop for the sequence model.

use std::path::PathBuf;

use careflow_core::MutualIntensity;
use serde::{Deserialize, Serialize};

use crate::data::SequenceBatches;
use crate::encoder::SequenceModel;
use crate::error::{map_candle, ModelError, ModelResult};
use crate::training::evaluation::{Evaluator, NextEventMetrics};
use crate::training::loss::{LossConfig, NextStepContrastiveLoss};
use crate::training::optimizer::{Sgd, SgdConfig};

/// Configuration for the training loop.
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    /// Number of passes over the training set.
    pub epochs: usize,
    /// Evaluate every N epochs (0 disables periodic evaluation).
    pub eval_every: usize,
    /// Directory for safetensors checkpoints (None disables checkpointing).
    pub checkpoint_dir: Option<PathBuf>,
    /// Loss configuration.
    pub loss: LossConfig,
    /// Optimizer configuration.
    pub sgd: SgdConfig,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            eval_every: 1,
            checkpoint_dir: None,
            loss: LossConfig::default(),
            sgd: SgdConfig::default(),
        }
    }
}

/// Per-epoch training record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochSummary {
    /// Epoch index.
    pub epoch: usize,
    /// Mean training loss across the epoch's batches.
    pub mean_loss: f64,
    /// Ranking metrics when the epoch was evaluated.
    pub eval: Option<NextEventMetrics>,
}

/// Outcome of a training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Optimizer steps taken.
    pub steps: usize,
    /// Mean loss of the final epoch.
    pub final_loss: f64,
    /// Per-epoch history.
    pub history: Vec<EpochSummary>,
}

/// Epoch/batch training driver around a [`SequenceModel`].
pub struct Trainer {
    model: SequenceModel,
    loss: NextStepContrastiveLoss,
    optimizer: Sgd,
    config: TrainerConfig,
}

impl Trainer {
    /// Build a trainer around an existing model.
    pub fn new(model: SequenceModel, config: TrainerConfig) -> ModelResult<Self> {
        if config.epochs == 0 {
            return Err(ModelError::ConfigError {
                message: "epochs must be positive".to_string(),
            });
        }
        let optimizer = Sgd::new(config.sgd.clone())?;
        let loss = NextStepContrastiveLoss::new(config.loss.clone());
        Ok(Self {
            model,
            loss,
            optimizer,
            config,
        })
    }

    /// The wrapped model.
    pub fn model(&self) -> &SequenceModel {
        &self.model
    }

    /// Consume the trainer, returning the trained model.
    pub fn into_model(self) -> SequenceModel {
        self.model
    }

    /// Run the full training loop.
    ///
    /// Evaluation runs on a fresh batch every `eval_every` epochs;
    /// checkpoints are written at the half-way and final epochs when a
    /// checkpoint directory is configured.
    pub fn train(
        &mut self,
        batches: &mut SequenceBatches,
        mutual: &MutualIntensity,
    ) -> ModelResult<TrainingReport> {
        let per_epoch = batches.batches_per_epoch();
        let mut history = Vec::with_capacity(self.config.epochs);

        for epoch in 0..self.config.epochs {
            let mut epoch_loss = 0.0;
            for batch_idx in 0..per_epoch {
                let batch = batches.next_batch()?;
                let output = self
                    .model
                    .forward(&batch.features, &batch.timestamps, mutual)?;
                let (loss, value) = self.loss.compute(&output.mixed, &output.hidden)?;
                let grads = loss.backward().map_err(map_candle)?;
                self.optimizer.step(&self.model.trainable_vars(), &grads)?;
                epoch_loss += value;
                tracing::debug!(
                    epoch,
                    batch = batch_idx,
                    loss = value,
                    lr = self.optimizer.current_learning_rate(),
                    "training step"
                );
            }
            let mean_loss = epoch_loss / per_epoch as f64;

            let eval = if self.config.eval_every > 0 && epoch % self.config.eval_every == 0 {
                let batch = batches.next_batch()?;
                let output = self
                    .model
                    .forward(&batch.features, &batch.timestamps, mutual)?;
                let metrics = Evaluator::evaluate(&output.mixed, &output.hidden)?;
                tracing::info!(epoch, mean_loss, summary = %metrics.summary(), "epoch evaluated");
                Some(metrics)
            } else {
                tracing::info!(epoch, mean_loss, "epoch finished");
                None
            };

            history.push(EpochSummary {
                epoch,
                mean_loss,
                eval,
            });

            if epoch == self.config.epochs / 2 || epoch + 1 == self.config.epochs {
                self.checkpoint(epoch)?;
            }
        }

        Ok(TrainingReport {
            steps: self.optimizer.steps(),
            final_loss: history
                .last()
                .map(|summary| summary.mean_loss)
                .unwrap_or(f64::NAN),
            history,
        })
    }

    fn checkpoint(&self, epoch: usize) -> ModelResult<()> {
        let Some(dir) = &self.config.checkpoint_dir else {
            return Ok(());
        };
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("model-epoch-{epoch}.safetensors"));
        candle_core::safetensors::save(&self.model.export_tensors(), &path)
            .map_err(map_candle)?;
        tracing::info!(epoch, path = %path.display(), "checkpoint written");
        Ok(())
    }
}
