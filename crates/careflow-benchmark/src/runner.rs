//! Benchmark runner: generate a cohort, train, evaluate on held-out patients.

use std::time::Instant;

use candle_core::Device;
use careflow_core::{
    AttentionConfig, Initializer, InitializerMap, COMBINE_INIT, MUTUAL_INTENSITY_INIT,
};
use careflow_model::config::ModelConfig;
use careflow_model::data::{EventBatch, SequenceBatches};
use careflow_model::encoder::{
    SequenceModel, CANDIDATE_BIAS_INIT, CANDIDATE_WEIGHT_INIT, GATE_BIAS_INIT, GATE_WEIGHT_INIT,
};
use careflow_model::error::{ModelError, ModelResult};
use careflow_model::training::{
    Evaluator, LossConfig, NextEventMetrics, SgdConfig, Trainer, TrainerConfig, TrainingReport,
};
use serde::{Deserialize, Serialize};

use crate::datasets::{estimate_mutual_intensity, CohortConfig};

/// Configuration for a full benchmark run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Cohort generation parameters.
    pub cohort: CohortConfig,

    /// Patients held out for evaluation.
    pub test_patients: usize,

    /// Training epochs.
    pub epochs: usize,

    /// Training batch size.
    pub batch_size: usize,

    /// Encoder hidden width.
    pub num_hidden: usize,

    /// Starting learning rate (decays polynomially to 1% of this).
    pub learning_rate: f64,

    /// Contrastive loss temperature.
    pub temperature: f64,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            cohort: CohortConfig::default(),
            test_patients: 16,
            epochs: 10,
            batch_size: 16,
            num_hidden: 32,
            learning_rate: 0.1,
            temperature: 0.1,
        }
    }
}

/// Results of a benchmark run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    /// Configuration the run used.
    pub config: BenchmarkConfig,

    /// Training history.
    pub training: TrainingReport,

    /// Ranking metrics on the held-out patients.
    pub test_metrics: NextEventMetrics,

    /// Wall-clock duration in milliseconds.
    pub elapsed_ms: u128,
}

/// Drives cohort generation, training, and held-out evaluation.
pub struct BenchmarkRunner {
    config: BenchmarkConfig,
}

impl BenchmarkRunner {
    /// Create a runner.
    pub fn new(config: BenchmarkConfig) -> Self {
        Self { config }
    }

    /// Run the benchmark end to end.
    pub fn run(&self) -> ModelResult<BenchmarkReport> {
        if self.config.test_patients == 0
            || self.config.test_patients >= self.config.cohort.num_patients
        {
            return Err(ModelError::ConfigError {
                message: format!(
                    "test_patients {} must leave at least one training patient of {}",
                    self.config.test_patients, self.config.cohort.num_patients
                ),
            });
        }

        let started = Instant::now();
        let device = Device::Cpu;

        tracing::info!(patients = self.config.cohort.num_patients, "generating cohort");
        let cohort = self.config.cohort.generate()?;
        let mutual = estimate_mutual_intensity(&cohort, &device)?;

        let train_len = self.config.cohort.num_patients - self.config.test_patients;
        let (train, test) = cohort.sequences.clone().split(train_len)?;

        let model_config = ModelConfig {
            attention: AttentionConfig {
                x_depth: self.config.cohort.x_depth,
                t_depth: 1,
                decay: self.config.cohort.decay_table(),
                initializers: default_initializers(),
            },
            num_hidden: self.config.num_hidden,
        };
        let model = SequenceModel::new(&model_config, &device)?;

        let trainer_config = TrainerConfig {
            epochs: self.config.epochs,
            eval_every: 1,
            checkpoint_dir: None,
            loss: LossConfig {
                temperature: self.config.temperature,
            },
            sgd: SgdConfig {
                learning_rate: self.config.learning_rate,
                end_learning_rate: self.config.learning_rate / 100.0,
                decay_steps: 10_000,
                power: 1.0,
            },
        };

        let mut batches =
            SequenceBatches::new(train, self.config.batch_size, self.config.cohort.seed, &device)?;
        let mut trainer = Trainer::new(model, trainer_config)?;

        tracing::info!(epochs = self.config.epochs, "training");
        let training = trainer.train(&mut batches, &mutual)?;

        let test_batch = EventBatch::from_sequences(&test, &device)?;
        let output = trainer
            .model()
            .forward(&test_batch.features, &test_batch.timestamps, &mutual)?;
        let test_metrics = Evaluator::evaluate(&output.mixed, &output.hidden)?;
        tracing::info!(summary = %test_metrics.summary(), "held-out evaluation");

        Ok(BenchmarkReport {
            config: self.config.clone(),
            training,
            test_metrics,
            elapsed_ms: started.elapsed().as_millis(),
        })
    }
}

/// Xavier weights and zero biases for every named parameter the model needs.
pub fn default_initializers() -> InitializerMap {
    InitializerMap::new()
        .with(MUTUAL_INTENSITY_INIT, Initializer::Xavier)
        .with(COMBINE_INIT, Initializer::Xavier)
        .with(GATE_WEIGHT_INIT, Initializer::Xavier)
        .with(GATE_BIAS_INIT, Initializer::Zeros)
        .with(CANDIDATE_WEIGHT_INIT, Initializer::Xavier)
        .with(CANDIDATE_BIAS_INIT, Initializer::Zeros)
}
