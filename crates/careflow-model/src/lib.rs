//! Sequence model and training pipeline around the Hawkes attention core.
//!
//! This crate assembles the collaborators the attention engine expects: a
//! GRU-style recurrent encoder unrolled over event streams, the data pipeline
//! that converts batch-major sequence files into time-major tensors, and a
//! training loop with a next-step contrastive objective, SGD with polynomial
//! learning-rate decay, ranking evaluation, and safetensors checkpoints.
//!
//! # Architecture
//!
//! - **GruCell / SequenceModel**: recurrent encoder invoking the attention
//!   engine once per time index
//! - **EventSequences / SequenceBatches**: consistency-checked data with
//!   seeded shuffling and time-major conversion
//! - **Trainer**: loss, optimizer, evaluation cadence, checkpoints

pub mod config;
pub mod data;
pub mod encoder;
pub mod error;
pub mod training;

pub use config::ModelConfig;
pub use data::{DataShape, EventBatch, EventSequences, SequenceBatches};
pub use encoder::{GruCell, SequenceModel, SequenceOutput};
pub use error::{ModelError, ModelResult};
pub use training::{
    Evaluator, NextEventMetrics, NextStepContrastiveLoss, Sgd, SgdConfig, Trainer, TrainerConfig,
    TrainingReport,
};
