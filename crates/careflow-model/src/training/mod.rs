//! Training infrastructure for the sequence model.
//!
//! ```text
//! SequenceBatches ──> Trainer ──┬── NextStepContrastiveLoss (InfoNCE)
//!                               ├── Sgd (polynomial LR decay)
//!                               └── Evaluator (Top-1 / MRR / AUC)
//! ```
//!
//! # Modules
//!
//! - [`loss`]: next-step contrastive objective over mixed representations
//! - [`optimizer`]: SGD with polynomial learning-rate decay
//! - [`trainer`]: epoch/batch loop with evaluation cadence and checkpoints
//! - [`evaluation`]: next-event ranking metrics

pub mod evaluation;
pub mod loss;
pub mod optimizer;
pub mod trainer;

pub use evaluation::{Evaluator, NextEventMetrics};
pub use loss::{LossConfig, NextStepContrastiveLoss};
pub use optimizer::{Sgd, SgdConfig};
pub use trainer::{EpochSummary, Trainer, TrainerConfig, TrainingReport};
