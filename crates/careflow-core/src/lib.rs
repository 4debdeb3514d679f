//! Hawkes-process temporal attention core for event-stream sequence models.
//!
//! This crate provides the attention mechanism used by careflow's next-event
//! prediction models: for each time index of an event sequence it blends all
//! causally-prior hidden states, with weights derived from a self-exciting
//! point-process intensity model rather than from learned dot-product scores.
//!
//! # Architecture
//!
//! - **DecayTable**: fixed-length lookup from integer day-gap to decay weight
//! - **MutualIntensity**: offline-estimated excitation matrix between event types
//! - **HawkesAttention**: the engine computing normalized intensity weights
//!   and the mixed hidden state, owning the one trainable mutual parameter
//! - **AttentionConfig**: statically validated configuration with named,
//!   typed initializers
//!
//! # Example
//!
//! ```rust,ignore
//! use careflow_core::{AttentionConfig, HawkesAttention, MutualIntensity};
//! use candle_core::Device;
//!
//! let device = Device::Cpu;
//! let config = AttentionConfig::from_file("attention.toml")?;
//! let engine = HawkesAttention::new(&config, &device)?;
//! let mixed = engine.mix(t, &hidden, &features, &timestamps, &mutual)?;
//! ```

pub mod attention;
pub mod config;
pub mod error;

pub use attention::{DecayTable, HawkesAttention, MutualIntensity};
pub use config::{
    AttentionConfig, Initializer, InitializerMap, COMBINE_INIT, MUTUAL_INTENSITY_INIT,
};
pub use error::{AttentionError, AttentionResult};
