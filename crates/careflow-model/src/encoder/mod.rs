//! Recurrent encoder over event streams.
//!
//! [`GruCell`] advances the hidden state one event at a time;
//! [`SequenceModel`] unrolls it over a whole time-major batch, invoking the
//! Hawkes attention engine at every index and merging the blend with the
//! current state through the trainable combine projection.

mod gru;
mod sequence;

pub use gru::{
    GruCell, CANDIDATE_BIAS_INIT, CANDIDATE_WEIGHT_INIT, GATE_BIAS_INIT, GATE_WEIGHT_INIT,
};
pub use sequence::{SequenceModel, SequenceOutput};
