//! Tests for the Hawkes attention engine.

mod causality;
mod construction;

use candle_core::{Device, Tensor};

use crate::config::{AttentionConfig, Initializer, InitializerMap, COMBINE_INIT, MUTUAL_INTENSITY_INIT};
use crate::attention::{HawkesAttention, MutualIntensity};

/// Engine config with a unit mutual parameter so weights are hand-computable.
pub(crate) fn unit_config(x_depth: usize, decay: Vec<f64>) -> AttentionConfig {
    AttentionConfig {
        x_depth,
        t_depth: 1,
        decay,
        initializers: InitializerMap::new()
            .with(MUTUAL_INTENSITY_INIT, Initializer::Constant { value: 1.0 })
            .with(COMBINE_INIT, Initializer::Xavier),
    }
}

pub(crate) fn unit_engine(x_depth: usize, decay: Vec<f64>) -> HawkesAttention {
    HawkesAttention::new(&unit_config(x_depth, decay), &Device::Cpu)
        .expect("engine construction should succeed")
}

pub(crate) fn identity_mutual(x_depth: usize) -> MutualIntensity {
    let rows = (0..x_depth)
        .map(|r| (0..x_depth).map(|c| if r == c { 1.0 } else { 0.0 }).collect())
        .collect();
    MutualIntensity::from_rows(rows, &Device::Cpu).unwrap()
}

/// Time-major `[steps, batch, depth]` tensor from a flat slice.
pub(crate) fn tensor3(data: &[f64], steps: usize, batch: usize, depth: usize) -> Tensor {
    Tensor::from_slice(data, (steps, batch, depth), &Device::Cpu).unwrap()
}
