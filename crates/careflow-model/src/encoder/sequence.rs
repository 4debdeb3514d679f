//! Sequence model: GRU unrolling with per-step Hawkes attention.

use std::collections::HashMap;

use candle_core::{DType, Device, Tensor, Var};
use careflow_core::{HawkesAttention, MutualIntensity, COMBINE_INIT};

use crate::config::ModelConfig;
use crate::encoder::GruCell;
use crate::error::{map_candle, ModelResult};

/// Per-step outputs of a full sequence unroll.
#[derive(Debug, Clone)]
pub struct SequenceOutput {
    /// Raw encoder states `[T, B, H]`.
    pub hidden: Tensor,
    /// Attention-mixed step representations `[T, B, H]`.
    pub mixed: Tensor,
}

/// Recurrent encoder with Hawkes-attention mixing at every time index.
///
/// The unroll advances the GRU state with each event, then asks the attention
/// engine for the intensity-weighted blend of the hidden history at that
/// index. The blend and the current state are merged through the trainable
/// `combine` projection into the step representation consumed downstream.
#[derive(Debug)]
pub struct SequenceModel {
    cell: GruCell,
    attention: HawkesAttention,
    /// Merges `[mixed, state]` into the step representation, shape `[2H, H]`.
    combine: Var,
    num_hidden: usize,
    device: Device,
}

impl SequenceModel {
    /// Build the model from a validated configuration.
    pub fn new(config: &ModelConfig, device: &Device) -> ModelResult<Self> {
        config.validate()?;
        let attention = HawkesAttention::new(&config.attention, device)?;
        let cell = GruCell::new(
            config.attention.x_depth,
            config.num_hidden,
            &config.attention.initializers,
            device,
        )?;
        let combine_init = config.attention.initializers.require(COMBINE_INIT)?;
        let values = combine_init.materialize(2 * config.num_hidden, config.num_hidden);
        let combine = Var::from_tensor(
            &Tensor::from_slice(&values, (2 * config.num_hidden, config.num_hidden), device)
                .map_err(map_candle)?,
        )
        .map_err(map_candle)?;

        Ok(Self {
            cell,
            attention,
            combine,
            num_hidden: config.num_hidden,
            device: device.clone(),
        })
    }

    /// Hidden-state width.
    pub fn num_hidden(&self) -> usize {
        self.num_hidden
    }

    /// The attention engine (e.g. to inspect the mutual parameter).
    pub fn attention(&self) -> &HawkesAttention {
        &self.attention
    }

    /// Unroll the encoder over a full time-major batch.
    ///
    /// # Arguments
    /// * `features` - `[T, B, x_depth]`
    /// * `timestamps` - `[T, B, t_depth]`
    /// * `mutual` - mutual-intensity matrix for this step
    pub fn forward(
        &self,
        features: &Tensor,
        timestamps: &Tensor,
        mutual: &MutualIntensity,
    ) -> ModelResult<SequenceOutput> {
        let (steps, batch, _) = features.dims3().map_err(map_candle)?;

        let mut state =
            Tensor::zeros((batch, self.num_hidden), DType::F64, &self.device).map_err(map_candle)?;
        let mut hidden_steps: Vec<Tensor> = Vec::with_capacity(steps);
        let mut mixed_steps: Vec<Tensor> = Vec::with_capacity(steps);

        for t in 0..steps {
            let input = features.get(t).map_err(map_candle)?;
            state = self.cell.forward(&input, &state)?;
            hidden_steps.push(state.clone());

            let history = Tensor::stack(&hidden_steps, 0).map_err(map_candle)?;
            let mixed = self
                .attention
                .mix(t, &history, features, timestamps, mutual)?;

            let merged = Tensor::cat(&[&mixed, &state], 1)
                .map_err(map_candle)?
                .matmul(self.combine.as_tensor())
                .map_err(map_candle)?
                .tanh()
                .map_err(map_candle)?;
            mixed_steps.push(merged);
        }

        Ok(SequenceOutput {
            hidden: Tensor::stack(&hidden_steps, 0).map_err(map_candle)?,
            mixed: Tensor::stack(&mixed_steps, 0).map_err(map_candle)?,
        })
    }

    /// Trainable variables of the cell, the attention engine, and the combine
    /// projection.
    pub fn trainable_vars(&self) -> Vec<&Var> {
        let mut vars = self.cell.trainable_vars();
        vars.extend(self.attention.trainable_vars());
        vars.push(&self.combine);
        vars
    }

    /// Named parameter tensors for checkpointing.
    pub fn export_tensors(&self) -> HashMap<String, Tensor> {
        let cell_vars = self.cell.trainable_vars();
        let mut tensors = HashMap::new();
        tensors.insert("gru.gate_weight".to_string(), cell_vars[0].as_tensor().clone());
        tensors.insert("gru.gate_bias".to_string(), cell_vars[1].as_tensor().clone());
        tensors.insert(
            "gru.candidate_weight".to_string(),
            cell_vars[2].as_tensor().clone(),
        );
        tensors.insert(
            "gru.candidate_bias".to_string(),
            cell_vars[3].as_tensor().clone(),
        );
        tensors.insert(
            "attention.mutual_parameter".to_string(),
            self.attention.mutual_parameter().as_tensor().clone(),
        );
        tensors.insert("combine".to_string(), self.combine.as_tensor().clone());
        tensors
    }
}
