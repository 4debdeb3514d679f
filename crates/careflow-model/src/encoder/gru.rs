//! GRU-style recurrent cell over event feature vectors.

use candle_core::{Device, Tensor, Var};
use careflow_core::InitializerMap;

use crate::error::{map_candle, ModelError, ModelResult};

/// Initializer name for the fused update/reset gate weights.
pub const GATE_WEIGHT_INIT: &str = "gate_weight";
/// Initializer name for the fused gate bias.
pub const GATE_BIAS_INIT: &str = "gate_bias";
/// Initializer name for the candidate-state weights.
pub const CANDIDATE_WEIGHT_INIT: &str = "candidate_weight";
/// Initializer name for the candidate-state bias.
pub const CANDIDATE_BIAS_INIT: &str = "candidate_bias";

/// Single GRU cell with fused gate weights.
///
/// Gate weights are `[x_depth + num_hidden, 2 * num_hidden]` (update gate in
/// the first half, reset gate in the second), candidate weights
/// `[x_depth + num_hidden, num_hidden]`. All parameters are `Var`s built from
/// the named initializers; construction fails when any name is missing.
#[derive(Debug)]
pub struct GruCell {
    x_depth: usize,
    num_hidden: usize,
    gate_weight: Var,
    gate_bias: Var,
    candidate_weight: Var,
    candidate_bias: Var,
}

impl GruCell {
    /// Build a cell from the shared initializer map.
    pub fn new(
        x_depth: usize,
        num_hidden: usize,
        initializers: &InitializerMap,
        device: &Device,
    ) -> ModelResult<Self> {
        if x_depth == 0 || num_hidden == 0 {
            return Err(ModelError::ConfigError {
                message: format!(
                    "GRU dimensions must be positive, got x_depth={x_depth}, num_hidden={num_hidden}"
                ),
            });
        }
        let input_width = x_depth + num_hidden;

        let gate_weight = materialize_var(
            initializers,
            GATE_WEIGHT_INIT,
            input_width,
            2 * num_hidden,
            device,
        )?;
        let gate_bias = materialize_bias(initializers, GATE_BIAS_INIT, 2 * num_hidden, device)?;
        let candidate_weight = materialize_var(
            initializers,
            CANDIDATE_WEIGHT_INIT,
            input_width,
            num_hidden,
            device,
        )?;
        let candidate_bias =
            materialize_bias(initializers, CANDIDATE_BIAS_INIT, num_hidden, device)?;

        Ok(Self {
            x_depth,
            num_hidden,
            gate_weight,
            gate_bias,
            candidate_weight,
            candidate_bias,
        })
    }

    /// Event feature width.
    pub fn x_depth(&self) -> usize {
        self.x_depth
    }

    /// Hidden-state width.
    pub fn num_hidden(&self) -> usize {
        self.num_hidden
    }

    /// One recurrence step: `[B, x_depth]` input and `[B, H]` state to the
    /// next `[B, H]` state.
    pub fn forward(&self, input: &Tensor, state: &Tensor) -> ModelResult<Tensor> {
        self.check_shapes(input, state)?;
        let h = self.num_hidden;

        let combined = Tensor::cat(&[input, state], 1).map_err(map_candle)?;
        let gates = combined
            .matmul(self.gate_weight.as_tensor())
            .map_err(map_candle)?
            .broadcast_add(self.gate_bias.as_tensor())
            .map_err(map_candle)?;
        let gates = candle_nn::ops::sigmoid(&gates).map_err(map_candle)?;
        let update = gates.narrow(1, 0, h).map_err(map_candle)?;
        let reset = gates.narrow(1, h, h).map_err(map_candle)?;

        let gated_state = reset.mul(state).map_err(map_candle)?;
        let candidate_input = Tensor::cat(&[input, &gated_state], 1).map_err(map_candle)?;
        let candidate = candidate_input
            .matmul(self.candidate_weight.as_tensor())
            .map_err(map_candle)?
            .broadcast_add(self.candidate_bias.as_tensor())
            .map_err(map_candle)?
            .tanh()
            .map_err(map_candle)?;

        // h' = (1 - z) * h + z * candidate
        let keep = update.affine(-1.0, 1.0).map_err(map_candle)?;
        keep.mul(state)
            .map_err(map_candle)?
            .add(&update.mul(&candidate).map_err(map_candle)?)
            .map_err(map_candle)
    }

    /// Trainable variables exposed to the optimizer.
    pub fn trainable_vars(&self) -> Vec<&Var> {
        vec![
            &self.gate_weight,
            &self.gate_bias,
            &self.candidate_weight,
            &self.candidate_bias,
        ]
    }

    fn check_shapes(&self, input: &Tensor, state: &Tensor) -> ModelResult<()> {
        let (batch, width) = input.dims2().map_err(map_candle)?;
        if width != self.x_depth {
            return Err(ModelError::ShapeMismatch {
                context: "gru input",
                expected: format!("[*, {}]", self.x_depth),
                actual: format!("[{batch}, {width}]"),
            });
        }
        let (state_batch, state_width) = state.dims2().map_err(map_candle)?;
        if state_width != self.num_hidden || state_batch != batch {
            return Err(ModelError::ShapeMismatch {
                context: "gru state",
                expected: format!("[{batch}, {}]", self.num_hidden),
                actual: format!("[{state_batch}, {state_width}]"),
            });
        }
        Ok(())
    }
}

fn materialize_var(
    initializers: &InitializerMap,
    name: &str,
    rows: usize,
    cols: usize,
    device: &Device,
) -> ModelResult<Var> {
    let values = initializers.require(name)?.materialize(rows, cols);
    let tensor = Tensor::from_slice(&values, (rows, cols), device).map_err(map_candle)?;
    Var::from_tensor(&tensor).map_err(map_candle)
}

fn materialize_bias(
    initializers: &InitializerMap,
    name: &str,
    width: usize,
    device: &Device,
) -> ModelResult<Var> {
    let values = initializers.require(name)?.materialize(1, width);
    let tensor = Tensor::from_slice(&values, (width,), device).map_err(map_candle)?;
    Var::from_tensor(&tensor).map_err(map_candle)
}
