//! Hawkes-process-based temporal attention engine.
//!
//! For a query time index `t`, the engine weighs every causally-prior hidden
//! state by the self-exciting point-process intensity accumulated *at* that
//! historical instant: every event `j <= i` contributes excitation towards
//! candidate `i`, scaled by the mutual-intensity coupling of their event
//! types and decayed by the integer day-gap between them. The normalized
//! weights then blend the hidden-state history into one mixed state.
//!
//! Two semantics are deliberate and load-bearing:
//!
//! - Day-gaps are measured relative to the **candidate** index `i`
//!   (`ts[i] - ts[j]`), not the query index `t`. The weight of index `i`
//!   models the intensity process as it stood when `i` was observed.
//! - Normalization divides by the plain sum of accumulated intensities. If
//!   every intensity is zero the division produces NaN, which propagates to
//!   the caller unmasked; no clamping policy is invented here.

use candle_core::{DType, Device, Tensor, Var};

use crate::config::{AttentionConfig, COMBINE_INIT, MUTUAL_INTENSITY_INIT};
use crate::error::{map_candle, AttentionError, AttentionResult};

use super::decay::DecayTable;
use super::intensity::MutualIntensity;

/// Temporal attention over event-stream hidden states.
///
/// Stateless across calls apart from the trainable mutual parameter, which is
/// owned here and updated by the enclosing model's optimizer between steps.
/// Concurrent [`mix`](Self::mix) calls against the same immutable inputs are
/// safe; callers must serialize parameter updates against evaluation.
#[derive(Debug)]
pub struct HawkesAttention {
    x_depth: usize,
    t_depth: usize,
    decay: DecayTable,
    /// Combines the per-type intensity row into a scalar, shape `[x_depth, 1]`.
    mutual_parameter: Var,
    device: Device,
}

impl HawkesAttention {
    /// Build the engine from a validated configuration.
    ///
    /// Fails fast, before any computation is attempted, when the
    /// `mutual_intensity` or `combine` initializer is missing or the decay
    /// table is invalid.
    pub fn new(config: &AttentionConfig, device: &Device) -> AttentionResult<Self> {
        config.validate()?;
        let mutual_init = config.initializers.require(MUTUAL_INTENSITY_INIT)?;
        // Consumed by the enclosing model's combine projection; its presence
        // is part of this engine's construction contract.
        config.initializers.require(COMBINE_INIT)?;

        let decay = DecayTable::new(config.decay.clone())?;
        let values = mutual_init.materialize(config.x_depth, 1);
        let mutual_parameter = Var::from_tensor(
            &Tensor::from_slice(&values, (config.x_depth, 1), device).map_err(map_candle)?,
        )
        .map_err(map_candle)?;

        Ok(Self {
            x_depth: config.x_depth,
            t_depth: config.t_depth,
            decay,
            mutual_parameter,
            device: device.clone(),
        })
    }

    /// Event feature width the engine was configured for.
    pub fn x_depth(&self) -> usize {
        self.x_depth
    }

    /// Timestamp width the engine was configured for.
    pub fn t_depth(&self) -> usize {
        self.t_depth
    }

    /// The decay table in use.
    pub fn decay(&self) -> &DecayTable {
        &self.decay
    }

    /// The trainable mutual parameter, shape `[x_depth, 1]`.
    pub fn mutual_parameter(&self) -> &Var {
        &self.mutual_parameter
    }

    /// Trainable variables exposed to the external optimizer.
    pub fn trainable_vars(&self) -> Vec<&Var> {
        vec![&self.mutual_parameter]
    }

    /// Mixed hidden state at `time_index`.
    ///
    /// Computes the normalized attention weights over indices
    /// `0..=time_index` and returns the weighted sum of the corresponding
    /// hidden states.
    ///
    /// # Arguments
    /// * `time_index` - query index `t`; index 0 is the first observed event
    /// * `hidden` - hidden-state history `[T, B, H]`, time-major
    /// * `features` - event features `[T, B, x_depth]`, time-major
    /// * `timestamps` - event timestamps `[T, B, t_depth]`, time-major
    /// * `mutual` - mutual-intensity matrix `[x_depth, x_depth]`
    ///
    /// # Returns
    /// The mixed state `[B, H]`. Entries at indices `> time_index` are never
    /// read.
    pub fn mix(
        &self,
        time_index: usize,
        hidden: &Tensor,
        features: &Tensor,
        timestamps: &Tensor,
        mutual: &MutualIntensity,
    ) -> AttentionResult<Tensor> {
        self.check_shapes(time_index, Some(hidden), features, timestamps, mutual)?;
        let weights = self.unchecked_weights(time_index, features, timestamps, mutual)?;

        let mut mixed = weights[0]
            .broadcast_mul(&hidden.get(0).map_err(map_candle)?)
            .map_err(map_candle)?;
        for i in 1..=time_index {
            let scaled = weights[i]
                .broadcast_mul(&hidden.get(i).map_err(map_candle)?)
                .map_err(map_candle)?;
            mixed = mixed.add(&scaled).map_err(map_candle)?;
        }
        Ok(mixed)
    }

    /// Normalized attention weights for indices `0..=time_index`, shape
    /// `[time_index + 1, B, 1]`.
    ///
    /// For each batch element the weights sum to 1, except in the degenerate
    /// all-zero-intensity case where the division yields NaN (propagated, not
    /// masked).
    pub fn weights(
        &self,
        time_index: usize,
        features: &Tensor,
        timestamps: &Tensor,
        mutual: &MutualIntensity,
    ) -> AttentionResult<Tensor> {
        self.check_shapes(time_index, None, features, timestamps, mutual)?;
        let weights = self.unchecked_weights(time_index, features, timestamps, mutual)?;
        Tensor::stack(&weights, 0).map_err(map_candle)
    }

    /// Accumulated, mutually-excited, time-decayed intensities, normalized
    /// per batch element across the candidate axis.
    fn unchecked_weights(
        &self,
        time_index: usize,
        features: &Tensor,
        timestamps: &Tensor,
        mutual: &MutualIntensity,
    ) -> AttentionResult<Vec<Tensor>> {
        let (_, batch_size, _) = features.dims3().map_err(map_candle)?;
        let times = timestamps
            .narrow(0, 0, time_index + 1)
            .map_err(map_candle)?
            .to_vec3::<f64>()
            .map_err(map_candle)?;

        // Per-event raw intensity: (x_j · M) · theta, a scalar per batch
        // element. Independent of the candidate index, so computed once.
        let mut raw = Vec::with_capacity(time_index + 1);
        for j in 0..=time_index {
            let contribution = features
                .get(j)
                .map_err(map_candle)?
                .matmul(mutual.matrix())
                .map_err(map_candle)?
                .matmul(self.mutual_parameter.as_tensor())
                .map_err(map_candle)?;
            raw.push(contribution);
        }

        let mut unnormalized = Vec::with_capacity(time_index + 1);
        for i in 0..=time_index {
            let mut intensity = Tensor::zeros((batch_size, 1), DType::F64, &self.device)
                .map_err(map_candle)?;
            for j in 0..=i {
                let mut decay_column = Vec::with_capacity(batch_size);
                for (b, step) in times[i].iter().enumerate() {
                    let gap = self.day_gap(step[0], times[j][b][0], j, i, b)?;
                    decay_column.push(self.decay.weight(gap)?);
                }
                let decay = Tensor::from_slice(&decay_column, (batch_size, 1), &self.device)
                    .map_err(map_candle)?;
                let decayed = raw[j].mul(&decay).map_err(map_candle)?;
                intensity = intensity.add(&decayed).map_err(map_candle)?;
            }
            unnormalized.push(intensity);
        }

        let mut total = unnormalized[0].clone();
        for intensity in unnormalized.iter().skip(1) {
            total = total.add(intensity).map_err(map_candle)?;
        }

        unnormalized
            .iter()
            .map(|intensity| intensity.div(&total).map_err(map_candle))
            .collect()
    }

    /// Integer day-gap between the candidate's timestamp and an earlier
    /// event's timestamp.
    fn day_gap(
        &self,
        candidate: f64,
        earlier: f64,
        earlier_idx: usize,
        candidate_idx: usize,
        batch: usize,
    ) -> AttentionResult<usize> {
        let gap = (candidate - earlier).round();
        if gap < 0.0 {
            return Err(AttentionError::NonMonotonicTimestamps {
                earlier: earlier_idx,
                later: candidate_idx,
                batch,
            });
        }
        Ok(gap as usize)
    }

    /// Boundary validation run before the accumulation loop.
    fn check_shapes(
        &self,
        time_index: usize,
        hidden: Option<&Tensor>,
        features: &Tensor,
        timestamps: &Tensor,
        mutual: &MutualIntensity,
    ) -> AttentionResult<()> {
        let (x_steps, x_batch, x_width) = features.dims3().map_err(map_candle)?;
        if x_width != self.x_depth {
            return Err(AttentionError::ShapeMismatch {
                context: "features",
                expected: format!("[*, *, {}]", self.x_depth),
                actual: format!("[{x_steps}, {x_batch}, {x_width}]"),
            });
        }
        let (t_steps, t_batch, t_width) = timestamps.dims3().map_err(map_candle)?;
        if t_width != self.t_depth {
            return Err(AttentionError::ShapeMismatch {
                context: "timestamps",
                expected: format!("[*, *, {}]", self.t_depth),
                actual: format!("[{t_steps}, {t_batch}, {t_width}]"),
            });
        }
        if t_batch != x_batch {
            return Err(AttentionError::ShapeMismatch {
                context: "timestamps",
                expected: format!("batch size {x_batch}"),
                actual: format!("batch size {t_batch}"),
            });
        }
        if time_index >= x_steps || time_index >= t_steps {
            return Err(AttentionError::ShapeMismatch {
                context: "time_index",
                expected: format!("< min({x_steps}, {t_steps}) time steps"),
                actual: format!("{time_index}"),
            });
        }
        if mutual.x_depth() != self.x_depth {
            return Err(AttentionError::ShapeMismatch {
                context: "mutual-intensity matrix",
                expected: format!("[{0}, {0}]", self.x_depth),
                actual: format!("[{0}, {0}]", mutual.x_depth()),
            });
        }
        if let Some(hidden) = hidden {
            let (h_steps, h_batch, _) = hidden.dims3().map_err(map_candle)?;
            if h_batch != x_batch {
                return Err(AttentionError::ShapeMismatch {
                    context: "hidden states",
                    expected: format!("batch size {x_batch}"),
                    actual: format!("batch size {h_batch}"),
                });
            }
            if time_index >= h_steps {
                return Err(AttentionError::ShapeMismatch {
                    context: "hidden states",
                    expected: format!("> {time_index} time steps"),
                    actual: format!("{h_steps}"),
                });
            }
        }
        Ok(())
    }
}
