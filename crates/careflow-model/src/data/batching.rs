//! Shuffled batching and batch-major to time-major conversion.

use candle_core::{Device, Tensor};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::{map_candle, ModelError, ModelResult};

use super::EventSequences;

/// One time-major batch ready for the model.
#[derive(Debug, Clone)]
pub struct EventBatch {
    /// Event features `[T, B, x_depth]`.
    pub features: Tensor,
    /// Event timestamps `[T, B, t_depth]`.
    pub timestamps: Tensor,
}

impl EventBatch {
    /// Convert a whole dataset into a single time-major batch (evaluation
    /// path: no shuffling, no remainder discard).
    pub fn from_sequences(data: &EventSequences, device: &Device) -> ModelResult<Self> {
        let indices: Vec<usize> = (0..data.len()).collect();
        build_batch(data, &indices, device)
    }
}

/// Cycling batch iterator with per-epoch reshuffling.
///
/// Samples are shuffled with a seeded RNG, the remainder that does not fill a
/// whole batch is discarded, and exhausting the epoch triggers a reshuffle,
/// so the iterator never ends.
#[derive(Debug)]
pub struct SequenceBatches {
    data: EventSequences,
    batch_size: usize,
    indices: Vec<usize>,
    position: usize,
    rng: ChaCha8Rng,
    device: Device,
}

impl SequenceBatches {
    /// Build a batch iterator over the dataset.
    ///
    /// # Errors
    /// - [`ModelError::ConfigError`] if `batch_size` is zero or larger than
    ///   the dataset
    pub fn new(
        data: EventSequences,
        batch_size: usize,
        seed: u64,
        device: &Device,
    ) -> ModelResult<Self> {
        if batch_size == 0 {
            return Err(ModelError::ConfigError {
                message: "batch_size must be positive".to_string(),
            });
        }
        if batch_size > data.len() {
            return Err(ModelError::ConfigError {
                message: format!(
                    "batch_size {batch_size} exceeds dataset size {}",
                    data.len()
                ),
            });
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut indices: Vec<usize> = (0..data.len()).collect();
        indices.shuffle(&mut rng);
        Ok(Self {
            data,
            batch_size,
            indices,
            position: 0,
            rng,
            device: device.clone(),
        })
    }

    /// Full batches per epoch; the remainder is discarded.
    pub fn batches_per_epoch(&self) -> usize {
        self.data.len() / self.batch_size
    }

    /// The underlying dataset.
    pub fn data(&self) -> &EventSequences {
        &self.data
    }

    /// Next time-major batch, reshuffling when the epoch is exhausted.
    pub fn next_batch(&mut self) -> ModelResult<EventBatch> {
        if self.position + self.batch_size > self.batches_per_epoch() * self.batch_size {
            self.indices.shuffle(&mut self.rng);
            self.position = 0;
        }
        let selected = &self.indices[self.position..self.position + self.batch_size];
        let batch = build_batch(&self.data, selected, &self.device)?;
        self.position += self.batch_size;
        Ok(batch)
    }
}

/// Transpose the selected batch-major samples into time-major tensors.
fn build_batch(
    data: &EventSequences,
    selected: &[usize],
    device: &Device,
) -> ModelResult<EventBatch> {
    let shape = *data.shape();
    let batch = selected.len();

    let features = to_time_major(
        data.features(),
        selected,
        shape.time_length,
        shape.x_depth,
    );
    let timestamps = to_time_major(
        data.timestamps(),
        selected,
        shape.time_length,
        shape.t_depth,
    );

    Ok(EventBatch {
        features: Tensor::from_slice(
            &features,
            (shape.time_length, batch, shape.x_depth),
            device,
        )
        .map_err(map_candle)?,
        timestamps: Tensor::from_slice(
            &timestamps,
            (shape.time_length, batch, shape.t_depth),
            device,
        )
        .map_err(map_candle)?,
    })
}

fn to_time_major(
    sequences: &[Vec<Vec<f64>>],
    selected: &[usize],
    time_length: usize,
    depth: usize,
) -> Vec<f64> {
    let mut flat = Vec::with_capacity(time_length * selected.len() * depth);
    for t in 0..time_length {
        for &sample in selected {
            flat.extend_from_slice(&sequences[sample][t]);
        }
    }
    flat
}
