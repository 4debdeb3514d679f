//! Event-sequence data: containers, consistency checks, and CSV loading.
//!
//! Sequences are stored batch-major (`[samples][time][depth]`) as read from
//! disk; conversion to the time-major tensors the model consumes is the
//! loader's responsibility and happens in [`batching`].

mod batching;

pub use batching::{EventBatch, SequenceBatches};

use std::path::Path;

use crate::error::{ModelError, ModelResult};

/// Declared shape parameters a dataset must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataShape {
    /// Event feature width.
    pub x_depth: usize,
    /// Timestamp width.
    pub t_depth: usize,
    /// Steps per sequence.
    pub time_length: usize,
}

/// Batch-major container of event features and timestamps.
#[derive(Debug, Clone)]
pub struct EventSequences {
    features: Vec<Vec<Vec<f64>>>,
    timestamps: Vec<Vec<Vec<f64>>>,
    shape: DataShape,
}

impl EventSequences {
    /// Build a dataset, checking every sample against the declared shape.
    ///
    /// # Errors
    /// - [`ModelError::DataError`] naming the first offending sample when the
    ///   data disagrees with the declared `x_depth` / `t_depth` /
    ///   `time_length`
    pub fn new(
        features: Vec<Vec<Vec<f64>>>,
        timestamps: Vec<Vec<Vec<f64>>>,
        shape: DataShape,
    ) -> ModelResult<Self> {
        if features.len() != timestamps.len() {
            return Err(ModelError::DataError {
                message: format!(
                    "{} feature sequences but {} timestamp sequences",
                    features.len(),
                    timestamps.len()
                ),
            });
        }
        if features.is_empty() {
            return Err(ModelError::DataError {
                message: "dataset must contain at least one sequence".to_string(),
            });
        }
        for (sample, sequence) in features.iter().enumerate() {
            check_sequence(sequence, sample, "features", shape.time_length, shape.x_depth)?;
        }
        for (sample, sequence) in timestamps.iter().enumerate() {
            check_sequence(sequence, sample, "timestamps", shape.time_length, shape.t_depth)?;
        }
        Ok(Self {
            features,
            timestamps,
            shape,
        })
    }

    /// Load features and timestamps from two headerless CSV files.
    ///
    /// Each row is one sample: `time_length * depth` values, step-major.
    pub fn from_csv_files(
        features_path: impl AsRef<Path>,
        timestamps_path: impl AsRef<Path>,
        shape: DataShape,
    ) -> ModelResult<Self> {
        let features = read_sequence_csv(features_path.as_ref(), shape.time_length, shape.x_depth)?;
        let timestamps =
            read_sequence_csv(timestamps_path.as_ref(), shape.time_length, shape.t_depth)?;
        Self::new(features, timestamps, shape)
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the dataset is empty (construction rejects this).
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// The declared shape.
    pub fn shape(&self) -> &DataShape {
        &self.shape
    }

    /// Batch-major feature sequences.
    pub fn features(&self) -> &[Vec<Vec<f64>>] {
        &self.features
    }

    /// Batch-major timestamp sequences.
    pub fn timestamps(&self) -> &[Vec<Vec<f64>>] {
        &self.timestamps
    }

    /// Split off the first `train_len` samples as a training set, leaving the
    /// rest as a held-out set.
    pub fn split(self, train_len: usize) -> ModelResult<(Self, Self)> {
        if train_len == 0 || train_len >= self.len() {
            return Err(ModelError::DataError {
                message: format!(
                    "split at {train_len} impossible for {} samples",
                    self.len()
                ),
            });
        }
        let mut features = self.features;
        let mut timestamps = self.timestamps;
        let test_features = features.split_off(train_len);
        let test_timestamps = timestamps.split_off(train_len);
        let train = Self {
            features,
            timestamps,
            shape: self.shape,
        };
        let test = Self {
            features: test_features,
            timestamps: test_timestamps,
            shape: self.shape,
        };
        Ok((train, test))
    }
}

fn check_sequence(
    sequence: &[Vec<f64>],
    sample: usize,
    kind: &str,
    time_length: usize,
    depth: usize,
) -> ModelResult<()> {
    if sequence.len() != time_length {
        return Err(ModelError::DataError {
            message: format!(
                "{kind} sample {sample} has {} steps, expected {time_length}",
                sequence.len()
            ),
        });
    }
    for (step, vector) in sequence.iter().enumerate() {
        if vector.len() != depth {
            return Err(ModelError::DataError {
                message: format!(
                    "{kind} sample {sample} step {step} has width {}, expected {depth}",
                    vector.len()
                ),
            });
        }
    }
    Ok(())
}

fn read_sequence_csv(
    path: &Path,
    time_length: usize,
    depth: usize,
) -> ModelResult<Vec<Vec<Vec<f64>>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| ModelError::DataError {
            message: format!("Failed to open sequence file '{}': {}", path.display(), e),
        })?;

    let expected = time_length * depth;
    let mut samples = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| ModelError::DataError {
            message: format!("Sequence row {row_idx}: {e}"),
        })?;
        if record.len() != expected {
            return Err(ModelError::DataError {
                message: format!(
                    "Sequence row {row_idx} has {} values, expected {expected} \
                     ({time_length} steps x {depth})",
                    record.len()
                ),
            });
        }
        let values = record
            .iter()
            .enumerate()
            .map(|(col, field)| {
                field
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| ModelError::DataError {
                        message: format!(
                            "Sequence row {row_idx} column {col} ('{field}') is not a number: {e}"
                        ),
                    })
            })
            .collect::<ModelResult<Vec<f64>>>()?;
        let sequence = values
            .chunks(depth)
            .map(|chunk| chunk.to_vec())
            .collect::<Vec<_>>();
        samples.push(sequence);
    }
    Ok(samples)
}
