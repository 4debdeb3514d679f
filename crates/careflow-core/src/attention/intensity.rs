//! Mutual-intensity matrix between event types.
//!
//! Element `[a][b]` quantifies how strongly an event of type `a` excites the
//! occurrence rate of events of type `b`. The matrix is estimated offline,
//! supplied per training/evaluation step, and never learned here. A symmetric
//! interpretation is not required.

use std::path::Path;

use candle_core::{Device, Tensor};

use crate::error::{map_candle, AttentionError, AttentionResult};

/// Square `x_depth × x_depth` excitation matrix.
#[derive(Debug, Clone)]
pub struct MutualIntensity {
    matrix: Tensor,
    x_depth: usize,
}

impl MutualIntensity {
    /// Build a matrix from row vectors.
    ///
    /// # Errors
    /// - [`AttentionError::ShapeMismatch`] if the rows do not form a square
    ///   `x_depth × x_depth` matrix
    /// - [`AttentionError::ConfigError`] on non-finite entries
    pub fn from_rows(rows: Vec<Vec<f64>>, device: &Device) -> AttentionResult<Self> {
        let x_depth = rows.len();
        if x_depth == 0 {
            return Err(AttentionError::ConfigError {
                message: "mutual-intensity matrix must not be empty".to_string(),
            });
        }
        let mut flat = Vec::with_capacity(x_depth * x_depth);
        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != x_depth {
                return Err(AttentionError::ShapeMismatch {
                    context: "mutual-intensity row",
                    expected: format!("{x_depth} columns"),
                    actual: format!("{} columns in row {row_idx}", row.len()),
                });
            }
            for (col_idx, value) in row.iter().enumerate() {
                if !value.is_finite() {
                    return Err(AttentionError::ConfigError {
                        message: format!(
                            "mutual_intensity[{row_idx}][{col_idx}] = {value} is not finite"
                        ),
                    });
                }
                flat.push(*value);
            }
        }
        let matrix =
            Tensor::from_slice(&flat, (x_depth, x_depth), device).map_err(map_candle)?;
        Ok(Self { matrix, x_depth })
    }

    /// Load a matrix from a headerless CSV file with `x_depth` rows of
    /// `x_depth` values each.
    pub fn from_csv_file(
        path: impl AsRef<Path>,
        x_depth: usize,
        device: &Device,
    ) -> AttentionResult<Self> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(|e| AttentionError::ConfigError {
                message: format!(
                    "Failed to open mutual-intensity file '{}': {}",
                    path.display(),
                    e
                ),
            })?;

        let mut rows = Vec::with_capacity(x_depth);
        for (row_idx, result) in reader.records().enumerate() {
            let record = result.map_err(|e| AttentionError::ConfigError {
                message: format!("Mutual-intensity row {row_idx}: {e}"),
            })?;
            let row = record
                .iter()
                .enumerate()
                .map(|(col_idx, field)| {
                    field
                        .trim()
                        .parse::<f64>()
                        .map_err(|e| AttentionError::ConfigError {
                            message: format!(
                                "Mutual-intensity entry [{row_idx}][{col_idx}] ('{field}') is not a number: {e}"
                            ),
                        })
                })
                .collect::<AttentionResult<Vec<f64>>>()?;
            rows.push(row);
        }

        if rows.len() != x_depth {
            return Err(AttentionError::ShapeMismatch {
                context: "mutual-intensity matrix",
                expected: format!("{x_depth} rows"),
                actual: format!("{} rows in '{}'", rows.len(), path.display()),
            });
        }
        Self::from_rows(rows, device)
    }

    /// Side length of the matrix.
    pub fn x_depth(&self) -> usize {
        self.x_depth
    }

    /// The underlying `[x_depth, x_depth]` tensor.
    pub fn matrix(&self) -> &Tensor {
        &self.matrix
    }

    /// Excitation of event type `target` by event type `source`.
    pub fn excitation(&self, source: usize, target: usize) -> AttentionResult<f64> {
        if source >= self.x_depth || target >= self.x_depth {
            return Err(AttentionError::ShapeMismatch {
                context: "mutual-intensity index",
                expected: format!("indices < {}", self.x_depth),
                actual: format!("[{source}][{target}]"),
            });
        }
        self.matrix
            .get(source)
            .map_err(map_candle)?
            .get(target)
            .map_err(map_candle)?
            .to_scalar::<f64>()
            .map_err(map_candle)
    }
}
