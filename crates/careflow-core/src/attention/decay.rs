//! Precomputed day-gap decay table.
//!
//! The table maps an integer day-gap to a multiplicative decay weight applied
//! to excitation between two events that far apart. It is loaded once from
//! configuration and indexed by the attention engine; it must be sized to
//! cover the maximum elapsed time observable in the dataset.

use std::path::Path;

use crate::error::{AttentionError, AttentionResult};

/// Fixed-length lookup from integer day-gap to decay weight.
#[derive(Debug, Clone, PartialEq)]
pub struct DecayTable {
    weights: Vec<f64>,
}

impl DecayTable {
    /// Build a table from explicit weights.
    ///
    /// # Errors
    /// - [`AttentionError::ConfigError`] if the table is empty or contains a
    ///   non-finite or negative weight
    pub fn new(weights: Vec<f64>) -> AttentionResult<Self> {
        if weights.is_empty() {
            return Err(AttentionError::ConfigError {
                message: "decay table must not be empty".to_string(),
            });
        }
        for (gap, weight) in weights.iter().enumerate() {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(AttentionError::ConfigError {
                    message: format!("decay[{gap}] = {weight} must be finite and non-negative"),
                });
            }
        }
        Ok(Self { weights })
    }

    /// Load a table from the single-row CSV layout: one line whose fields are
    /// the decay weights for gaps `0, 1, 2, ...`.
    ///
    /// When `expected_len` is given, the row must have exactly that many
    /// fields.
    pub fn from_csv_file(
        path: impl AsRef<Path>,
        expected_len: Option<usize>,
    ) -> AttentionResult<Self> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(|e| AttentionError::ConfigError {
                message: format!("Failed to open decay table '{}': {}", path.display(), e),
            })?;

        let record = match reader.records().next() {
            Some(result) => result.map_err(|e| AttentionError::ConfigError {
                message: format!("Failed to read decay table '{}': {}", path.display(), e),
            })?,
            None => {
                return Err(AttentionError::ConfigError {
                    message: format!("Decay table '{}' is empty", path.display()),
                })
            }
        };

        if let Some(expected) = expected_len {
            if record.len() != expected {
                return Err(AttentionError::ConfigError {
                    message: format!(
                        "Decay table '{}' has {} entries, expected {}",
                        path.display(),
                        record.len(),
                        expected
                    ),
                });
            }
        }

        let weights = record
            .iter()
            .enumerate()
            .map(|(gap, field)| {
                field
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| AttentionError::ConfigError {
                        message: format!("Decay entry {gap} ('{field}') is not a number: {e}"),
                    })
            })
            .collect::<AttentionResult<Vec<f64>>>()?;

        Self::new(weights)
    }

    /// Checked lookup of the decay weight for an integer day-gap.
    ///
    /// # Errors
    /// - [`AttentionError::GapOutOfRange`] if `gap >= len()`: the caller
    ///   violated the sizing contract
    pub fn weight(&self, gap: usize) -> AttentionResult<f64> {
        self.weights
            .get(gap)
            .copied()
            .ok_or(AttentionError::GapOutOfRange {
                gap,
                table_len: self.weights.len(),
            })
    }

    /// Number of covered gaps (`L`).
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Always false: construction rejects empty tables.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Largest gap the table covers.
    pub fn max_gap(&self) -> usize {
        self.weights.len() - 1
    }

    /// Whether a gap is inside the table.
    pub fn covers(&self, gap: usize) -> bool {
        gap < self.weights.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn lookup_returns_configured_weights() {
        let table = DecayTable::new(vec![1.0, 0.5, 0.25]).unwrap();
        assert_eq!(table.weight(0).unwrap(), 1.0);
        assert_eq!(table.weight(2).unwrap(), 0.25);
        assert_eq!(table.len(), 3);
        assert_eq!(table.max_gap(), 2);
        assert!(table.covers(2));
        assert!(!table.covers(3));
    }

    #[test]
    fn out_of_range_gap_is_a_checked_error() {
        let table = DecayTable::new(vec![1.0, 0.5]).unwrap();
        let err = table.weight(2).unwrap_err();
        assert!(matches!(
            err,
            AttentionError::GapOutOfRange { gap: 2, table_len: 2 }
        ));
    }

    #[test]
    fn empty_table_is_rejected() {
        assert!(DecayTable::new(Vec::new()).is_err());
    }

    #[test]
    fn negative_weight_is_rejected() {
        let err = DecayTable::new(vec![1.0, -0.1]).unwrap_err();
        assert!(err.to_string().contains("decay[1]"));
    }

    #[test]
    fn nan_weight_is_rejected() {
        assert!(DecayTable::new(vec![1.0, f64::NAN]).is_err());
    }

    #[test]
    fn csv_single_row_loads() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1.0,0.8,0.64,0.512").unwrap();
        let table = DecayTable::from_csv_file(file.path(), Some(4)).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.weight(3).unwrap(), 0.512);
    }

    #[test]
    fn csv_length_mismatch_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1.0,0.8").unwrap();
        let err = DecayTable::from_csv_file(file.path(), Some(3)).unwrap_err();
        assert!(err.to_string().contains("expected 3"));
    }

    #[test]
    fn csv_non_numeric_field_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1.0,fast,0.25").unwrap();
        assert!(DecayTable::from_csv_file(file.path(), None).is_err());
    }
}
