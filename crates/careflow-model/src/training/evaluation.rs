//! Evaluation metrics for next-event prediction.
//!
//! The mixed representation at step `t` is scored against the encoder states
//! at `t + 1` across the batch: the true continuation should rank first.
//! Reported metrics: top-1 accuracy, mean reciprocal rank, and the AUC of
//! matching vs non-matching similarity scores.

use candle_core::Tensor;
use serde::{Deserialize, Serialize};

use crate::error::{map_candle, ModelError, ModelResult};

/// Ranking metrics over a batch of unrolled sequences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NextEventMetrics {
    /// Fraction of queries whose true next state ranks first.
    pub top1_accuracy: f64,
    /// Mean reciprocal rank of the true next state.
    pub mrr: f64,
    /// AUC for separating matching from non-matching pairs.
    pub auc: f64,
    /// Number of (step, sequence) queries evaluated.
    pub num_queries: usize,
}

impl NextEventMetrics {
    /// Format metrics as a one-line summary.
    pub fn summary(&self) -> String {
        format!(
            "Top1={:.3} MRR={:.3} AUC={:.3} (n={})",
            self.top1_accuracy, self.mrr, self.auc, self.num_queries
        )
    }
}

/// Evaluator for next-event ranking quality.
pub struct Evaluator;

impl Evaluator {
    /// Rank the true next encoder state for every (step, sequence) query.
    ///
    /// # Arguments
    /// * `mixed` - mixed step representations `[T, B, H]`
    /// * `hidden` - encoder states `[T, B, H]`
    pub fn evaluate(mixed: &Tensor, hidden: &Tensor) -> ModelResult<NextEventMetrics> {
        let (steps, batch, _) = mixed.dims3().map_err(map_candle)?;
        if mixed.dims() != hidden.dims() {
            return Err(ModelError::ShapeMismatch {
                context: "evaluation inputs",
                expected: format!("{:?}", mixed.dims()),
                actual: format!("{:?}", hidden.dims()),
            });
        }
        if steps < 2 {
            return Err(ModelError::DataError {
                message: format!("evaluation needs at least two steps, got {steps}"),
            });
        }

        let mut top1 = 0usize;
        let mut mrr_sum = 0.0f64;
        let mut scores = Vec::new();
        let mut labels = Vec::new();
        let num_queries = (steps - 1) * batch;

        for t in 0..steps - 1 {
            let query = normalize_rows(&mixed.get(t).map_err(map_candle)?)?;
            let keys = normalize_rows(&hidden.get(t + 1).map_err(map_candle)?)?;
            let sims: Vec<Vec<f64>> = query
                .matmul(&keys.t().map_err(map_candle)?)
                .map_err(map_candle)?
                .to_vec2()
                .map_err(map_candle)?;

            for (i, row) in sims.iter().enumerate() {
                let correct = row[i];
                let rank = 1 + row
                    .iter()
                    .enumerate()
                    .filter(|(j, &s)| *j != i && s > correct)
                    .count();
                if rank == 1 {
                    top1 += 1;
                }
                mrr_sum += 1.0 / rank as f64;
                for (j, &s) in row.iter().enumerate() {
                    scores.push(s);
                    labels.push(j == i);
                }
            }
        }

        Ok(NextEventMetrics {
            top1_accuracy: top1 as f64 / num_queries as f64,
            mrr: mrr_sum / num_queries as f64,
            auc: ranking_auc(&scores, &labels),
            num_queries,
        })
    }
}

/// Wilcoxon-Mann-Whitney AUC over scored binary labels.
fn ranking_auc(scores: &[f64], labels: &[bool]) -> f64 {
    if scores.len() != labels.len() || scores.is_empty() {
        return 0.0;
    }

    let mut pairs: Vec<(f64, bool)> = scores
        .iter()
        .zip(labels.iter())
        .map(|(&s, &l)| (s, l))
        .collect();
    pairs.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let total_pos = labels.iter().filter(|&&l| l).count() as f64;
    let total_neg = labels.iter().filter(|&&l| !l).count() as f64;
    if total_pos == 0.0 || total_neg == 0.0 {
        return 0.5;
    }

    let mut auc = 0.0f64;
    let mut tp = 0.0f64;
    for (_, is_positive) in &pairs {
        if *is_positive {
            tp += 1.0;
        } else {
            auc += tp;
        }
    }
    auc / (total_pos * total_neg)
}

fn normalize_rows(x: &Tensor) -> ModelResult<Tensor> {
    let norm = x
        .sqr()
        .map_err(map_candle)?
        .sum_keepdim(1)
        .map_err(map_candle)?
        .affine(1.0, 1e-12)
        .map_err(map_candle)?
        .sqrt()
        .map_err(map_candle)?;
    x.broadcast_div(&norm).map_err(map_candle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn perfect_predictions_score_one() {
        let device = Device::Cpu;
        // Orthogonal states per sequence so ranking is unambiguous.
        let hidden = Tensor::from_slice(
            &[
                1.0f64, 0.0, 0.0, 1.0, // step 0
                0.0, 1.0, 1.0, 0.0, // step 1
            ],
            (2, 2, 2),
            &device,
        )
        .unwrap();
        // Mixed state at step 0 equals the true step-1 state per sequence.
        let mixed = Tensor::from_slice(
            &[
                0.0f64, 1.0, 1.0, 0.0, // step 0 predicts step 1
                0.0, 1.0, 1.0, 0.0, // step 1 (unused tail)
            ],
            (2, 2, 2),
            &device,
        )
        .unwrap();

        let metrics = Evaluator::evaluate(&mixed, &hidden).unwrap();
        assert_eq!(metrics.num_queries, 2);
        assert_eq!(metrics.top1_accuracy, 1.0);
        assert_eq!(metrics.mrr, 1.0);
        assert_eq!(metrics.auc, 1.0);
    }

    #[test]
    fn inverted_predictions_score_zero_top1() {
        let device = Device::Cpu;
        let hidden = Tensor::from_slice(
            &[1.0f64, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0],
            (2, 2, 2),
            &device,
        )
        .unwrap();
        // Each query matches the other sequence's continuation.
        let mixed = Tensor::from_slice(
            &[1.0f64, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0],
            (2, 2, 2),
            &device,
        )
        .unwrap();

        let metrics = Evaluator::evaluate(&mixed, &hidden).unwrap();
        assert_eq!(metrics.top1_accuracy, 0.0);
        assert!((metrics.mrr - 0.5).abs() < 1e-12);
    }

    #[test]
    fn auc_handles_degenerate_label_sets() {
        assert_eq!(ranking_auc(&[0.5, 0.2], &[true, true]), 0.5);
        assert_eq!(ranking_auc(&[], &[]), 0.0);
    }

    #[test]
    fn auc_orders_separable_scores() {
        let scores = [0.9, 0.8, 0.3, 0.2];
        let labels = [true, true, false, false];
        assert_eq!(ranking_auc(&scores, &labels), 1.0);
    }

    #[test]
    fn summary_is_compact() {
        let metrics = NextEventMetrics {
            top1_accuracy: 0.5,
            mrr: 0.75,
            auc: 0.9,
            num_queries: 8,
        };
        assert_eq!(metrics.summary(), "Top1=0.500 MRR=0.750 AUC=0.900 (n=8)");
    }
}
