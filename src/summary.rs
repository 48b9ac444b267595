use serde::Serialize;

use crate::compare::Components;
use crate::error::ModelError;
use crate::harness::TrialRecord;

/// Aggregate discrepancy over a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialSummary {
    pub trials: usize,
    pub dimension: usize,
    pub mean_error: Vec<f64>,
    pub max_error: Vec<f64>,
    /// Mean over every component of every trial.
    pub overall_mean: f64,
}

#[derive(Debug, Default, Clone)]
pub struct SummaryAccumulator {
    sum: Vec<f64>,
    max: Vec<f64>,
    count: usize,
}

impl SummaryAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, error: &[f64]) -> Result<(), ModelError> {
        if self.count == 0 {
            self.sum = vec![0.0; error.len()];
            self.max = vec![f64::NEG_INFINITY; error.len()];
        } else if error.len() != self.sum.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.sum.len(),
                got: error.len(),
            });
        }

        for (k, &e) in error.iter().enumerate() {
            self.sum[k] += e;
            self.max[k] = self.max[k].max(e);
        }
        self.count += 1;
        Ok(())
    }

    pub fn finalize(&self) -> TrialSummary {
        if self.count == 0 {
            return TrialSummary {
                trials: 0,
                dimension: 0,
                mean_error: Vec::new(),
                max_error: Vec::new(),
                overall_mean: 0.0,
            };
        }

        let n = self.count as f64;
        let mean_error: Vec<f64> = self.sum.iter().map(|s| s / n).collect();
        let overall_mean = if mean_error.is_empty() {
            0.0
        } else {
            mean_error.iter().sum::<f64>() / mean_error.len() as f64
        };

        TrialSummary {
            trials: self.count,
            dimension: self.sum.len(),
            mean_error,
            max_error: self.max.clone(),
            overall_mean,
        }
    }
}

pub fn summarize<D: Components>(records: &[TrialRecord<D>]) -> Result<TrialSummary, ModelError> {
    let mut acc = SummaryAccumulator::new();
    for record in records {
        acc.observe(record.error.components())?;
    }
    Ok(acc.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterVector;

    fn record(trial: usize, error: Vec<f64>) -> TrialRecord {
        TrialRecord {
            trial,
            true_parameters: ParameterVector::from([0.0, 0.0]),
            inferred_parameters: ParameterVector::from([0.0, 0.0]),
            error,
        }
    }

    #[test]
    fn mean_and_max_per_component() {
        let records = vec![
            record(0, vec![1.0, 4.0]),
            record(1, vec![3.0, 0.0]),
            record(2, vec![2.0, 2.0]),
        ];
        let summary = summarize(&records).unwrap();
        assert_eq!(summary.trials, 3);
        assert_eq!(summary.dimension, 2);
        assert_eq!(summary.mean_error, vec![2.0, 2.0]);
        assert_eq!(summary.max_error, vec![3.0, 4.0]);
        assert!((summary.overall_mean - 2.0).abs() < 1e-12);
    }

    #[test]
    fn empty_input_gives_zero_summary() {
        let summary = summarize::<Vec<f64>>(&[]).unwrap();
        assert_eq!(summary.trials, 0);
        assert_eq!(summary.overall_mean, 0.0);
    }

    #[test]
    fn ragged_errors_are_rejected() {
        let records = vec![record(0, vec![1.0, 4.0]), record(1, vec![3.0])];
        assert!(matches!(
            summarize(&records),
            Err(ModelError::DimensionMismatch {
                expected: 2,
                got: 1
            })
        ));
    }
}
