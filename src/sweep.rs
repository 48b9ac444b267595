//! Sample-size sweeps
//!
//! A consistent estimator's error shrinks as it sees more data. The sweep runs
//! the same seeded validation once per sample size so that trend can be read
//! off, or asserted on, directly.

use serde::Serialize;
use tracing::info;

use crate::compare::Comparator;
use crate::error::SimvalError;
use crate::models::{run_model_trials, Model};
use crate::summary::{summarize, TrialSummary};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepPoint {
    pub sample_size: usize,
    pub summary: TrialSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    pub model: String,
    pub comparator: Comparator,
    pub trials: i64,
    pub seed: u64,
    pub points: Vec<SweepPoint>,
}

impl SweepReport {
    pub fn overall_means(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.summary.overall_mean).collect()
    }

    /// True when the overall mean error strictly decreases with sample size.
    pub fn is_consistent(&self) -> bool {
        self.points
            .windows(2)
            .all(|w| w[1].summary.overall_mean < w[0].summary.overall_mean)
    }
}

fn check_sizes(sizes: &[usize]) -> Result<(), SimvalError> {
    if sizes.is_empty() {
        return Err(SimvalError::InvalidConfig(
            "sweep needs at least one sample size".to_string(),
        ));
    }
    if sizes.windows(2).any(|w| w[0] >= w[1]) {
        return Err(SimvalError::InvalidConfig(
            "sweep sample sizes must be strictly increasing".to_string(),
        ));
    }
    Ok(())
}

/// Run `trial_count` trials at each sample size in `sizes`, with models built
/// by `build`. Every size reuses `seed`, so the sampled true parameters line
/// up across sizes.
pub fn run_sample_size_sweep<M, F>(
    sizes: &[usize],
    trial_count: i64,
    seed: u64,
    comparator: Comparator,
    parallel: bool,
    build: F,
) -> Result<SweepReport, SimvalError>
where
    M: Model,
    F: Fn(usize) -> Result<M, SimvalError>,
{
    check_sizes(sizes)?;

    let mut points = Vec::with_capacity(sizes.len());
    let mut model_name = String::new();

    for &sample_size in sizes {
        let model = build(sample_size)?;
        model_name = model.name().to_string();

        let records = run_model_trials(&model, comparator, trial_count, seed, parallel)?;
        let summary = summarize(&records)?;
        info!(
            model = model.name(),
            sample_size,
            overall_mean = summary.overall_mean,
            "sweep point complete"
        );
        points.push(SweepPoint {
            sample_size,
            summary,
        });
    }

    Ok(SweepReport {
        model: model_name,
        comparator,
        trials: trial_count,
        seed,
        points,
    })
}
