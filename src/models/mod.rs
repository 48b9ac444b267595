//! Built-in parametric models
//!
//! A [`Model`] bundles the three model-specific collaborators of a validation
//! run: a parameter sampler, a generator, and an estimator. Comparators are
//! model independent and live in [`crate::compare`].

use rand::RngCore;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::compare::Comparator;
use crate::error::{ModelError, SimvalError};
use crate::harness::{run_parallel_trials, run_seeded_trials, TrialRecord, TrialRng};
use crate::params::{Dataset, ParameterVector};

pub mod gaussian;
pub mod linear;

pub use gaussian::GaussianModel;
pub use linear::LinearModel;

pub trait Model: Send + Sync {
    fn name(&self) -> &'static str;
    /// Length of every parameter vector the model samples or fits.
    fn dimension(&self) -> usize;
    /// Observations per generated dataset.
    fn sample_size(&self) -> usize;
    fn sample_parameters(&self, rng: &mut dyn RngCore) -> Result<ParameterVector, ModelError>;
    fn generate(
        &self,
        params: &ParameterVector,
        rng: &mut dyn RngCore,
    ) -> Result<Dataset, ModelError>;
    fn fit(&self, data: &Dataset) -> Result<ParameterVector, ModelError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    #[default]
    Gaussian,
    Linear,
}

impl ModelKind {
    /// Same spelling as the serde form in config files.
    pub fn name(self) -> &'static str {
        match self {
            ModelKind::Gaussian => "gaussian",
            ModelKind::Linear => "linear",
        }
    }
}

impl std::str::FromStr for ModelKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gaussian" | "normal" => Ok(ModelKind::Gaussian),
            "linear" => Ok(ModelKind::Linear),
            other => Err(ModelError::InvalidParameter(format!(
                "unknown model '{other}', expected gaussian or linear"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BuiltinModel {
    Gaussian(GaussianModel),
    Linear(LinearModel),
}

impl Model for BuiltinModel {
    fn name(&self) -> &'static str {
        match self {
            BuiltinModel::Gaussian(m) => m.name(),
            BuiltinModel::Linear(m) => m.name(),
        }
    }

    fn dimension(&self) -> usize {
        match self {
            BuiltinModel::Gaussian(m) => m.dimension(),
            BuiltinModel::Linear(m) => m.dimension(),
        }
    }

    fn sample_size(&self) -> usize {
        match self {
            BuiltinModel::Gaussian(m) => m.sample_size(),
            BuiltinModel::Linear(m) => m.sample_size(),
        }
    }

    fn sample_parameters(&self, rng: &mut dyn RngCore) -> Result<ParameterVector, ModelError> {
        match self {
            BuiltinModel::Gaussian(m) => m.sample_parameters(rng),
            BuiltinModel::Linear(m) => m.sample_parameters(rng),
        }
    }

    fn generate(
        &self,
        params: &ParameterVector,
        rng: &mut dyn RngCore,
    ) -> Result<Dataset, ModelError> {
        match self {
            BuiltinModel::Gaussian(m) => m.generate(params, rng),
            BuiltinModel::Linear(m) => m.generate(params, rng),
        }
    }

    fn fit(&self, data: &Dataset) -> Result<ParameterVector, ModelError> {
        match self {
            BuiltinModel::Gaussian(m) => m.fit(data),
            BuiltinModel::Linear(m) => m.fit(data),
        }
    }
}

pub(crate) fn check_range(name: &str, range: [f64; 2]) -> Result<(), ModelError> {
    let [low, high] = range;
    if !low.is_finite() || !high.is_finite() {
        return Err(ModelError::InvalidParameter(format!(
            "{name} bounds must be finite"
        )));
    }
    if low > high {
        return Err(ModelError::InvalidParameter(format!(
            "{name} lower bound {low} exceeds upper bound {high}"
        )));
    }
    if !(high - low).is_finite() {
        return Err(ModelError::InvalidParameter(format!(
            "{name} width overflows: [{low}, {high}]"
        )));
    }
    Ok(())
}

/// Uniform draw from `[low, high)`; a degenerate range returns `low`.
pub(crate) fn sample_uniform(
    rng: &mut dyn RngCore,
    name: &str,
    range: [f64; 2],
) -> Result<f64, ModelError> {
    check_range(name, range)?;
    let [low, high] = range;
    if low == high {
        return Ok(low);
    }
    Ok(Uniform::new(low, high).sample(rng))
}

pub(crate) fn check_dimension(params: &ParameterVector, expected: usize) -> Result<(), ModelError> {
    if params.len() != expected {
        return Err(ModelError::DimensionMismatch {
            expected,
            got: params.len(),
        });
    }
    Ok(())
}

/// Run a seeded validation of `model`, sequentially or on the rayon pool.
/// Both paths return identical records for the same seed.
pub fn run_model_trials<M: Model + ?Sized>(
    model: &M,
    comparator: Comparator,
    trial_count: i64,
    seed: u64,
    parallel: bool,
) -> Result<Vec<TrialRecord>, SimvalError> {
    let sample = |rng: &mut TrialRng| model.sample_parameters(rng).map_err(SimvalError::from);
    let generate = |params: &ParameterVector, rng: &mut TrialRng| {
        model.generate(params, rng).map_err(SimvalError::from)
    };
    let fit = |data: &Dataset| model.fit(data).map_err(SimvalError::from);
    let compare = |truth: &ParameterVector, inferred: &ParameterVector| {
        comparator.apply(truth, inferred).map_err(SimvalError::from)
    };

    tracing::debug!(
        model = model.name(),
        comparator = comparator.name(),
        sample_size = model.sample_size(),
        parallel,
        "running model trials"
    );

    if parallel {
        run_parallel_trials(trial_count, seed, &sample, &generate, &fit, &compare)
    } else {
        run_seeded_trials(trial_count, seed, &sample, &generate, &fit, &compare)
    }
}
