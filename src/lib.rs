//! simval - simulation-validation harness
//!
//! Checks that an estimator recovers parameters it was given: sample true
//! parameters, generate synthetic data from them, fit an estimate back from
//! that data, and score the discrepancy, over many independent trials.

pub mod compare;
pub mod config;
pub mod error;
pub mod harness;
pub mod models;
pub mod output;
pub mod params;
pub mod summary;
pub mod sweep;

// Re-export main types
pub use compare::{absolute_error, squared_error, Comparator, Components};
pub use config::ValidationConfig;
pub use error::{HarnessError, ModelError, SimvalError};
pub use harness::{
    run_parallel_trials, run_seeded_trials, run_trials, trial_rng, TrialRecord, TrialRng,
};
pub use models::{run_model_trials, BuiltinModel, GaussianModel, LinearModel, Model, ModelKind};
pub use params::{Dataset, ParameterVector};
pub use summary::{summarize, TrialSummary};
pub use sweep::{run_sample_size_sweep, SweepPoint, SweepReport};
