use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::compare::Comparator;
use crate::error::SimvalError;
use crate::models::{BuiltinModel, GaussianModel, LinearModel, ModelKind};

pub const DEFAULT_TRIALS: i64 = 1000;

/// Settings for a validation run or sample-size sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub trials: i64,
    pub seed: u64,
    pub parallel: bool,
    pub model: ModelKind,
    pub comparator: Comparator,
    /// Observations per trial for a single run; overrides the model table.
    pub sample_size: usize,
    pub sweep_sizes: Vec<usize>,
    pub gaussian: GaussianModel,
    pub linear: LinearModel,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            trials: DEFAULT_TRIALS,
            seed: 2026,
            parallel: false,
            model: ModelKind::Gaussian,
            comparator: Comparator::Squared,
            sample_size: 50,
            sweep_sizes: vec![5, 10, 25, 50, 100, 250],
            gaussian: GaussianModel::default(),
            linear: LinearModel::default(),
        }
    }
}

impl ValidationConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, SimvalError> {
        let cfg: ValidationConfig = toml::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, SimvalError> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn to_toml_string(&self) -> Result<String, SimvalError> {
        toml::to_string_pretty(self)
            .map_err(|e| SimvalError::InvalidConfig(format!("failed to render config: {e}")))
    }

    pub fn validate(&self) -> Result<(), SimvalError> {
        if self.trials < 1 {
            return Err(SimvalError::InvalidConfig(format!(
                "trials must be at least 1, got {}",
                self.trials
            )));
        }
        if self.sweep_sizes.is_empty() {
            return Err(SimvalError::InvalidConfig(
                "sweep_sizes must be non-empty".to_string(),
            ));
        }
        if self.sweep_sizes.windows(2).any(|w| w[0] >= w[1]) {
            return Err(SimvalError::InvalidConfig(
                "sweep_sizes must be strictly increasing".to_string(),
            ));
        }
        self.build_model(self.sample_size)?;
        for &size in &self.sweep_sizes {
            self.build_model(size)?;
        }
        Ok(())
    }

    /// The configured model, drawing `sample_size` observations per trial.
    pub fn build_model(&self, sample_size: usize) -> Result<BuiltinModel, SimvalError> {
        let model = match self.model {
            ModelKind::Gaussian => {
                let m = self.gaussian.with_sample_size(sample_size);
                m.validate()?;
                BuiltinModel::Gaussian(m)
            }
            ModelKind::Linear => {
                let m = self.linear.with_sample_size(sample_size);
                m.validate()?;
                BuiltinModel::Linear(m)
            }
        };
        Ok(model)
    }
}
