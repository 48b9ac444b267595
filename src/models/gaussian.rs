use rand::RngCore;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use super::{check_dimension, check_range, sample_uniform, Model};
use crate::error::ModelError;
use crate::params::{Dataset, ParameterVector};

/// Normal location/scale model with parameters `[mu, sigma]`.
///
/// The estimator returns the sample mean and the sample standard deviation
/// with Bessel's correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaussianModel {
    pub mean_range: [f64; 2],
    pub std_range: [f64; 2],
    /// Runs set this through the top-level `sample_size` / `sweep_sizes`.
    #[serde(skip)]
    pub sample_size: usize,
}

impl Default for GaussianModel {
    fn default() -> Self {
        Self {
            mean_range: [-5.0, 5.0],
            std_range: [0.5, 3.0],
            sample_size: 50,
        }
    }
}

impl GaussianModel {
    pub fn new(
        mean_range: [f64; 2],
        std_range: [f64; 2],
        sample_size: usize,
    ) -> Result<Self, ModelError> {
        let model = Self {
            mean_range,
            std_range,
            sample_size,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        check_range("mean_range", self.mean_range)?;
        check_range("std_range", self.std_range)?;
        if self.std_range[0] <= 0.0 {
            return Err(ModelError::InvalidParameter(
                "std_range must be strictly positive".to_string(),
            ));
        }
        if self.sample_size < 2 {
            return Err(ModelError::InvalidParameter(
                "gaussian sample_size must be at least 2".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_sample_size(&self, sample_size: usize) -> Self {
        Self {
            sample_size,
            ..self.clone()
        }
    }
}

impl Model for GaussianModel {
    fn name(&self) -> &'static str {
        "gaussian"
    }

    fn dimension(&self) -> usize {
        2
    }

    fn sample_size(&self) -> usize {
        self.sample_size
    }

    fn sample_parameters(&self, rng: &mut dyn RngCore) -> Result<ParameterVector, ModelError> {
        let mu = sample_uniform(rng, "mean_range", self.mean_range)?;
        let sigma = sample_uniform(rng, "std_range", self.std_range)?;
        Ok(ParameterVector::from([mu, sigma]))
    }

    fn generate(
        &self,
        params: &ParameterVector,
        rng: &mut dyn RngCore,
    ) -> Result<Dataset, ModelError> {
        check_dimension(params, self.dimension())?;
        let (mu, sigma) = (params[0], params[1]);
        let normal =
            Normal::new(mu, sigma).map_err(|e| ModelError::Distribution(e.to_string()))?;

        let mut values = Vec::with_capacity(self.sample_size);
        for _ in 0..self.sample_size {
            values.push(normal.sample(&mut *rng));
        }
        Dataset::new(values)
    }

    fn fit(&self, data: &Dataset) -> Result<ParameterVector, ModelError> {
        let n = data.len();
        if n < 2 {
            return Err(ModelError::Degenerate(format!(
                "standard deviation needs at least 2 observations, got {n}"
            )));
        }

        let mean = data.mean();
        let var = data.iter().map(|&x| (x - mean) * (x - mean)).sum::<f64>() / (n - 1) as f64;
        Ok(ParameterVector::from([mean, var.sqrt()]))
    }
}
