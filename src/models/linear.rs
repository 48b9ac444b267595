use rand::RngCore;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use super::{check_dimension, check_range, sample_uniform, Model};
use crate::error::ModelError;
use crate::params::{Dataset, ParameterVector};

/// Simple regression `y_i = a + b * x_i + N(0, sigma)` with parameters
/// `[a, b, sigma]` on the fixed design `x_i = i / (n - 1)`.
///
/// Only the responses are stored in the dataset; the design is implied by
/// position, so the estimator rebuilds it from the dataset length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearModel {
    pub intercept_range: [f64; 2],
    pub slope_range: [f64; 2],
    pub noise_range: [f64; 2],
    /// Runs set this through the top-level `sample_size` / `sweep_sizes`.
    #[serde(skip)]
    pub sample_size: usize,
}

impl Default for LinearModel {
    fn default() -> Self {
        Self {
            intercept_range: [-2.0, 2.0],
            slope_range: [-2.0, 2.0],
            noise_range: [0.1, 1.0],
            sample_size: 50,
        }
    }
}

/// Design point `i` of `n`, spread evenly over `[0, 1]`.
pub fn design_point(i: usize, n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    i as f64 / (n - 1) as f64
}

impl LinearModel {
    pub fn validate(&self) -> Result<(), ModelError> {
        check_range("intercept_range", self.intercept_range)?;
        check_range("slope_range", self.slope_range)?;
        check_range("noise_range", self.noise_range)?;
        if self.noise_range[0] < 0.0 {
            return Err(ModelError::InvalidParameter(
                "noise_range must be non-negative".to_string(),
            ));
        }
        if self.sample_size < 3 {
            return Err(ModelError::InvalidParameter(
                "linear sample_size must be at least 3".to_string(),
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

impl Model for LinearModel {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn dimension(&self) -> usize {
        3
    }

    fn sample_size(&self) -> usize {
        self.sample_size
    }

    fn sample_parameters(&self, rng: &mut dyn RngCore) -> Result<ParameterVector, ModelError> {
        let a = sample_uniform(rng, "intercept_range", self.intercept_range)?;
        let b = sample_uniform(rng, "slope_range", self.slope_range)?;
        let sigma = sample_uniform(rng, "noise_range", self.noise_range)?;
        Ok(ParameterVector::from([a, b, sigma]))
    }

    fn generate(
        &self,
        params: &ParameterVector,
        rng: &mut dyn RngCore,
    ) -> Result<Dataset, ModelError> {
        check_dimension(params, self.dimension())?;
        let (a, b, sigma) = (params[0], params[1], params[2]);
        let noise = Normal::new(0.0, sigma).map_err(|e| ModelError::Distribution(e.to_string()))?;

        let n = self.sample_size;
        let mut values = Vec::with_capacity(n);
        for i in 0..n {
            let x = design_point(i, n);
            values.push(a + b * x + noise.sample(&mut *rng));
        }
        Dataset::new(values)
    }

    fn fit(&self, data: &Dataset) -> Result<ParameterVector, ModelError> {
        let n = data.len();
        if n < 3 {
            return Err(ModelError::Degenerate(format!(
                "linear fit needs at least 3 observations, got {n}"
            )));
        }

        let x_mean = (0..n).map(|i| design_point(i, n)).sum::<f64>() / n as f64;
        let y_mean = data.mean();

        let mut sxx = 0.0;
        let mut sxy = 0.0;
        for (i, &y) in data.iter().enumerate() {
            let dx = design_point(i, n) - x_mean;
            sxx += dx * dx;
            sxy += dx * (y - y_mean);
        }

        let slope = sxy / sxx;
        let intercept = y_mean - slope * x_mean;

        let rss: f64 = data
            .iter()
            .enumerate()
            .map(|(i, &y)| {
                let r = y - intercept - slope * design_point(i, n);
                r * r
            })
            .sum();
        let sigma = (rss / (n - 2) as f64).sqrt();

        Ok(ParameterVector::from([intercept, slope, sigma]))
    }
}
