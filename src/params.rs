//! Parameter and observation value types
//!
//! Both types are read-only once built: there are no mutable accessors, so a
//! vector produced by a sampler or an estimator is exactly what ends up in the
//! trial record.

use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Free parameters of a statistical model, either true or estimated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterVector(Vec<f64>);

impl ParameterVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl Deref for ParameterVector {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0
    }
}

impl From<Vec<f64>> for ParameterVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

impl<const N: usize> From<[f64; N]> for ParameterVector {
    fn from(values: [f64; N]) -> Self {
        Self(values.to_vec())
    }
}

/// Synthetic observations drawn from a model. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Dataset(Vec<f64>);

impl Dataset {
    pub fn new(values: Vec<f64>) -> Result<Self, ModelError> {
        if values.is_empty() {
            return Err(ModelError::EmptyDataset);
        }
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn mean(&self) -> f64 {
        self.0.iter().sum::<f64>() / self.0.len() as f64
    }
}

impl Deref for Dataset {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0
    }
}

impl TryFrom<Vec<f64>> for Dataset {
    type Error = ModelError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}
