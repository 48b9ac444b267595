//! Comparators scoring true against inferred parameters

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::params::ParameterVector;

/// A discrepancy viewed as a flat list of per-component values.
pub trait Components {
    fn components(&self) -> &[f64];
}

impl Components for f64 {
    fn components(&self) -> &[f64] {
        std::slice::from_ref(self)
    }
}

impl Components for Vec<f64> {
    fn components(&self) -> &[f64] {
        self
    }
}

impl Components for ParameterVector {
    fn components(&self) -> &[f64] {
        self.as_slice()
    }
}

fn componentwise(
    truth: &[f64],
    inferred: &[f64],
    op: impl Fn(f64, f64) -> f64,
) -> Result<Vec<f64>, ModelError> {
    if truth.len() != inferred.len() {
        return Err(ModelError::DimensionMismatch {
            expected: truth.len(),
            got: inferred.len(),
        });
    }
    Ok(truth
        .iter()
        .zip(inferred)
        .map(|(&t, &e)| op(t, e))
        .collect())
}

/// Component-wise `(t - e)^2`.
pub fn squared_error(truth: &[f64], inferred: &[f64]) -> Result<Vec<f64>, ModelError> {
    componentwise(truth, inferred, |t, e| (t - e) * (t - e))
}

/// Component-wise `|t - e|`.
pub fn absolute_error(truth: &[f64], inferred: &[f64]) -> Result<Vec<f64>, ModelError> {
    componentwise(truth, inferred, |t, e| (t - e).abs())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparator {
    #[default]
    Squared,
    Absolute,
}

impl Comparator {
    pub fn apply(
        self,
        truth: &ParameterVector,
        inferred: &ParameterVector,
    ) -> Result<Vec<f64>, ModelError> {
        match self {
            Comparator::Squared => squared_error(truth, inferred),
            Comparator::Absolute => absolute_error(truth, inferred),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Comparator::Squared => "squared",
            Comparator::Absolute => "absolute",
        }
    }
}

impl std::str::FromStr for Comparator {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "squared" => Ok(Comparator::Squared),
            "absolute" => Ok(Comparator::Absolute),
            other => Err(ModelError::InvalidParameter(format!(
                "unknown comparator '{other}', expected squared or absolute"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squared_error_is_componentwise() {
        let err = squared_error(&[0.5, 1.0], &[0.5, 0.0]).unwrap();
        assert_eq!(err, vec![0.0, 1.0]);
    }

    #[test]
    fn absolute_error_ignores_sign() {
        let err = absolute_error(&[1.0, -2.0], &[3.0, -1.5]).unwrap();
        assert_eq!(err, vec![2.0, 0.5]);
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let err = squared_error(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert_eq!(
            err,
            ModelError::DimensionMismatch {
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn comparator_parses_names() {
        assert_eq!("Squared".parse::<Comparator>().unwrap(), Comparator::Squared);
        assert_eq!("absolute".parse::<Comparator>().unwrap(), Comparator::Absolute);
        assert!("huber".parse::<Comparator>().is_err());
    }

    #[test]
    fn scalar_discrepancy_has_one_component() {
        assert_eq!(2.5_f64.components(), &[2.5]);
    }
}
