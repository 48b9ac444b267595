use thiserror::Error;

/// Errors raised by the harness itself, before or between collaborator calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HarnessError {
    #[error("trial count must be at least 1, got {0}")]
    InvalidTrialCount(i64),
    #[error("cannot hold records for {0} trials")]
    CapacityExceeded(i64),
}

/// Errors raised by generators, estimators, and comparators.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("dataset must contain at least one observation")]
    EmptyDataset,
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("degenerate estimate: {0}")]
    Degenerate(String),
    #[error("distribution error: {0}")]
    Distribution(String),
}

#[derive(Debug, Error)]
pub enum SimvalError {
    #[error(transparent)]
    Harness(#[from] HarnessError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
