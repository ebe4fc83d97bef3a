use std::path::PathBuf;
use thiserror::Error;

use crate::ml::ModelKind;

/// Failures the experiment recognises by name
#[derive(Debug, Error)]
pub enum ExperimentError {
    /// Input CSV does not exist. Reported with the failure marker and the run stops before training.
    #[error("{} not found. Run the training data export first.", .path.display())]
    DataNotFound { path: PathBuf },

    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    #[error("dataset contains no rows")]
    EmptyDataset,

    #[error("chronological split left an empty partition (train={train}, test={test})")]
    EmptySplit { train: usize, test: usize },

    #[error("invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),

    #[error("{model} training failed: {reason}")]
    Training { model: ModelKind, reason: String },

    #[error("shape mismatch: expected {expected} columns, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
}

impl ExperimentError {
    pub fn training(model: ModelKind, reason: impl ToString) -> Self {
        Self::Training { model, reason: reason.to_string() }
    }

    pub fn is_data_not_found(&self) -> bool {
        matches!(self, Self::DataNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_not_found_message() {
        let err = ExperimentError::DataNotFound { path: PathBuf::from("neural_training_data.csv") };
        assert!(err.is_data_not_found());
        assert_eq!(
            err.to_string(),
            "neural_training_data.csv not found. Run the training data export first."
        );
    }

    #[test]
    fn test_invalid_config_joins_problems() {
        let err = ExperimentError::InvalidConfig(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(err.to_string(), "invalid configuration: a; b");
        assert!(!err.is_data_not_found());
    }
}
