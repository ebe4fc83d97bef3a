use anyhow::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Model family identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[serde(alias = "lr")]
    LogisticRegression,
    Mlp,
    #[serde(alias = "rf")]
    RandomForest,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::LogisticRegression => "logistic_regression",
            ModelKind::Mlp => "mlp",
            ModelKind::RandomForest => "random_forest",
        }
    }

    /// Label used in the accuracy table
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelKind::LogisticRegression => "Logistic Regression (Baseline)",
            ModelKind::Mlp => "MLP (Deep Neural Network)",
            ModelKind::RandomForest => "Random Forest (Ensemble)",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "logistic_regression" | "lr" => Ok(ModelKind::LogisticRegression),
            "mlp" => Ok(ModelKind::Mlp),
            "random_forest" | "rf" => Ok(ModelKind::RandomForest),
            _ => Err(anyhow::anyhow!("Unknown model kind: {}", s)),
        }
    }
}

/// Binary classifier over a dense feature matrix. Fit once, predict many.
#[cfg_attr(test, mockall::automock)]
pub trait Classifier {
    fn kind(&self) -> ModelKind;

    fn fit(&mut self, features: &Array2<f64>, labels: &Array1<bool>) -> Result<()>;

    fn predict(&self, features: &Array2<f64>) -> Result<Array1<bool>>;

    /// Per-feature importance scores, for models that expose them
    fn feature_importances(&self) -> Option<Array1<f64>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_kind_from_str() {
        assert_eq!(ModelKind::from_str("mlp").unwrap(), ModelKind::Mlp);
        assert_eq!(ModelKind::from_str("rf").unwrap(), ModelKind::RandomForest);
        assert_eq!(ModelKind::from_str("logistic_regression").unwrap(), ModelKind::LogisticRegression);
        assert!(ModelKind::from_str("svm").is_err());
    }

    #[test]
    fn test_model_kind_deserializes_short_names() {
        let kinds: Vec<ModelKind> = serde_json::from_str(r#"["lr", "rf", "mlp", "random_forest"]"#).unwrap();
        assert_eq!(
            kinds,
            vec![ModelKind::LogisticRegression, ModelKind::RandomForest, ModelKind::Mlp, ModelKind::RandomForest]
        );
        assert_eq!(serde_json::to_string(&ModelKind::RandomForest).unwrap(), "\"random_forest\"");
    }

    #[test]
    fn test_model_kind_round_trips_through_as_str() {
        for kind in [ModelKind::LogisticRegression, ModelKind::Mlp, ModelKind::RandomForest] {
            assert_eq!(ModelKind::from_str(kind.as_str()).unwrap(), kind);
        }
    }
}
