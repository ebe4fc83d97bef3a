use serde::{Deserialize, Serialize};

use crate::data::DEFAULT_TRAIN_FRACTION;
use crate::ml::ModelKind;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub data: DataSettings,
    pub logistic: LogisticSettings,
    pub mlp: MlpSettings,
    pub forest: ForestSettings,
    pub report: ReportSettings,
}

impl ExperimentConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        // Data validation
        if self.data.path.trim().is_empty() {
            errors.push("data.path must not be empty".to_string());
        }
        if !(self.data.train_fraction > 0.0 && self.data.train_fraction < 1.0) {
            errors.push("data.train_fraction must be between 0 and 1 (exclusive)".to_string());
        }

        // Logistic regression validation
        if self.logistic.alpha < 0.0 {
            errors.push("logistic.alpha must be >= 0".to_string());
        }
        if self.logistic.max_iterations == 0 {
            errors.push("logistic.max_iterations must be > 0".to_string());
        }

        // MLP validation
        if self.mlp.hidden_layers.is_empty() || self.mlp.hidden_layers.contains(&0) {
            errors.push("mlp.hidden_layers must list at least one non-zero layer size".to_string());
        }
        if self.mlp.learning_rate <= 0.0 {
            errors.push("mlp.learning_rate must be > 0".to_string());
        }
        if self.mlp.max_iter == 0 {
            errors.push("mlp.max_iter must be > 0".to_string());
        }
        if self.mlp.batch_size == 0 {
            errors.push("mlp.batch_size must be > 0".to_string());
        }
        if !(0.0..1.0).contains(&self.mlp.beta_1) || !(0.0..1.0).contains(&self.mlp.beta_2) {
            errors.push("mlp.beta_1 and mlp.beta_2 must be in [0, 1)".to_string());
        }

        // Forest validation
        if self.forest.n_trees == 0 {
            errors.push("forest.n_trees must be > 0".to_string());
        }
        if self.forest.min_samples_split < 2 {
            errors.push("forest.min_samples_split must be >= 2".to_string());
        }
        if self.forest.min_samples_leaf == 0 {
            errors.push("forest.min_samples_leaf must be > 0".to_string());
        }
        if self.forest.max_features == Some(0) {
            errors.push("forest.max_features must be > 0 when set".to_string());
        }

        // Report validation
        if !(0.0..=1.0).contains(&self.report.success_threshold) {
            errors.push("report.success_threshold must be between 0 and 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Apply one seed to every randomised model
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.mlp.seed = seed;
        self.forest.seed = seed;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub path: String,
    pub train_fraction: f64,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            path: "neural_training_data.csv".to_string(),
            train_fraction: DEFAULT_TRAIN_FRACTION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticSettings {
    /// L2 penalty strength (inverse of C)
    pub alpha: f64,
    pub max_iterations: u64,
    pub gradient_tolerance: f64,
}

impl Default for LogisticSettings {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            max_iterations: 100,
            gradient_tolerance: 1e-4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlpSettings {
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f64,
    /// L2 penalty on the weights
    pub alpha: f64,
    /// Maximum number of epochs
    pub max_iter: usize,
    pub batch_size: usize,
    pub tol: f64,
    pub n_iter_no_change: usize,
    pub beta_1: f64,
    pub beta_2: f64,
    pub epsilon: f64,
    pub seed: u64,
}

impl Default for MlpSettings {
    fn default() -> Self {
        Self {
            hidden_layers: vec![16, 12],
            learning_rate: 0.001,
            alpha: 1e-4,
            max_iter: 500,
            batch_size: 200,
            tol: 1e-4,
            n_iter_no_change: 10,
            beta_1: 0.9,
            beta_2: 0.999,
            epsilon: 1e-8,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestSettings {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Candidate features per split; `None` means `floor(sqrt(n_features))`
    pub max_features: Option<usize>,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestSettings {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Best accuracy must exceed this for the SUCCESS conclusion
    pub success_threshold: f64,
    /// Model whose classification report and confusion matrix are printed
    pub detailed_model: ModelKind,
    pub json_output: Option<String>,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            success_threshold: 0.75,
            detailed_model: ModelKind::Mlp,
            json_output: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ExperimentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mlp.hidden_layers, vec![16, 12]);
        assert_eq!(config.mlp.max_iter, 500);
        assert_eq!(config.forest.n_trees, 100);
        assert_eq!(config.forest.seed, 42);
        assert_eq!(config.report.success_threshold, 0.75);
        assert_eq!(config.report.detailed_model, ModelKind::Mlp);
        assert_eq!(config.data.train_fraction, 0.8);
    }

    #[test]
    fn test_validation_collects_every_problem() {
        let mut config = ExperimentConfig::default();
        config.data.train_fraction = 1.0;
        config.forest.n_trees = 0;
        config.mlp.hidden_layers = vec![];

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.contains("train_fraction")));
        assert!(errors.iter().any(|e| e.contains("n_trees")));
        assert!(errors.iter().any(|e| e.contains("hidden_layers")));
    }

    #[test]
    fn test_with_seed_applies_to_random_models() {
        let config = ExperimentConfig::default().with_seed(7);
        assert_eq!(config.mlp.seed, 7);
        assert_eq!(config.forest.seed, 7);
    }
}
