pub mod classifier;
pub mod forest;
pub mod logistic;
pub mod mlp;

pub use classifier::{Classifier, ModelKind};
pub use forest::RandomForest;
pub use logistic::LogisticModel;
pub use mlp::MlpClassifier;

#[cfg(test)]
pub use classifier::MockClassifier;

use crate::config::ExperimentConfig;

/// The three contenders, fitted independently and in this order
pub struct ModelSuite {
    pub baseline: Box<dyn Classifier>,
    pub network: Box<dyn Classifier>,
    pub forest: Box<dyn Classifier>,
}

impl ModelSuite {
    pub fn from_config(config: &ExperimentConfig) -> Self {
        Self {
            baseline: Box::new(LogisticModel::new(config.logistic.clone())),
            network: Box::new(MlpClassifier::new(config.mlp.clone())),
            forest: Box::new(RandomForest::new(config.forest.clone())),
        }
    }
}
