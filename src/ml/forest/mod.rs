pub mod tree;

use anyhow::{anyhow, Result};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

pub use tree::{DecisionTree, TreeParams};

use super::{Classifier, ModelKind};
use crate::config::ForestSettings;
use crate::error::ExperimentError;

/// Bagged ensemble of Gini trees with per-split feature subsampling.
/// Predicts by averaging leaf probabilities across trees.
pub struct RandomForest {
    settings: ForestSettings,
    trees: Vec<DecisionTree>,
    n_features: usize,
}

impl RandomForest {
    pub fn new(settings: ForestSettings) -> Self {
        Self {
            settings,
            trees: Vec::new(),
            n_features: 0,
        }
    }

    /// `max_features` setting, or `floor(sqrt(n_features))` clamped to at least 1
    fn features_per_split(&self, n_features: usize) -> usize {
        match self.settings.max_features {
            Some(k) => k.clamp(1, n_features.max(1)),
            None => ((n_features as f64).sqrt().floor() as usize).max(1),
        }
    }

    /// Mean positive-class probability over all trees
    pub fn predict_probabilities(&self, features: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(anyhow!("random forest is not fitted"));
        }
        if features.ncols() != self.n_features {
            return Err(ExperimentError::ShapeMismatch { expected: self.n_features, actual: features.ncols() }.into());
        }

        let n_trees = self.trees.len() as f64;
        let probs = features
            .rows()
            .into_iter()
            .map(|row| self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees)
            .collect();
        Ok(probs)
    }
}

impl Classifier for RandomForest {
    fn kind(&self) -> ModelKind {
        ModelKind::RandomForest
    }

    fn fit(&mut self, features: &Array2<f64>, labels: &Array1<bool>) -> Result<()> {
        let (n, n_features) = features.dim();
        if n == 0 {
            return Err(anyhow!("cannot train random forest on an empty dataset"));
        }
        if labels.len() != n {
            return Err(anyhow!("random forest got {} rows but {} labels", n, labels.len()));
        }

        let params = TreeParams {
            max_depth: self.settings.max_depth,
            min_samples_split: self.settings.min_samples_split,
            min_samples_leaf: self.settings.min_samples_leaf,
            max_features: self.features_per_split(n_features),
        };
        let labels = labels.to_vec();
        let mut rng = StdRng::seed_from_u64(self.settings.seed);

        self.n_features = n_features;
        self.trees = (0..self.settings.n_trees)
            .map(|_| {
                let mut tree_rng = StdRng::seed_from_u64(rng.gen());
                let samples: Vec<usize> = if self.settings.bootstrap {
                    (0..n).map(|_| tree_rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                DecisionTree::fit(features, &labels, samples, &params, &mut tree_rng)
            })
            .collect();

        let n_trees = self.trees.len() as f64;
        let mean_depth = self.trees.iter().map(|t| t.depth() as f64).sum::<f64>() / n_trees;
        let mean_leaves = self.trees.iter().map(|t| t.n_leaves() as f64).sum::<f64>() / n_trees;
        info!(
            "✓ Random forest fitted: {} trees, {} features per split, mean depth {:.1}, mean leaves {:.0}",
            self.trees.len(),
            params.max_features,
            mean_depth,
            mean_leaves
        );
        Ok(())
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Array1<bool>> {
        // Ties go to the negative class
        Ok(self.predict_probabilities(features)?.mapv(|p| p > 0.5))
    }

    /// Mean decrease in impurity, averaged over trees that split at least once and renormalised
    fn feature_importances(&self) -> Option<Array1<f64>> {
        if self.trees.is_empty() {
            return None;
        }

        let mut total = Array1::<f64>::zeros(self.n_features);
        let mut contributing = 0usize;
        for tree in self.trees.iter().filter(|t| t.node_count() > 1) {
            total += &Array1::from(tree.feature_importances());
            contributing += 1;
        }
        if contributing == 0 {
            return Some(total);
        }

        total /= contributing as f64;
        let sum = total.sum();
        if sum > 0.0 {
            total /= sum;
        }
        Some(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Label depends on feature 1 only; features 0 and 2 are noise
    fn noisy_dataset() -> (Array2<f64>, Array1<bool>) {
        let n = 120;
        let mut rng = StdRng::seed_from_u64(11);
        let x = Array2::from_shape_fn((n, 3), |(i, j)| match j {
            1 => (i % 10) as f64,
            _ => rng.gen_range(0.0..1.0),
        });
        let y = Array1::from_shape_fn(n, |i| (i % 10) >= 5);
        (x, y)
    }

    fn settings(n_trees: usize) -> ForestSettings {
        ForestSettings { n_trees, ..ForestSettings::default() }
    }

    #[test]
    fn test_features_per_split_defaults_to_sqrt() {
        let forest = RandomForest::new(ForestSettings::default());
        assert_eq!(forest.features_per_split(9), 3);
        assert_eq!(forest.features_per_split(3), 1);
        assert_eq!(forest.features_per_split(1), 1);

        let forest = RandomForest::new(ForestSettings { max_features: Some(20), ..ForestSettings::default() });
        assert_eq!(forest.features_per_split(9), 9);
    }

    #[test]
    fn test_importances_sum_to_one_and_find_signal() {
        let (x, y) = noisy_dataset();
        let mut forest = RandomForest::new(settings(30));
        forest.fit(&x, &y).unwrap();

        let importances = forest.feature_importances().unwrap();
        assert!((importances.sum() - 1.0).abs() < 1e-9);
        assert!(importances[1] > importances[0]);
        assert!(importances[1] > importances[2]);
    }

    #[test]
    fn test_fixed_seed_gives_identical_forests() {
        let (x, y) = noisy_dataset();
        let mut first = RandomForest::new(settings(20));
        let mut second = RandomForest::new(settings(20));
        first.fit(&x, &y).unwrap();
        second.fit(&x, &y).unwrap();

        assert_eq!(first.feature_importances(), second.feature_importances());
        assert_eq!(first.predict_probabilities(&x).unwrap(), second.predict_probabilities(&x).unwrap());
    }

    #[test]
    fn test_predicts_training_signal() {
        let (x, y) = noisy_dataset();
        let mut forest = RandomForest::new(settings(25));
        forest.fit(&x, &y).unwrap();

        let predictions = forest.predict(&x).unwrap();
        let correct = predictions.iter().zip(y.iter()).filter(|(p, t)| p == t).count();
        assert!(correct as f64 / y.len() as f64 > 0.95);
    }

    #[test]
    fn test_single_class_degrades_to_constant() {
        let x = Array2::from_shape_fn((10, 2), |(i, j)| (i + j) as f64);
        let y = Array1::from(vec![true; 10]);
        let mut forest = RandomForest::new(settings(5));
        forest.fit(&x, &y).unwrap();

        assert!(forest.predict(&x).unwrap().iter().all(|&p| p));
        assert_eq!(forest.feature_importances().unwrap().sum(), 0.0);
    }

    #[test]
    fn test_unfitted_forest() {
        let forest = RandomForest::new(settings(5));
        assert!(forest.predict(&Array2::zeros((1, 2))).is_err());
        assert!(forest.feature_importances().is_none());
    }
}
