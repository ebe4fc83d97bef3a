use anyhow::{anyhow, Result};
use chrono::Utc;
use ndarray::{Array1, Array2};
use std::time::Instant;
use tracing::info;

use crate::config::{ensure_valid, ExperimentConfig};
use crate::data::{feature_matrix, label_vector, ChronologicalSplit, DatasetSource, HitFeatures};
use crate::error::ExperimentError;
use crate::evaluation::{evaluate, rank_features};
use crate::ml::{Classifier, ModelSuite};
use crate::report::{ComparisonReport, Conclusion};

/// Load → split → fit three models → evaluate → summarise
pub struct Experiment {
    config: ExperimentConfig,
}

impl Experiment {
    pub fn new(config: ExperimentConfig) -> Result<Self, ExperimentError> {
        ensure_valid(&config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn run(&self, source: &dyn DatasetSource, mut models: ModelSuite) -> Result<ComparisonReport> {
        info!("━━━ Step 1: Loading data from {} ━━━", source.describe());
        let dataset = source.load()?;
        info!("✓ Loaded {} samples ({} hits)", dataset.len(), dataset.positives());

        info!("━━━ Step 2: Chronological split ━━━");
        let split = ChronologicalSplit::non_empty(dataset.rows(), self.config.data.train_fraction)?;
        info!(
            "✓ Training on {} samples, testing on {} samples.",
            split.train.len(),
            split.test.len()
        );
        let (x_train, y_train) = (feature_matrix(split.train), label_vector(split.train));
        let (x_test, y_test) = (feature_matrix(split.test), label_vector(split.test));

        info!("━━━ Step 3: Training models ━━━");
        fit_model(models.baseline.as_mut(), &x_train, &y_train)?;
        fit_model(models.network.as_mut(), &x_train, &y_train)?;
        fit_model(models.forest.as_mut(), &x_train, &y_train)?;

        info!("━━━ Step 4: Evaluating on held-out slice ━━━");
        let evaluations = vec![
            evaluate(models.baseline.as_ref(), &x_test, &y_test)?,
            evaluate(models.network.as_ref(), &x_test, &y_test)?,
            evaluate(models.forest.as_ref(), &x_test, &y_test)?,
        ];
        for evaluation in &evaluations {
            info!("  {}: {:.2}%", evaluation.model, evaluation.accuracy * 100.0);
        }

        let importances = models
            .forest
            .feature_importances()
            .ok_or_else(|| anyhow!("{} does not expose feature importances", models.forest.kind()))?;
        let feature_importance = rank_features(&HitFeatures::NAMES, &importances)?;

        info!("━━━ Step 5: Building report ━━━");
        let conclusion = Conclusion::from_evaluations(&evaluations, self.config.report.success_threshold)
            .ok_or_else(|| anyhow!("no baseline evaluation to compare against"))?;

        Ok(ComparisonReport {
            generated_at: Utc::now(),
            source: source.describe(),
            total_samples: dataset.len(),
            train_samples: split.train.len(),
            test_samples: split.test.len(),
            evaluations,
            feature_importance,
            detailed_model: self.config.report.detailed_model,
            conclusion,
        })
    }
}

fn fit_model(model: &mut dyn Classifier, features: &Array2<f64>, labels: &Array1<bool>) -> Result<()> {
    let kind = model.kind();
    info!("Training {}...", kind.display_name());
    let started = Instant::now();
    model
        .fit(features, labels)
        .map_err(|e| ExperimentError::training(kind, format!("{:#}", e)))?;
    info!("✓ {} trained in {:.2}s", kind, started.elapsed().as_secs_f64());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::Dataset;
    use crate::data::{MockDatasetSource, Observation};
    use crate::ml::{MockClassifier, ModelKind};
    use crate::report::Verdict;
    use std::path::PathBuf;

    /// Hits follow `gap > 0.5`, the other features are filler
    fn synthetic_dataset(n: usize) -> Dataset {
        let rows = (0..n)
            .map(|i| {
                let gap = ((i * 37) % 100) as f64 / 100.0;
                let mut values = [0.0; HitFeatures::NUM_FEATURES];
                values[0] = ((i * 13) % 7) as f64 / 7.0 - 0.5;
                values[1] = gap;
                values[2] = ((i * 29) % 11) as f64 / 11.0;
                values[5] = (i % 2) as f64;
                values[7] = ((i * 5) % 3) as f64 / 3.0;
                Observation::new(HitFeatures::from_array(values), gap > 0.5)
            })
            .collect();
        Dataset::new(rows)
    }

    fn source_with(dataset: Dataset) -> MockDatasetSource {
        let mut source = MockDatasetSource::new();
        source.expect_describe().return_const("in-memory".to_string());
        source.expect_load().returning(move || Ok(dataset.clone()));
        source
    }

    fn untouched_model(kind: ModelKind) -> Box<dyn Classifier> {
        let mut model = MockClassifier::new();
        model.expect_kind().return_const(kind);
        model.expect_fit().times(0);
        model.expect_predict().times(0);
        Box::new(model)
    }

    fn untouched_suite() -> ModelSuite {
        ModelSuite {
            baseline: untouched_model(ModelKind::LogisticRegression),
            network: untouched_model(ModelKind::Mlp),
            forest: untouched_model(ModelKind::RandomForest),
        }
    }

    fn fast_config() -> ExperimentConfig {
        let mut config = ExperimentConfig::default();
        config.forest.n_trees = 15;
        config.mlp.max_iter = 60;
        config
    }

    #[test]
    fn test_missing_file_skips_training() {
        let mut source = MockDatasetSource::new();
        source.expect_describe().return_const("neural_training_data.csv".to_string());
        source
            .expect_load()
            .times(1)
            .returning(|| Err(ExperimentError::DataNotFound { path: PathBuf::from("neural_training_data.csv") }));

        let experiment = Experiment::new(ExperimentConfig::default()).unwrap();
        let err = experiment.run(&source, untouched_suite()).unwrap_err();

        let typed = err.downcast_ref::<ExperimentError>().unwrap();
        assert!(typed.is_data_not_found());
    }

    #[test]
    fn test_empty_split_fails_before_training() {
        let experiment = Experiment::new(ExperimentConfig::default()).unwrap();
        let err = experiment.run(&source_with(synthetic_dataset(1)), untouched_suite()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExperimentError>(),
            Some(ExperimentError::EmptySplit { train: 0, test: 1 })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = ExperimentConfig::default();
        config.forest.n_trees = 0;
        assert!(matches!(Experiment::new(config), Err(ExperimentError::InvalidConfig(_))));
    }

    #[test]
    fn test_each_model_fitted_once_and_scored() {
        fn scripted(kind: ModelKind, predictions: Vec<bool>, importances: Option<Vec<f64>>) -> Box<dyn Classifier> {
            let mut model = MockClassifier::new();
            model.expect_kind().return_const(kind);
            model.expect_fit().times(1).returning(|x, y| {
                assert_eq!(x.nrows(), 8);
                assert_eq!(y.len(), 8);
                Ok(())
            });
            model
                .expect_predict()
                .times(1)
                .returning(move |x| {
                    assert_eq!(x.nrows(), 2);
                    Ok(Array1::from(predictions.clone()))
                });
            model
                .expect_feature_importances()
                .returning(move || importances.clone().map(Array1::from));
            Box::new(model)
        }

        // Rows 8 and 9 form the test slice: 37*8 % 100 = 96 (hit), 37*9 % 100 = 33 (miss)
        let models = ModelSuite {
            baseline: scripted(ModelKind::LogisticRegression, vec![false, false], None),
            network: scripted(ModelKind::Mlp, vec![true, true], None),
            forest: scripted(
                ModelKind::RandomForest,
                vec![true, false],
                Some(vec![0.05, 0.6, 0.05, 0.05, 0.05, 0.05, 0.05, 0.05, 0.05]),
            ),
        };

        let experiment = Experiment::new(ExperimentConfig::default()).unwrap();
        let report = experiment.run(&source_with(synthetic_dataset(10)), models).unwrap();

        assert_eq!((report.train_samples, report.test_samples), (8, 2));
        assert_eq!(report.evaluation(ModelKind::LogisticRegression).unwrap().accuracy, 0.5);
        assert_eq!(report.evaluation(ModelKind::Mlp).unwrap().accuracy, 0.5);
        assert_eq!(report.evaluation(ModelKind::RandomForest).unwrap().accuracy, 1.0);
        assert_eq!(report.feature_importance[0].feature, "gap");
        assert_eq!(report.conclusion.best_model, ModelKind::RandomForest);
        assert_eq!(report.conclusion.verdict, Verdict::Success);
        assert!((report.conclusion.improvement_pct - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_full_pipeline_with_real_models() {
        let experiment = Experiment::new(fast_config()).unwrap();
        let models = ModelSuite::from_config(experiment.config());
        let report = experiment.run(&source_with(synthetic_dataset(200)), models).unwrap();

        assert_eq!(report.total_samples, 200);
        assert_eq!(report.train_samples, 160);
        assert_eq!(report.test_samples, 40);
        assert_eq!(report.evaluations.len(), 3);
        for evaluation in &report.evaluations {
            assert!((0.0..=1.0).contains(&evaluation.accuracy));
            assert_eq!(evaluation.confusion.total(), 40);
        }

        let total: f64 = report.feature_importance.iter().map(|f| f.score).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(report.feature_importance.len(), HitFeatures::NUM_FEATURES);
        assert_eq!(report.feature_importance[0].feature, "gap");
    }

    #[test]
    fn test_importance_ranking_stable_for_fixed_seed() {
        let experiment = Experiment::new(fast_config()).unwrap();
        let first = experiment
            .run(&source_with(synthetic_dataset(150)), ModelSuite::from_config(experiment.config()))
            .unwrap();
        let second = experiment
            .run(&source_with(synthetic_dataset(150)), ModelSuite::from_config(experiment.config()))
            .unwrap();

        assert_eq!(first.feature_importance, second.feature_importance);
        assert_eq!(first.evaluations, second.evaluations);
    }
}
