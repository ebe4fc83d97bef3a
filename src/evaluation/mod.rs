pub mod importance;
pub mod metrics;

pub use importance::{rank_features, FeatureImportance};
pub use metrics::{ClassificationReport, ConfusionMatrix};

use anyhow::{Context, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ml::{Classifier, ModelKind};

/// Scores of one fitted model on the held-out rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEvaluation {
    pub model: ModelKind,
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
    pub report: ClassificationReport,
}

pub fn evaluate(model: &dyn Classifier, features: &Array2<f64>, labels: &Array1<bool>) -> Result<ModelEvaluation> {
    let kind = model.kind();
    let predicted = model
        .predict(features)
        .with_context(|| format!("{} failed to predict the test split", kind))?;

    let accuracy = metrics::accuracy(labels, &predicted)?;
    let confusion = ConfusionMatrix::from_predictions(labels, &predicted)?;
    let report = ClassificationReport::from_predictions(labels, &predicted)?;
    debug!("{}: accuracy={:.4} ({:?})", kind, accuracy, confusion);

    Ok(ModelEvaluation { model: kind, accuracy, confusion, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::MockClassifier;

    #[test]
    fn test_evaluate_uses_model_predictions() {
        let mut model = MockClassifier::new();
        model.expect_kind().return_const(ModelKind::Mlp);
        model
            .expect_predict()
            .times(1)
            .returning(|_| Ok(Array1::from(vec![true, false, false, true])));

        let features = Array2::zeros((4, 9));
        let labels = Array1::from(vec![true, false, true, true]);
        let evaluation = evaluate(&model, &features, &labels).unwrap();

        assert_eq!(evaluation.model, ModelKind::Mlp);
        assert_eq!(evaluation.accuracy, 0.75);
        assert_eq!(evaluation.confusion.false_negatives, 1);
        assert_eq!(evaluation.report.total, 4);
    }

    #[test]
    fn test_evaluate_propagates_prediction_failure() {
        let mut model = MockClassifier::new();
        model.expect_kind().return_const(ModelKind::RandomForest);
        model.expect_predict().returning(|_| Err(anyhow::anyhow!("not fitted")));

        let result = evaluate(&model, &Array2::zeros((1, 9)), &Array1::from(vec![true]));
        assert!(result.is_err());
    }
}
