use anyhow::{anyhow, Result};
use linfa::prelude::*;
use linfa_logistic::{FittedLogisticRegression, LogisticRegression};
use ndarray::{Array1, Array2};
use tracing::{debug, info};

use super::{Classifier, ModelKind};
use crate::config::LogisticSettings;

/// L2-regularised logistic regression baseline on the raw (unscaled) features
pub struct LogisticModel {
    settings: LogisticSettings,
    fitted: Option<FittedLogisticRegression<f64, bool>>,
}

impl LogisticModel {
    pub fn new(settings: LogisticSettings) -> Self {
        Self { settings, fitted: None }
    }

    pub fn coefficients(&self) -> Option<(Vec<f64>, f64)> {
        self.fitted
            .as_ref()
            .map(|model| (model.params().to_vec(), model.intercept()))
    }
}

impl Classifier for LogisticModel {
    fn kind(&self) -> ModelKind {
        ModelKind::LogisticRegression
    }

    fn fit(&mut self, features: &Array2<f64>, labels: &Array1<bool>) -> Result<()> {
        let positives = labels.iter().filter(|&&l| l).count();
        if positives == 0 || positives == labels.len() {
            return Err(anyhow!(
                "logistic regression needs both classes in the training labels ({} of {} positive)",
                positives,
                labels.len()
            ));
        }

        let dataset = Dataset::new(features.clone(), labels.clone());

        let model = LogisticRegression::default()
            .alpha(self.settings.alpha)
            .max_iterations(self.settings.max_iterations)
            .gradient_tolerance(self.settings.gradient_tolerance)
            .with_intercept(true)
            .fit(&dataset)
            .map_err(|e| anyhow!("logistic regression fit failed: {}", e))?;

        self.fitted = Some(model);

        if let Some((coefficients, intercept)) = self.coefficients() {
            debug!("Logistic coefficients: {:?}, intercept {:.4}", coefficients, intercept);
        }
        info!("✓ Logistic regression fitted on {} samples", features.nrows());
        Ok(())
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Array1<bool>> {
        let model = self.fitted.as_ref().ok_or_else(|| anyhow!("logistic regression is not fitted"))?;
        Ok(model.predict(features))
    }
}
