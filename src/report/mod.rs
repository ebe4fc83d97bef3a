use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::info;

use crate::evaluation::{FeatureImportance, ModelEvaluation};
use crate::ml::ModelKind;

/// `(best - baseline) / baseline * 100`, or 0 when the baseline scored nothing
pub fn improvement_over_baseline(best: f64, baseline: f64) -> f64 {
    if baseline > 0.0 {
        (best - baseline) / baseline * 100.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Success,
    Neutral,
}

/// Closing recommendation derived from the best accuracy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conclusion {
    pub verdict: Verdict,
    pub best_model: ModelKind,
    pub best_accuracy: f64,
    pub baseline_accuracy: f64,
    pub improvement_pct: f64,
    pub threshold: f64,
}

impl Conclusion {
    /// `evaluations` must contain the baseline; the best model wins ties by list order
    pub fn from_evaluations(evaluations: &[ModelEvaluation], threshold: f64) -> Option<Self> {
        let baseline_accuracy = evaluations
            .iter()
            .find(|e| e.model == ModelKind::LogisticRegression)?
            .accuracy;
        let best = evaluations
            .iter()
            .fold(None::<&ModelEvaluation>, |best, e| match best {
                Some(b) if b.accuracy >= e.accuracy => Some(b),
                _ => Some(e),
            })?;

        let verdict = if best.accuracy > threshold { Verdict::Success } else { Verdict::Neutral };
        Some(Self {
            verdict,
            best_model: best.model,
            best_accuracy: best.accuracy,
            baseline_accuracy,
            improvement_pct: improvement_over_baseline(best.accuracy, baseline_accuracy),
            threshold,
        })
    }

    pub fn lines(&self) -> Vec<String> {
        match self.verdict {
            Verdict::Success => vec![
                format!("   SUCCESS: Advanced models achieve {:.1}% accuracy.", self.best_accuracy * 100.0),
                format!("   Improvement over baseline: +{:.1}%", self.improvement_pct),
                "   RECOMMENDATION: Moving to a persistent inference engine built on the best model could yield significant gains."
                    .to_string(),
            ],
            Verdict::Neutral => vec![
                format!("   NEUTRAL: Models achieve {:.1}% accuracy.", self.best_accuracy * 100.0),
                "   Betting outcomes are high-variance. The current heuristic model provides reasonable value."
                    .to_string(),
            ],
        }
    }
}

/// Everything the experiment found, ready to print or export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub total_samples: usize,
    pub train_samples: usize,
    pub test_samples: usize,
    /// Baseline, MLP, forest, in training order
    pub evaluations: Vec<ModelEvaluation>,
    pub feature_importance: Vec<FeatureImportance>,
    pub detailed_model: ModelKind,
    pub conclusion: Conclusion,
}

impl ComparisonReport {
    pub fn evaluation(&self, model: ModelKind) -> Option<&ModelEvaluation> {
        self.evaluations.iter().find(|e| e.model == model)
    }

    /// Evaluations sorted by accuracy, best first (stable for ties)
    pub fn ranked(&self) -> Vec<&ModelEvaluation> {
        let mut ranked: Vec<&ModelEvaluation> = self.evaluations.iter().collect();
        ranked.sort_by(|a, b| b.accuracy.partial_cmp(&a.accuracy).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }

    /// Pretty print results to console
    pub fn print_summary(&self) {
        print!("{}", self);
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("failed to write report to {}", path.display()))?;
        info!("✓ Report exported to {}", path.display());
        Ok(())
    }
}

impl fmt::Display for ComparisonReport {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(out, "\n{}", "=".repeat(60))?;
        writeln!(out, "            MODEL COMPARISON (HIT WITHIN 5 DRAWS)")?;
        writeln!(out, "{}", "=".repeat(60))?;
        writeln!(out, "Source:             {}", self.source)?;
        writeln!(out, "Samples:            {}", self.total_samples)?;
        writeln!(
            out,
            "Training on {} samples, testing on {} samples.",
            self.train_samples, self.test_samples
        )?;

        writeln!(out, "\nMODEL PERFORMANCES (Accuracy on unseen data)")?;
        writeln!(out, "{}", "-".repeat(50))?;
        for (rank, evaluation) in self.ranked().iter().enumerate() {
            let label = format!("{}:", evaluation.model.display_name());
            writeln!(out, "  {}. {:<32}{:>6.2}%", rank + 1, label, evaluation.accuracy * 100.0)?;
        }
        writeln!(out, "{}", "-".repeat(50))?;

        if let Some(detailed) = self.evaluation(self.detailed_model) {
            let heading = match detailed.model {
                ModelKind::LogisticRegression => "LOGISTIC REGRESSION",
                ModelKind::Mlp => "MLP",
                ModelKind::RandomForest => "RANDOM FOREST",
            };
            writeln!(out, "\nDETAILED ANALYSIS ({})", heading)?;
            writeln!(out, "{}", detailed.report)?;
            writeln!(out, "Confusion matrix:")?;
            writeln!(out, "{}", detailed.confusion)?;
        }

        writeln!(out, "\nFEATURE IMPORTANCE (What matters most?)")?;
        for item in &self.feature_importance {
            writeln!(out, "  {:<12}{:>10.6}", item.feature, item.score)?;
        }

        writeln!(out, "\nRESEARCH CONCLUSION")?;
        for line in self.conclusion.lines() {
            writeln!(out, "{}", line)?;
        }
        writeln!(out, "{}", "=".repeat(60))
    }
}
