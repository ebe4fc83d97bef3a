use anyhow::{anyhow, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

fn check_lengths(truth: &Array1<bool>, predicted: &Array1<bool>) -> Result<()> {
    if truth.len() != predicted.len() {
        return Err(anyhow!(
            "prediction count {} does not match label count {}",
            predicted.len(),
            truth.len()
        ));
    }
    Ok(())
}

/// Fraction of exact matches. Empty input scores 0.
pub fn accuracy(truth: &Array1<bool>, predicted: &Array1<bool>) -> Result<f64> {
    check_lengths(truth, predicted)?;
    if truth.is_empty() {
        return Ok(0.0);
    }
    let correct = truth.iter().zip(predicted.iter()).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / truth.len() as f64)
}

/// 2x2 outcome counts, positive class = hit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_positives: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(truth: &Array1<bool>, predicted: &Array1<bool>) -> Result<Self> {
        check_lengths(truth, predicted)?;
        let mut matrix = Self::default();
        for (&t, &p) in truth.iter().zip(predicted.iter()) {
            match (t, p) {
                (false, false) => matrix.true_negatives += 1,
                (false, true) => matrix.false_positives += 1,
                (true, false) => matrix.false_negatives += 1,
                (true, true) => matrix.true_positives += 1,
            }
        }
        Ok(matrix)
    }

    pub fn total(&self) -> usize {
        self.true_negatives + self.false_positives + self.false_negatives + self.true_positives
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_negatives + self.true_positives, self.total())
    }

    /// Metrics with `class` treated as the positive label
    pub fn class_metrics(&self, class: bool) -> ClassMetrics {
        let (tp, fp, fn_) = if class {
            (self.true_positives, self.false_positives, self.false_negatives)
        } else {
            (self.true_negatives, self.false_negatives, self.false_positives)
        };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        ClassMetrics {
            label: if class { "1" } else { "0" }.to_string(),
            precision,
            recall,
            f1,
            support: tp + fn_,
        }
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>14}{:>10}{:>10}", "", "pred 0", "pred 1")?;
        writeln!(f, "{:>14}{:>10}{:>10}", "actual 0", self.true_negatives, self.false_positives)?;
        write!(f, "{:>14}{:>10}{:>10}", "actual 1", self.false_negatives, self.true_positives)
    }
}

/// Zero denominators score 0
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class precision/recall/F1 plus macro and support-weighted averages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    pub total: usize,
}

impl ClassificationReport {
    /// Only classes present in either the truth or the predictions get a row
    pub fn from_predictions(truth: &Array1<bool>, predicted: &Array1<bool>) -> Result<Self> {
        let matrix = ConfusionMatrix::from_predictions(truth, predicted)?;
        let present = |class: bool| truth.iter().chain(predicted.iter()).any(|&v| v == class);

        let classes: Vec<ClassMetrics> = [false, true]
            .into_iter()
            .filter(|&c| present(c))
            .map(|c| matrix.class_metrics(c))
            .collect();

        let total = matrix.total();
        let n_classes = classes.len().max(1) as f64;
        let macro_avg = ClassMetrics {
            label: "macro avg".to_string(),
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / n_classes,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / n_classes,
            f1: classes.iter().map(|c| c.f1).sum::<f64>() / n_classes,
            support: total,
        };

        let weight = |c: &ClassMetrics| if total == 0 { 0.0 } else { c.support as f64 / total as f64 };
        let weighted_avg = ClassMetrics {
            label: "weighted avg".to_string(),
            precision: classes.iter().map(|c| c.precision * weight(c)).sum(),
            recall: classes.iter().map(|c| c.recall * weight(c)).sum(),
            f1: classes.iter().map(|c| c.f1 * weight(c)).sum(),
            support: total,
        };

        Ok(Self {
            classes,
            accuracy: matrix.accuracy(),
            macro_avg,
            weighted_avg,
            total,
        })
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>12}{:>10}{:>10}{:>10}{:>10}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for class in &self.classes {
            write_row(f, class)?;
        }
        writeln!(f)?;
        writeln!(f, "{:>12}{:>10}{:>10}{:>10.2}{:>10}", "accuracy", "", "", self.accuracy, self.total)?;
        write_row(f, &self.macro_avg)?;
        write_row(f, &self.weighted_avg)
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, m: &ClassMetrics) -> fmt::Result {
    writeln!(f, "{:>12}{:>10.2}{:>10.2}{:>10.2}{:>10}", m.label, m.precision, m.recall, m.f1, m.support)
}
