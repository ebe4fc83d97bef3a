use anyhow::{anyhow, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub score: f64,
}

/// Pair scores with column names and sort descending. Equal scores keep column order.
pub fn rank_features(names: &[&str], scores: &Array1<f64>) -> Result<Vec<FeatureImportance>> {
    if names.len() != scores.len() {
        return Err(anyhow!("{} feature names but {} importance scores", names.len(), scores.len()));
    }

    let mut ranking: Vec<FeatureImportance> = names
        .iter()
        .zip(scores.iter())
        .map(|(name, &score)| FeatureImportance { feature: name.to_string(), score })
        .collect();
    ranking.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    Ok(ranking)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranks_descending() {
        let ranking = rank_features(&["gap", "markov", "lag1"], &Array1::from(vec![0.2, 0.5, 0.3])).unwrap();
        let order: Vec<&str> = ranking.iter().map(|f| f.feature.as_str()).collect();
        assert_eq!(order, vec!["markov", "lag1", "gap"]);
        assert_eq!(ranking[0].score, 0.5);
    }

    #[test]
    fn test_ties_keep_column_order() {
        let ranking = rank_features(&["a", "b", "c"], &Array1::from(vec![0.25, 0.5, 0.25])).unwrap();
        let order: Vec<&str> = ranking.iter().map(|f| f.feature.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(rank_features(&["a"], &Array1::from(vec![0.5, 0.5])).is_err());
    }
}
