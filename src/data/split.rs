use super::Observation;
use crate::error::ExperimentError;

/// Fraction of rows used for training when nothing else is configured
pub const DEFAULT_TRAIN_FRACTION: f64 = 0.8;

/// Boundary between train and test rows: `floor(n * fraction)`
pub fn split_index(n: usize, train_fraction: f64) -> usize {
    ((n as f64 * train_fraction).floor() as usize).min(n)
}

/// Positional train/test partition of time-ordered rows.
/// `train` is the prefix `[0, split_idx)`, `test` the suffix `[split_idx, n)`.
#[derive(Debug, Clone, Copy)]
pub struct ChronologicalSplit<'a> {
    pub train: &'a [Observation],
    pub test: &'a [Observation],
    pub split_idx: usize,
}

impl<'a> ChronologicalSplit<'a> {
    /// Split without shuffling. Either side may come back empty; see [`Self::non_empty`].
    pub fn new(rows: &'a [Observation], train_fraction: f64) -> Self {
        let split_idx = split_index(rows.len(), train_fraction);
        let (train, test) = rows.split_at(split_idx);
        Self { train, test, split_idx }
    }

    /// Split and refuse to continue if either side has no rows
    pub fn non_empty(rows: &'a [Observation], train_fraction: f64) -> Result<Self, ExperimentError> {
        let split = Self::new(rows, train_fraction);
        if split.train.is_empty() || split.test.is_empty() {
            return Err(ExperimentError::EmptySplit {
                train: split.train.len(),
                test: split.test.len(),
            });
        }
        Ok(split)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::HitFeatures;

    fn rows(n: usize) -> Vec<Observation> {
        (0..n)
            .map(|i| Observation::new(HitFeatures::from_array([i as f64; 9]), i % 2 == 0))
            .collect()
    }

    #[test]
    fn test_split_index_reference_sizes() {
        assert_eq!(split_index(100, DEFAULT_TRAIN_FRACTION), 80);
        assert_eq!(split_index(5, DEFAULT_TRAIN_FRACTION), 4);
        assert_eq!(split_index(1, DEFAULT_TRAIN_FRACTION), 0);
        assert_eq!(split_index(0, DEFAULT_TRAIN_FRACTION), 0);
    }

    #[test]
    fn test_split_is_prefix_and_suffix() {
        for n in [2usize, 3, 7, 10, 49, 100, 257] {
            let data = rows(n);
            let split = ChronologicalSplit::new(&data, DEFAULT_TRAIN_FRACTION);
            let expected_train = (n as f64 * 0.8).floor() as usize;

            assert_eq!(split.train.len(), expected_train);
            assert_eq!(split.test.len(), n - expected_train);
            assert_eq!(split.split_idx, expected_train);

            let rejoined: Vec<Observation> = split.train.iter().chain(split.test.iter()).cloned().collect();
            assert_eq!(rejoined, data);
        }
    }

    #[test]
    fn test_empty_partition_fails_fast() {
        let data = rows(1);
        match ChronologicalSplit::non_empty(&data, DEFAULT_TRAIN_FRACTION) {
            Err(ExperimentError::EmptySplit { train, test }) => {
                assert_eq!(train, 0);
                assert_eq!(test, 1);
            }
            other => panic!("expected EmptySplit, got {:?}", other.map(|s| s.split_idx)),
        }

        let data = rows(5);
        assert!(ChronologicalSplit::non_empty(&data, DEFAULT_TRAIN_FRACTION).is_ok());
    }
}
