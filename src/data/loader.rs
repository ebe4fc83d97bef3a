use ndarray::{Array1, Array2};
use serde::Deserialize;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{HitFeatures, Observation};
use crate::error::ExperimentError;

pub const LABEL_COLUMN: &str = "hit_in_5";

/// Time-ordered table of observations, in file order
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Vec<Observation>,
}

impl Dataset {
    pub fn new(rows: Vec<Observation>) -> Self {
        Self { rows }
    }

    /// Parse a CSV stream with a header row. Columns are matched by name; unknown columns are ignored.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ExperimentError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let missing: Vec<String> = HitFeatures::NAMES
            .iter()
            .copied()
            .chain(std::iter::once(LABEL_COLUMN))
            .filter(|name| !headers.iter().any(|h| h == *name))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(ExperimentError::MissingColumns(missing));
        }

        let mut rows = Vec::new();
        for (idx, record) in csv_reader.deserialize::<CsvRecord>().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(e) if e.is_io_error() => return Err(ExperimentError::Csv(e)),
                Err(e) => {
                    return Err(ExperimentError::MalformedRow { row: idx + 1, reason: e.to_string() })
                }
            };
            rows.push(record.into_observation(idx + 1)?);
        }

        if rows.is_empty() {
            return Err(ExperimentError::EmptyDataset);
        }

        Ok(Self::new(rows))
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn positives(&self) -> usize {
        self.rows.iter().filter(|o| o.hit_in_5).count()
    }
}

/// Build the (n x 9) feature matrix for a run of rows
pub fn feature_matrix(rows: &[Observation]) -> Array2<f64> {
    let mut features = Array2::<f64>::zeros((rows.len(), HitFeatures::NUM_FEATURES));
    for (i, obs) in rows.iter().enumerate() {
        for (j, &val) in obs.features.to_array().iter().enumerate() {
            features[[i, j]] = val;
        }
    }
    features
}

pub fn label_vector(rows: &[Observation]) -> Array1<bool> {
    rows.iter().map(|o| o.hit_in_5).collect()
}

#[derive(Debug, Deserialize)]
struct CsvRecord {
    momentum: f64,
    gap: f64,
    markov: f64,
    pattern: f64,
    algebraic: f64,
    lag1: f64,
    lag2: f64,
    #[serde(rename = "hmmState")]
    hmm_state: f64,
    resonance: f64,
    hit_in_5: f64,
}

impl CsvRecord {
    fn into_observation(self, row: usize) -> Result<Observation, ExperimentError> {
        let features = HitFeatures::from_array([
            self.momentum,
            self.gap,
            self.markov,
            self.pattern,
            self.algebraic,
            self.lag1,
            self.lag2,
            self.hmm_state,
            self.resonance,
        ]);

        let hit = if self.hit_in_5 == 0.0 {
            false
        } else if self.hit_in_5 == 1.0 {
            true
        } else {
            return Err(ExperimentError::MalformedRow {
                row,
                reason: format!("{} must be 0 or 1, got {}", LABEL_COLUMN, self.hit_in_5),
            });
        };

        if let Some(pos) = features.to_array().iter().position(|v| !v.is_finite()) {
            return Err(ExperimentError::MalformedRow {
                row,
                reason: format!("{} is not a finite number", HitFeatures::NAMES[pos]),
            });
        }

        Ok(Observation::new(features, hit))
    }
}

/// Where the experiment gets its rows from
#[cfg_attr(test, mockall::automock)]
pub trait DatasetSource {
    /// Human-readable origin, used in log lines
    fn describe(&self) -> String;

    fn load(&self) -> Result<Dataset, ExperimentError>;
}

/// Dataset stored as a CSV file on disk
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    path: PathBuf,
}

impl CsvFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl DatasetSource for CsvFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Dataset, ExperimentError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ExperimentError::DataNotFound { path: self.path.clone() });
            }
            Err(e) => return Err(ExperimentError::Csv(csv::Error::from(e))),
        };
        debug!("Opened {}", self.path.display());

        let dataset = Dataset::from_reader(file)?;
        info!("Loaded {} samples from history.", dataset.len());
        Ok(dataset)
    }
}
