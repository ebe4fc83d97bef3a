pub mod features;
pub mod loader;
pub mod split;

pub use features::{HitFeatures, Observation};
pub use loader::{feature_matrix, label_vector, CsvFileSource, DatasetSource};
pub use split::{ChronologicalSplit, DEFAULT_TRAIN_FRACTION};

#[cfg(test)]
pub use loader::MockDatasetSource;
