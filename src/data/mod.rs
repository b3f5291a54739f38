// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the dataset CSV and the rows a model is
// fitted on.
//
//   dataset CSV
//       │
//       ▼
//   CsvMeasurementLoader → column checks, schema-ordered rows
//       │
//       ▼
//   Dataset::encode      → class indices via the label codec
//       │
//       ▼
//   split_train_test     → seeded 80/20 partition
//       │
//       ▼
//   SmoteBalancer        → oversampled TRAIN partition only
//       │
//       ▼
//   StandardScaler       → per-candidate preprocessing step
//
// StratifiedKFold and MeasurementBatcher support the learning
// curves and the neural classifier respectively.

/// Reads the labelled measurement CSV
pub mod loader;

/// Encoded feature rows + class indices
pub mod dataset;

/// Seeded train/test split
pub mod splitter;

/// SMOTE oversampling of the training partition
pub mod balancer;

/// Zero-mean, unit-variance feature scaling
pub mod preprocessor;

/// Stratified k-fold index partitions
pub mod folds;

/// Tensor batches for the burn training loop
pub mod batcher;

#[cfg(test)]
pub mod fixtures;
