// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Typed errors for every failure category the engine knows.
//
//   DataFormatError  — dataset unusable, training aborts
//   BalancingError   — a class cannot be resampled, training aborts
//   FitError         — one candidate failed, the bank moves on
//   SelectionError   — nothing fit to persist, training aborts
//   ClassifyError    — one request failed, the service keeps running
//
// Orchestration code (application + CLI) wraps these with
// anyhow::Context; the typed variants stay matchable below it.

use thiserror::Error;

/// The dataset is missing columns or contains unreadable cells.
#[derive(Debug, Error)]
pub enum DataFormatError {
    #[error("dataset is missing required column(s): {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("row {row}, column '{column}': '{value}' is not a number")]
    InvalidNumber {
        row:    usize,
        column: String,
        value:  String,
    },

    #[error("dataset contains no complete rows")]
    Empty,

    #[error("cannot read dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed CSV: {0}")]
    Csv(String),
}

/// A class in the training partition cannot be oversampled.
#[derive(Debug, Error)]
pub enum BalancingError {
    #[error("training partition is empty")]
    EmptyTrainingSet,

    #[error("class '{class}' has {members} member(s); at least 2 are needed to interpolate")]
    TooFewMembers { class: String, members: usize },

    #[error("class '{class}' has no rows in the training partition; nothing to oversample")]
    AbsentClass { class: String },
}

/// A single candidate pipeline failed to fit or score.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FitError {
    #[error("insufficient training data: {0}")]
    InsufficientData(String),

    #[error("did not converge: {0}")]
    NonConvergence(String),

    #[error("numerical failure: {0}")]
    Numerical(String),

    #[error("model not fitted")]
    NotFitted,

    #[error("{0}")]
    Backend(String),
}

/// No candidate can be persisted under the requested policy.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SelectionError {
    #[error("no candidate named '{name}' (available: {})", available.join(", "))]
    UnknownCandidate { name: String, available: Vec<String> },

    #[error("candidate '{name}' failed and cannot be selected: {reason}")]
    CandidateFailed { name: String, reason: String },

    #[error("every candidate failed to fit")]
    NoneSucceeded,
}

/// Failure of a single classification request.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClassifyError {
    #[error("please enter a valid value for: {}", features.join(", "))]
    MissingFeature { features: Vec<String> },

    #[error("inference failed: {0}")]
    Inference(String),
}

/// Persisted artifacts cannot be written, read or paired.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact '{path}' not found; run `train` first")]
    NotFound { path: String },

    #[error("pipeline (pair {pipeline}) and label codec (pair {codec}) come from different training runs")]
    PairMismatch { pipeline: u64, codec: u64 },

    #[error("pipeline predicts {pipeline} classes but the label codec has {codec}")]
    ClassCountMismatch { pipeline: usize, codec: usize },

    #[error("i/o error on '{path}': {source}")]
    Io {
        path:   String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot (de)serialise '{path}': {source}")]
    Serde {
        path:   String,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_feature_message_lists_all() {
        let e = ClassifyError::MissingFeature {
            features: vec!["Wavelength".into(), "Optical Density".into()],
        };
        assert_eq!(
            e.to_string(),
            "please enter a valid value for: Wavelength, Optical Density"
        );
    }

    #[test]
    fn test_missing_columns_message() {
        let e = DataFormatError::MissingColumns {
            missing: vec!["Material".into(), "Transmission".into()],
        };
        assert!(e.to_string().contains("Material, Transmission"));
    }
}
