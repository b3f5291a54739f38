// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams the rest of the system is written against:
//
//   MeasurementSource — anything that yields labelled rows
//   Classifier        — multiclass fit / predict / predict_proba
//   BinaryClassifier  — a yes/no learner, lifted to multiclass
//                       by the one-vs-rest wrapper
//
// Every model family (kernel SVM, k-NN, trees, forest,
// boosted trees, neural net) implements one of the two model
// traits, so the model bank can treat them uniformly.

use crate::domain::errors::{DataFormatError, FitError};
use crate::domain::measurement::MeasurementTable;

// ─── MeasurementSource ────────────────────────────────────────────────────────
/// Any component that can load the labelled TCO measurements.
///
/// Implementations:
///   - CsvMeasurementLoader → reads the dataset CSV
pub trait MeasurementSource {
    fn load(&self) -> Result<MeasurementTable, DataFormatError>;
}

// ─── Classifier ───────────────────────────────────────────────────────────────
/// A trainable multiclass classifier.
///
/// `x` rows are feature vectors in schema order, `y` holds class
/// indices in `[0, n_classes)`. A class may be absent from `y`
/// (small cross-validation folds); its probability is then 0.
pub trait Classifier {
    /// Fit on the given rows. Refitting replaces all learned state.
    fn fit(&mut self, x: &[Vec<f64>], y: &[usize], n_classes: usize) -> Result<(), FitError>;

    /// One probability row of length `n_classes` per input row.
    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, FitError>;

    /// Most probable class per row.
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<usize>, FitError> {
        Ok(self.predict_proba(x)?.iter().map(|p| argmax(p)).collect())
    }
}

// ─── BinaryClassifier ─────────────────────────────────────────────────────────
/// A natively binary learner (positive vs. rest).
pub trait BinaryClassifier {
    fn fit_binary(&mut self, x: &[Vec<f64>], y: &[bool]) -> Result<(), FitError>;

    /// Estimated P(positive | x) in [0, 1]
    fn positive_probability(&self, x: &[f64]) -> Result<f64, FitError>;
}

/// Index of the largest entry; ties resolve to the lowest index.
pub fn argmax(row: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in row.iter().enumerate() {
        if v > row[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_prefers_first_on_tie() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), 1);
        assert_eq!(argmax(&[0.9, 0.05, 0.05]), 0);
        assert_eq!(argmax(&[]), 0);
    }
}
