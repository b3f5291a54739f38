// ============================================================
// Layer 4 — Stratified K-Fold
// ============================================================
// Partitions row indices into k folds for cross-validation,
// keeping each class's share roughly equal in every fold.
//
// Each class's members are dealt out round-robin in row order:
//
//   class A rows: a0 a1 a2 a3 a4 a5 a6   (k = 3)
//   fold 0:       a0       a3       a6
//   fold 1:          a1       a4
//   fold 2:             a2       a5
//
// Fold f validates on its own rows and trains on the rest.
// Deterministic: no shuffling happens here.

use crate::domain::errors::FitError;

/// One cross-validation round
#[derive(Debug, Clone, PartialEq)]
pub struct Fold {
    pub train:      Vec<usize>,
    pub validation: Vec<usize>,
}

pub struct StratifiedKFold {
    n_folds: usize,
}

impl StratifiedKFold {
    /// A single fold has nothing to validate on, so `n_folds` must be ≥ 2.
    pub fn new(n_folds: usize) -> Result<Self, FitError> {
        if n_folds < 2 {
            return Err(FitError::InsufficientData(format!(
                "cross-validation needs at least 2 folds, got {n_folds}"
            )));
        }
        Ok(Self { n_folds })
    }

    /// Split the rows described by `targets` into folds.
    pub fn split(&self, targets: &[usize]) -> Vec<Fold> {
        let n_classes = targets.iter().copied().max().map_or(0, |m| m + 1);
        let mut seen  = vec![0usize; n_classes];
        let mut fold_of = Vec::with_capacity(targets.len());

        for &t in targets {
            fold_of.push(seen[t] % self.n_folds);
            seen[t] += 1;
        }

        (0..self.n_folds)
            .map(|f| {
                let (validation, train): (Vec<usize>, Vec<usize>) =
                    (0..targets.len()).partition(|&i| fold_of[i] == f);
                Fold { train, validation }
            })
            .collect()
    }
}
