// ============================================================
// Layer 4 — Feature Standardiser
// ============================================================
// Zero-mean, unit-variance scaling per feature:
//
//   z = (x − mean) / std
//
// The four raw features live on wildly different scales
// (absorbance ≤ 1, optical density up to 100000). Distance-
// and gradient-based models (k-NN, SVM, MLP, boosted trees on
// standardised inputs) need them on a common scale.
//
// Rules:
//   1. fit() sees the TRAINING rows only
//   2. the same mean/std are applied to test rows and to every
//      inference request
//   3. a constant feature (std = 0) gets scale 1 so it maps to 0
//
// Reference: Rust Book §13 (Iterators)

use serde::{Deserialize, Serialize};

use crate::domain::errors::FitError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean:  Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn per-feature mean and population standard deviation.
    pub fn fit(&mut self, x: &[Vec<f64>]) -> Result<(), FitError> {
        let n = x.len();
        if n == 0 {
            return Err(FitError::InsufficientData("cannot standardise zero rows".into()));
        }
        let d = x[0].len();

        let mut mean = vec![0.0; d];
        for row in x {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n as f64);

        let mut var = vec![0.0; d];
        for row in x {
            for ((s, v), m) in var.iter_mut().zip(row).zip(&mean) {
                *s += (v - m) * (v - m);
            }
        }

        let scale: Vec<f64> = var
            .into_iter()
            .map(|s| {
                let std = (s / n as f64).sqrt();
                if std > f64::EPSILON { std } else { 1.0 }
            })
            .collect();

        if mean.iter().chain(&scale).any(|v| !v.is_finite()) {
            return Err(FitError::Numerical("non-finite feature statistics".into()));
        }

        self.mean  = mean;
        self.scale = scale;
        Ok(())
    }

    /// Standardise a single row.
    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }

    /// Standardise many rows.
    pub fn transform(&self, x: &[Vec<f64>]) -> Vec<Vec<f64>> {
        x.iter().map(|row| self.transform_row(row)).collect()
    }
}
