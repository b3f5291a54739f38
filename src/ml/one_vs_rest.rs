// ============================================================
// Layer 5 — One-vs-Rest Wrapper
// ============================================================
// Lifts a BinaryClassifier to K classes: estimator c learns
// "class c vs. everything else", then the K positive
// probabilities are normalised into one distribution.
//
//   raw_c   = P_c(positive | x)
//   P(c|x)  = raw_c / Σ raw
//
// If every estimator says 0, the row falls back to uniform.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::errors::FitError;
use crate::domain::traits::{BinaryClassifier, Classifier};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneVsRest<C> {
    template:   C,
    estimators: Vec<C>,
    n_classes:  usize,
}

impl<C: BinaryClassifier + Clone> OneVsRest<C> {
    /// `template` is cloned once per class before fitting.
    pub fn new(template: C) -> Self {
        Self { template, estimators: Vec::new(), n_classes: 0 }
    }

    pub fn estimators(&self) -> &[C] {
        &self.estimators
    }
}

impl<C> Classifier for OneVsRest<C>
where
    C: BinaryClassifier + Clone + Send + Sync,
{
    fn fit(&mut self, x: &[Vec<f64>], y: &[usize], n_classes: usize) -> Result<(), FitError> {
        if n_classes < 2 {
            return Err(FitError::InsufficientData(format!(
                "one-vs-rest needs at least 2 classes, got {n_classes}"
            )));
        }

        let estimators: Result<Vec<C>, FitError> = (0..n_classes)
            .into_par_iter()
            .map(|class| {
                let labels: Vec<bool> = y.iter().map(|&t| t == class).collect();
                let mut est = self.template.clone();
                est.fit_binary(x, &labels)?;
                Ok(est)
            })
            .collect();

        self.estimators = estimators?;
        self.n_classes  = n_classes;
        Ok(())
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, FitError> {
        if self.estimators.is_empty() {
            return Err(FitError::NotFitted);
        }
        x.iter()
            .map(|row| {
                let raw = self
                    .estimators
                    .iter()
                    .map(|e| e.positive_probability(row))
                    .collect::<Result<Vec<f64>, FitError>>()?;
                let total: f64 = raw.iter().sum();
                if !total.is_finite() {
                    return Err(FitError::Numerical("non-finite one-vs-rest score".into()));
                }
                if total <= 0.0 {
                    return Ok(vec![1.0 / self.n_classes as f64; self.n_classes]);
                }
                Ok(raw.into_iter().map(|p| p / total).collect())
            })
            .collect()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    /// Says "positive" with probability 1 for rows whose first
    /// value rounds to the class it was trained on.
    #[derive(Debug, Clone, Default)]
    struct Nearest {
        centre: Option<f64>,
    }

    impl BinaryClassifier for Nearest {
        fn fit_binary(&mut self, x: &[Vec<f64>], y: &[bool]) -> Result<(), FitError> {
            let pos: Vec<f64> = x.iter().zip(y).filter(|(_, b)| **b).map(|(r, _)| r[0]).collect();
            self.centre = Some(pos.iter().sum::<f64>() / pos.len().max(1) as f64);
            Ok(())
        }

        fn positive_probability(&self, x: &[f64]) -> Result<f64, FitError> {
            let c = self.centre.ok_or(FitError::NotFitted)?;
            Ok(if (x[0] - c).abs() < 0.5 { 1.0 } else { 0.0 })
        }
    }

    fn data() -> (Vec<Vec<f64>>, Vec<usize>) {
        (vec![vec![0.0], vec![1.0], vec![2.0]], vec![0, 1, 2])
    }

    #[test]
    fn test_one_estimator_per_class() {
        let (x, y) = data();
        let mut ovr = OneVsRest::new(Nearest::default());
        ovr.fit(&x, &y, 3).unwrap();
        assert_eq!(ovr.estimators().len(), 3);
        assert_eq!(ovr.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_all_zero_scores_fall_back_to_uniform() {
        let (x, y) = data();
        let mut ovr = OneVsRest::new(Nearest::default());
        ovr.fit(&x, &y, 3).unwrap();
        let p = ovr.predict_proba(&[vec![100.0]]).unwrap();
        assert_eq!(p[0], vec![1.0 / 3.0; 3]);
    }

    #[test]
    fn test_single_class_rejected() {
        let mut ovr = OneVsRest::new(Nearest::default());
        assert!(ovr.fit(&[vec![0.0]], &[0], 1).is_err());
    }

    #[test]
    fn test_unfitted_errors() {
        let ovr = OneVsRest::new(Nearest::default());
        assert_eq!(ovr.predict_proba(&[vec![0.0]]).unwrap_err(), FitError::NotFitted);
    }
}
