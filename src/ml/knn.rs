// ============================================================
// Layer 5 — k-Nearest Neighbours
// ============================================================
// Lazy learner: fit() memorises the (standardised) training
// rows, predict_proba() votes among the k closest ones under
// Euclidean distance with uniform weights.
//
//   P(class | x) = |{neighbours of x with that class}| / k
//
// Equal distances resolve to the earlier training row, so the
// vote is deterministic.

use serde::{Deserialize, Serialize};

use crate::data::balancer::squared_distance;
use crate::domain::errors::FitError;
use crate::domain::traits::Classifier;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnnParams {
    pub k: usize,
}

impl Default for KnnParams {
    fn default() -> Self {
        Self { k: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNearestNeighbors {
    params:    KnnParams,
    rows:      Vec<Vec<f64>>,
    targets:   Vec<usize>,
    n_classes: usize,
}

impl KNearestNeighbors {
    pub fn new(params: KnnParams) -> Self {
        Self { params, rows: Vec::new(), targets: Vec::new(), n_classes: 0 }
    }

    fn neighbours(&self, query: &[f64]) -> Vec<usize> {
        let mut scored: Vec<(f64, usize)> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| (squared_distance(row, query), i))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        scored.truncate(self.params.k.min(self.rows.len()));
        scored.into_iter().map(|(_, i)| i).collect()
    }
}

impl Classifier for KNearestNeighbors {
    fn fit(&mut self, x: &[Vec<f64>], y: &[usize], n_classes: usize) -> Result<(), FitError> {
        if self.params.k == 0 {
            return Err(FitError::InsufficientData("k must be at least 1".into()));
        }
        if x.is_empty() {
            return Err(FitError::InsufficientData("k-NN needs at least one row".into()));
        }
        self.rows      = x.to_vec();
        self.targets   = y.to_vec();
        self.n_classes = n_classes;
        Ok(())
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, FitError> {
        if self.rows.is_empty() {
            return Err(FitError::NotFitted);
        }
        Ok(x.iter()
            .map(|query| {
                let neighbours = self.neighbours(query);
                let share = 1.0 / neighbours.len() as f64;
                let mut proba = vec![0.0; self.n_classes];
                for i in neighbours {
                    proba[self.targets[i]] += share;
                }
                proba
            })
            .collect())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> (Vec<Vec<f64>>, Vec<usize>) {
        let x = vec![vec![0.0], vec![1.0], vec![2.0], vec![10.0], vec![11.0]];
        let y = vec![0, 0, 0, 1, 1];
        (x, y)
    }

    #[test]
    fn test_vote_fractions() {
        let (x, y) = line();
        let mut knn = KNearestNeighbors::new(KnnParams { k: 3 });
        knn.fit(&x, &y, 2).unwrap();

        let p = knn.predict_proba(&[vec![9.0]]).unwrap();
        assert!((p[0][0] - 1.0 / 3.0).abs() < 1e-12);
        assert!((p[0][1] - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(knn.predict(&[vec![0.5], vec![10.5]]).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_k_larger_than_training_set() {
        let (x, y) = line();
        let mut knn = KNearestNeighbors::new(KnnParams { k: 50 });
        knn.fit(&x, &y, 2).unwrap();
        let p = knn.predict_proba(&[vec![5.0]]).unwrap();
        assert!((p[0][0] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_equal_distance_prefers_earlier_row() {
        let x = vec![vec![-1.0], vec![1.0]];
        let mut knn = KNearestNeighbors::new(KnnParams { k: 1 });
        knn.fit(&x, &[1, 0], 2).unwrap();
        assert_eq!(knn.predict(&[vec![0.0]]).unwrap(), vec![1]);
    }

    #[test]
    fn test_zero_k_rejected() {
        let (x, y) = line();
        let mut knn = KNearestNeighbors::new(KnnParams { k: 0 });
        assert!(knn.fit(&x, &y, 2).is_err());
    }
}
