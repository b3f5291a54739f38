// ============================================================
// Layer 5 — Random Forest
// ============================================================
// Bagged ensemble of CART trees:
//
//   for t in 0..n_estimators:
//       rows_t  = bootstrap sample of the training rows
//       tree_t  = CART on rows_t, √d features tried per node
//
//   P(class | x) = mean over trees of the leaf distribution
//
// Trees are independent, so they are grown in parallel with
// rayon. Tree t draws from its own StdRng seeded `seed + t`,
// which keeps the forest identical regardless of how rayon
// schedules the work.
//
// Reference: Breiman (2001) Random Forests

use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::errors::FitError;
use crate::domain::traits::Classifier;
use crate::ml::tree::{DecisionTree, TreeParams};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_estimators:      usize,
    pub max_depth:         Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf:  usize,
    /// `None` = ⌊√d⌋ features per node
    pub max_features:      Option<usize>,
    pub seed:              u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators:      200,
            max_depth:         None,
            min_samples_split: 2,
            min_samples_leaf:  1,
            max_features:      None,
            seed:              42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    params:    ForestParams,
    trees:     Vec<DecisionTree>,
    n_classes: usize,
}

impl RandomForest {
    pub fn new(params: ForestParams) -> Self {
        Self { params, trees: Vec::new(), n_classes: 0 }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn tree_params(&self, n_features: usize) -> TreeParams {
        let sqrt = (n_features as f64).sqrt().floor() as usize;
        TreeParams {
            max_depth:         self.params.max_depth,
            min_samples_split: self.params.min_samples_split,
            min_samples_leaf:  self.params.min_samples_leaf,
            max_features:      Some(self.params.max_features.unwrap_or(sqrt).clamp(1, n_features.max(1))),
            seed:              self.params.seed,
        }
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: &[Vec<f64>], y: &[usize], n_classes: usize) -> Result<(), FitError> {
        if x.is_empty() {
            return Err(FitError::InsufficientData("random forest needs at least one row".into()));
        }
        if self.params.n_estimators == 0 {
            return Err(FitError::InsufficientData("n_estimators must be at least 1".into()));
        }

        let n           = x.len();
        let tree_params = self.tree_params(x[0].len());
        let seed        = self.params.seed;

        let trees: Result<Vec<DecisionTree>, FitError> = (0..self.params.n_estimators)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(t as u64));
                let rows: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                let mut tree = DecisionTree::new(tree_params.clone());
                tree.fit_rows(x, y, n_classes, &rows, &mut rng)?;
                Ok(tree)
            })
            .collect();

        self.trees     = trees?;
        self.n_classes = n_classes;
        tracing::debug!("Random forest grown: {} trees", self.n_trees());
        Ok(())
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, FitError> {
        if self.trees.is_empty() {
            return Err(FitError::NotFitted);
        }
        let share = 1.0 / self.trees.len() as f64;

        x.iter()
            .map(|row| {
                let mut proba = vec![0.0; self.n_classes];
                for tree in &self.trees {
                    for (p, d) in proba.iter_mut().zip(tree.leaf_distribution(row)?) {
                        *p += d * share;
                    }
                }
                Ok(proba)
            })
            .collect()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::imbalanced_tco;

    fn small() -> ForestParams {
        ForestParams { n_estimators: 15, ..ForestParams::default() }
    }

    #[test]
    fn test_forest_separates_clusters() {
        let train = imbalanced_tco(30, 30, 30, 1);
        let test  = imbalanced_tco(10, 10, 10, 2);

        let mut forest = RandomForest::new(small());
        forest.fit(&train.features, &train.targets, 3).unwrap();

        assert_eq!(forest.n_trees(), 15);
        assert_eq!(forest.predict(&test.features).unwrap(), test.targets);
    }

    #[test]
    fn test_probabilities_average_to_one() {
        let ds = imbalanced_tco(15, 15, 15, 5);
        let mut forest = RandomForest::new(small());
        forest.fit(&ds.features, &ds.targets, 3).unwrap();

        for p in forest.predict_proba(&ds.features).unwrap() {
            assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_same_seed_same_forest() {
        let ds = imbalanced_tco(15, 15, 15, 6);
        let mut a = RandomForest::new(small());
        let mut b = RandomForest::new(small());
        a.fit(&ds.features, &ds.targets, 3).unwrap();
        b.fit(&ds.features, &ds.targets, 3).unwrap();
        assert_eq!(a.predict_proba(&ds.features).unwrap(), b.predict_proba(&ds.features).unwrap());
    }

    #[test]
    fn test_default_feature_budget_is_sqrt() {
        let forest = RandomForest::new(ForestParams::default());
        assert_eq!(forest.tree_params(4).max_features, Some(2));
    }
}
