// ============================================================
// Layer 5 — Trained Pipeline
// ============================================================
// An optional standardisation step followed by one fitted
// classifier:
//
//   row ──► StandardScaler? ──► Model ──► K probabilities
//
// Every model family is one variant of the `Model` enum, so a
// whole pipeline serialises to a single JSON document with
// serde and comes back as the same concrete type.

use serde::{Deserialize, Serialize};

use crate::data::preprocessor::StandardScaler;
use crate::domain::errors::FitError;
use crate::domain::traits::Classifier;
use crate::ml::{
    boosting::GradientBoostedTrees,
    forest::RandomForest,
    knn::KNearestNeighbors,
    mlp::MlpClassifier,
    one_vs_rest::OneVsRest,
    svm::KernelSvm,
    tree::DecisionTree,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "family", content = "model")]
pub enum Model {
    KernelSvm(OneVsRest<KernelSvm>),
    NearestNeighbors(KNearestNeighbors),
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
    GradientBoosting(OneVsRest<GradientBoostedTrees>),
    NeuralNet(MlpClassifier),
}

impl Model {
    fn as_classifier(&self) -> &dyn Classifier {
        match self {
            Model::KernelSvm(m)        => m,
            Model::NearestNeighbors(m) => m,
            Model::DecisionTree(m)     => m,
            Model::RandomForest(m)     => m,
            Model::GradientBoosting(m) => m,
            Model::NeuralNet(m)        => m,
        }
    }

    fn as_classifier_mut(&mut self) -> &mut dyn Classifier {
        match self {
            Model::KernelSvm(m)        => m,
            Model::NearestNeighbors(m) => m,
            Model::DecisionTree(m)     => m,
            Model::RandomForest(m)     => m,
            Model::GradientBoosting(m) => m,
            Model::NeuralNet(m)        => m,
        }
    }
}

impl Classifier for Model {
    fn fit(&mut self, x: &[Vec<f64>], y: &[usize], n_classes: usize) -> Result<(), FitError> {
        self.as_classifier_mut().fit(x, y, n_classes)
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, FitError> {
        self.as_classifier().predict_proba(x)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    scaler:    Option<StandardScaler>,
    model:     Model,
    n_classes: usize,
}

impl Pipeline {
    /// An unfitted pipeline; `standardize` adds the scaling step.
    pub fn new(model: Model, standardize: bool) -> Self {
        Self {
            scaler: standardize.then(StandardScaler::new),
            model,
            n_classes: 0,
        }
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn is_standardized(&self) -> bool {
        self.scaler.is_some()
    }

    /// Probabilities for a single feature row.
    pub fn predict_proba_one(&self, row: &[f64]) -> Result<Vec<f64>, FitError> {
        self.predict_proba(&[row.to_vec()])?
            .pop()
            .ok_or_else(|| FitError::Numerical("model returned no probability row".into()))
    }
}

impl Classifier for Pipeline {
    fn fit(&mut self, x: &[Vec<f64>], y: &[usize], n_classes: usize) -> Result<(), FitError> {
        if x.len() != y.len() {
            return Err(FitError::InsufficientData(format!(
                "{} rows but {} labels",
                x.len(),
                y.len()
            )));
        }
        let fitted = match &mut self.scaler {
            Some(scaler) => {
                scaler.fit(x)?;
                let z = scaler.transform(x);
                self.model.fit(&z, y, n_classes)
            }
            None => self.model.fit(x, y, n_classes),
        };
        fitted?;
        self.n_classes = n_classes;
        Ok(())
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, FitError> {
        if self.n_classes == 0 {
            return Err(FitError::NotFitted);
        }
        match &self.scaler {
            Some(scaler) => self.model.predict_proba(&scaler.transform(x)),
            None => self.model.predict_proba(x),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::imbalanced_tco;
    use crate::ml::knn::KnnParams;
    use crate::ml::tree::TreeParams;

    #[test]
    fn test_scaled_knn_pipeline() {
        let train = imbalanced_tco(20, 20, 20, 1);
        let test  = imbalanced_tco(5, 5, 5, 2);

        let mut p = Pipeline::new(Model::NearestNeighbors(KNearestNeighbors::new(KnnParams::default())), true);
        p.fit(&train.features, &train.targets, 3).unwrap();

        assert!(p.is_standardized());
        assert_eq!(p.n_classes(), 3);
        assert_eq!(p.predict(&test.features).unwrap(), test.targets);
    }

    #[test]
    fn test_pipeline_json_round_trip_predicts_identically() {
        let train = imbalanced_tco(20, 20, 20, 3);
        let mut p = Pipeline::new(Model::DecisionTree(DecisionTree::new(TreeParams::default())), false);
        p.fit(&train.features, &train.targets, 3).unwrap();

        let json = serde_json::to_string(&p).unwrap();
        let back: Pipeline = serde_json::from_str(&json).unwrap();
        assert_eq!(
            p.predict_proba(&train.features).unwrap(),
            back.predict_proba(&train.features).unwrap()
        );
    }

    #[test]
    fn test_unfitted_pipeline_errors() {
        let p = Pipeline::new(Model::DecisionTree(DecisionTree::new(TreeParams::default())), false);
        assert_eq!(p.predict_proba_one(&[0.0; 4]).unwrap_err(), FitError::NotFitted);
    }
}
