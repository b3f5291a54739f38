// ============================================================
// Layer 5 — Model Bank & Selector
// ============================================================
// Fits every candidate pipeline on the balanced training set,
// scores it on the untouched test set, and picks the one to
// persist.
//
//   name            pipeline
//   ─────────────── ───────────────────────────────────────────
//   SVC             standardise → one-vs-rest RBF SVM
//   KNN             standardise → 3-nearest neighbours
//   Decision Tree   CART
//   Random Forest   200 bagged CART trees
//   XGBoost         standardise → one-vs-rest boosted trees
//   MLP             standardise → 100-unit ReLU network
//
// A candidate that fails to fit or score is logged, scored as
// accuracy 0 and can never be selected; the rest carry on.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::data::dataset::Dataset;
use crate::domain::errors::{FitError, SelectionError};
use crate::domain::traits::{argmax, Classifier};
use crate::infra::metrics::{
    accuracy, multiclass_roc, ClassificationReport, ConfusionMatrix, MulticlassRoc,
};
use crate::ml::{
    boosting::{BoostingParams, GradientBoostedTrees},
    forest::{ForestParams, RandomForest},
    knn::{KNearestNeighbors, KnnParams},
    learning_curve::{learning_curve, LearningCurve, LearningCurveConfig},
    mlp::{MlpClassifier, MlpParams},
    one_vs_rest::OneVsRest,
    pipeline::{Model, Pipeline},
    svm::{KernelSvm, SvmParams},
    tree::{DecisionTree, TreeParams},
};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Hyperparameters for every candidate family. Any field left
/// out of a JSON override keeps its default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelBankConfig {
    pub svm:      SvmParams,
    pub knn:      KnnParams,
    pub tree:     TreeParams,
    pub forest:   ForestParams,
    pub boosting: BoostingParams,
    pub mlp:      MlpParams,
}

impl ModelBankConfig {
    /// Propagate the run seed into every seeded family.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.tree.seed   = seed;
        self.forest.seed = seed;
        self.mlp.seed    = seed;
        self
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Cannot read model config '{}'", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid model config '{}'", path.display()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum SelectionPolicy {
    /// Highest test accuracy; ties go to the earlier candidate
    #[default]
    BestAccuracy,
    /// Always persist the named candidate
    Fixed(String),
}

// ─── Candidates & results ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Candidate {
    pub name:     String,
    pub pipeline: Pipeline,
}

impl Candidate {
    pub fn new(name: impl Into<String>, pipeline: Pipeline) -> Self {
        Self { name: name.into(), pipeline }
    }
}

/// Test-set scores of one fitted candidate.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub accuracy:    f64,
    pub report:      ClassificationReport,
    pub confusion:   ConfusionMatrix,
    pub roc:         Option<MulticlassRoc>,
    /// Why ROC was not computed, when it wasn't
    pub roc_skipped: Option<String>,
    pub fitted:      Pipeline,
}

#[derive(Debug, Clone)]
pub struct CandidateResult {
    pub name:    String,
    pub outcome: Result<Evaluation, FitError>,
}

impl CandidateResult {
    /// Test accuracy, 0 for a failed candidate.
    pub fn accuracy(&self) -> f64 {
        self.outcome.as_ref().map_or(0.0, |e| e.accuracy)
    }
}

#[derive(Debug, Clone)]
pub struct CandidateCurve {
    pub name:    String,
    pub outcome: Result<LearningCurve, FitError>,
}

#[derive(Debug, Clone)]
pub struct BenchmarkReport {
    pub results: Vec<CandidateResult>,
}

impl BenchmarkReport {
    /// (name, accuracy) sorted best first; equal scores keep bank order.
    pub fn accuracy_table(&self) -> Vec<(&str, f64)> {
        let mut table: Vec<(&str, f64)> =
            self.results.iter().map(|r| (r.name.as_str(), r.accuracy())).collect();
        table.sort_by(|a, b| b.1.total_cmp(&a.1));
        table
    }

    pub fn get(&self, name: &str) -> Option<&CandidateResult> {
        self.results.iter().find(|r| r.name == name)
    }

    /// The candidate to persist under `policy`.
    pub fn select(&self, policy: &SelectionPolicy) -> Result<(&str, &Evaluation), SelectionError> {
        match policy {
            SelectionPolicy::Fixed(name) => {
                let result = self.get(name).ok_or_else(|| SelectionError::UnknownCandidate {
                    name:      name.clone(),
                    available: self.results.iter().map(|r| r.name.clone()).collect(),
                })?;
                match &result.outcome {
                    Ok(eval) => Ok((result.name.as_str(), eval)),
                    Err(e) => Err(SelectionError::CandidateFailed {
                        name:   name.clone(),
                        reason: e.to_string(),
                    }),
                }
            }
            SelectionPolicy::BestAccuracy => {
                let mut best: Option<(&str, &Evaluation)> = None;
                for result in &self.results {
                    if let Ok(eval) = &result.outcome {
                        if best.map_or(true, |(_, b)| eval.accuracy > b.accuracy) {
                            best = Some((result.name.as_str(), eval));
                        }
                    }
                }
                best.ok_or(SelectionError::NoneSucceeded)
            }
        }
    }
}

// ─── Model bank ───────────────────────────────────────────────────────────────

pub struct ModelBank {
    candidates: Vec<Candidate>,
}

impl ModelBank {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    /// The six standard candidate families.
    pub fn standard(cfg: &ModelBankConfig) -> Self {
        Self::new(vec![
            Candidate::new(
                "SVC",
                Pipeline::new(Model::KernelSvm(OneVsRest::new(KernelSvm::new(cfg.svm.clone()))), true),
            ),
            Candidate::new(
                "KNN",
                Pipeline::new(Model::NearestNeighbors(KNearestNeighbors::new(cfg.knn.clone())), true),
            ),
            Candidate::new(
                "Decision Tree",
                Pipeline::new(Model::DecisionTree(DecisionTree::new(cfg.tree.clone())), false),
            ),
            Candidate::new(
                "Random Forest",
                Pipeline::new(Model::RandomForest(RandomForest::new(cfg.forest.clone())), false),
            ),
            Candidate::new(
                "XGBoost",
                Pipeline::new(
                    Model::GradientBoosting(OneVsRest::new(GradientBoostedTrees::new(cfg.boosting.clone()))),
                    true,
                ),
            ),
            Candidate::new(
                "MLP",
                Pipeline::new(Model::NeuralNet(MlpClassifier::new(cfg.mlp.clone())), true),
            ),
        ])
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Fit each candidate on `train`, score it on `test`.
    pub fn evaluate(&self, train: &Dataset, test: &Dataset, class_names: &[String]) -> BenchmarkReport {
        let results = self
            .candidates
            .iter()
            .map(|candidate| {
                tracing::info!("Training candidate '{}'", candidate.name);
                let outcome = evaluate_candidate(candidate, train, test, class_names);
                match &outcome {
                    Ok(eval) => tracing::info!("{:<14} accuracy={:.4}", candidate.name, eval.accuracy),
                    Err(e)   => tracing::warn!("{:<14} failed: {e} (scored 0)", candidate.name),
                }
                CandidateResult { name: candidate.name.clone(), outcome }
            })
            .collect();
        BenchmarkReport { results }
    }

    /// Cross-validated learning curves for every candidate.
    pub fn learning_curves(&self, data: &Dataset, cfg: &LearningCurveConfig) -> Vec<CandidateCurve> {
        self.candidates
            .iter()
            .map(|candidate| {
                let outcome = learning_curve(&candidate.pipeline, data, cfg);
                if let Err(e) = &outcome {
                    tracing::warn!("Learning curve for '{}' failed: {e}", candidate.name);
                }
                CandidateCurve { name: candidate.name.clone(), outcome }
            })
            .collect()
    }
}

fn evaluate_candidate(
    candidate:   &Candidate,
    train:       &Dataset,
    test:        &Dataset,
    class_names: &[String],
) -> Result<Evaluation, FitError> {
    let k = class_names.len();
    let mut fitted = candidate.pipeline.clone();
    fitted.fit(&train.features, &train.targets, k)?;

    let proba = fitted.predict_proba(&test.features)?;
    if proba.len() != test.len() || proba.iter().any(|p| p.len() != k) {
        return Err(FitError::Numerical(format!(
            "expected {} probability rows of length {k}",
            test.len()
        )));
    }

    let predicted: Vec<usize> = proba.iter().map(|p| argmax(p)).collect();
    let confusion = ConfusionMatrix::compute(&test.targets, &predicted, class_names);
    let report    = ClassificationReport::compute(&confusion);

    let (roc, roc_skipped) = match multiclass_roc(&test.targets, &proba, class_names) {
        Ok(roc) => (Some(roc), None),
        Err(reason) => {
            tracing::warn!("ROC skipped for '{}': {reason}", candidate.name);
            (None, Some(reason))
        }
    };

    Ok(Evaluation {
        accuracy: accuracy(&test.targets, &predicted),
        report,
        confusion,
        roc,
        roc_skipped,
        fitted,
    })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{imbalanced_tco, CLASSES};

    fn names() -> Vec<String> {
        CLASSES.iter().map(|s| s.to_string()).collect()
    }

    fn cheap_bank() -> ModelBank {
        ModelBank::new(vec![
            Candidate::new(
                "KNN",
                Pipeline::new(Model::NearestNeighbors(KNearestNeighbors::new(KnnParams::default())), true),
            ),
            Candidate::new(
                "Decision Tree",
                Pipeline::new(Model::DecisionTree(DecisionTree::new(TreeParams::default())), false),
            ),
            // k = 0 always fails to fit
            Candidate::new(
                "Broken",
                Pipeline::new(Model::NearestNeighbors(KNearestNeighbors::new(KnnParams { k: 0 })), true),
            ),
        ])
    }

    #[test]
    fn test_standard_bank_names_in_order() {
        let bank = ModelBank::standard(&ModelBankConfig::default());
        let names: Vec<&str> = bank.candidates().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["SVC", "KNN", "Decision Tree", "Random Forest", "XGBoost", "MLP"]);
        assert!(!bank.candidates()[2].pipeline.is_standardized());
        assert!(bank.candidates()[4].pipeline.is_standardized());
    }

    #[test]
    fn test_failed_candidate_does_not_stop_bank() {
        let train = imbalanced_tco(20, 20, 20, 1);
        let test  = imbalanced_tco(5, 5, 5, 2);
        let report = cheap_bank().evaluate(&train, &test, &names());

        assert_eq!(report.results.len(), 3);
        assert!(report.results[0].outcome.is_ok());
        assert!(report.results[2].outcome.is_err());
        assert_eq!(report.get("Broken").unwrap().accuracy(), 0.0);

        let table = report.accuracy_table();
        assert_eq!(table.last().unwrap(), &("Broken", 0.0));
    }

    #[test]
    fn test_evaluation_contents() {
        let train = imbalanced_tco(20, 20, 20, 1);
        let test  = imbalanced_tco(5, 5, 5, 2);
        let report = cheap_bank().evaluate(&train, &test, &names());
        let eval = report.results[0].outcome.as_ref().unwrap();

        assert_eq!(eval.accuracy, 1.0);
        assert_eq!(eval.report.classes.len(), 3);
        assert_eq!(eval.confusion.counts[1][1], 5);
        assert_eq!(eval.roc.as_ref().unwrap().mean_auc, 1.0);
        assert!(eval.roc_skipped.is_none());
    }

    #[test]
    fn test_selection_policies() {
        let train = imbalanced_tco(20, 20, 20, 1);
        let test  = imbalanced_tco(5, 5, 5, 2);
        let report = cheap_bank().evaluate(&train, &test, &names());

        // both real candidates score 1.0 → the earlier one wins
        let (name, _) = report.select(&SelectionPolicy::BestAccuracy).unwrap();
        assert_eq!(name, "KNN");

        let (name, _) = report.select(&SelectionPolicy::Fixed("Decision Tree".into())).unwrap();
        assert_eq!(name, "Decision Tree");

        assert!(matches!(
            report.select(&SelectionPolicy::Fixed("Broken".into())),
            Err(SelectionError::CandidateFailed { .. })
        ));
        assert!(matches!(
            report.select(&SelectionPolicy::Fixed("XGBoost".into())),
            Err(SelectionError::UnknownCandidate { .. })
        ));
    }

    #[test]
    fn test_all_failed_selects_nothing() {
        let bank = ModelBank::new(vec![Candidate::new(
            "Broken",
            Pipeline::new(Model::NearestNeighbors(KNearestNeighbors::new(KnnParams { k: 0 })), false),
        )]);
        let train = imbalanced_tco(5, 5, 5, 1);
        let report = bank.evaluate(&train, &train, &names());
        assert_eq!(report.select(&SelectionPolicy::BestAccuracy).unwrap_err(), SelectionError::NoneSucceeded);
    }

    #[test]
    fn test_partial_config_override_keeps_defaults() {
        let cfg: ModelBankConfig = serde_json::from_str(r#"{ "forest": { "n_estimators": 10 } }"#).unwrap();
        assert_eq!(cfg.forest.n_estimators, 10);
        assert_eq!(cfg.knn.k, 3);
        assert_eq!(cfg.svm.c, 10.0);
        assert_eq!(cfg.with_seed(7).mlp.seed, 7);
    }
}
