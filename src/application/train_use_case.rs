// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load the measurement CSV      (Layer 4 - data)
//   Step 2: Fit the label codec           (Layer 3 - domain)
//   Step 3: Encode + split 80/20          (Layer 4 - data)
//   Step 4: SMOTE the training partition  (Layer 4 - data)
//   Step 5: Fit + score every candidate   (Layer 5 - ml)
//   Step 6: Write evaluation reports      (Layer 6 - infra)
//   Step 7: Learning curves (optional)    (Layer 5 - ml)
//   Step 8: Select one candidate          (Layer 5 - ml)
//   Step 9: Persist pipeline + codec      (Layer 6 - infra)
//   Step 10: Sanity-classify a test row   (Layer 5 - ml)
//
// Data and balancing errors abort before any model is fitted.
// A failing candidate only loses its place in the ranking.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::data::{
    balancer::{BalancerConfig, SmoteBalancer},
    dataset::Dataset,
    loader::CsvMeasurementLoader,
};
use crate::domain::{label_codec::LabelCodec, traits::MeasurementSource};
use crate::infra::{artifact_store::ArtifactStore, reports::ReportWriter};
use crate::ml::{
    inferencer::{capture_all, InferenceService},
    learning_curve::LearningCurveConfig,
    model_bank::{ModelBank, ModelBankConfig, SelectionPolicy},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// Every setting of a training run. Serialisable so the run can
// be written next to its artifacts as train_config.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub dataset:         String,
    pub artifact_dir:    String,
    pub report_dir:      String,
    pub seed:            u64,
    pub test_fraction:   f64,
    pub smote_k:         usize,
    /// Per-class size after SMOTE; `None` = majority class count
    pub balance_target:  Option<usize>,
    pub selection:       SelectionPolicy,
    /// Optional JSON file overriding candidate hyperparameters
    pub model_config:    Option<String>,
    pub cv_folds:        usize,
    pub learning_curves: bool,
    /// Resolved candidate hyperparameters
    pub models:          ModelBankConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            dataset:         "data/TCO.csv".to_string(),
            artifact_dir:    "artifacts".to_string(),
            report_dir:      "reports".to_string(),
            seed:            42,
            test_fraction:   0.2,
            smote_k:         5,
            balance_target:  None,
            selection:       SelectionPolicy::BestAccuracy,
            model_config:    None,
            cv_folds:        5,
            learning_curves: true,
            models:          ModelBankConfig::default(),
        }
    }
}

/// What a finished run reports back to the CLI.
#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub selected:           String,
    pub accuracy:           f64,
    pub pair_id:            u64,
    pub classes:            Vec<String>,
    pub n_rows:             usize,
    pub skipped_incomplete: usize,
    pub n_train:            usize,
    pub n_synthetic:        usize,
    pub n_test:             usize,
    /// (candidate, test accuracy), best first
    pub accuracy_table:     Vec<(String, f64)>,
    pub artifact_dir:       PathBuf,
    pub report_dir:         PathBuf,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the config and runs the full training pipeline.
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    /// Create a new TrainUseCase with the given configuration
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainSummary> {
        let mut cfg = self.config.clone();
        if let Some(path) = &cfg.model_config {
            cfg.models = ModelBankConfig::from_file(Path::new(path))?;
            tracing::info!("Candidate hyperparameters loaded from '{path}'");
        }
        let models = cfg.models.clone().with_seed(cfg.seed);

        // ── Step 1: Load the dataset ──────────────────────────────────────────
        tracing::info!("Loading measurements from '{}'", cfg.dataset);
        let table = CsvMeasurementLoader::new(&cfg.dataset)
            .load()
            .with_context(|| format!("Cannot use dataset '{}'", cfg.dataset))?;
        tracing::info!(
            "Loaded {} rows ({} incomplete rows skipped)",
            table.len(),
            table.skipped_incomplete
        );

        // ── Step 2: Label codec on the FULL label column ─────────────────────
        let codec = LabelCodec::fit(table.labels());
        if codec.len() < 2 {
            bail!("dataset has {} material class(es); at least 2 are needed", codec.len());
        }
        tracing::info!("Classes: {}", codec.classes().join(", "));

        // ── Step 3: Encode + seeded train/test split ──────────────────────────
        let data = Dataset::encode(&table, &codec)?;
        let (train, test) = data.split(cfg.test_fraction, cfg.seed);
        if test.is_empty() {
            bail!("test partition is empty; raise --test-fraction or add rows");
        }
        tracing::info!("Split: {} train, {} test", train.len(), test.len());

        // ── Step 4: SMOTE on the training partition only ──────────────────────
        let balancer = SmoteBalancer::new(BalancerConfig {
            k_neighbors: cfg.smote_k,
            target:      cfg.balance_target,
            seed:        cfg.seed,
        });
        let balanced = balancer.balance(&train, &codec).context("Class balancing failed")?;
        tracing::info!(
            "Balanced training set: {} rows ({} synthetic), per class {:?}",
            balanced.dataset.len(),
            balanced.synthetic_count(),
            balanced.dataset.class_counts()
        );

        // ── Step 5: Fit and score every candidate ─────────────────────────────
        let bank   = ModelBank::standard(&models);
        let report = bank.evaluate(&balanced.dataset, &test, codec.classes());

        for (name, acc) in report.accuracy_table() {
            tracing::info!("  {:<14} {:.4}", name, acc);
        }

        // ── Step 6: Evaluation side outputs ───────────────────────────────────
        let writer = ReportWriter::new(&cfg.report_dir)?;
        writer.write_benchmark(&report)?;

        // ── Step 7: Learning curves on the unbalanced data ────────────────────
        if cfg.learning_curves {
            tracing::info!("Computing {}-fold learning curves", cfg.cv_folds);
            let lc_cfg = LearningCurveConfig {
                n_folds: cfg.cv_folds,
                seed:    cfg.seed,
                ..LearningCurveConfig::default()
            };
            writer.write_learning_curves(&bank.learning_curves(&data, &lc_cfg))?;
        }

        // ── Step 8: Pick the pipeline to persist ──────────────────────────────
        let (selected, evaluation) = report.select(&cfg.selection)?;
        tracing::info!(
            "Selected '{}' (test accuracy {:.4}, standardised inputs: {})",
            selected,
            evaluation.accuracy,
            evaluation.fitted.is_standardized()
        );

        // ── Step 9: Persist the pair + run config ─────────────────────────────
        let store   = ArtifactStore::new(&cfg.artifact_dir);
        let pair_id = store.save_pair(&evaluation.fitted, &codec)?;
        store.save_config(&TrainConfig { models: models.clone(), ..cfg.clone() })?;

        // ── Step 10: The saved pair must classify a real row ──────────────────
        let service = InferenceService::new(evaluation.fitted.clone(), codec.clone())?;
        let sample  = test.features[0].iter().map(|&v| Some(v)).collect::<Vec<_>>();
        let sample: [Option<f64>; 4] = sample
            .try_into()
            .map_err(|_| anyhow::anyhow!("test row does not have 4 features"))?;
        let check = service.classify(&capture_all(sample))?;
        tracing::info!("Sanity check: first test row classified as {}", check.label);

        Ok(TrainSummary {
            selected:           selected.to_string(),
            accuracy:           evaluation.accuracy,
            pair_id,
            classes:            codec.classes().to_vec(),
            n_rows:             table.len(),
            skipped_incomplete: table.skipped_incomplete,
            n_train:            train.len(),
            n_synthetic:        balanced.synthetic_count(),
            n_test:             test.len(),
            accuracy_table:     report
                .accuracy_table()
                .into_iter()
                .map(|(n, a)| (n.to_string(), a))
                .collect(),
            artifact_dir:       PathBuf::from(&cfg.artifact_dir),
            report_dir:         PathBuf::from(&cfg.report_dir),
        })
    }
}
