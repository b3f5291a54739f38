// ============================================================
// Layer 5 — Learning Curves
// ============================================================
// How does a candidate's accuracy move as it sees more data?
//
//   for each stratified fold (in parallel):
//       shuffle the fold's training rows (StdRng, seed + fold)
//       for each size in linspace(min_fraction, 1, n_steps):
//           fit a fresh pipeline clone on the first `size` rows
//           score it on those rows and on the validation rows
//
//   report per size: mean ± std of train and validation
//   accuracy across folds
//
// Diagnostic only: nothing here feeds selection.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::{dataset::Dataset, folds::StratifiedKFold};
use crate::domain::errors::FitError;
use crate::domain::traits::Classifier;
use crate::infra::metrics::accuracy;
use crate::ml::pipeline::Pipeline;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningCurveConfig {
    pub n_folds:      usize,
    pub n_steps:      usize,
    pub min_fraction: f64,
    pub seed:         u64,
}

impl Default for LearningCurveConfig {
    fn default() -> Self {
        Self { n_folds: 5, n_steps: 5, min_fraction: 0.1, seed: 42 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub train_size:       usize,
    pub train_score_mean: f64,
    pub train_score_std:  f64,
    pub val_score_mean:   f64,
    pub val_score_std:    f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningCurve {
    pub points: Vec<CurvePoint>,
}

/// Absolute training sizes for `n_train` rows: floor(f · n_train),
/// at least 1, duplicates removed.
pub fn training_sizes(n_train: usize, cfg: &LearningCurveConfig) -> Vec<usize> {
    let steps = cfg.n_steps.max(1);
    let mut sizes: Vec<usize> = (0..steps)
        .map(|i| {
            let frac = if i + 1 == steps {
                1.0
            } else {
                cfg.min_fraction + (1.0 - cfg.min_fraction) * i as f64 / (steps - 1) as f64
            };
            ((frac * n_train as f64).floor() as usize).clamp(1, n_train.max(1))
        })
        .collect();
    sizes.dedup();
    sizes
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    let n    = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var  = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Cross-validated learning curve of `template` on `data`.
pub fn learning_curve(
    template: &Pipeline,
    data:     &Dataset,
    cfg:      &LearningCurveConfig,
) -> Result<LearningCurve, FitError> {
    let kfold = StratifiedKFold::new(cfg.n_folds)?;
    if data.len() < cfg.n_folds {
        return Err(FitError::InsufficientData(format!(
            "{} rows cannot fill {} folds",
            data.len(),
            cfg.n_folds
        )));
    }

    let folds   = kfold.split(&data.targets);
    let min_len = folds.iter().map(|f| f.train.len()).min().unwrap_or(0);
    let sizes   = training_sizes(min_len, cfg);

    // scores[fold][size] = (train accuracy, validation accuracy)
    let scores: Vec<Vec<(f64, f64)>> = folds
        .into_par_iter()
        .enumerate()
        .map(|(f, fold)| {
            let mut rng = StdRng::seed_from_u64(cfg.seed.wrapping_add(f as u64));
            let mut train_rows = fold.train;
            train_rows.shuffle(&mut rng);
            let validation = data.subset(&fold.validation);

            sizes
                .iter()
                .map(|&size| {
                    let subset = data.subset(&train_rows[..size]);
                    let mut pipeline = template.clone();
                    pipeline.fit(&subset.features, &subset.targets, data.n_classes)?;

                    let train_acc = accuracy(&subset.targets, &pipeline.predict(&subset.features)?);
                    let val_acc   = accuracy(&validation.targets, &pipeline.predict(&validation.features)?);
                    Ok((train_acc, val_acc))
                })
                .collect::<Result<Vec<_>, FitError>>()
        })
        .collect::<Result<Vec<_>, FitError>>()?;

    let points = sizes
        .iter()
        .enumerate()
        .map(|(s, &train_size)| {
            let train: Vec<f64> = scores.iter().map(|fold| fold[s].0).collect();
            let val:   Vec<f64> = scores.iter().map(|fold| fold[s].1).collect();
            let (train_score_mean, train_score_std) = mean_std(&train);
            let (val_score_mean, val_score_std)     = mean_std(&val);
            CurvePoint { train_size, train_score_mean, train_score_std, val_score_mean, val_score_std }
        })
        .collect();

    Ok(LearningCurve { points })
}
