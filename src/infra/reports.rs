// ============================================================
// Layer 6 — Report Writer
// ============================================================
// Writes the evaluation side outputs of a training run.
//
// Output files (report directory):
//   accuracy.csv                 model,accuracy,status,error
//   classification_reports.txt   one text report per candidate
//   confusion_matrices.txt       one matrix per candidate
//   roc_auc.csv                  model,class,auc  (+ "mean" rows)
//   roc_curves.csv               model,class,threshold,fpr,tpr
//   learning_curves.csv          model,train_size,…,error
//
// Example accuracy.csv:
//   model,accuracy,status,error
//   XGBoost,0.983333,ok,
//   Broken,0.000000,failed,insufficient training data: …
//
// Nothing here is read back by the inference service.

use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::ml::model_bank::{BenchmarkReport, CandidateCurve};

pub const ACCURACY_FILE:        &str = "accuracy.csv";
pub const REPORTS_FILE:         &str = "classification_reports.txt";
pub const CONFUSION_FILE:       &str = "confusion_matrices.txt";
pub const ROC_AUC_FILE:         &str = "roc_auc.csv";
pub const ROC_CURVES_FILE:      &str = "roc_curves.csv";
pub const LEARNING_CURVES_FILE: &str = "learning_curves.csv";

#[derive(Serialize)]
struct AccuracyRow<'a> {
    model:    &'a str,
    accuracy: f64,
    status:   &'a str,
    error:    String,
}

#[derive(Serialize)]
struct AucRow<'a> {
    model: &'a str,
    class: &'a str,
    auc:   f64,
}

#[derive(Serialize)]
struct RocPointRow<'a> {
    model:     &'a str,
    class:     &'a str,
    threshold: f64,
    fpr:       f64,
    tpr:       f64,
}

#[derive(Serialize)]
struct CurveRow<'a> {
    model:            &'a str,
    train_size:       Option<usize>,
    train_score_mean: Option<f64>,
    train_score_std:  Option<f64>,
    val_score_mean:   Option<f64>,
    val_score_std:    Option<f64>,
    error:            String,
}

pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    /// Creates the report directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create report directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Accuracy table, text reports, confusion matrices and ROC.
    pub fn write_benchmark(&self, report: &BenchmarkReport) -> Result<()> {
        self.write_csv(
            ACCURACY_FILE,
            report.accuracy_table().into_iter().map(|(model, accuracy)| {
                let error = report
                    .get(model)
                    .and_then(|r| r.outcome.as_ref().err())
                    .map(ToString::to_string)
                    .unwrap_or_default();
                AccuracyRow {
                    model,
                    accuracy,
                    status: if error.is_empty() { "ok" } else { "failed" },
                    error,
                }
            }),
        )?;

        let mut reports   = String::new();
        let mut confusion = String::new();
        for result in &report.results {
            reports.push_str(&format!("=== {} ===\n", result.name));
            confusion.push_str(&format!("=== {} ===\n", result.name));
            match &result.outcome {
                Ok(eval) => {
                    reports.push_str(&eval.report.render());
                    confusion.push_str(&eval.confusion.render());
                }
                Err(e) => {
                    reports.push_str(&format!("failed: {e}\n"));
                    confusion.push_str(&format!("failed: {e}\n"));
                }
            }
            reports.push('\n');
            confusion.push('\n');
        }
        self.write_text(REPORTS_FILE, &reports)?;
        self.write_text(CONFUSION_FILE, &confusion)?;

        let evaluated = report
            .results
            .iter()
            .filter_map(|r| Some((r.name.as_str(), r.outcome.as_ref().ok()?.roc.as_ref()?)));

        let mut auc_rows   = Vec::new();
        let mut point_rows = Vec::new();
        for (model, roc) in evaluated {
            for class in &roc.classes {
                auc_rows.push(AucRow { model, class: &class.label, auc: class.auc });
                let c = &class.curve;
                for i in 0..c.fpr.len() {
                    point_rows.push(RocPointRow {
                        model,
                        class:     &class.label,
                        threshold: c.thresholds[i],
                        fpr:       c.fpr[i],
                        tpr:       c.tpr[i],
                    });
                }
            }
            auc_rows.push(AucRow { model, class: "mean", auc: roc.mean_auc });
        }
        self.write_csv(ROC_AUC_FILE, auc_rows)?;
        self.write_csv(ROC_CURVES_FILE, point_rows)?;

        tracing::info!("Evaluation reports written to '{}'", self.dir.display());
        Ok(())
    }

    pub fn write_learning_curves(&self, curves: &[CandidateCurve]) -> Result<()> {
        let mut rows = Vec::new();
        for curve in curves {
            match &curve.outcome {
                Ok(lc) => rows.extend(lc.points.iter().map(|p| CurveRow {
                    model:            &curve.name,
                    train_size:       Some(p.train_size),
                    train_score_mean: Some(p.train_score_mean),
                    train_score_std:  Some(p.train_score_std),
                    val_score_mean:   Some(p.val_score_mean),
                    val_score_std:    Some(p.val_score_std),
                    error:            String::new(),
                })),
                Err(e) => rows.push(CurveRow {
                    model:            &curve.name,
                    train_size:       None,
                    train_score_mean: None,
                    train_score_std:  None,
                    val_score_mean:   None,
                    val_score_std:    None,
                    error:            e.to_string(),
                }),
            }
        }
        self.write_csv(LEARNING_CURVES_FILE, rows)
    }

    fn write_csv<R: Serialize>(&self, name: &str, rows: impl IntoIterator<Item = R>) -> Result<()> {
        let path = self.dir.join(name);
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Cannot create '{}'", path.display()))?;
        for row in rows {
            writer
                .serialize(row)
                .with_context(|| format!("Cannot write row to '{}'", path.display()))?;
        }
        writer.flush()?;
        tracing::debug!("Wrote '{}'", path.display());
        Ok(())
    }

    fn write_text(&self, name: &str, text: &str) -> Result<()> {
        let path = self.dir.join(name);
        fs::write(&path, text).with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Wrote '{}'", path.display());
        Ok(())
    }
}
