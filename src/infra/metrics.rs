// ============================================================
// Layer 6 — Evaluation Metrics
// ============================================================
// Scores a fitted candidate on the held-out test partition.
//
//   accuracy           = correct / total
//   precision_c        = TP_c / (TP_c + FP_c)
//   recall_c           = TP_c / (TP_c + FN_c)
//   F1_c               = 2·P·R / (P + R)
//   macro avg          = unweighted mean over classes
//   weighted avg       = mean weighted by support
//
// A 0/0 ratio is reported as 0.
//
// ROC (one class vs. rest):
//   sweep the threshold down through every distinct score,
//   recording (FPR, TPR) after each step, starting at (0, 0)
//   with threshold +∞. AUC is the trapezoid area under the
//   resulting curve. A class with no positive or no negative
//   test rows has an undefined AUC (NaN) and is left out of
//   the mean.
//
// Reference: Fawcett (2006) An Introduction to ROC Analysis

use serde::{Deserialize, Serialize};
use std::fmt::Write;

pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    correct as f64 / y_true.len() as f64
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

// ─── Confusion Matrix ─────────────────────────────────────────────────────────

/// `counts[true][predicted]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub labels: Vec<String>,
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn compute(y_true: &[usize], y_pred: &[usize], labels: &[String]) -> Self {
        let k = labels.len();
        let mut counts = vec![vec![0usize; k]; k];
        for (&t, &p) in y_true.iter().zip(y_pred) {
            counts[t][p] += 1;
        }
        Self { labels: labels.to_vec(), counts }
    }

    /// Rows are true classes, columns predicted classes.
    pub fn render(&self) -> String {
        let width = self
            .labels
            .iter()
            .map(String::len)
            .chain(self.counts.iter().flatten().map(|c| c.to_string().len()))
            .max()
            .unwrap_or(1)
            .max(4);

        let mut out = format!("{:>width$}", "");
        for label in &self.labels {
            let _ = write!(out, " {label:>width$}");
        }
        out.push('\n');
        for (label, row) in self.labels.iter().zip(&self.counts) {
            let _ = write!(out, "{label:>width$}");
            for c in row {
                let _ = write!(out, " {c:>width$}");
            }
            out.push('\n');
        }
        out
    }
}

// ─── Classification Report ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label:     String,
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
    pub support:   usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes:      Vec<ClassMetrics>,
    pub accuracy:     f64,
    pub macro_avg:    ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    pub fn compute(confusion: &ConfusionMatrix) -> Self {
        let k     = confusion.labels.len();
        let total = confusion.counts.iter().flatten().sum::<usize>();

        let classes: Vec<ClassMetrics> = (0..k)
            .map(|c| {
                let tp        = confusion.counts[c][c];
                let predicted = (0..k).map(|r| confusion.counts[r][c]).sum::<usize>();
                let support   = confusion.counts[c].iter().sum::<usize>();
                let precision = ratio(tp, predicted);
                let recall    = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics { label: confusion.labels[c].clone(), precision, recall, f1, support }
            })
            .collect();

        let correct = (0..k).map(|c| confusion.counts[c][c]).sum::<usize>();

        let uniform: Vec<f64> = vec![1.0; k];
        let support: Vec<f64> = classes.iter().map(|m| m.support as f64).collect();
        let macro_avg    = weighted_mean("macro avg", &classes, &uniform, total);
        let weighted_avg = weighted_mean("weighted avg", &classes, &support, total);

        Self { classes, accuracy: ratio(correct, total), macro_avg, weighted_avg }
    }

    pub fn render(&self) -> String {
        let width = self
            .classes
            .iter()
            .map(|m| m.label.len())
            .chain(["weighted avg".len()])
            .max()
            .unwrap_or(12);

        let line = |m: &ClassMetrics| {
            format!(
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}\n",
                m.label, m.precision, m.recall, m.f1, m.support
            )
        };

        let mut out = format!(
            "{:>width$} {:>9} {:>9} {:>9} {:>9}\n\n",
            "", "precision", "recall", "f1-score", "support"
        );
        for m in &self.classes {
            out.push_str(&line(m));
        }
        out.push('\n');
        let _ = writeln!(
            out,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        );
        out.push_str(&line(&self.macro_avg));
        out.push_str(&line(&self.weighted_avg));
        out
    }
}

fn weighted_mean(label: &str, classes: &[ClassMetrics], weights: &[f64], total: usize) -> ClassMetrics {
    let w_total: f64 = weights.iter().sum();
    let mean = |f: fn(&ClassMetrics) -> f64| {
        if w_total > 0.0 {
            classes.iter().zip(weights).map(|(m, w)| w * f(m)).sum::<f64>() / w_total
        } else {
            0.0
        }
    };
    ClassMetrics {
        label:     label.to_string(),
        precision: mean(|m| m.precision),
        recall:    mean(|m| m.recall),
        f1:        mean(|m| m.f1),
        support:   total,
    }
}

// ─── ROC ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    pub fpr:        Vec<f64>,
    pub tpr:        Vec<f64>,
    pub thresholds: Vec<f64>,
}

/// ROC points for binary truth `positive` and scores `score`.
pub fn roc_curve(positive: &[bool], score: &[f64]) -> RocCurve {
    let mut order: Vec<usize> = (0..score.len()).collect();
    order.sort_by(|&a, &b| score[b].total_cmp(&score[a]));

    let n_pos = positive.iter().filter(|&&p| p).count() as f64;
    let n_neg = positive.len() as f64 - n_pos;

    let mut fpr        = vec![0.0];
    let mut tpr        = vec![0.0];
    let mut thresholds = vec![f64::INFINITY];
    let (mut tp, mut fp) = (0.0, 0.0);

    for (i, &row) in order.iter().enumerate() {
        if positive[row] { tp += 1.0 } else { fp += 1.0 }

        let last_of_tie = order.get(i + 1).map_or(true, |&next| score[next] != score[row]);
        if last_of_tie {
            fpr.push(fp / n_neg);
            tpr.push(tp / n_pos);
            thresholds.push(score[row]);
        }
    }
    RocCurve { fpr, tpr, thresholds }
}

/// Trapezoid area under (x, y); NaN if any coordinate is NaN.
pub fn auc(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[0] + ys[1]) / 2.0)
        .sum()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRoc {
    pub label: String,
    pub curve: RocCurve,
    pub auc:   f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MulticlassRoc {
    pub classes:  Vec<ClassRoc>,
    /// Mean over the classes with a defined AUC; NaN if none
    pub mean_auc: f64,
}

/// One-vs-rest ROC for every class. Fails on NaN scores.
pub fn multiclass_roc(
    y_true: &[usize],
    proba:  &[Vec<f64>],
    labels: &[String],
) -> Result<MulticlassRoc, String> {
    if proba.iter().flatten().any(|p| p.is_nan()) {
        return Err("predicted probabilities contain NaN".into());
    }

    let classes: Vec<ClassRoc> = labels
        .iter()
        .enumerate()
        .map(|(c, label)| {
            let positive: Vec<bool> = y_true.iter().map(|&t| t == c).collect();
            let score: Vec<f64>     = proba.iter().map(|p| p[c]).collect();
            let curve = roc_curve(&positive, &score);
            let auc   = auc(&curve.fpr, &curve.tpr);
            ClassRoc { label: label.clone(), curve, auc }
        })
        .collect();

    let defined: Vec<f64> = classes.iter().map(|c| c.auc).filter(|a| a.is_finite()).collect();
    let mean_auc = if defined.is_empty() {
        f64::NAN
    } else {
        defined.iter().sum::<f64>() / defined.len() as f64
    };
    Ok(MulticlassRoc { classes, mean_auc })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        vec!["AZO".into(), "FTO".into(), "ITO".into()]
    }

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&[0, 1, 2, 2], &[0, 1, 1, 2]), 0.75);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }

    #[test]
    fn test_confusion_counts() {
        let cm = ConfusionMatrix::compute(&[0, 0, 1, 2], &[0, 1, 1, 2], &labels());
        assert_eq!(cm.counts, vec![vec![1, 1, 0], vec![0, 1, 0], vec![0, 0, 1]]);
        assert!(cm.render().contains("AZO"));
    }

    #[test]
    fn test_report_values() {
        // AZO: tp 1, predicted 1, support 2 → P 1.0, R 0.5
        // FTO: tp 1, predicted 2, support 1 → P 0.5, R 1.0
        let cm = ConfusionMatrix::compute(&[0, 0, 1, 2], &[0, 1, 1, 2], &labels());
        let r  = ClassificationReport::compute(&cm);

        assert_eq!(r.classes[0].precision, 1.0);
        assert_eq!(r.classes[0].recall, 0.5);
        assert!((r.classes[0].f1 - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(r.classes[1].precision, 0.5);
        assert_eq!(r.accuracy, 0.75);
        assert_eq!(r.macro_avg.support, 4);
        // weighted recall equals accuracy
        assert!((r.weighted_avg.recall - 0.75).abs() < 1e-12);
        assert!(r.render().contains("weighted avg"));
    }

    #[test]
    fn test_zero_division_reports_zero() {
        let cm = ConfusionMatrix::compute(&[0, 0], &[0, 0], &labels());
        let r  = ClassificationReport::compute(&cm);
        assert_eq!(r.classes[1].precision, 0.0);
        assert_eq!(r.classes[1].f1, 0.0);
    }

    #[test]
    fn test_perfect_ranking_has_unit_auc() {
        let curve = roc_curve(&[true, true, false, false], &[0.9, 0.8, 0.3, 0.1]);
        assert_eq!(auc(&curve.fpr, &curve.tpr), 1.0);
        assert_eq!(curve.fpr[0], 0.0);
        assert_eq!(*curve.tpr.last().unwrap(), 1.0);
        assert_eq!(curve.thresholds[0], f64::INFINITY);
    }

    #[test]
    fn test_tied_scores_give_diagonal() {
        let curve = roc_curve(&[true, false], &[0.5, 0.5]);
        assert_eq!(curve.fpr, vec![0.0, 1.0]);
        assert_eq!(auc(&curve.fpr, &curve.tpr), 0.5);
    }

    #[test]
    fn test_multiclass_skips_absent_class_in_mean() {
        let proba = vec![vec![0.8, 0.1, 0.1], vec![0.2, 0.7, 0.1]];
        let roc = multiclass_roc(&[0, 1], &proba, &labels()).unwrap();
        assert!(roc.classes[2].auc.is_nan());
        assert_eq!(roc.mean_auc, 1.0);
    }

    #[test]
    fn test_nan_scores_rejected() {
        let proba = vec![vec![f64::NAN, 0.5, 0.5]];
        assert!(multiclass_roc(&[0], &proba, &labels()).is_err());
    }
}
