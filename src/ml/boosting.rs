// ============================================================
// Layer 5 — Gradient Boosted Trees (binary logistic)
// ============================================================
// Additive model on the log-odds margin:
//
//   F_0(x) = log(p / (1 − p))            p = positive rate
//   F_m(x) = F_{m−1}(x) + η · tree_m(x)
//
// Each round fits a regression tree to the second-order
// expansion of the logistic loss:
//
//   g_i = σ(F(x_i)) − y_i                (gradient)
//   h_i = σ(F(x_i)) · (1 − σ(F(x_i)))    (hessian)
//
//   leaf weight  w* = −G / (H + λ)
//   split gain      = ½ [G_L²/(H_L+λ) + G_R²/(H_R+λ) − G²/(H+λ)] − γ
//
// P(positive | x) = σ(F_M(x)). One booster per class is
// combined by the one-vs-rest wrapper.
//
// Reference: Friedman (2001) Greedy Function Approximation
//            Chen & Guestrin (2016) XGBoost

use serde::{Deserialize, Serialize};

use crate::domain::errors::FitError;
use crate::domain::traits::BinaryClassifier;
use crate::ml::tree::{partition, presort, SortedRows};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    pub n_estimators:     usize,
    pub learning_rate:    f64,
    pub max_depth:        usize,
    /// L2 penalty on leaf weights
    pub lambda:           f64,
    /// Minimum hessian sum per child
    pub min_child_weight: f64,
    /// Minimum gain for a split
    pub gamma:            f64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators:     200,
            learning_rate:    0.1,
            max_depth:        10,
            lambda:           1.0,
            min_child_weight: 1.0,
            gamma:            0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RegressionNode {
    Leaf { value: f64 },
    Split {
        feature:   usize,
        threshold: f64,
        left:      usize,
        right:     usize,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<RegressionNode>,
}

impl RegressionTree {
    fn predict(&self, row: &[f64]) -> f64 {
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                RegressionNode::Leaf { value } => return *value,
                RegressionNode::Split { feature, threshold, left, right } => {
                    at = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    params:      BoostingParams,
    base_margin: f64,
    trees:       Vec<RegressionTree>,
    fitted:      bool,
}

impl GradientBoostedTrees {
    pub fn new(params: BoostingParams) -> Self {
        Self { params, base_margin: 0.0, trees: Vec::new(), fitted: false }
    }

    pub fn n_rounds(&self) -> usize {
        self.trees.len()
    }

    fn margin(&self, row: &[f64]) -> f64 {
        self.base_margin
            + self.params.learning_rate * self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl BinaryClassifier for GradientBoostedTrees {
    fn fit_binary(&mut self, x: &[Vec<f64>], y: &[bool]) -> Result<(), FitError> {
        if x.is_empty() {
            return Err(FitError::InsufficientData("gradient boosting needs at least one row".into()));
        }
        let n = x.len();
        let positive_rate = (y.iter().filter(|&&b| b).count() as f64 / n as f64).clamp(1e-6, 1.0 - 1e-6);

        self.base_margin = (positive_rate / (1.0 - positive_rate)).ln();
        self.trees.clear();

        let rows: Vec<usize> = (0..n).collect();
        let root_sorted      = presort(x, &rows, x[0].len());
        let mut margins      = vec![self.base_margin; n];
        let mut grad         = vec![0.0; n];
        let mut hess         = vec![0.0; n];

        for round in 0..self.params.n_estimators {
            for i in 0..n {
                let p = sigmoid(margins[i]);
                grad[i] = p - f64::from(u8::from(y[i]));
                hess[i] = (p * (1.0 - p)).max(1e-12);
            }

            if grad.iter().all(|g| g.abs() < 1e-6) {
                tracing::debug!("Boosting converged after {round} rounds");
                break;
            }

            let mut builder = RegressionBuilder {
                x,
                grad: &grad,
                hess: &hess,
                params: &self.params,
                nodes: Vec::new(),
            };
            builder.grow(root_sorted.clone(), 0);
            let tree = RegressionTree { nodes: builder.nodes };

            for (m, row) in margins.iter_mut().zip(x) {
                *m += self.params.learning_rate * tree.predict(row);
            }
            if margins.iter().any(|m| !m.is_finite()) {
                return Err(FitError::Numerical(format!("margin diverged in round {round}")));
            }
            self.trees.push(tree);
        }

        self.fitted = true;
        tracing::trace!("Boosting fitted: {} rounds", self.n_rounds());
        Ok(())
    }

    fn positive_probability(&self, x: &[f64]) -> Result<f64, FitError> {
        if !self.fitted {
            return Err(FitError::NotFitted);
        }
        Ok(sigmoid(self.margin(x)))
    }
}

// ─── Builder ──────────────────────────────────────────────────────────────────

struct RegressionBuilder<'a> {
    x:      &'a [Vec<f64>],
    grad:   &'a [f64],
    hess:   &'a [f64],
    params: &'a BoostingParams,
    nodes:  Vec<RegressionNode>,
}

struct Candidate {
    feature:   usize,
    threshold: f64,
    gain:      f64,
}

impl RegressionBuilder<'_> {
    fn score(&self, g: f64, h: f64) -> f64 {
        g * g / (h + self.params.lambda)
    }

    fn grow(&mut self, sorted: SortedRows, depth: usize) -> usize {
        let rows = &sorted[0];
        let g: f64 = rows.iter().map(|&r| self.grad[r]).sum();
        let h: f64 = rows.iter().map(|&r| self.hess[r]).sum();

        let best = if depth < self.params.max_depth && rows.len() >= 2 {
            self.best_split(&sorted, g, h)
        } else {
            None
        };

        match best {
            Some(split) => {
                let at = self.nodes.len();
                self.nodes.push(RegressionNode::Leaf { value: 0.0 });

                let (left_rows, right_rows) = partition(self.x, sorted, split.feature, split.threshold);
                let left  = self.grow(left_rows, depth + 1);
                let right = self.grow(right_rows, depth + 1);

                self.nodes[at] = RegressionNode::Split {
                    feature:   split.feature,
                    threshold: split.threshold,
                    left,
                    right,
                };
                at
            }
            None => {
                self.nodes.push(RegressionNode::Leaf { value: -g / (h + self.params.lambda) });
                self.nodes.len() - 1
            }
        }
    }

    fn best_split(&self, sorted: &SortedRows, g: f64, h: f64) -> Option<Candidate> {
        let parent = self.score(g, h);
        let mut best: Option<Candidate> = None;

        for (feature, rows) in sorted.iter().enumerate() {
            let (mut gl, mut hl) = (0.0, 0.0);

            for i in 0..rows.len() - 1 {
                gl += self.grad[rows[i]];
                hl += self.hess[rows[i]];

                let here = self.x[rows[i]][feature];
                let next = self.x[rows[i + 1]][feature];
                if here >= next {
                    continue;
                }
                let (gr, hr) = (g - gl, h - hl);
                if hl < self.params.min_child_weight || hr < self.params.min_child_weight {
                    continue;
                }

                let gain = 0.5 * (self.score(gl, hl) + self.score(gr, hr) - parent) - self.params.gamma;
                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(Candidate {
                        feature,
                        threshold: here + (next - here) / 2.0,
                        gain,
                    });
                }
            }
        }
        best
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn quick() -> BoostingParams {
        BoostingParams { n_estimators: 30, max_depth: 3, min_child_weight: 0.01, ..BoostingParams::default() }
    }

    fn threshold_data() -> (Vec<Vec<f64>>, Vec<bool>) {
        let x: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64, (i % 7) as f64]).collect();
        let y: Vec<bool>     = (0..40).map(|i| i >= 20).collect();
        (x, y)
    }

    #[test]
    fn test_learns_threshold() {
        let (x, y) = threshold_data();
        let mut gbt = GradientBoostedTrees::new(quick());
        gbt.fit_binary(&x, &y).unwrap();

        assert!(gbt.positive_probability(&[3.0, 0.0]).unwrap() < 0.2);
        assert!(gbt.positive_probability(&[35.0, 0.0]).unwrap() > 0.8);
    }

    #[test]
    fn test_base_margin_matches_positive_rate() {
        let (x, _) = threshold_data();
        let y: Vec<bool> = (0..40).map(|i| i < 10).collect();
        let mut gbt = GradientBoostedTrees::new(BoostingParams { n_estimators: 0, ..quick() });
        gbt.fit_binary(&x, &y).unwrap();

        assert_eq!(gbt.n_rounds(), 0);
        assert!((gbt.positive_probability(&x[0]).unwrap() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_single_class_labels_stay_near_constant() {
        let (x, _) = threshold_data();
        let y = vec![false; 40];
        let mut gbt = GradientBoostedTrees::new(quick());
        gbt.fit_binary(&x, &y).unwrap();
        assert!(gbt.positive_probability(&x[5]).unwrap() < 1e-3);
    }

    #[test]
    fn test_unfitted_errors() {
        let gbt = GradientBoostedTrees::new(quick());
        assert_eq!(gbt.positive_probability(&[0.0]).unwrap_err(), FitError::NotFitted);
    }
}
