// ============================================================
// Layer 5 — Kernel SVM (RBF) with Platt probabilities
// ============================================================
// Soft-margin C-SVM in its dual form:
//
//   min_α  ½ αᵀQα − Σα_i
//   s.t.   0 ≤ α_i ≤ C,   Σ y_i α_i = 0
//   Q_ij = y_i y_j K(x_i, x_j),  K(a, b) = exp(−γ‖a − b‖²)
//
// Solved by SMO: each step picks the maximal violating pair
// (i from I_up, j from I_low), updates the two multipliers
// analytically inside the box, and refreshes the gradient
// G = Qα − e. Stops when the violation drops below `tol`.
//
// Decision value:  f(x) = Σ α_i y_i K(x_i, x) − ρ
//
// Probabilities come from a sigmoid fitted to the training
// decision values (Platt scaling, Newton method with
// backtracking line search):
//
//   P(positive | x) = 1 / (1 + exp(A·f(x) + B))
//
// γ defaults to "scale": 1 / (d · Var(X)).
//
// Reference: Platt (1998) Sequential Minimal Optimization
//            Fan, Chen & Lin (2005) Working Set Selection Using
//              Second Order Information for Training SVM
//            Lin, Lin & Weng (2007) A Note on Platt's Probabilistic
//              Outputs for Support Vector Machines

use serde::{Deserialize, Serialize};

use crate::data::balancer::squared_distance;
use crate::domain::errors::FitError;
use crate::domain::traits::BinaryClassifier;

const TAU: f64 = 1e-12;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SvmParams {
    /// Box constraint
    pub c:        f64,
    /// RBF width; `None` = 1 / (d · Var(X))
    pub gamma:    Option<f64>,
    /// KKT violation tolerance
    pub tol:      f64,
    pub max_iter: usize,
}

impl Default for SvmParams {
    fn default() -> Self {
        Self {
            c:        10.0,
            gamma:    None,
            tol:      1e-3,
            max_iter: 100_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct PlattSigmoid {
    a: f64,
    b: f64,
}

impl PlattSigmoid {
    fn probability(&self, decision: f64) -> f64 {
        let z = self.a * decision + self.b;
        if z >= 0.0 {
            (-z).exp() / (1.0 + (-z).exp())
        } else {
            1.0 / (1.0 + z.exp())
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelSvm {
    params:   SvmParams,
    gamma:    f64,
    support:  Vec<Vec<f64>>,
    /// α_i · y_i per support vector
    coef:     Vec<f64>,
    rho:      f64,
    platt:    PlattSigmoid,
    /// Set when the training labels were all one class
    constant: Option<f64>,
    fitted:   bool,
}

impl KernelSvm {
    pub fn new(params: SvmParams) -> Self {
        Self {
            params,
            gamma:    0.0,
            support:  Vec::new(),
            coef:     Vec::new(),
            rho:      0.0,
            platt:    PlattSigmoid { a: -1.0, b: 0.0 },
            constant: None,
            fitted:   false,
        }
    }

    pub fn n_support(&self) -> usize {
        self.support.len()
    }

    fn kernel(&self, a: &[f64], b: &[f64]) -> f64 {
        (-self.gamma * squared_distance(a, b)).exp()
    }

    /// Signed distance-like score; positive leans to the positive class.
    pub fn decision_value(&self, x: &[f64]) -> f64 {
        self.support
            .iter()
            .zip(&self.coef)
            .map(|(sv, c)| c * self.kernel(sv, x))
            .sum::<f64>()
            - self.rho
    }
}

/// 1 / (d · Var(X)) over every entry of X; 1.0 for constant data.
fn scale_gamma(x: &[Vec<f64>]) -> f64 {
    let d     = x[0].len() as f64;
    let count = x.len() as f64 * d;
    let mean  = x.iter().flatten().sum::<f64>() / count;
    let var   = x.iter().flatten().map(|v| (v - mean).powi(2)).sum::<f64>() / count;
    if var > f64::EPSILON { 1.0 / (d * var) } else { 1.0 }
}

impl BinaryClassifier for KernelSvm {
    fn fit_binary(&mut self, x: &[Vec<f64>], y: &[bool]) -> Result<(), FitError> {
        if x.is_empty() {
            return Err(FitError::InsufficientData("SVM needs at least one row".into()));
        }
        if x.iter().flatten().any(|v| !v.is_finite()) {
            return Err(FitError::Numerical("non-finite feature value".into()));
        }

        self.support.clear();
        self.coef.clear();
        self.fitted = true;

        let n_pos = y.iter().filter(|&&b| b).count();
        if n_pos == 0 || n_pos == y.len() {
            self.constant = Some(n_pos as f64 / y.len() as f64);
            return Ok(());
        }
        self.constant = None;
        self.gamma    = self.params.gamma.unwrap_or_else(|| scale_gamma(x));

        let labels: Vec<f64> = y.iter().map(|&b| if b { 1.0 } else { -1.0 }).collect();
        let gram   = self.gram_matrix(x);
        let alpha  = self.solve(&gram, &labels)?;

        for (i, (&a, &l)) in alpha.iter().zip(&labels).enumerate() {
            if a > 1e-8 {
                self.support.push(x[i].clone());
                self.coef.push(a * l);
            }
        }

        let decisions: Vec<f64> = x.iter().map(|row| self.decision_value(row)).collect();
        self.platt = fit_platt(&decisions, y);

        if !self.rho.is_finite() || !self.platt.a.is_finite() || !self.platt.b.is_finite() {
            return Err(FitError::Numerical("SVM solution is not finite".into()));
        }
        tracing::debug!("SVM fitted: {} support vectors, gamma={:.4}", self.n_support(), self.gamma);
        Ok(())
    }

    fn positive_probability(&self, x: &[f64]) -> Result<f64, FitError> {
        if !self.fitted {
            return Err(FitError::NotFitted);
        }
        if let Some(p) = self.constant {
            return Ok(p);
        }
        Ok(self.platt.probability(self.decision_value(x)))
    }
}

// ─── SMO solver ───────────────────────────────────────────────────────────────

impl KernelSvm {
    fn gram_matrix(&self, x: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let n = x.len();
        let mut k = vec![vec![0.0; n]; n];
        for i in 0..n {
            k[i][i] = 1.0;
            for j in 0..i {
                let v = self.kernel(&x[i], &x[j]);
                k[i][j] = v;
                k[j][i] = v;
            }
        }
        k
    }

    /// Returns the multipliers and sets ρ.
    fn solve(&mut self, k: &[Vec<f64>], y: &[f64]) -> Result<Vec<f64>, FitError> {
        let n = y.len();
        let c = self.params.c;
        let q = |i: usize, j: usize| y[i] * y[j] * k[i][j];

        let mut alpha = vec![0.0; n];
        let mut grad  = vec![-1.0; n];

        let is_up  = |a: f64, yi: f64| (yi > 0.0 && a < c) || (yi < 0.0 && a > 0.0);
        let is_low = |a: f64, yi: f64| (yi > 0.0 && a > 0.0) || (yi < 0.0 && a < c);

        let mut iter = 0;
        loop {
            let mut i = None;
            let mut g_max = f64::NEG_INFINITY;
            let mut j = None;
            let mut g_min = f64::INFINITY;
            for t in 0..n {
                let v = -y[t] * grad[t];
                if is_up(alpha[t], y[t]) && v > g_max {
                    g_max = v;
                    i = Some(t);
                }
                if is_low(alpha[t], y[t]) && v < g_min {
                    g_min = v;
                    j = Some(t);
                }
            }

            let (Some(i), Some(j)) = (i, j) else { break };
            if g_max - g_min < self.params.tol {
                break;
            }
            if iter >= self.params.max_iter {
                tracing::warn!("SMO stopped at max_iter={} (violation {:.2e})", iter, g_max - g_min);
                break;
            }
            iter += 1;

            let (old_i, old_j) = (alpha[i], alpha[j]);
            if y[i] != y[j] {
                let quad  = (q(i, i) + q(j, j) + 2.0 * q(i, j)).max(TAU);
                let delta = (-grad[i] - grad[j]) / quad;
                let diff  = alpha[i] - alpha[j];
                alpha[i] += delta;
                alpha[j] += delta;
                if diff > 0.0 {
                    if alpha[j] < 0.0 { alpha[j] = 0.0; alpha[i] = diff; }
                } else if alpha[i] < 0.0 {
                    alpha[i] = 0.0;
                    alpha[j] = -diff;
                }
                if diff > 0.0 {
                    if alpha[i] > c { alpha[i] = c; alpha[j] = c - diff; }
                } else if alpha[j] > c {
                    alpha[j] = c;
                    alpha[i] = c + diff;
                }
            } else {
                let quad  = (q(i, i) + q(j, j) - 2.0 * q(i, j)).max(TAU);
                let delta = (grad[i] - grad[j]) / quad;
                let sum   = alpha[i] + alpha[j];
                alpha[i] -= delta;
                alpha[j] += delta;
                if sum > c {
                    if alpha[i] > c { alpha[i] = c; alpha[j] = sum - c; }
                } else if alpha[j] < 0.0 {
                    alpha[j] = 0.0;
                    alpha[i] = sum;
                }
                if sum > c {
                    if alpha[j] > c { alpha[j] = c; alpha[i] = sum - c; }
                } else if alpha[i] < 0.0 {
                    alpha[i] = 0.0;
                    alpha[j] = sum;
                }
            }

            let (d_i, d_j) = (alpha[i] - old_i, alpha[j] - old_j);
            for t in 0..n {
                grad[t] += q(t, i) * d_i + q(t, j) * d_j;
            }
            if !grad[i].is_finite() || !grad[j].is_finite() {
                return Err(FitError::Numerical("SMO gradient diverged".into()));
            }
        }

        self.rho = compute_rho(&alpha, &grad, y, c);
        Ok(alpha)
    }
}

/// ρ from the free multipliers, or the midpoint of the feasible band.
fn compute_rho(alpha: &[f64], grad: &[f64], y: &[f64], c: f64) -> f64 {
    let mut upper = f64::INFINITY;
    let mut lower = f64::NEG_INFINITY;
    let mut free_sum = 0.0;
    let mut n_free   = 0usize;

    for t in 0..alpha.len() {
        let yg = y[t] * grad[t];
        if alpha[t] >= c {
            if y[t] < 0.0 { upper = upper.min(yg) } else { lower = lower.max(yg) }
        } else if alpha[t] <= 0.0 {
            if y[t] > 0.0 { upper = upper.min(yg) } else { lower = lower.max(yg) }
        } else {
            n_free   += 1;
            free_sum += yg;
        }
    }

    if n_free > 0 { free_sum / n_free as f64 } else { (upper + lower) / 2.0 }
}

// ─── Platt scaling ────────────────────────────────────────────────────────────

fn fit_platt(decisions: &[f64], y: &[bool]) -> PlattSigmoid {
    let n_pos = y.iter().filter(|&&b| b).count() as f64;
    let n_neg = y.len() as f64 - n_pos;

    let hi = (n_pos + 1.0) / (n_pos + 2.0);
    let lo = 1.0 / (n_neg + 2.0);
    let targets: Vec<f64> = y.iter().map(|&b| if b { hi } else { lo }).collect();

    let objective = |a: f64, b: f64| -> f64 {
        decisions
            .iter()
            .zip(&targets)
            .map(|(f, t)| {
                let z = f * a + b;
                if z >= 0.0 { t * z + (-z).exp().ln_1p() } else { (t - 1.0) * z + z.exp().ln_1p() }
            })
            .sum()
    };

    let mut a    = 0.0;
    let mut b    = ((n_neg + 1.0) / (n_pos + 1.0)).ln();
    let mut fval = objective(a, b);

    for _ in 0..100 {
        let (mut h11, mut h22, mut h21) = (1e-12, 1e-12, 0.0);
        let (mut g1, mut g2) = (0.0, 0.0);

        for (f, t) in decisions.iter().zip(&targets) {
            let z = f * a + b;
            let (p, q) = if z >= 0.0 {
                let e = (-z).exp();
                (e / (1.0 + e), 1.0 / (1.0 + e))
            } else {
                let e = z.exp();
                (1.0 / (1.0 + e), e / (1.0 + e))
            };
            let d2 = p * q;
            h11 += f * f * d2;
            h22 += d2;
            h21 += f * d2;
            let d1 = t - p;
            g1 += f * d1;
            g2 += d1;
        }

        if g1.abs() < 1e-5 && g2.abs() < 1e-5 {
            break;
        }

        let det = h11 * h22 - h21 * h21;
        let da  = -(h22 * g1 - h21 * g2) / det;
        let db  = -(-h21 * g1 + h11 * g2) / det;
        let gd  = g1 * da + g2 * db;

        let mut step = 1.0;
        while step >= 1e-10 {
            let (na, nb) = (a + step * da, b + step * db);
            let nf = objective(na, nb);
            if nf < fval + 1e-4 * step * gd {
                a = na;
                b = nb;
                fval = nf;
                break;
            }
            step /= 2.0;
        }
        if step < 1e-10 {
            break;
        }
    }

    PlattSigmoid { a, b }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> (Vec<Vec<f64>>, Vec<bool>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..20 {
            let d = (i % 5) as f64 * 0.1;
            x.push(vec![-2.0 + d, -2.0 - d]);
            y.push(false);
            x.push(vec![2.0 - d, 2.0 + d]);
            y.push(true);
        }
        (x, y)
    }

    #[test]
    fn test_separates_two_blobs() {
        let (x, y) = two_blobs();
        let mut svm = KernelSvm::new(SvmParams::default());
        svm.fit_binary(&x, &y).unwrap();

        assert!(svm.n_support() > 0);
        assert!(svm.decision_value(&[2.0, 2.0]) > 0.0);
        assert!(svm.decision_value(&[-2.0, -2.0]) < 0.0);
        assert!(svm.positive_probability(&[2.0, 2.0]).unwrap() > 0.5);
        assert!(svm.positive_probability(&[-2.0, -2.0]).unwrap() < 0.5);
    }

    #[test]
    fn test_probabilities_in_unit_interval() {
        let (x, y) = two_blobs();
        let mut svm = KernelSvm::new(SvmParams::default());
        svm.fit_binary(&x, &y).unwrap();
        for row in &x {
            let p = svm.positive_probability(row).unwrap();
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn test_single_class_is_constant() {
        let (x, _) = two_blobs();
        let y = vec![true; x.len()];
        let mut svm = KernelSvm::new(SvmParams::default());
        svm.fit_binary(&x, &y).unwrap();
        assert_eq!(svm.positive_probability(&[0.0, 0.0]).unwrap(), 1.0);
    }

    #[test]
    fn test_non_finite_input_is_numerical_error() {
        let x = vec![vec![f64::NAN, 0.0], vec![1.0, 1.0]];
        let mut svm = KernelSvm::new(SvmParams::default());
        assert!(matches!(svm.fit_binary(&x, &[true, false]), Err(FitError::Numerical(_))));
    }

    #[test]
    fn test_scale_gamma() {
        // entries 0, 2 → var 1, d 1
        assert!((scale_gamma(&[vec![0.0], vec![2.0]]) - 1.0).abs() < 1e-12);
        assert_eq!(scale_gamma(&[vec![3.0], vec![3.0]]), 1.0);
    }
}
