// ============================================================
// Layer 5 — Neural Classifier
// ============================================================
// Classifier-trait face of the burn network. fit() runs the
// training loop, then copies the two Linear layers out of the
// backend into plain row-major vectors:
//
//   DenseLayer { weights: [d_input × d_output], bias: [d_output] }
//   out_j = bias_j + Σ_i in_i · weights[i·d_output + j]
//
// The exported layers serialise with serde alongside every
// other model, and prediction is a direct forward pass plus a
// numerically stable softmax.

use burn::nn::Linear;
use serde::{Deserialize, Serialize};

use crate::domain::errors::FitError;
use crate::domain::traits::Classifier;
use crate::ml::trainer::{train_network, InnerBackend};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MlpParams {
    pub hidden:           usize,
    pub epochs:           usize,
    pub batch_size:       usize,
    pub learning_rate:    f64,
    /// Minimum loss improvement that resets the patience counter
    pub tol:              f64,
    pub n_iter_no_change: usize,
    pub seed:             u64,
}

impl Default for MlpParams {
    fn default() -> Self {
        Self {
            hidden:           100,
            epochs:           500,
            batch_size:       200,
            learning_rate:    1e-3,
            tol:              1e-4,
            n_iter_no_change: 10,
            seed:             42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    d_input:  usize,
    d_output: usize,
    weights:  Vec<f32>,
    bias:     Vec<f32>,
}

impl DenseLayer {
    fn from_linear(linear: &Linear<InnerBackend>) -> Result<Self, FitError> {
        let weight = linear.weight.val();
        let [d_input, d_output] = weight.dims();
        let weights = weight
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| FitError::Backend(format!("cannot export weights: {e:?}")))?;
        let bias = match &linear.bias {
            Some(b) => b
                .val()
                .into_data()
                .to_vec::<f32>()
                .map_err(|e| FitError::Backend(format!("cannot export bias: {e:?}")))?,
            None => vec![0.0; d_output],
        };
        Ok(Self { d_input, d_output, weights, bias })
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        (0..self.d_output)
            .map(|j| {
                f64::from(self.bias[j])
                    + (0..self.d_input)
                        .map(|i| input[i] * f64::from(self.weights[i * self.d_output + j]))
                        .sum::<f64>()
            })
            .collect()
    }
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = logits.iter().map(|z| (z - max).exp()).collect();
    let sum: f64 = exp.iter().sum();
    exp.into_iter().map(|e| e / sum).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpClassifier {
    params: MlpParams,
    layers: Option<(DenseLayer, DenseLayer)>,
}

impl MlpClassifier {
    pub fn new(params: MlpParams) -> Self {
        Self { params, layers: None }
    }
}

impl Classifier for MlpClassifier {
    fn fit(&mut self, x: &[Vec<f64>], y: &[usize], n_classes: usize) -> Result<(), FitError> {
        let net    = train_network(&self.params, x, y, n_classes)?;
        let hidden = DenseLayer::from_linear(&net.hidden)?;
        let output = DenseLayer::from_linear(&net.output)?;

        if hidden.weights.iter().chain(&output.weights).any(|w| !w.is_finite()) {
            return Err(FitError::Numerical("network weights are not finite".into()));
        }
        self.layers = Some((hidden, output));
        Ok(())
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, FitError> {
        let (hidden, output) = self.layers.as_ref().ok_or(FitError::NotFitted)?;
        Ok(x.iter()
            .map(|row| {
                let h: Vec<f64> = hidden.forward(row).into_iter().map(|v| v.max(0.0)).collect();
                softmax(&output.forward(&h))
            })
            .collect())
    }
}
