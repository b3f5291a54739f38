// ============================================================
// Layer 5 — Neural Network Architecture (Burn)
// ============================================================
// Single-hidden-layer perceptron:
//
//   inputs [batch, 4]
//       │
//       ▼
//   Linear(4 → hidden) → ReLU
//       │
//       ▼
//   Linear(hidden → n_classes) → logits [batch, n_classes]
//
// Trained with cross-entropy on the logits. After training the
// weights are exported to plain vectors (see mlp.rs), so
// inference never touches a burn backend.
//
// Reference: Burn Book §3 (Building Blocks)
//            Rumelhart, Hinton & Williams (1986) Backpropagation

use burn::{
    module::Param,
    nn::{loss::CrossEntropyLossConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::relu,
};
use rand::{rngs::StdRng, Rng};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct MlpNetConfig {
    pub d_input:   usize,
    pub d_hidden:  usize,
    pub n_classes: usize,
}

impl MlpNetConfig {
    /// Weights are drawn from `rng`, so a fixed seed always yields
    /// the same starting network.
    pub fn init<B: Backend>(&self, device: &B::Device, rng: &mut StdRng) -> MlpNet<B> {
        MlpNet {
            hidden: seeded_linear(self.d_input, self.d_hidden, device, rng),
            output: seeded_linear(self.d_hidden, self.n_classes, device, rng),
        }
    }
}

/// U(−1/√fan_in, 1/√fan_in) for weights and bias.
fn seeded_linear<B: Backend>(
    d_in:   usize,
    d_out:  usize,
    device: &B::Device,
    rng:    &mut StdRng,
) -> Linear<B> {
    let bound = 1.0 / (d_in as f64).sqrt();
    let mut draw = |n: usize| -> Vec<f32> {
        (0..n).map(|_| rng.gen_range(-bound..bound) as f32).collect()
    };
    let weights = draw(d_in * d_out);
    let bias    = draw(d_out);

    let mut linear = LinearConfig::new(d_in, d_out).init(device);
    // Linear stores its weight as [d_in, d_out]
    linear.weight = Param::from_tensor(
        Tensor::<B, 1>::from_floats(weights.as_slice(), device).reshape([d_in, d_out]),
    );
    linear.bias = Some(Param::from_tensor(Tensor::<B, 1>::from_floats(bias.as_slice(), device)));
    linear
}

#[derive(Module, Debug)]
pub struct MlpNet<B: Backend> {
    pub hidden: Linear<B>,
    pub output: Linear<B>,
}

impl<B: Backend> MlpNet<B> {
    /// inputs: [batch, d_input] → logits: [batch, n_classes]
    pub fn forward(&self, inputs: Tensor<B, 2>) -> Tensor<B, 2> {
        let h = relu(self.hidden.forward(inputs));
        self.output.forward(h)
    }

    /// Mean cross-entropy over the batch.
    pub fn forward_loss(&self, inputs: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1> {
        let logits = self.forward(inputs);
        CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits, targets)
    }
}
