// ============================================================
// Layer 5 — Neural Network Training Loop
// ============================================================
// Mini-batch Adam on cross-entropy, CPU only.
//
// Key Burn 0.20 insight:
//   - Training uses TrainBackend (Autodiff<NdArray>) for gradients
//   - model.valid() returns the model on InnerBackend (NdArray),
//     which is what gets exported once training finishes
//
// Epoch loop:
//   1. the DataLoader reshuffles the rows (seeded) and yields
//      batches of batch_size
//   2. per batch: forward, loss, backward, Adam step
//   3. stop early once the mean loss has not improved by `tol`
//      for `n_iter_no_change` epochs
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use burn::{
    backend::{ndarray::NdArrayDevice, Autodiff, NdArray},
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
};
use rand::{rngs::StdRng, SeedableRng};

use crate::data::batcher::{measurement_dataset, MeasurementBatcher};
use crate::domain::errors::FitError;
use crate::ml::mlp::MlpParams;
use crate::ml::model::{MlpNet, MlpNetConfig};

type TrainBackend = Autodiff<NdArray>;
pub type InnerBackend = NdArray;

pub fn train_network(
    params:    &MlpParams,
    x:         &[Vec<f64>],
    y:         &[usize],
    n_classes: usize,
) -> Result<MlpNet<InnerBackend>, FitError> {
    if x.is_empty() {
        return Err(FitError::InsufficientData("neural net needs at least one row".into()));
    }
    if params.hidden == 0 || params.epochs == 0 {
        return Err(FitError::InsufficientData("hidden units and epochs must be positive".into()));
    }

    let device  = NdArrayDevice::default();
    let mut rng = StdRng::seed_from_u64(params.seed);

    // ── Build model ───────────────────────────────────────────────────────────
    let net_cfg = MlpNetConfig::new(x[0].len(), params.hidden, n_classes);
    let mut model: MlpNet<TrainBackend> = net_cfg.init(&device, &mut rng);

    // ── Adam optimiser ────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let batch_size   = params.batch_size.clamp(1, x.len());
    let train_loader = DataLoaderBuilder::new(MeasurementBatcher::<TrainBackend>::new())
        .batch_size(batch_size)
        .shuffle(params.seed)
        .build(measurement_dataset(x, y));

    let mut best_loss = f64::INFINITY;
    let mut stale     = 0usize;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=params.epochs {
        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;

        for batch in train_loader.iter() {
            let loss = model.forward_loss(batch.inputs, batch.targets);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            if !loss_val.is_finite() {
                return Err(FitError::NonConvergence(format!("loss became {loss_val} in epoch {epoch}")));
            }
            loss_sum += loss_val;
            batches  += 1;

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(params.learning_rate, model, grads);
        }

        let epoch_loss = loss_sum / batches as f64;
        tracing::trace!("MLP epoch {:>3}/{} | loss={:.5}", epoch, params.epochs, epoch_loss);

        if epoch_loss < best_loss - params.tol {
            best_loss = epoch_loss;
            stale = 0;
        } else {
            stale += 1;
            if stale >= params.n_iter_no_change {
                tracing::debug!("MLP stopped after {epoch} epochs (loss={epoch_loss:.5})");
                break;
            }
        }
    }

    Ok(model.valid())
}
