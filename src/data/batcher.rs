// ============================================================
// Layer 4 — Measurement Batcher
// ============================================================
// Implements Burn's Batcher trait so the neural classifier's
// training loop can be driven by Burn's DataLoader.
//
// How batching works here:
//   Input:  Vec of N MeasurementItems (standardised features
//           + class index)
//   Output: inputs  [N, 4]  (Float)
//           targets [N]     (Int)
//
//   Rows are flattened into one Vec<f32> then reshaped:
//   [r1_f1, r1_f2, r1_f3, r1_f4, r2_f1, ...] → [N, 4]
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::{dataloader::batcher::Batcher, dataset::InMemDataset},
    prelude::*,
};
use std::marker::PhantomData;

/// One training row as seen by the DataLoader.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementItem {
    pub features: Vec<f64>,
    pub target:   usize,
}

/// Wrap encoded rows in an in-memory Burn dataset.
pub fn measurement_dataset(x: &[Vec<f64>], y: &[usize]) -> InMemDataset<MeasurementItem> {
    let items = x
        .iter()
        .zip(y)
        .map(|(features, &target)| MeasurementItem { features: features.clone(), target })
        .collect();
    InMemDataset::new(items)
}

// ─── MeasurementBatch ─────────────────────────────────────────────────────────
/// A batch ready for the forward pass.
#[derive(Debug, Clone)]
pub struct MeasurementBatch<B: Backend> {
    /// Feature rows — shape: [batch_size, n_features]
    pub inputs: Tensor<B, 2>,

    /// Class indices — shape: [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

// ─── MeasurementBatcher ───────────────────────────────────────────────────────
/// Stateless; the DataLoader hands over the device per batch.
#[derive(Clone, Debug)]
pub struct MeasurementBatcher<B: Backend> {
    _backend: PhantomData<B>,
}

impl<B: Backend> MeasurementBatcher<B> {
    pub fn new() -> Self {
        Self { _backend: PhantomData }
    }
}

impl<B: Backend> Batcher<B, MeasurementItem, MeasurementBatch<B>> for MeasurementBatcher<B> {
    fn batch(&self, items: Vec<MeasurementItem>, device: &B::Device) -> MeasurementBatch<B> {
        let batch_size = items.len();
        let n_features = items.first().map_or(0, |i| i.features.len());

        // Burn's default float element on NdArray is f32
        let flat: Vec<f32> = items
            .iter()
            .flat_map(|i| i.features.iter().map(|&v| v as f32))
            .collect();
        let targets: Vec<i32> = items.iter().map(|i| i.target as i32).collect();

        let inputs = Tensor::<B, 1>::from_floats(flat.as_slice(), device)
            .reshape([batch_size, n_features]);
        let targets = Tensor::<B, 1, Int>::from_ints(targets.as_slice(), device);

        MeasurementBatch { inputs, targets }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{ndarray::NdArrayDevice, NdArray};
    use burn::data::dataset::Dataset as _;

    #[test]
    fn test_batch_shapes_and_row_order() {
        let x = vec![vec![1.0, 2.0, 3.0, 4.0], vec![5.0, 6.0, 7.0, 8.0]];
        let y = vec![2, 0];
        let items = measurement_dataset(&x, &y).iter().collect::<Vec<_>>();

        let batch = MeasurementBatcher::<NdArray>::new().batch(items, &NdArrayDevice::default());

        assert_eq!(batch.inputs.dims(), [2, 4]);
        assert_eq!(batch.targets.dims(), [2]);
        assert_eq!(
            batch.inputs.into_data().to_vec::<f32>().unwrap(),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]
        );
    }

    #[test]
    fn test_dataset_keeps_every_row() {
        let x = vec![vec![0.0; 4]; 5];
        let y = vec![0, 1, 2, 1, 0];
        let ds = measurement_dataset(&x, &y);
        assert_eq!(ds.len(), 5);
        assert_eq!(ds.get(2).map(|i| i.target), Some(2));
    }
}
