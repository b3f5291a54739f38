// ============================================================
// Layer 4 — Encoded Dataset
// ============================================================
// The loaded table after label encoding: one feature row per
// measurement (schema order) and one class index per row.
//
//   MeasurementTable ──encode(codec)──► Dataset
//                                         │
//                          split / subset ┘
//
// Every model, fold and balancer works on this shape.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::data::splitter::split_train_test;
use crate::domain::label_codec::LabelCodec;
use crate::domain::measurement::MeasurementTable;

/// Encoded training data: feature rows in schema order plus
/// class indices from the label codec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub features:  Vec<Vec<f64>>,
    pub targets:   Vec<usize>,
    pub n_classes: usize,
}

impl Dataset {
    pub fn new(features: Vec<Vec<f64>>, targets: Vec<usize>, n_classes: usize) -> Self {
        debug_assert_eq!(features.len(), targets.len());
        Self { features, targets, n_classes }
    }

    /// Encode a loaded table with a codec fit on the full label column.
    pub fn encode(table: &MeasurementTable, codec: &LabelCodec) -> Result<Self> {
        let targets = codec
            .encode_all(table.labels())
            .map_err(anyhow::Error::msg)?;
        Ok(Self::new(table.feature_matrix(), targets, codec.len()))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Member count per class index
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &t in &self.targets {
            counts[t] += 1;
        }
        counts
    }

    /// Rows at the given indices, in the given order
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            features:  indices.iter().map(|&i| self.features[i].clone()).collect(),
            targets:   indices.iter().map(|&i| self.targets[i]).collect(),
            n_classes: self.n_classes,
        }
    }

    /// Seeded train/test split of the rows.
    pub fn split(&self, test_fraction: f64, seed: u64) -> (Self, Self) {
        let indices: Vec<usize> = (0..self.len()).collect();
        let (train, test) = split_train_test(indices, test_fraction, seed);
        (self.subset(&train), self.subset(&test))
    }
}
