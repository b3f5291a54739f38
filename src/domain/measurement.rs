// ============================================================
// Layer 3 — Measurement Domain Type
// ============================================================
// One labelled row of the TCO dataset: the four optical
// measurements plus the material name.
//
// The features are stored already in schema order, so the
// row can be handed to any classifier without re-ordering.

use serde::{Deserialize, Serialize};

use crate::domain::feature_schema::FeatureVector;

/// A labelled optical measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Material name, e.g. "ITO", "FTO", "AZO"
    pub material: String,

    /// [Wavelength, Absorbance, Transmission, OpticalDensity]
    pub features: FeatureVector,
}

impl Measurement {
    pub fn new(material: impl Into<String>, features: FeatureVector) -> Self {
        Self {
            material: material.into(),
            features,
        }
    }
}

/// The full in-memory table produced by the dataset loader.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeasurementTable {
    pub rows: Vec<Measurement>,

    /// Rows dropped because at least one cell was empty
    pub skipped_incomplete: usize,
}

impl MeasurementTable {
    pub fn new(rows: Vec<Measurement>) -> Self {
        Self { rows, skipped_incomplete: 0 }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Feature matrix X, one schema-ordered row per measurement
    pub fn feature_matrix(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(|r| r.features.to_vec()).collect()
    }

    /// Raw label vector y
    pub fn labels(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.material.as_str()).collect()
    }
}
