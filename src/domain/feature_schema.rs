// ============================================================
// Layer 3 — Feature Schema
// ============================================================
// The four optical measurements the classifier understands,
// in the exact order every feature vector must follow.
//
// The fitted pipeline addresses features by POSITION, not by
// name. Index 0 is always wavelength, index 3 is always
// optical density. Every component that builds a vector goes
// through this table instead of hard-coding its own order.
//
//   index │ feature         │ CSV column      │ range
//   ──────┼─────────────────┼─────────────────┼──────────────
//     0   │ Wavelength      │ Wavelength      │ 300 – 800 nm
//     1   │ Absorbance      │ AbsorptionRate  │ 0 – 1
//     2   │ Transmission    │ Transmission    │ 0 – 100 %
//     3   │ OpticalDensity  │ OpticalDensity  │ 0 – 100000

use serde::{Deserialize, Serialize};

/// Number of features in every measurement vector
pub const N_FEATURES: usize = 4;

/// A single feature vector in schema order
pub type FeatureVector = [f64; N_FEATURES];

/// Identifies one of the four optical features.
/// The discriminant IS the position in the feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    Wavelength     = 0,
    Absorbance     = 1,
    Transmission   = 2,
    OpticalDensity = 3,
}

impl Feature {
    /// All features in vector order
    pub const ALL: [Feature; N_FEATURES] = [
        Feature::Wavelength,
        Feature::Absorbance,
        Feature::Transmission,
        Feature::OpticalDensity,
    ];

    /// Position of this feature in a [`FeatureVector`]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The static description of this feature
    pub fn spec(self) -> &'static FeatureSpec {
        &FEATURES[self.index()]
    }
}

/// Static description of one feature: names, unit and hard range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureSpec {
    pub feature: Feature,
    /// Canonical feature name
    pub name:    &'static str,
    /// Column header in the dataset CSV
    pub column:  &'static str,
    /// Label shown to users (used in missing-value messages)
    pub label:   &'static str,
    pub unit:    &'static str,
    pub min:     f64,
    pub max:     f64,
}

impl FeatureSpec {
    /// Clamp a value into this feature's hard range.
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// True if the value lies inside the hard range (inclusive).
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// The canonical feature table, in vector order.
pub const FEATURES: [FeatureSpec; N_FEATURES] = [
    FeatureSpec {
        feature: Feature::Wavelength,
        name:    "Wavelength",
        column:  "Wavelength",
        label:   "Wavelength",
        unit:    "nm",
        min:     300.0,
        max:     800.0,
    },
    FeatureSpec {
        feature: Feature::Absorbance,
        name:    "Absorbance",
        column:  "AbsorptionRate",
        label:   "Absorbance",
        unit:    "",
        min:     0.0,
        max:     1.0,
    },
    FeatureSpec {
        feature: Feature::Transmission,
        name:    "Transmission",
        column:  "Transmission",
        label:   "Transmission (%)",
        unit:    "%",
        min:     0.0,
        max:     100.0,
    },
    FeatureSpec {
        feature: Feature::OpticalDensity,
        name:    "OpticalDensity",
        column:  "OpticalDensity",
        label:   "Optical Density",
        unit:    "",
        min:     0.0,
        max:     100_000.0,
    },
];

/// Name of the label column in the dataset CSV
pub const LABEL_COLUMN: &str = "Material";
