// ============================================================
// Layer 5 — Inference Service
// ============================================================
// Classifies one measurement with a loaded pipeline + codec.
//
// Request flow:
//
//   4 × FeatureInput { raw, clamped }
//       │  missing any? → MissingFeature (names ALL absent ones)
//       ▼
//   [wavelength, absorbance, transmission, optical density]
//       │  raw value if present, else the clamped one
//       ▼
//   pipeline.predict_proba  (exactly once)
//       │  K finite, non-negative values summing to 1 ± 1e-6
//       ▼
//   argmax → codec.decode → Classification
//
// The service never mutates its pipeline, so one instance can
// be shared by any number of concurrent callers.

use serde::Serialize;

use crate::domain::errors::ClassifyError;
use crate::domain::feature_schema::{FeatureSpec, FeatureVector, FEATURES, N_FEATURES};
use crate::domain::label_codec::LabelCodec;
use crate::domain::traits::argmax;
use crate::infra::artifact_store::ArtifactStore;
use crate::ml::pipeline::Pipeline;

const PROBABILITY_TOLERANCE: f64 = 1e-6;

// ─── Request values ───────────────────────────────────────────────────────────

/// One user-supplied feature value after validation.
///
/// `raw` is what the user typed, `clamped` the same value
/// forced into the feature's hard range for display. The model
/// is fed `raw` whenever it exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FeatureInput {
    pub raw:     Option<f64>,
    pub clamped: Option<f64>,
}

impl FeatureInput {
    /// The single validation step for a feature value.
    pub fn capture(value: Option<f64>, spec: &FeatureSpec) -> Self {
        Self {
            raw:     value,
            clamped: value.map(|v| spec.clamp(v)),
        }
    }

    /// Value handed to the model: raw first, clamped as fallback.
    pub fn inference_value(&self) -> Option<f64> {
        self.raw.or(self.clamped)
    }

    /// Value shown back to the user.
    pub fn display_value(&self) -> Option<f64> {
        self.clamped.or(self.raw)
    }

    pub fn was_clamped(&self) -> bool {
        matches!((self.raw, self.clamped), (Some(r), Some(c)) if r != c)
    }
}

/// The four inputs in schema order
pub type RawInputs = [FeatureInput; N_FEATURES];

/// Capture four optional values in schema order.
pub fn capture_all(values: [Option<f64>; N_FEATURES]) -> RawInputs {
    let mut inputs = RawInputs::default();
    for (i, spec) in FEATURES.iter().enumerate() {
        inputs[i] = FeatureInput::capture(values[i], spec);
    }
    inputs
}

/// Parse user text for one feature. Empty or whitespace → absent.
pub fn parse_feature_text(text: Option<&str>, spec: &FeatureSpec) -> Result<Option<f64>, ClassifyError> {
    match text.map(str::trim) {
        None | Some("") => Ok(None),
        Some(t) => t.parse::<f64>().map(Some).map_err(|_| {
            ClassifyError::Inference(format!("{}: '{t}' is not a number", spec.label))
        }),
    }
}

// ─── Results ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassProbability {
    pub class:       String,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub label:         String,
    /// One entry per class, in codec order
    pub probabilities: Vec<ClassProbability>,
    /// The exact vector the model saw
    pub features:      FeatureVector,
}

impl Classification {
    pub fn probability_of(&self, class: &str) -> Option<f64> {
        self.probabilities.iter().find(|p| p.class == class).map(|p| p.probability)
    }
}

// ─── InferenceService ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct InferenceService {
    pipeline: Pipeline,
    codec:    LabelCodec,
}

impl InferenceService {
    pub fn new(pipeline: Pipeline, codec: LabelCodec) -> Result<Self, ClassifyError> {
        if pipeline.n_classes() != codec.len() {
            return Err(ClassifyError::Inference(format!(
                "pipeline predicts {} classes but the label codec has {}",
                pipeline.n_classes(),
                codec.len()
            )));
        }
        Ok(Self { pipeline, codec })
    }

    /// Load the persisted pair from an artifact directory.
    pub fn from_store(store: &ArtifactStore) -> anyhow::Result<Self> {
        let (pipeline, codec) = store.load_pair()?;
        Ok(Self::new(pipeline, codec)?)
    }

    pub fn classes(&self) -> &[String] {
        self.codec.classes()
    }

    pub fn classify(&self, inputs: &RawInputs) -> Result<Classification, ClassifyError> {
        let missing: Vec<String> = inputs
            .iter()
            .zip(&FEATURES)
            .filter(|(input, _)| input.inference_value().is_none())
            .map(|(_, spec)| spec.label.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ClassifyError::MissingFeature { features: missing });
        }

        let mut features: FeatureVector = [0.0; N_FEATURES];
        for ((slot, input), spec) in features.iter_mut().zip(inputs).zip(&FEATURES) {
            let value = input.inference_value().unwrap_or_default();
            if !value.is_finite() {
                return Err(ClassifyError::Inference(format!("{} must be a finite number", spec.label)));
            }
            if !spec.contains(value) {
                tracing::debug!("{} = {} lies outside [{}, {}]; classifying it as given", spec.name, value, spec.min, spec.max);
            }
            *slot = value;
        }

        let proba = self
            .pipeline
            .predict_proba_one(&features)
            .map_err(|e| ClassifyError::Inference(e.to_string()))?;
        self.check_probabilities(&proba)?;

        let label = self.codec.decode(argmax(&proba))?.to_string();
        let probabilities = self
            .codec
            .classes()
            .iter()
            .zip(proba)
            .map(|(class, probability)| ClassProbability { class: class.clone(), probability })
            .collect();

        tracing::debug!("Classified {:?} as {}", features, label);
        Ok(Classification { label, probabilities, features })
    }

    fn check_probabilities(&self, proba: &[f64]) -> Result<(), ClassifyError> {
        if proba.len() != self.codec.len() {
            return Err(ClassifyError::Inference(format!(
                "model returned {} probabilities for {} classes",
                proba.len(),
                self.codec.len()
            )));
        }
        if proba.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(ClassifyError::Inference(format!("malformed probabilities {proba:?}")));
        }
        let sum: f64 = proba.iter().sum();
        if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(ClassifyError::Inference(format!("probabilities sum to {sum}, not 1")));
        }
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{imbalanced_tco, CLASSES};
    use crate::domain::feature_schema::Feature;
    use crate::domain::traits::Classifier;
    use crate::ml::knn::{KNearestNeighbors, KnnParams};
    use crate::ml::pipeline::Model;

    fn service() -> InferenceService {
        let ds = imbalanced_tco(20, 20, 20, 1);
        let mut p = Pipeline::new(Model::NearestNeighbors(KNearestNeighbors::new(KnnParams::default())), true);
        p.fit(&ds.features, &ds.targets, 3).unwrap();
        InferenceService::new(p, LabelCodec::fit(CLASSES)).unwrap()
    }

    #[test]
    fn test_capture_keeps_raw_and_clamps_display() {
        let input = FeatureInput::capture(Some(850.0), Feature::Wavelength.spec());
        assert_eq!(input.raw, Some(850.0));
        assert_eq!(input.clamped, Some(800.0));
        assert_eq!(input.inference_value(), Some(850.0));
        assert_eq!(input.display_value(), Some(800.0));
        assert!(input.was_clamped());
    }

    #[test]
    fn test_clamped_value_used_only_without_raw() {
        let input = FeatureInput { raw: None, clamped: Some(800.0) };
        assert_eq!(input.inference_value(), Some(800.0));
    }

    #[test]
    fn test_all_missing_names_every_feature() {
        let err = service().classify(&capture_all([None; 4])).unwrap_err();
        assert_eq!(
            err,
            ClassifyError::MissingFeature {
                features: vec![
                    "Wavelength".into(),
                    "Absorbance".into(),
                    "Transmission (%)".into(),
                    "Optical Density".into(),
                ],
            }
        );
    }

    #[test]
    fn test_one_missing_names_only_it() {
        let err = service()
            .classify(&capture_all([Some(500.0), None, Some(80.0), Some(120.0)]))
            .unwrap_err();
        assert_eq!(err, ClassifyError::MissingFeature { features: vec!["Absorbance".into()] });
    }

    #[test]
    fn test_classifies_ito_like_measurement() {
        let c = service()
            .classify(&capture_all([Some(500.0), Some(0.3), Some(80.0), Some(120.0)]))
            .unwrap();

        assert_eq!(c.label, "ITO");
        assert_eq!(c.probabilities.len(), 3);
        let sum: f64 = c.probabilities.iter().map(|p| p.probability).sum();
        assert!((sum - 1.0).abs() < 1e-6);
        let best = c.probabilities.iter().map(|p| p.probability).fold(0.0, f64::max);
        assert_eq!(c.probability_of("ITO"), Some(best));
    }

    #[test]
    fn test_raw_value_reaches_model() {
        let c = service()
            .classify(&capture_all([Some(850.0), Some(0.3), Some(80.0), Some(120.0)]))
            .unwrap();
        assert_eq!(c.features[0], 850.0);
    }

    #[test]
    fn test_non_finite_value_is_inference_error() {
        let err = service()
            .classify(&capture_all([Some(f64::NAN), Some(0.3), Some(80.0), Some(120.0)]))
            .unwrap_err();
        assert!(matches!(err, ClassifyError::Inference(_)));
    }

    #[test]
    fn test_class_count_mismatch_rejected() {
        let ds = imbalanced_tco(5, 5, 5, 1);
        let mut p = Pipeline::new(Model::NearestNeighbors(KNearestNeighbors::new(KnnParams::default())), false);
        p.fit(&ds.features, &ds.targets, 3).unwrap();
        assert!(InferenceService::new(p, LabelCodec::fit(["AZO", "FTO"])).is_err());
    }

    #[test]
    fn test_parse_feature_text() {
        let spec = Feature::Absorbance.spec();
        assert_eq!(parse_feature_text(None, spec).unwrap(), None);
        assert_eq!(parse_feature_text(Some("   "), spec).unwrap(), None);
        assert_eq!(parse_feature_text(Some(" 0.25 "), spec).unwrap(), Some(0.25));
        assert!(matches!(parse_feature_text(Some("abc"), spec), Err(ClassifyError::Inference(_))));
    }
}
