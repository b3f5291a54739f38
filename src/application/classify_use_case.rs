// ============================================================
// Layer 2 — ClassifyUseCase
// ============================================================
// Serves classification requests from the persisted pair.
//
//   start   → load pipeline + codec ONCE, fail fast on mismatch
//   classify → read-only; any number of concurrent callers
//   reload  → swap in a freshly loaded pair atomically
//
// Requests in flight during a reload finish on the pair they
// started with: each caller clones the Arc under a short read
// lock and classifies without holding the lock.

use anyhow::{Context, Result};
use std::sync::{Arc, RwLock};

use crate::application::train_use_case::TrainConfig;
use crate::domain::errors::ClassifyError;
use crate::infra::artifact_store::ArtifactStore;
use crate::ml::inferencer::{Classification, InferenceService, RawInputs};

pub struct ClassifierService {
    store:   ArtifactStore,
    current: RwLock<Arc<InferenceService>>,
}

impl ClassifierService {
    /// Load the artifact pair and get ready to serve.
    pub fn start(store: ArtifactStore) -> Result<Self> {
        let service = InferenceService::from_store(&store)
            .with_context(|| format!("Cannot load artifacts from '{}'", store.dir().display()))?;
        tracing::info!(
            "Classifier ready with {} classes: {}",
            service.classes().len(),
            service.classes().join(", ")
        );
        // train_config.json is informational; older artifact dirs may lack it
        match store.load_config::<TrainConfig>() {
            Ok(cfg) => tracing::debug!("Artifacts trained on '{}' with seed {}", cfg.dataset, cfg.seed),
            Err(e)  => tracing::debug!("No training config alongside artifacts: {e}"),
        }
        Ok(Self { store, current: RwLock::new(Arc::new(service)) })
    }

    /// The pair currently being served.
    pub fn current(&self) -> Arc<InferenceService> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn classify(&self, inputs: &RawInputs) -> Result<Classification, ClassifyError> {
        self.current().classify(inputs)
    }

    /// Re-read the artifact directory. On failure the old pair stays live.
    pub fn reload(&self) -> Result<()> {
        let fresh = InferenceService::from_store(&self.store)
            .with_context(|| format!("Cannot reload artifacts from '{}'", self.store.dir().display()))?;
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Arc::new(fresh);
        tracing::info!("Reloaded artifacts from '{}'", self.store.dir().display());
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::{tests::config_in, TrainUseCase};
    use crate::data::fixtures::{imbalanced_tco, CLASSES};
    use crate::domain::label_codec::LabelCodec;
    use crate::domain::traits::Classifier;
    use crate::infra::artifact_store::CODEC_FILE;
    use crate::ml::inferencer::{capture_all, FeatureInput};
    use crate::ml::knn::{KNearestNeighbors, KnnParams};
    use crate::ml::pipeline::{Model, Pipeline};
    use std::{fs, path::Path, thread};

    const ITO_LIKE: [Option<f64>; 4] = [Some(500.0), Some(0.3), Some(80.0), Some(120.0)];

    fn knn_store(dir: &Path) -> ArtifactStore {
        let ds = imbalanced_tco(20, 20, 20, 1);
        let mut p = Pipeline::new(Model::NearestNeighbors(KNearestNeighbors::new(KnnParams::default())), true);
        p.fit(&ds.features, &ds.targets, 3).unwrap();
        let store = ArtifactStore::new(dir);
        store.save_pair(&p, &LabelCodec::fit(CLASSES)).unwrap();
        store
    }

    #[test]
    fn test_service_over_trained_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config_in(dir.path());
        TrainUseCase::new(cfg.clone()).execute().unwrap();

        let svc = ClassifierService::start(ArtifactStore::new(&cfg.artifact_dir)).unwrap();
        let c = svc.classify(&capture_all(ITO_LIKE)).unwrap();

        assert!(CLASSES.contains(&c.label.as_str()));
        assert_eq!(c.probabilities.len(), 3);
        let sum: f64 = c.probabilities.iter().map(|p| p.probability).sum();
        assert!((sum - 1.0).abs() < 1e-6);
        let best = c.probabilities.iter().map(|p| p.probability).fold(0.0, f64::max);
        assert_eq!(c.probability_of(&c.label), Some(best));
    }

    #[test]
    fn test_all_missing_names_all_four_features() {
        let dir = tempfile::tempdir().unwrap();
        let svc = ClassifierService::start(knn_store(dir.path())).unwrap();
        match svc.classify(&capture_all([None; 4])).unwrap_err() {
            ClassifyError::MissingFeature { features } => assert_eq!(features.len(), 4),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_raw_value_takes_precedence_over_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let svc = ClassifierService::start(knn_store(dir.path())).unwrap();

        let mut inputs = capture_all(ITO_LIKE);
        inputs[0] = FeatureInput { raw: Some(850.0), clamped: Some(800.0) };
        let c = svc.classify(&inputs).unwrap();
        assert_eq!(c.features[0], 850.0);
    }

    #[test]
    fn test_classification_is_idempotent_across_loads() {
        let dir   = tempfile::tempdir().unwrap();
        let store = knn_store(dir.path());
        let a = ClassifierService::start(store.clone()).unwrap();
        let b = ClassifierService::start(store).unwrap();

        let inputs = capture_all(ITO_LIKE);
        let first  = a.classify(&inputs).unwrap();
        assert_eq!(first, a.classify(&inputs).unwrap());
        assert_eq!(first, b.classify(&inputs).unwrap());
    }

    #[test]
    fn test_mismatched_pair_is_rejected_at_start() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        knn_store(dir_a.path());
        knn_store(dir_b.path());
        fs::copy(dir_b.path().join(CODEC_FILE), dir_a.path().join(CODEC_FILE)).unwrap();

        assert!(ClassifierService::start(ArtifactStore::new(dir_a.path())).is_err());
    }

    #[test]
    fn test_missing_artifacts_fail_to_start() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ClassifierService::start(ArtifactStore::new(dir.path())).is_err());
    }

    #[test]
    fn test_reload_swaps_pair_and_keeps_old_on_failure() {
        let dir   = tempfile::tempdir().unwrap();
        let store = knn_store(dir.path());
        let svc   = ClassifierService::start(store.clone()).unwrap();
        let before = svc.current();

        knn_store(dir.path());
        svc.reload().unwrap();
        assert!(!Arc::ptr_eq(&before, &svc.current()));

        fs::remove_file(dir.path().join(CODEC_FILE)).unwrap();
        assert!(svc.reload().is_err());
        assert!(svc.classify(&capture_all(ITO_LIKE)).is_ok());
    }

    #[test]
    fn test_concurrent_callers_agree() {
        let dir = tempfile::tempdir().unwrap();
        let svc = Arc::new(ClassifierService::start(knn_store(dir.path())).unwrap());
        let expected = svc.classify(&capture_all(ITO_LIKE)).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let svc = Arc::clone(&svc);
                thread::spawn(move || svc.classify(&capture_all(ITO_LIKE)).unwrap())
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), expected);
        }
    }
}
