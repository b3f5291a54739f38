// ============================================================
// Layer 6 — Artifact Store
// ============================================================
// Persists the selected pipeline and the label codec as a
// PAIR, plus the training config as a side output.
//
// File layout:
//   artifacts/
//     pipeline.json      ← { pair_id, pipeline }
//     label_codec.json   ← { pair_id, codec }
//     train_config.json  ← settings of the run (human-readable)
//
// Both pair files carry the same random pair_id. Loading
// rejects a pipeline and codec whose ids differ (they come
// from different runs) or whose class counts disagree.
//
// Writes go to `<name>.tmp` first and are renamed only after
// both temp files are complete, so a crash mid-save never
// leaves a half-written artifact under the real name.
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (I/O and File Handling)

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::domain::errors::ArtifactError;
use crate::domain::label_codec::LabelCodec;
use crate::ml::pipeline::Pipeline;

pub const PIPELINE_FILE: &str = "pipeline.json";
pub const CODEC_FILE:    &str = "label_codec.json";
pub const CONFIG_FILE:   &str = "train_config.json";

#[derive(Debug, Serialize, Deserialize)]
struct PipelineArtifact {
    pair_id:  u64,
    pipeline: Pipeline,
}

#[derive(Debug, Serialize, Deserialize)]
struct CodecArtifact {
    pair_id: u64,
    codec:   LabelCodec,
}

/// Reads and writes the artifact directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write pipeline + codec under a fresh pair id; returns the id.
    pub fn save_pair(&self, pipeline: &Pipeline, codec: &LabelCodec) -> Result<u64, ArtifactError> {
        fs::create_dir_all(&self.dir).map_err(|source| ArtifactError::Io {
            path: self.dir.display().to_string(),
            source,
        })?;

        let pair_id: u64 = rand::random();

        let pipeline_path = self.dir.join(PIPELINE_FILE);
        let codec_path    = self.dir.join(CODEC_FILE);

        let pipeline_tmp = write_tmp(&pipeline_path, &PipelineArtifact { pair_id, pipeline: pipeline.clone() })?;
        let codec_tmp    = write_tmp(&codec_path, &CodecArtifact { pair_id, codec: codec.clone() })?;

        rename(&pipeline_tmp, &pipeline_path)?;
        rename(&codec_tmp, &codec_path)?;

        tracing::info!("Saved artifact pair {:016x} to '{}'", pair_id, self.dir.display());
        Ok(pair_id)
    }

    /// Load and cross-check the pair written by `save_pair`.
    pub fn load_pair(&self) -> Result<(Pipeline, LabelCodec), ArtifactError> {
        let p: PipelineArtifact = read_json(&self.dir.join(PIPELINE_FILE))?;
        let c: CodecArtifact    = read_json(&self.dir.join(CODEC_FILE))?;

        if p.pair_id != c.pair_id {
            return Err(ArtifactError::PairMismatch { pipeline: p.pair_id, codec: c.pair_id });
        }
        if p.pipeline.n_classes() != c.codec.len() {
            return Err(ArtifactError::ClassCountMismatch {
                pipeline: p.pipeline.n_classes(),
                codec:    c.codec.len(),
            });
        }

        tracing::debug!("Loaded artifact pair {:016x} ({} classes)", p.pair_id, c.codec.len());
        Ok((p.pipeline, c.codec))
    }

    /// Save the run settings next to the pair.
    pub fn save_config<T: Serialize>(&self, cfg: &T) -> Result<(), ArtifactError> {
        fs::create_dir_all(&self.dir).map_err(|source| ArtifactError::Io {
            path: self.dir.display().to_string(),
            source,
        })?;
        let path = self.dir.join(CONFIG_FILE);
        let tmp  = write_tmp(&path, cfg)?;
        rename(&tmp, &path)?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config<T: DeserializeOwned>(&self) -> Result<T, ArtifactError> {
        read_json(&self.dir.join(CONFIG_FILE))
    }
}

// ─── File helpers ─────────────────────────────────────────────────────────────

fn write_tmp<T: Serialize>(path: &Path, value: &T) -> Result<PathBuf, ArtifactError> {
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(value).map_err(|source| ArtifactError::Serde {
        path: path.display().to_string(),
        source,
    })?;
    fs::write(&tmp, json).map_err(|source| ArtifactError::Io {
        path: tmp.display().to_string(),
        source,
    })?;
    Ok(tmp)
}

fn rename(from: &Path, to: &Path) -> Result<(), ArtifactError> {
    fs::rename(from, to).map_err(|source| ArtifactError::Io {
        path: to.display().to_string(),
        source,
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let text = fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ArtifactError::NotFound { path: path.display().to_string() },
        _ => ArtifactError::Io { path: path.display().to_string(), source },
    })?;
    serde_json::from_str(&text).map_err(|source| ArtifactError::Serde {
        path: path.display().to_string(),
        source,
    })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{imbalanced_tco, CLASSES};
    use crate::domain::traits::Classifier;
    use crate::ml::pipeline::Model;
    use crate::ml::tree::{DecisionTree, TreeParams};

    fn fitted() -> (Pipeline, LabelCodec) {
        let ds = imbalanced_tco(10, 10, 10, 1);
        let mut p = Pipeline::new(Model::DecisionTree(DecisionTree::new(TreeParams::default())), false);
        p.fit(&ds.features, &ds.targets, 3).unwrap();
        (p, LabelCodec::fit(CLASSES))
    }

    #[test]
    fn test_pair_round_trip() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let (p, codec) = fitted();

        store.save_pair(&p, &codec).unwrap();
        let (p2, codec2) = store.load_pair().unwrap();

        assert_eq!(codec2, codec);
        let row = vec![vec![500.0, 0.3, 80.0, 120.0]];
        assert_eq!(p.predict_proba(&row).unwrap(), p2.predict_proba(&row).unwrap());
        assert!(!dir.path().join("pipeline.json.tmp").exists());
    }

    #[test]
    fn test_codec_from_another_run_is_rejected() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        let (p, codec) = fitted();

        ArtifactStore::new(dir_a.path()).save_pair(&p, &codec).unwrap();
        ArtifactStore::new(dir_b.path()).save_pair(&p, &codec).unwrap();
        fs::copy(dir_b.path().join(CODEC_FILE), dir_a.path().join(CODEC_FILE)).unwrap();

        let err = ArtifactStore::new(dir_a.path()).load_pair().unwrap_err();
        assert!(matches!(err, ArtifactError::PairMismatch { .. }));
    }

    #[test]
    fn test_class_count_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (p, _) = fitted();
        let store = ArtifactStore::new(dir.path());
        store.save_pair(&p, &LabelCodec::fit(["AZO", "FTO"])).unwrap();

        assert!(matches!(
            store.load_pair().unwrap_err(),
            ArtifactError::ClassCountMismatch { pipeline: 3, codec: 2 }
        ));
    }

    #[test]
    fn test_missing_artifacts_report_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = ArtifactStore::new(dir.path()).load_pair().unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound { .. }));
    }

    #[test]
    fn test_config_round_trip() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("nested"));
        store.save_config(&vec![1u64, 2, 3]).unwrap();
        let back: Vec<u64> = store.load_config().unwrap();
        assert_eq!(back, vec![1, 2, 3]);
    }
}
