// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns that don't belong in any specific
// business layer:
//
//   artifact_store.rs — Saving and loading the pipeline and
//                       label codec as a matched pair, plus
//                       the training config as JSON.
//
//   metrics.rs        — Accuracy, confusion matrix, per-class
//                       report and one-vs-rest ROC / AUC.
//
//   reports.rs        — Writes the evaluation side outputs
//                       (CSV + text) of a training run.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)

/// Paired pipeline + codec persistence
pub mod artifact_store;

/// Evaluation metrics
pub mod metrics;

/// Evaluation report files
pub mod reports;
