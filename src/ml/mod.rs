// ============================================================
// Layer 5 — ML / Model Layer
// ============================================================
// Every estimator, the model bank and the inference service.
// Only model.rs, trainer.rs and mlp.rs touch Burn; a fitted
// network is exported to plain weight matrices so serving and
// persistence never need a Burn backend.
//
// What's in this layer:
//
//   tree.rs / forest.rs  — CART decision tree, bagged forest
//   boosting.rs          — gradient-boosted regression trees
//                          on the logistic loss (binary)
//   svm.rs               — RBF kernel SVM (SMO) + Platt scaling
//   knn.rs               — k-nearest neighbours
//   one_vs_rest.rs       — lifts binary estimators to K classes
//   model.rs / trainer.rs / mlp.rs
//                        — one-hidden-layer MLP trained with
//                          Burn (Adam, cross-entropy)
//   pipeline.rs          — optional scaler + one model
//   learning_curve.rs    — k-fold learning curves
//   model_bank.rs        — fit, score and select candidates
//   inferencer.rs        — classifies one measurement
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Breiman et al. (1984) Classification and Regression Trees

pub mod tree;
pub mod forest;
pub mod boosting;
pub mod svm;
pub mod knn;
pub mod one_vs_rest;

/// Burn MLP architecture
pub mod model;

/// MLP training loop
pub mod trainer;

pub mod mlp;
pub mod pipeline;
pub mod learning_curve;
pub mod model_bank;

/// Inference service over a loaded pipeline + codec
pub mod inferencer;
