// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits describing the problem:
// the feature schema, a labelled measurement, the label
// codec, the error taxonomy and the model abstractions.
//
// Rules for this layer:
//   - NO burn types
//   - NO file I/O
//   - Only structs, enums and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// The four optical features, their order and ranges
pub mod feature_schema;

// A labelled row of the dataset
pub mod measurement;

// Material name ↔ class index mapping
pub mod label_codec;

// Typed errors for data, balancing, fitting and inference
pub mod errors;

// Core abstractions (traits) that other layers implement
pub mod traits;
