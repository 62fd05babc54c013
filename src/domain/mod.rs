// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits describing the task:
// samples, labels, feature kinds, tracks, and the errors
// the rest of the crate reports.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Typed failures (configuration, degenerate input, training)
pub mod error;

// Track and feature enums resolved from CLI strings
pub mod kinds;

// Sample, label and metadata types
pub mod sample;

// Core abstractions (traits) that other layers implement
pub mod traits;
