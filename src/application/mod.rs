// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// one run: training or scoring.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing here (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Serialisable run configuration and its validation
pub mod run_config;

// The training workflow
pub mod train_use_case;

// The eval-only scoring workflow
pub mod score_use_case;
