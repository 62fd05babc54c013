// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by the application layer:
//
//   checkpoint.rs — per-epoch model weights and run_config.json
//                   through Burn's file recorders
//
//   metrics.rs    — epoch-level metrics appended to a CSV file
//
//   run_dirs.rs   — models/<run_id> and logs/<run_id>, owned by
//                   a guard that removes them if the run fails
//
//   logging.rs    — tracing subscriber (stdout + run log file)
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// Run directory layout and cleanup guard
pub mod run_dirs;

/// tracing subscriber setup
pub mod logging;
