// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's file recorders.
//
// What gets saved per run:
//   1. Model weights after every epoch (epoch_<n>.mpk)
//   2. run_config.json — the resolved run configuration
//
// Recorder: NamedMpkFileRecorder<FullPrecisionSettings>
//   - MessagePack with named fields
//   - f32 parameters kept as-is, so a reloaded model predicts
//     exactly what the saved one did
//
// File naming convention:
//   models/<run_id>/
//     epoch_0.mpk
//     epoch_1.mpk
//     ...
//     run_config.json
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
};

use crate::application::run_config::RunConfig;

pub const CONFIG_FILE: &str = "run_config.json";

type CheckpointRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// Writes checkpoints into one run's model directory.
/// The directory itself is owned by the run guard.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `{dir}/epoch_{epoch}.mpk`
    pub fn epoch_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("epoch_{epoch}.mpk"))
    }

    /// Save the full model state after `epoch`; returns the file written.
    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M, epoch: usize) -> Result<PathBuf> {
        let path = self.epoch_path(epoch);

        CheckpointRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| {
                format!("Failed to save checkpoint to '{}'", path.display())
            })?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(path)
    }

    pub fn save_config(&self, cfg: &RunConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved run config to '{}'", path.display());
        Ok(())
    }
}

/// Restore weights from `path` into `model`.
///
/// The architecture of `model` must match the one that was saved.
pub fn load_model<B: Backend, M: Module<B>>(model: M, path: &Path, device: &B::Device) -> Result<M> {
    let record = CheckpointRecorder::new()
        .load(path.to_path_buf(), device)
        .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;

    tracing::info!("Loaded checkpoint '{}'", path.display());
    Ok(model.load_record(record))
}

pub fn load_config(model_dir: &Path) -> Result<RunConfig> {
    let path = model_dir.join(CONFIG_FILE);
    let json = fs::read_to_string(&path)
        .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
    Ok(serde_json::from_str(&json)?)
}
