// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records one row per epoch in logs/<run_id>/metrics.csv.
//
// Metrics recorded per epoch:
//   - epoch:          0-based, matches the checkpoint file name
//   - train_loss:     weighted NLL averaged over training samples
//   - train_accuracy: fraction of training samples classified right
//   - valid_accuracy: fraction of held-out samples classified right
//
// Example CSV output:
//   epoch,train_loss,train_accuracy,valid_accuracy
//   0,0.412300,0.871000,0.902000
//   1,0.301800,0.910000,0.915000

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

pub const METRICS_FILE: &str = "metrics.csv";
pub const METRICS_HEADER: &str = "epoch,train_loss,train_accuracy,valid_accuracy";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:          usize,
    pub train_loss:     f64,
    /// Range: [0.0, 1.0]
    pub train_accuracy: f64,
    /// Range: [0.0, 1.0]
    pub valid_accuracy: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, train_accuracy: f64, valid_accuracy: f64) -> Self {
        Self { epoch, train_loss, train_accuracy, valid_accuracy }
    }
}

/// Appends epoch metrics to a CSV file.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: &Path) -> Result<Self> {
        let csv_path = dir.join(METRICS_FILE);

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{METRICS_HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6}",
            m.epoch,
            m.train_loss,
            m.train_accuracy,
            m.valid_accuracy,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, valid_accuracy={:.4}",
            m.epoch,
            m.train_loss,
            m.valid_accuracy,
        );

        Ok(())
    }
}
