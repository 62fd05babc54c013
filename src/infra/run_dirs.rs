// ============================================================
// Layer 6 — Run Directories
// ============================================================
// A training run owns two directories:
//
//   <root>/models/<run_id>   checkpoints + run_config.json
//   <root>/logs/<run_id>     logger.log + metrics.csv
//
// RunGuard creates both and removes both when it is dropped
// without complete() having been called: an error return, a
// `?` in the epoch loop or a panic all leave nothing behind.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const LOG_FILE: &str = "logger.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    pub run_id:    String,
    pub model_dir: PathBuf,
    pub log_dir:   PathBuf,
}

impl RunLayout {
    pub fn new(root: &Path, run_id: impl Into<String>) -> Self {
        let run_id = run_id.into();
        Self {
            model_dir: root.join("models").join(&run_id),
            log_dir:   root.join("logs").join(&run_id),
            run_id,
        }
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join(LOG_FILE)
    }

    /// Idempotent `mkdir -p` of both directories.
    pub fn create(&self) -> Result<()> {
        for dir in [&self.model_dir, &self.log_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create '{}'", dir.display()))?;
        }
        Ok(())
    }
}

/// Scoped owner of a run's directories.
#[derive(Debug)]
pub struct RunGuard {
    layout:    RunLayout,
    completed: bool,
}

impl RunGuard {
    pub fn acquire(layout: RunLayout) -> Result<Self> {
        layout.create()?;
        Ok(Self { layout, completed: false })
    }

    pub fn layout(&self) -> &RunLayout {
        &self.layout
    }

    /// Keep the directories; the run finished.
    pub fn complete(mut self) -> RunLayout {
        self.completed = true;
        self.layout.clone()
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        tracing::error!("Run '{}' failed, removing its directories", self.layout.run_id);
        for dir in [&self.layout.model_dir, &self.layout.log_dir] {
            if dir.exists() {
                if let Err(e) = fs::remove_dir_all(dir) {
                    tracing::warn!("Could not remove '{}': {}", dir.display(), e);
                }
            }
        }
    }
}
