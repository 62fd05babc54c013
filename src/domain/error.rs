// ============================================================
// Layer 3 — Domain Errors
// ============================================================
// Typed failures that callers (and tests) need to tell apart.
// Everything else travels as anyhow::Error with context.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpoofError {
    /// Rejected before any run directory is touched.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A zero-length waveform cannot be fitted or normalised.
    #[error("empty waveform")]
    EmptyInput,

    /// Silent or non-finite audio would divide by zero during peak normalisation.
    #[error("degenerate waveform: {0}")]
    DegenerateInput(&'static str),

    #[error("dataset error: {0}")]
    Dataset(String),

    /// Any error raised inside the epoch loop. The run guard has already
    /// removed the run's directories by the time this reaches `main`.
    #[error("training failed at epoch {epoch}: {source}")]
    TrainingFailure {
        epoch:  usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl SpoofError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }
}
