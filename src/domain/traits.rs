// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams where implementations are swapped:
//   - FeatureExtractor: spectrogram, MFCC (CQCC has none; the
//     maps arrive precomputed)
//   - SampleSource:     the ASVspoof protocol loader
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::sample::{FeatureMap, SampleSet};

// ─── FeatureExtractor ─────────────────────────────────────────────────────────
/// Turns a fixed-length, peak-normalised waveform into a 2-D feature map.
///
/// Implementations are called from several data-loader workers at once,
/// so they must hold only immutable state.
pub trait FeatureExtractor: Send + Sync {
    fn extract(&self, waveform: &[f32]) -> FeatureMap;
}

// ─── SampleSource ─────────────────────────────────────────────────────────────
/// Anything that can produce one split of labelled utterances.
pub trait SampleSource {
    fn load(&self) -> Result<SampleSet>;
}
