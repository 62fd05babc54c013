// ============================================================
// Layer 4 — Feature Extractors
// ============================================================
// Strategy table from FeatureKind to extractor. Resolved once
// when the pipeline is built.
//
//   spect → LogSpectrogram  (1025 × frames, dB re. max)
//   mfcc  → MfccExtractor   (72 × frames: 24 MFCC + Δ + Δ²)
//   cqcc  → none            (maps arrive precomputed)

pub mod mfcc;
pub mod spectrogram;
pub mod stft;

use std::sync::Arc;

use crate::domain::kinds::FeatureKind;
use crate::domain::traits::FeatureExtractor;

pub use mfcc::MfccExtractor;
pub use spectrogram::LogSpectrogram;

pub fn extractor_for(kind: FeatureKind) -> Option<Arc<dyn FeatureExtractor>> {
    match kind {
        FeatureKind::Spect => Some(Arc::new(LogSpectrogram::new())),
        FeatureKind::Mfcc  => Some(Arc::new(MfccExtractor::new())),
        FeatureKind::Cqcc  => None,
    }
}
