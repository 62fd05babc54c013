// ============================================================
// Layer 4 — Sample Pipeline
// ============================================================
// The per-sample transform applied while batches are loaded:
//
//   waveform
//       │  fit_length       (truncate / element-wise repeat)
//       ▼
//       │  peak_normalize   (max |x| = 1)
//       ▼
//       │  extract          (spectrogram or MFCC)
//       ▼
//       │  to_tensor        (row-major [1, rows, frames])
//       ▼
//       │  replicate ×3     (image-style 3-channel input)
//       ▼
//   FeatureTensor
//
// Precomputed CQCC maps skip the first three steps; only their
// frame count is fitted.
//
// The pipeline owns nothing mutable. burn's DataLoader may call
// `apply` from several worker threads at the same time.

use std::sync::Arc;

use crate::data::features::extractor_for;
use crate::data::padding::{fit_frames, fit_length, peak_amplitude, peak_normalize};
use crate::domain::error::SpoofError;
use crate::domain::kinds::FeatureKind;
use crate::domain::sample::{FeatureMap, SampleInput};
use crate::domain::traits::FeatureExtractor;

/// Image-style models expect three input channels.
pub const CHANNELS: usize = 3;

/// Default time axis for precomputed CQCC maps.
pub const DEFAULT_CQCC_FRAMES: usize = 400;

/// Backend-independent `[channels, rows, frames]` buffer, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTensor {
    pub data:  Vec<f32>,
    pub shape: [usize; 3],
}

impl FeatureTensor {
    pub fn from_map(map: &FeatureMap) -> Self {
        let (rows, frames) = map.dim();
        Self {
            data:  map.iter().copied().collect(),
            shape: [1, rows, frames],
        }
    }

    /// Stack `n` copies of the channels; values are copied, not recomputed.
    pub fn replicate_channels(self, n: usize) -> Self {
        let [c, rows, frames] = self.shape;
        Self {
            data:  self.data.repeat(n),
            shape: [c * n, rows, frames],
        }
    }
}

#[derive(Clone)]
pub struct SamplePipeline {
    kind:        FeatureKind,
    extractor:   Option<Arc<dyn FeatureExtractor>>,
    max_len:     usize,
    cqcc_frames: usize,
}

impl SamplePipeline {
    pub fn new(kind: FeatureKind, max_len: usize, cqcc_frames: usize) -> Self {
        Self {
            kind,
            extractor: extractor_for(kind),
            max_len,
            cqcc_frames,
        }
    }

    pub fn kind(&self) -> FeatureKind {
        self.kind
    }

    /// Run the full transform on one sample.
    pub fn apply(&self, input: &SampleInput) -> Result<FeatureTensor, SpoofError> {
        let map = match (input, &self.extractor) {
            (SampleInput::Waveform(wave), Some(extractor)) => {
                let fitted = fit_length(wave, self.max_len)?;
                let normalized = peak_normalize(&fitted)?;
                extractor.extract(&normalized)
            }
            (SampleInput::Precomputed(map), None) => fit_frames(map, self.cqcc_frames)?,
            _ => return Err(self.mismatch(input)),
        };
        Ok(FeatureTensor::from_map(&map).replicate_channels(CHANNELS))
    }

    /// Cheap pre-flight check: everything in `apply` that can fail, without
    /// running the extractor.
    pub fn check(&self, input: &SampleInput) -> Result<(), SpoofError> {
        match (input, &self.extractor) {
            (SampleInput::Waveform(wave), Some(_)) => {
                let fitted = fit_length(wave, self.max_len)?;
                peak_amplitude(&fitted).map(|_| ())
            }
            (SampleInput::Precomputed(map), None) => {
                if map.iter().any(|v| !v.is_finite()) {
                    return Err(SpoofError::DegenerateInput("non-finite feature value"));
                }
                fit_frames(map, self.cqcc_frames).map(|_| ())
            }
            _ => Err(self.mismatch(input)),
        }
    }

    fn mismatch(&self, input: &SampleInput) -> SpoofError {
        let got = match input {
            SampleInput::Waveform(_)    => "a waveform",
            SampleInput::Precomputed(_) => "a precomputed feature map",
        };
        SpoofError::dataset(format!("'{}' features cannot be built from {got}", self.kind))
    }
}
