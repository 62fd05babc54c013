// ============================================================
// Layer 3 — Sample Domain Types
// ============================================================
// One utterance as the dataset hands it over: raw input,
// binary label, and the protocol metadata needed to write
// a score line for it later.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Audio is always 16 kHz in ASVspoof 2019.
pub const SAMPLE_RATE: u32 = 16_000;

/// 2-D (coefficient × frame) feature map.
pub type FeatureMap = Array2<f32>;

/// Binary class label. Bona-fide is the positive class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    Spoof    = 0,
    Bonafide = 1,
}

impl Label {
    pub fn index(self) -> usize {
        self as usize
    }

    /// Key column of the score file.
    pub fn key(self) -> &'static str {
        match self {
            Label::Bonafide => "bonafide",
            Label::Spoof    => "spoof",
        }
    }
}

/// Protocol metadata for one utterance.
/// Mirrors the protocol columns: speaker, file, path, system id, key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleMeta {
    pub speaker_id: String,
    pub file_name:  String,
    pub path:       String,
    /// Index into the dataset's system-id table (0 = "-", i.e. bona-fide).
    pub sys_id:     usize,
    /// Ground-truth key; always `Spoof` for blind evaluation sets.
    pub key:        Label,
}

/// What the dataset supplies before the pipeline runs.
#[derive(Debug, Clone)]
pub enum SampleInput {
    Waveform(Vec<f32>),
    /// Feature map computed by an external tool (CQCC).
    Precomputed(FeatureMap),
}

#[derive(Debug, Clone)]
pub struct Sample {
    pub input: SampleInput,
    pub label: Label,
    pub meta:  SampleMeta,
}

impl Sample {
    pub fn new(input: SampleInput, label: Label, meta: SampleMeta) -> Self {
        Self { input, label, meta }
    }
}

/// Everything a dataset collaborator provides for one split.
#[derive(Debug, Clone)]
pub struct SampleSet {
    pub samples:     Vec<Sample>,
    /// Inverse system-id table: index → human-readable id ("-", "A01", ...).
    pub sysid_names: Vec<String>,
    /// Blind evaluation set (no ground truth in the protocol).
    pub is_eval:     bool,
}

impl SampleSet {
    pub fn sysid_name(&self, index: usize) -> Option<&str> {
        self.sysid_names.get(index).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_indices_match_class_order() {
        assert_eq!(Label::Spoof.index(), 0);
        assert_eq!(Label::Bonafide.index(), 1);
    }

    #[test]
    fn test_keys() {
        assert_eq!(Label::Bonafide.key(), "bonafide");
        assert_eq!(Label::Spoof.key(), "spoof");
    }
}
