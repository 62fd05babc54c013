// ============================================================
// Layer 3 — Configuration Enums
// ============================================================
// String flags from the command line are resolved into these
// enums exactly once, at startup. Nothing downstream matches
// on strings again.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::SpoofError;

/// ASVspoof 2019 evaluation condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    /// Synthetic speech (TTS / voice conversion); "LA" in the corpus.
    Logical,
    /// Replay attacks; "PA" in the corpus.
    Physical,
}

impl Track {
    /// Two-letter code used by the ASVspoof file layout.
    pub fn code(self) -> &'static str {
        match self {
            Track::Logical  => "LA",
            Track::Physical => "PA",
        }
    }
}

impl FromStr for Track {
    type Err = SpoofError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "logical"  => Ok(Track::Logical),
            "physical" => Ok(Track::Physical),
            other => Err(SpoofError::config(format!(
                "invalid track '{other}' (expected logical or physical)"
            ))),
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Track::Logical  => "logical",
            Track::Physical => "physical",
        })
    }
}

/// Which time-frequency representation feeds the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Mfcc,
    Spect,
    /// Precomputed outside this system; passed through.
    Cqcc,
}

impl FeatureKind {
    /// True when the feature map is computed from a waveform here,
    /// false when the dataset already supplies it.
    pub fn from_waveform(self) -> bool {
        !matches!(self, FeatureKind::Cqcc)
    }
}

impl FromStr for FeatureKind {
    type Err = SpoofError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mfcc"  => Ok(FeatureKind::Mfcc),
            "spect" => Ok(FeatureKind::Spect),
            "cqcc"  => Ok(FeatureKind::Cqcc),
            other => Err(SpoofError::config(format!(
                "unsupported features '{other}' (expected mfcc, spect or cqcc)"
            ))),
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FeatureKind::Mfcc  => "mfcc",
            FeatureKind::Spect => "spect",
            FeatureKind::Cqcc  => "cqcc",
        })
    }
}
