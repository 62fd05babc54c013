// ============================================================
// Layer 2 — Run Configuration
// ============================================================
// Everything one invocation needs, as plain serialisable values.
// It is written to models/<run_id>/run_config.json so a run can
// be traced back to the exact flags that produced it.
//
// validate() turns the string choices into enums and checks
// ranges. It touches nothing on disk, so a bad flag fails before
// any run directory exists.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::{
    loader::{ProtocolLoader, Split},
    padding::DEFAULT_MAX_LEN,
    pipeline::DEFAULT_CQCC_FRAMES,
};
use crate::domain::{
    error::SpoofError,
    kinds::{FeatureKind, Track},
};
use crate::infra::run_dirs::RunLayout;
use crate::ml::{model::ModelKind, trainer::OptimizerPolicy};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub eval:            bool,
    pub model_name:      String,
    pub model_path:      Option<String>,
    pub eval_output:     Option<String>,
    pub batch_size:      usize,
    pub num_epochs:      usize,
    pub lr:              f64,
    pub comment:         Option<String>,
    pub track:           String,
    pub features:        String,
    pub is_eval:         bool,
    pub eval_part:       usize,
    pub eval_part_size:  usize,
    pub data_root:       String,
    pub output_root:     String,
    pub max_len:         usize,
    pub cqcc_frames:     usize,
    pub workers:         usize,
    pub reset_optimizer: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            eval:            false,
            model_name:      "resnet18".to_string(),
            model_path:      None,
            eval_output:     None,
            batch_size:      30,
            num_epochs:      100,
            lr:              0.0001,
            comment:         None,
            track:           "physical".to_string(),
            features:        "spect".to_string(),
            is_eval:         false,
            eval_part:       0,
            eval_part_size:  0,
            data_root:       ".".to_string(),
            output_root:     ".".to_string(),
            max_len:         DEFAULT_MAX_LEN,
            cqcc_frames:     DEFAULT_CQCC_FRAMES,
            workers:         4,
            reset_optimizer: false,
        }
    }
}

/// The typed choices behind a validated RunConfig.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRun {
    pub track:     Track,
    pub features:  FeatureKind,
    pub model:     ModelKind,
    pub optimizer: OptimizerPolicy,
}

impl RunConfig {
    pub fn validate(&self) -> Result<ResolvedRun, SpoofError> {
        let features: FeatureKind = self.features.parse()?;
        let track:    Track       = self.track.parse()?;
        let model:    ModelKind   = self.model_name.parse()?;

        if self.batch_size == 0 {
            return Err(SpoofError::config("batch_size must be at least 1"));
        }
        if self.max_len == 0 || self.cqcc_frames == 0 {
            return Err(SpoofError::config("max_len and cqcc_frames must be positive"));
        }
        if self.eval_part > 0 && self.eval_part_size == 0 {
            return Err(SpoofError::config("eval_part needs a non-zero eval_part_size"));
        }
        if self.eval {
            if self.model_path.is_none() {
                return Err(SpoofError::config("You must provide model checkpoint"));
            }
            if self.eval_output.is_none() {
                return Err(SpoofError::config("You must provide a path for the score file"));
            }
        } else {
            if self.num_epochs == 0 {
                return Err(SpoofError::config("num_epochs must be at least 1"));
            }
            if !(self.lr.is_finite() && self.lr > 0.0) {
                return Err(SpoofError::config(format!("learning rate must be positive, got {}", self.lr)));
            }
        }

        let optimizer = if self.reset_optimizer {
            OptimizerPolicy::ResetEachEpoch
        } else {
            OptimizerPolicy::Persistent
        };
        Ok(ResolvedRun { track, features, model, optimizer })
    }

    /// `model_{track}_{features}_{model}_{epochs}_{batch}_{lr}[_{comment}]`
    pub fn run_id(&self) -> String {
        let mut id = format!(
            "model_{}_{}_{}_{}_{}_{}",
            self.track, self.features, self.model_name, self.num_epochs, self.batch_size, self.lr
        );
        if let Some(comment) = &self.comment {
            id.push('_');
            id.push_str(comment);
        }
        id
    }

    pub fn layout(&self) -> RunLayout {
        RunLayout::new(Path::new(&self.output_root), self.run_id())
    }

    /// Dev for training-time validation and scoring, Eval with --is_eval.
    pub fn held_out_split(&self) -> Split {
        if self.is_eval { Split::Eval } else { Split::Dev }
    }

    pub fn loader(&self, run: &ResolvedRun, split: Split) -> ProtocolLoader {
        let loader = ProtocolLoader::new(PathBuf::from(&self.data_root), run.track, split, run.features);
        if split != Split::Train && self.eval_part_size > 0 {
            loader.with_part(self.eval_part, self.eval_part_size)
        } else {
            loader
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let run = RunConfig::default().validate().unwrap();
        assert_eq!(run.track, Track::Physical);
        assert_eq!(run.features, FeatureKind::Spect);
        assert_eq!(run.model, ModelKind::Resnet18);
        assert_eq!(run.optimizer, OptimizerPolicy::Persistent);
    }

    #[test]
    fn test_run_id_layout() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.run_id(), "model_physical_spect_resnet18_100_30_0.0001");

        let cfg = RunConfig {
            track:    "logical".into(),
            features: "mfcc".into(),
            comment:  Some("try2".into()),
            ..RunConfig::default()
        };
        assert_eq!(cfg.run_id(), "model_logical_mfcc_resnet18_100_30_0.0001_try2");
    }

    #[test]
    fn test_invalid_choices_are_configuration_errors() {
        let bad = [
            RunConfig { features: "lfcc".into(), ..RunConfig::default() },
            RunConfig { track: "both".into(), ..RunConfig::default() },
            RunConfig { model_name: "mobilenet_v2".into(), ..RunConfig::default() },
            RunConfig { batch_size: 0, ..RunConfig::default() },
            RunConfig { lr: 0.0, ..RunConfig::default() },
            RunConfig { eval_part: 2, ..RunConfig::default() },
        ];
        for cfg in bad {
            assert!(matches!(cfg.validate(), Err(SpoofError::Configuration(_))), "{cfg:?}");
        }
    }

    #[test]
    fn test_eval_mode_needs_checkpoint_and_output() {
        let cfg = RunConfig { eval: true, ..RunConfig::default() };
        assert!(matches!(cfg.validate(), Err(SpoofError::Configuration(_))));

        let cfg = RunConfig { eval: true, model_path: Some("m.mpk".into()), ..RunConfig::default() };
        assert!(matches!(cfg.validate(), Err(SpoofError::Configuration(_))));

        let cfg = RunConfig {
            eval:        true,
            model_path:  Some("m.mpk".into()),
            eval_output: Some("scores.txt".into()),
            ..RunConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_reset_flag_selects_legacy_policy() {
        let cfg = RunConfig { reset_optimizer: true, ..RunConfig::default() };
        assert_eq!(cfg.validate().unwrap().optimizer, OptimizerPolicy::ResetEachEpoch);
    }

    #[test]
    fn test_held_out_split_follows_is_eval() {
        assert_eq!(RunConfig::default().held_out_split(), Split::Dev);
        let cfg = RunConfig { is_eval: true, ..RunConfig::default() };
        assert_eq!(cfg.held_out_split(), Split::Eval);
    }
}
