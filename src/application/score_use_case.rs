// ============================================================
// Layer 2 — ScoreUseCase
// ============================================================
// Eval-only mode: load a checkpoint, score the held-out split,
// write the score file. No run directories are created, so a
// failure here has nothing to clean up.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Result;
use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};

use crate::application::run_config::RunConfig;
use crate::data::{dataset::AsvDataset, pipeline::SamplePipeline};
use crate::domain::{error::SpoofError, sample::SampleSet, traits::SampleSource};
use crate::infra::checkpoint::{load_config, load_model, CONFIG_FILE};
use crate::ml::{
    evaluator::score_eval,
    model::{ModelVisitor, SpoofClassifier},
};

pub struct ScoreUseCase<B: AutodiffBackend> {
    config: RunConfig,
    device: B::Device,
}

impl<B: AutodiffBackend> ScoreUseCase<B> {
    pub fn new(config: RunConfig, device: B::Device) -> Self {
        Self { config, device }
    }

    /// Score the dev split, or the eval split with --is_eval.
    pub fn execute(&self) -> Result<PathBuf> {
        let cfg = &self.config;
        let run = cfg.validate()?;
        let set = cfg.loader(&run, cfg.held_out_split()).load()?;
        self.execute_with(set)
    }

    pub fn execute_with(&self, set: SampleSet) -> Result<PathBuf> {
        let cfg = &self.config;
        let run = cfg.validate()?;
        let model_path = cfg
            .model_path
            .as_deref()
            .ok_or_else(|| SpoofError::config("You must provide model checkpoint"))?;
        let output = cfg
            .eval_output
            .as_deref()
            .ok_or_else(|| SpoofError::config("You must provide a path for the score file"))?;

        warn_on_mismatch(cfg, Path::new(model_path))?;

        let pipeline = Arc::new(SamplePipeline::new(run.features, cfg.max_len, cfg.cqcc_frames));
        let dataset  = Arc::new(AsvDataset::new(set, pipeline)?);
        tracing::info!("Scoring {} samples with {}", dataset.sample_count(), run.model);

        let lines = run.model.build::<B, _>(&self.device, Scoring {
            device:     &self.device,
            model_path: Path::new(model_path),
            output:     Path::new(output),
            dataset,
        })?;
        tracing::debug!("Wrote {} score lines", lines);
        Ok(PathBuf::from(output))
    }
}

/// Checkpoints written by a training run sit next to its run_config.json.
/// A different model or feature choice there usually means the wrong flags.
fn warn_on_mismatch(cfg: &RunConfig, model_path: &Path) -> Result<()> {
    let Some(dir) = model_path.parent() else { return Ok(()) };
    if !dir.join(CONFIG_FILE).is_file() {
        return Ok(());
    }
    let trained = load_config(dir)?;
    if trained.model_name != cfg.model_name || trained.features != cfg.features {
        tracing::warn!(
            "Checkpoint was trained as {} on {} features, scoring as {} on {}",
            trained.model_name, trained.features, cfg.model_name, cfg.features,
        );
    }
    Ok(())
}

struct Scoring<'a, B: AutodiffBackend> {
    device:     &'a B::Device,
    model_path: &'a Path,
    output:     &'a Path,
    dataset:    Arc<AsvDataset>,
}

impl<'a, B: AutodiffBackend> ModelVisitor<B> for Scoring<'a, B> {
    type Output = Result<usize>;

    fn visit<M>(self, model: M) -> Self::Output
    where
        M: AutodiffModule<B> + SpoofClassifier<B>,
        M::InnerModule: SpoofClassifier<B::InnerBackend>,
    {
        let model = load_model(model, self.model_path, self.device)?.valid();
        score_eval::<B::InnerBackend, _>(self.dataset, &model, self.device, self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::{
        tests::{toy_config, toy_set},
        TrainUseCase,
    };
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    #[test]
    fn test_scores_a_trained_checkpoint() {
        let root = tempfile::tempdir().unwrap();
        let train_cfg = toy_config(root.path());
        let summary = TrainUseCase::<TestBackend>::new(train_cfg.clone(), Default::default())
            .execute_with(toy_set(2), toy_set(1))
            .unwrap();

        let scores = root.path().join("scores.txt");
        let cfg = RunConfig {
            eval:        true,
            model_path:  Some(summary.epochs[0].checkpoint.display().to_string()),
            eval_output: Some(scores.display().to_string()),
            ..train_cfg
        };
        let written = ScoreUseCase::<TestBackend>::new(cfg, Default::default())
            .execute_with(toy_set(3))
            .unwrap();

        assert_eq!(written, scores);
        let text = std::fs::read_to_string(&scores).unwrap();
        assert_eq!(text.lines().count(), 6);
        for line in text.lines() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            assert_eq!(fields.len(), 4);
            assert!(["bonafide", "spoof"].contains(&fields[2]));
            assert!(fields[3].parse::<f32>().unwrap().is_finite());
        }
    }

    #[test]
    fn test_missing_checkpoint_fails_without_side_effects() {
        let root = tempfile::tempdir().unwrap();
        let cfg = RunConfig {
            eval:        true,
            model_path:  Some(root.path().join("nope.mpk").display().to_string()),
            eval_output: Some(root.path().join("scores.txt").display().to_string()),
            ..toy_config(root.path())
        };
        let result = ScoreUseCase::<TestBackend>::new(cfg, Default::default()).execute_with(toy_set(1));
        assert!(result.is_err());
        assert!(!root.path().join("models").exists());
        assert!(!root.path().join("scores.txt").exists());
    }
}
