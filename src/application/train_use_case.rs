// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a full training run in order:
//
//   Step 1: Validate configuration     (Layer 2)
//   Step 2: Claim run directories      (Layer 6 - infra, RunGuard)
//   Step 3: Load train + held-out sets (Layer 4 - data)
//   Step 4: Build datasets + pipeline  (Layer 4 - data)
//   Step 5: Build the selected model   (Layer 5 - ml)
//   Step 6: Optional warm start        (Layer 6 - infra)
//   Step 7: Epoch loop                 (Layer 5 - ml)
//           train → accuracy on held-out split → log →
//           metrics.csv → epoch_<n>.mpk
//   Step 8: Mark the run complete
//
// Any error from Step 3 on drops the guard, which removes
// models/<run_id> and logs/<run_id>.
//
// Reference: Burn Book §5 (Training)

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Result;
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{AdamConfig, Optimizer},
    tensor::backend::AutodiffBackend,
    train::Interrupter as TrainingInterrupter,
};

use crate::application::run_config::{ResolvedRun, RunConfig};
use crate::data::{
    batcher::{SpoofBatch, SpoofBatcher},
    dataset::AsvDataset,
    loader::Split,
    pipeline::SamplePipeline,
};
use crate::domain::{error::SpoofError, sample::SampleSet, traits::SampleSource};
use crate::infra::{
    checkpoint::{load_model, CheckpointManager},
    metrics::{EpochMetrics, MetricsLogger},
    run_dirs::{RunGuard, RunLayout},
};
use crate::ml::{
    evaluator::accuracy_eval,
    model::{ModelVisitor, SpoofClassifier},
    trainer::{batches_per_epoch, train_epoch, EpochContext, OptimizerPolicy},
};

const SHUFFLE_SEED: u64 = 42;

/// Adam, β = 0.9 / 0.999, ε = 1e-8.
fn adam() -> AdamConfig {
    AdamConfig::new().with_epsilon(1e-8)
}

/// One finished epoch.
#[derive(Debug, Clone)]
pub struct EpochRecord {
    pub metrics:    EpochMetrics,
    pub checkpoint: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub layout: RunLayout,
    pub epochs: Vec<EpochRecord>,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase<B: AutodiffBackend> {
    config:      RunConfig,
    device:      B::Device,
    interrupter: TrainingInterrupter,
}

impl<B: AutodiffBackend> TrainUseCase<B> {
    pub fn new(config: RunConfig, device: B::Device) -> Self {
        Self { config, device, interrupter: TrainingInterrupter::new() }
    }

    /// Handle for stopping the run from another thread. A stopped run
    /// fails at its next batch and its directories are removed.
    pub fn interrupter(&self) -> TrainingInterrupter {
        self.interrupter.clone()
    }

    /// Load both splits from the protocol files and train.
    pub fn execute(&self) -> Result<RunSummary> {
        self.config.validate()?;
        let guard = RunGuard::acquire(self.config.layout())?;
        self.execute_in(guard)
    }

    /// Same as `execute`, inside directories the caller already claimed.
    pub fn execute_in(&self, guard: RunGuard) -> Result<RunSummary> {
        let cfg = &self.config;
        let run = cfg.validate()?;

        tracing::info!("Loading {} data from '{}'", run.track, cfg.data_root);
        let train_set = cfg.loader(&run, Split::Train).load()?;
        let valid_set = cfg.loader(&run, cfg.held_out_split()).load()?;

        self.train(run, guard, train_set, valid_set)
    }

    /// Train on sample sets that are already in memory.
    pub fn execute_with(&self, train_set: SampleSet, valid_set: SampleSet) -> Result<RunSummary> {
        let run = self.config.validate()?;
        let guard = RunGuard::acquire(self.config.layout())?;
        self.train(run, guard, train_set, valid_set)
    }

    fn train(
        &self,
        run:       ResolvedRun,
        guard:     RunGuard,
        train_set: SampleSet,
        valid_set: SampleSet,
    ) -> Result<RunSummary> {
        let cfg = &self.config;
        let pipeline = Arc::new(SamplePipeline::new(run.features, cfg.max_len, cfg.cqcc_frames));
        let train = AsvDataset::new(train_set, pipeline.clone())?;
        let valid = AsvDataset::new(valid_set, pipeline)?;

        let [spoof, bonafide] = train.class_counts();
        tracing::info!(
            "Train: {} samples ({} bona-fide, {} spoof) | held-out: {} samples",
            train.sample_count(), bonafide, spoof, valid.sample_count(),
        );
        tracing::info!("Model: {} | features: {} | run: {}", run.model, run.features, guard.layout().run_id);

        let epochs = run.model.build::<B, _>(&self.device, TrainingRun {
            config:      cfg,
            policy:      run.optimizer,
            interrupter: &self.interrupter,
            device:      &self.device,
            layout:      guard.layout(),
            train,
            valid,
        })?;

        let layout = guard.complete();
        tracing::info!("Training complete: {} epochs in '{}'", epochs.len(), layout.model_dir.display());
        Ok(RunSummary { layout, epochs })
    }
}

// ─── Epoch loop, monomorphised per model ─────────────────────────────────────
struct TrainingRun<'a, B: AutodiffBackend> {
    config:      &'a RunConfig,
    policy:      OptimizerPolicy,
    interrupter: &'a TrainingInterrupter,
    device:      &'a B::Device,
    layout:      &'a RunLayout,
    train:       AsvDataset,
    valid:       AsvDataset,
}

impl<'a, B: AutodiffBackend> ModelVisitor<B> for TrainingRun<'a, B> {
    type Output = Result<Vec<EpochRecord>>;

    fn visit<M>(self, mut model: M) -> Self::Output
    where
        M: AutodiffModule<B> + SpoofClassifier<B>,
        M::InnerModule: SpoofClassifier<B::InnerBackend>,
    {
        let cfg = self.config;

        if let Some(path) = &cfg.model_path {
            model = load_model(model, Path::new(path), self.device)?;
            tracing::info!("Warm start from '{}'", path);
        }

        let checkpoints = CheckpointManager::new(&self.layout.model_dir);
        checkpoints.save_config(cfg)?;
        let metrics = MetricsLogger::new(&self.layout.log_dir)?;

        let batches_per_epoch = batches_per_epoch(self.train.sample_count(), cfg.batch_size, cfg.workers);

        // ── Training data loader (AutodiffBackend) ────────────────────────────
        let mut train_builder = DataLoaderBuilder::new(SpoofBatcher::<B>::new(self.device.clone()))
            .batch_size(cfg.batch_size)
            .shuffle(SHUFFLE_SEED);
        // ── Validation data loader (InnerBackend, no autodiff overhead) ──────
        let mut valid_builder = DataLoaderBuilder::new(SpoofBatcher::<B::InnerBackend>::new(self.device.clone()))
            .batch_size(cfg.batch_size);
        if cfg.workers > 0 {
            train_builder = train_builder.num_workers(cfg.workers);
            valid_builder = valid_builder.num_workers(cfg.workers);
        }
        let train_loader = train_builder.build(self.train);
        let valid_loader = valid_builder.build(self.valid);

        let mut optim = adam().init::<B, M>();
        let mut history = Vec::with_capacity(cfg.num_epochs);

        tracing::info!("start training!");
        for epoch in 0..cfg.num_epochs {
            if epoch > 0 && self.policy == OptimizerPolicy::ResetEachEpoch {
                optim = adam().init::<B, M>();
            }
            let ctx = EpochContext {
                epoch,
                num_epochs: cfg.num_epochs,
                batches_per_epoch,
                lr: cfg.lr,
                interrupter: self.interrupter.clone(),
            };
            let (trained, record) = run_epoch(
                model,
                &mut optim,
                train_loader.as_ref(),
                valid_loader.as_ref(),
                &ctx,
                &metrics,
                &checkpoints,
            )
            .map_err(|source| SpoofError::TrainingFailure { epoch, source: source.into() })?;
            model = trained;
            history.push(record);
        }

        Ok(history)
    }
}

fn run_epoch<B, M, O>(
    model:        M,
    optim:        &mut O,
    train_loader: &dyn DataLoader<B, SpoofBatch<B>>,
    valid_loader: &dyn DataLoader<B::InnerBackend, SpoofBatch<B::InnerBackend>>,
    ctx:          &EpochContext,
    metrics:      &MetricsLogger,
    checkpoints:  &CheckpointManager,
) -> Result<(M, EpochRecord)>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + SpoofClassifier<B>,
    M::InnerModule: SpoofClassifier<B::InnerBackend>,
    O: Optimizer<M, B>,
{
    let (model, summary) = train_epoch(model, optim, train_loader, ctx)?;

    // model.valid() → same weights on the inner backend, dropout off
    let valid_accuracy = accuracy_eval(valid_loader, &model.valid());

    tracing::info!(
        "Epoch:{}/{} || loss:{} || TrainAccuracy:{:.2} || TestAccuracy:{:.2}",
        ctx.epoch, ctx.num_epochs, summary.loss, summary.accuracy, valid_accuracy,
    );

    let row = EpochMetrics::new(ctx.epoch, summary.loss, summary.accuracy, valid_accuracy);
    metrics.log(&row)?;
    let checkpoint = checkpoints.save_model(&model, ctx.epoch)?;

    Ok((model, EpochRecord { metrics: row, checkpoint }))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::sample::{Label, Sample, SampleInput, SampleMeta};
    use burn::backend::{Autodiff, NdArray};
    use std::fs;

    type TestBackend = Autodiff<NdArray>;

    /// Five tones per class, each at its own pitch and length.
    pub(crate) fn toy_set(per_class: usize) -> SampleSet {
        let mut samples = Vec::new();
        for i in 0..per_class * 2 {
            let label = if i % 2 == 0 { Label::Bonafide } else { Label::Spoof };
            let base  = if label == Label::Bonafide { 300.0 } else { 3_000.0 };
            let freq  = base + 37.0 * i as f32;
            let len   = 4_000 + 1_500 * i;
            let wave: Vec<f32> = (0..len)
                .map(|t| 0.5 * (2.0 * std::f32::consts::PI * freq * t as f32 / 16_000.0).sin())
                .collect();
            samples.push(Sample::new(
                SampleInput::Waveform(wave),
                label,
                SampleMeta {
                    speaker_id: "LA_0001".into(),
                    file_name:  format!("LA_T_{i:07}"),
                    path:       String::new(),
                    sys_id:     if label == Label::Bonafide { 0 } else { 1 },
                    key:        label,
                },
            ));
        }
        SampleSet {
            samples,
            sysid_names: vec!["-".into(), "A01".into()],
            is_eval:     false,
        }
    }

    pub(crate) fn toy_config(root: &Path) -> RunConfig {
        RunConfig {
            model_name:  "mfcc".into(),
            features:    "mfcc".into(),
            track:       "logical".into(),
            batch_size:  2,
            num_epochs:  1,
            max_len:     16_000,
            workers:     0,
            output_root: root.display().to_string(),
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_one_epoch_end_to_end() {
        let root = tempfile::tempdir().unwrap();
        let cfg = toy_config(root.path());
        let use_case = TrainUseCase::<TestBackend>::new(cfg.clone(), Default::default());

        let summary = use_case.execute_with(toy_set(5), toy_set(2)).unwrap();

        assert_eq!(summary.epochs.len(), 1);
        let record = &summary.epochs[0];
        assert!((0.0..=1.0).contains(&record.metrics.train_accuracy));
        assert!((0.0..=1.0).contains(&record.metrics.valid_accuracy));
        assert!(record.metrics.train_loss.is_finite());

        let layout = cfg.layout();
        assert!(layout.model_dir.is_dir());
        assert!(layout.log_dir.is_dir());
        assert!(layout.model_dir.join("run_config.json").is_file());
        assert!(layout.log_dir.join("metrics.csv").is_file());

        let checkpoints: Vec<String> = fs::read_dir(&layout.model_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".mpk"))
            .collect();
        assert_eq!(checkpoints, vec!["epoch_0.mpk".to_string()]);
        assert_eq!(record.checkpoint, layout.model_dir.join("epoch_0.mpk"));
    }

    #[test]
    fn test_failure_removes_run_directories() {
        let root = tempfile::tempdir().unwrap();
        let cfg = toy_config(root.path());
        let layout = cfg.layout();

        // A directory where the checkpoint file should go makes the save fail.
        fs::create_dir_all(layout.model_dir.join("epoch_0.mpk")).unwrap();

        let use_case = TrainUseCase::<TestBackend>::new(cfg, Default::default());
        let err = use_case.execute_with(toy_set(5), toy_set(2)).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<SpoofError>(),
            Some(SpoofError::TrainingFailure { epoch: 0, .. })
        ));
        assert!(!layout.model_dir.exists());
        assert!(!layout.log_dir.exists());
    }

    #[test]
    fn test_empty_training_split_fails_and_cleans_up() {
        let root = tempfile::tempdir().unwrap();
        let cfg = toy_config(root.path());
        let layout = cfg.layout();

        let use_case = TrainUseCase::<TestBackend>::new(cfg, Default::default());
        let err = use_case.execute_with(toy_set(0), toy_set(1)).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<SpoofError>(),
            Some(SpoofError::TrainingFailure { epoch: 0, .. })
        ));
        assert!(!layout.model_dir.exists());
        assert!(!layout.log_dir.exists());
    }

    #[test]
    fn test_interrupt_inside_batch_loop_fails_the_epoch() {
        let root = tempfile::tempdir().unwrap();
        let cfg = toy_config(root.path());
        let layout = cfg.layout();

        let use_case = TrainUseCase::<TestBackend>::new(cfg, Default::default());
        use_case.interrupter().stop(None);
        let err = use_case.execute_with(toy_set(2), toy_set(1)).unwrap_err();

        match err.downcast_ref::<SpoofError>() {
            Some(SpoofError::TrainingFailure { epoch, source }) => {
                assert_eq!(*epoch, 0);
                assert!(source.to_string().contains("interrupted at batch 1"), "{source}");
            }
            other => panic!("expected a training failure, got {other:?}"),
        }
        assert!(!layout.model_dir.join("epoch_0.mpk").exists());
        assert!(!layout.model_dir.exists());
        assert!(!layout.log_dir.exists());
    }

    #[test]
    fn test_bad_configuration_touches_nothing() {
        let root = tempfile::tempdir().unwrap();
        let cfg = RunConfig { features: "lfcc".into(), ..toy_config(root.path()) };
        let use_case = TrainUseCase::<TestBackend>::new(cfg, Default::default());

        let err = use_case.execute_with(toy_set(1), toy_set(1)).unwrap_err();
        assert!(matches!(err.downcast_ref::<SpoofError>(), Some(SpoofError::Configuration(_))));
        assert!(!root.path().join("models").exists());
        assert!(!root.path().join("logs").exists());
    }

    #[test]
    fn test_warm_start_and_reset_policy() {
        let root = tempfile::tempdir().unwrap();
        let first = toy_config(root.path());
        let summary = TrainUseCase::<TestBackend>::new(first.clone(), Default::default())
            .execute_with(toy_set(2), toy_set(1))
            .unwrap();

        let second = RunConfig {
            num_epochs:      2,
            reset_optimizer: true,
            model_path:      Some(summary.epochs[0].checkpoint.display().to_string()),
            comment:         Some("warm".into()),
            ..first
        };
        let summary = TrainUseCase::<TestBackend>::new(second, Default::default())
            .execute_with(toy_set(2), toy_set(1))
            .unwrap();
        assert_eq!(summary.epochs.len(), 2);
        assert!(summary.layout.run_id.ends_with("_warm"));
        assert!(summary.layout.model_dir.join("epoch_1.mpk").is_file());
    }
}
