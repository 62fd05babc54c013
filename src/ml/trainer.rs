// ============================================================
// Layer 5 — Training Loop
// ============================================================
// One epoch of class-weighted training using Burn's DataLoader.
//
// Key Burn insight:
//   - Training runs on an AutodiffBackend (Autodiff<Wgpu> at runtime,
//     Autodiff<NdArray> in tests)
//   - The optimiser is owned by the caller, so Adam's moment estimates
//     survive across epochs unless the caller re-creates it
//   - argmax(1) returns [batch,1] so we flatten before .equal()
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use burn::{
    data::dataloader::DataLoader,
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::{activation::log_softmax, backend::AutodiffBackend},
    train::Interrupter as TrainingInterrupter,
};
use serde::{Deserialize, Serialize};

use crate::data::batcher::SpoofBatch;
use crate::ml::model::SpoofClassifier;

/// NLL weights indexed by class: spoof = 0, bona-fide = 1.
pub const CLASS_WEIGHTS: [f32; 2] = [1.0, 9.0];

/// What happens to Adam's state at an epoch boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerPolicy {
    #[default]
    Persistent,
    ResetEachEpoch,
}

/// Fixed facts about the epoch being run.
#[derive(Clone)]
pub struct EpochContext {
    pub epoch:             usize,
    pub num_epochs:        usize,
    pub batches_per_epoch: usize,
    pub lr:                f64,
    /// Checked before every batch; a stopped run fails the epoch.
    pub interrupter:       TrainingInterrupter,
}

/// Batches one epoch yields for `samples` items.
///
/// With worker threads the loader splits the dataset into one contiguous
/// partition per worker (the last takes the remainder) and each partition
/// ends in its own partial batch.
pub fn batches_per_epoch(samples: usize, batch_size: usize, workers: usize) -> usize {
    if workers == 0 {
        return samples.div_ceil(batch_size);
    }
    let step = samples / workers;
    (0..workers)
        .map(|i| if i + 1 == workers { samples - step * i } else { step })
        .map(|len| len.div_ceil(batch_size))
        .sum()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochSummary {
    pub loss:     f64,
    pub accuracy: f64,
}

/// Loss and accuracy accumulators; one value per epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunningStats {
    loss_sum: f64,
    correct:  usize,
    total:    usize,
}

impl RunningStats {
    /// `batch_loss` is the batch mean; it is weighted by the batch size.
    pub fn record(&mut self, batch_loss: f64, correct: usize, batch_size: usize) {
        self.loss_sum += batch_loss * batch_size as f64;
        self.correct  += correct;
        self.total    += batch_size;
    }

    pub fn summary(&self) -> EpochSummary {
        if self.total == 0 {
            return EpochSummary { loss: f64::NAN, accuracy: 0.0 };
        }
        EpochSummary {
            loss:     self.loss_sum / self.total as f64,
            accuracy: self.correct as f64 / self.total as f64,
        }
    }
}

/// One per-batch progress record.
#[derive(Debug, Clone, Copy)]
pub struct BatchProgress {
    pub epoch:             usize,
    pub num_epochs:        usize,
    /// 1-based
    pub batch:             usize,
    pub batches_per_epoch: usize,
    pub loss:              f64,
    pub lr:                f64,
    pub batch_time:        Duration,
}

impl BatchProgress {
    /// Last batch duration × batches still to run in this epoch.
    pub fn eta(&self) -> Duration {
        let remaining = self.batches_per_epoch.saturating_sub(self.batch) as u32;
        self.batch_time * remaining
    }

    pub fn log(&self) {
        tracing::info!(
            epoch      = self.epoch,
            batch      = self.batch,
            loss       = self.loss,
            lr         = self.lr,
            batch_time = self.batch_time.as_secs_f64(),
            "Epoch:{}/{} || Epochiter: {}/{} || Loss: {:.4} || LR: {:.8} || Batchtime: {:.4} s || ETA: {}",
            self.epoch, self.num_epochs, self.batch, self.batches_per_epoch,
            self.loss, self.lr, self.batch_time.as_secs_f64(), format_eta(self.eta()),
        );
    }
}

/// `H:MM:SS`, whole seconds.
pub fn format_eta(eta: Duration) -> String {
    let secs = eta.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Weighted mean negative log-likelihood: `-Σ w[y]·logp[y] / Σ w[y]`.
///
/// log_probs: [batch, classes], targets: [batch], weights: [classes]
pub fn weighted_nll<B: Backend>(
    log_probs: Tensor<B, 2>,
    targets:   Tensor<B, 1, Int>,
    weights:   Tensor<B, 1>,
) -> Tensor<B, 1> {
    let [batch, _] = log_probs.dims();
    let picked = log_probs.gather(1, targets.clone().reshape([batch, 1])).reshape([batch]);
    let w = weights.select(0, targets);
    (picked * w.clone()).sum().neg() / w.sum()
}

/// Number of rows whose argmax matches the label.
pub fn count_correct<B: Backend>(scores: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> usize {
    // argmax(1) returns shape [batch, 1]
    let predicted = scores.argmax(1).flatten::<1>(0, 1);
    predicted.equal(labels).int().sum().into_scalar().elem::<i64>() as usize
}

/// Runs one epoch and hands the updated model back.
pub fn train_epoch<B, M, O>(
    mut model: M,
    optim:     &mut O,
    loader:    &dyn DataLoader<B, SpoofBatch<B>>,
    ctx:       &EpochContext,
) -> Result<(M, EpochSummary)>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + SpoofClassifier<B>,
    O: Optimizer<M, B>,
{
    let mut stats = RunningStats::default();
    let mut class_weights: Option<Tensor<B, 1>> = None;

    for (index, batch) in loader.iter().enumerate() {
        if ctx.interrupter.should_stop() {
            bail!("training interrupted at batch {}", index + 1);
        }
        let started    = Instant::now();
        let batch_size = batch.labels.dims()[0];
        let weights = class_weights
            .get_or_insert_with(|| {
                Tensor::<B, 1>::from_floats(CLASS_WEIGHTS, &batch.features.device())
            })
            .clone();

        let log_probs = log_softmax(model.forward(batch.features), 1);
        let loss      = weighted_nll(log_probs.clone(), batch.labels.clone(), weights);
        let correct   = count_correct(log_probs.detach(), batch.labels);

        let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
        if !loss_val.is_finite() {
            bail!("loss became {loss_val} at batch {}", index + 1);
        }
        stats.record(loss_val, correct, batch_size);

        // Backward pass + Adam update
        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        model = optim.step(ctx.lr, model, grads);

        BatchProgress {
            epoch:             ctx.epoch,
            num_epochs:        ctx.num_epochs,
            batch:             index + 1,
            batches_per_epoch: ctx.batches_per_epoch,
            loss:              loss_val,
            lr:                ctx.lr,
            batch_time:        started.elapsed(),
        }
        .log();
    }

    if stats.total == 0 {
        bail!("the training split produced no batches");
    }
    Ok((model, stats.summary()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use burn::backend::NdArray;

    type B = NdArray;

    #[test]
    fn test_weighted_nll_matches_hand_computation() {
        let device = Default::default();
        let log_probs = Tensor::<B, 2>::from_floats([[-0.1, -2.0], [-1.5, -0.3]], &device);
        let targets   = Tensor::<B, 1, Int>::from_ints([0, 1], &device);
        let weights   = Tensor::<B, 1>::from_floats(CLASS_WEIGHTS, &device);

        let loss: f64 = weighted_nll(log_probs, targets, weights).into_scalar().elem();
        let expected = (1.0 * 0.1 + 9.0 * 0.3) / 10.0;
        assert_relative_eq!(loss, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_count_correct() {
        let device = Default::default();
        let scores = Tensor::<B, 2>::from_floats([[2.0, 1.0], [0.0, 3.0], [5.0, 4.0]], &device);
        let labels = Tensor::<B, 1, Int>::from_ints([0, 1, 1], &device);
        assert_eq!(count_correct(scores, labels), 2);
    }

    #[test]
    fn test_running_stats_weights_by_batch_size() {
        let mut stats = RunningStats::default();
        stats.record(1.0, 2, 2);
        stats.record(4.0, 0, 1);
        let summary = stats.summary();
        assert_relative_eq!(summary.loss, 2.0);
        assert_relative_eq!(summary.accuracy, 2.0 / 3.0);
    }

    #[test]
    fn test_empty_stats() {
        let summary = RunningStats::default().summary();
        assert!(summary.loss.is_nan());
        assert_eq!(summary.accuracy, 0.0);
    }

    #[test]
    fn test_eta_uses_remaining_batches() {
        let progress = BatchProgress {
            epoch: 0, num_epochs: 1, batch: 3, batches_per_epoch: 10,
            loss: 0.5, lr: 1e-4, batch_time: Duration::from_millis(1500),
        };
        assert_eq!(progress.eta(), Duration::from_millis(10_500));
        assert_eq!(format_eta(progress.eta()), "0:00:10");
        assert_eq!(format_eta(Duration::from_secs(3 * 3600 + 65)), "3:01:05");
    }

    #[test]
    fn test_batch_count_follows_worker_partitions() {
        assert_eq!(batches_per_epoch(25_380, 30, 0), 846);
        // 4 partitions of 6345 each end in a batch of 15
        assert_eq!(batches_per_epoch(25_380, 30, 4), 4 * 212);
        assert_eq!(batches_per_epoch(10, 4, 3), 1 + 1 + 1);
        assert_eq!(batches_per_epoch(2, 4, 3), 1);
        assert_eq!(batches_per_epoch(0, 4, 2), 0);
    }
}
