// ============================================================
// Layer 5 — Evaluation
// ============================================================
// Inference-only passes over a split:
//
//   accuracy_eval → fraction of correct argmax predictions,
//                   used after every training epoch
//   score_eval    → one score line per utterance, consumed by
//                   the external EER / t-DCF tooling
//
// Both take the model on a plain Backend, i.e. the result of
// model.valid(): no autodiff graph, dropout off, BatchNorm on
// running statistics.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    sync::Arc,
};

use anyhow::{anyhow, Context, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    prelude::*,
};

use crate::data::{
    batcher::{SpoofBatch, SpoofBatcher},
    dataset::AsvDataset,
};
use crate::domain::sample::Label;
use crate::ml::model::SpoofClassifier;
use crate::ml::trainer::count_correct;

pub const SCORE_BATCH_SIZE: usize = 32;

pub fn accuracy_eval<B, M>(loader: &dyn DataLoader<B, SpoofBatch<B>>, model: &M) -> f64
where
    B: Backend,
    M: SpoofClassifier<B>,
{
    let mut correct = 0usize;
    let mut total   = 0usize;
    for batch in loader.iter() {
        total   += batch.labels.dims()[0];
        correct += count_correct(model.forward(batch.features), batch.labels);
    }
    if total == 0 { 0.0 } else { correct as f64 / total as f64 }
}

/// `logit[1] - logit[0]` per row. logits: [batch, 2]
pub fn bonafide_scores<B: Backend>(logits: Tensor<B, 2>) -> Result<Vec<f32>> {
    let [batch, _] = logits.dims();
    let spoof    = logits.clone().slice([0..batch, 0..1]);
    let bonafide = logits.slice([0..batch, 1..2]);
    (bonafide - spoof)
        .reshape([batch])
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("reading scores back from the device: {e:?}"))
}

/// One line of the score file.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRow {
    pub file_name: String,
    pub sys_id:    String,
    pub key:       Label,
    pub score:     f32,
}

impl ScoreRow {
    /// Blind rows carry only the file name and the score.
    pub fn line(&self, blind: bool) -> String {
        if blind {
            format!("{} {}", self.file_name, self.score)
        } else {
            format!("{} {} {} {}", self.file_name, self.sys_id, self.key.key(), self.score)
        }
    }
}

/// Scores every sample in dataset order and writes the score file.
/// Returns the number of lines written.
pub fn score_eval<B, M>(
    dataset:     Arc<AsvDataset>,
    model:       &M,
    device:      &B::Device,
    output_path: &Path,
) -> Result<usize>
where
    B: Backend,
    M: SpoofClassifier<B>,
{
    let blind  = dataset.is_eval();
    let loader = DataLoaderBuilder::new(SpoofBatcher::<B>::new(device.clone()))
        .batch_size(SCORE_BATCH_SIZE)
        .build(dataset.clone());

    let file = File::create(output_path)
        .with_context(|| format!("Cannot create score file {}", output_path.display()))?;
    let mut out = BufWriter::new(file);
    let mut written = 0usize;

    for batch in loader.iter() {
        let scores = bonafide_scores(model.forward(batch.features))?;
        for (meta, score) in batch.meta.into_iter().zip(scores) {
            let sys_id = dataset
                .sysid_name(meta.sys_id)
                .ok_or_else(|| anyhow!("unknown system id index {} for '{}'", meta.sys_id, meta.file_name))?
                .to_string();
            let row = ScoreRow { file_name: meta.file_name, sys_id, key: meta.key, score };
            writeln!(out, "{}", row.line(blind))?;
            written += 1;
        }
    }
    out.flush()?;

    tracing::info!("Result saved to {}", output_path.display());
    Ok(written)
}
