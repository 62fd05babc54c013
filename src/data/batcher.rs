// ============================================================
// Layer 4 — Spoof Batcher
// ============================================================
// Implements Burn's Batcher trait: stacks N feature tensors of
// shape [3, rows, frames] into one [N, 3, rows, frames] tensor.
//
// All items already share one shape (the pipeline fixed the
// waveform length or CQCC frame count before extraction), so
// no dynamic padding is needed here.
//
// Reference: Burn Book §4 (Batcher)

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::dataset::SpoofItem;
use crate::domain::sample::SampleMeta;

#[derive(Debug, Clone)]
pub struct SpoofBatch<B: Backend> {
    /// Features, shape: [batch_size, 3, rows, frames]
    pub features: Tensor<B, 4>,

    /// Class indices, shape: [batch_size]; 1 = bona-fide, 0 = spoof
    pub labels: Tensor<B, 1, Int>,

    /// Protocol metadata, in batch order (needed for score lines)
    pub meta: Vec<SampleMeta>,
}

/// Holds the target device so tensors are created on the right GPU/CPU.
#[derive(Clone, Debug)]
pub struct SpoofBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SpoofBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<B, SpoofItem, SpoofBatch<B>> for SpoofBatcher<B> {
    fn batch(&self, items: Vec<SpoofItem>, _device: &B::Device) -> SpoofBatch<B> {
        let batch_size = items.len();
        let [channels, rows, frames] = items[0].features.shape;

        // ── Flatten features in sample order ─────────────────────────────────
        let flat: Vec<f32> = items
            .iter()
            .flat_map(|item| item.features.data.iter().copied())
            .collect();

        let labels: Vec<i32> = items
            .iter()
            .map(|item| item.label.index() as i32)
            .collect();

        let features = Tensor::<B, 1>::from_floats(flat.as_slice(), &self.device)
            .reshape([batch_size, channels, rows, frames]);

        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        let meta = items.into_iter().map(|item| item.meta).collect();

        SpoofBatch { features, labels, meta }
    }
}
