use std::sync::Arc;

use anyhow::{Context, Result};
use burn::data::dataset::Dataset;

use crate::data::pipeline::{FeatureTensor, SamplePipeline};
use crate::domain::sample::{Label, SampleMeta, SampleSet};

/// One transformed sample, as handed to the batcher.
#[derive(Debug, Clone)]
pub struct SpoofItem {
    pub features: FeatureTensor,
    pub label:    Label,
    pub meta:     SampleMeta,
}

/// A split of utterances with the sample pipeline applied lazily on `get`.
pub struct AsvDataset {
    set:      SampleSet,
    pipeline: Arc<SamplePipeline>,
}

impl AsvDataset {
    /// Every input is checked here, so `get` inside loader workers never
    /// meets a sample the pipeline rejects.
    pub fn new(set: SampleSet, pipeline: Arc<SamplePipeline>) -> Result<Self> {
        for sample in &set.samples {
            pipeline
                .check(&sample.input)
                .with_context(|| format!("rejected sample '{}'", sample.meta.file_name))?;
        }
        Ok(Self { set, pipeline })
    }

    pub fn sample_count(&self) -> usize {
        self.set.samples.len()
    }

    pub fn is_eval(&self) -> bool {
        self.set.is_eval
    }

    /// Human-readable system id for a protocol index (the inverse table).
    pub fn sysid_name(&self, index: usize) -> Option<&str> {
        self.set.sysid_name(index)
    }

    pub fn class_counts(&self) -> [usize; 2] {
        let mut counts = [0usize; 2];
        for s in &self.set.samples {
            counts[s.label.index()] += 1;
        }
        counts
    }
}

impl Dataset<SpoofItem> for AsvDataset {
    fn get(&self, index: usize) -> Option<SpoofItem> {
        let sample = self.set.samples.get(index)?;
        match self.pipeline.apply(&sample.input) {
            Ok(features) => Some(SpoofItem {
                features,
                label: sample.label,
                meta:  sample.meta.clone(),
            }),
            Err(e) => {
                tracing::error!("Pipeline failed on '{}': {}", sample.meta.file_name, e);
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.set.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::pipeline::DEFAULT_CQCC_FRAMES;
    use crate::domain::error::SpoofError;
    use crate::domain::kinds::FeatureKind;
    use crate::domain::sample::{Sample, SampleInput};

    fn sample(name: &str, wave: Vec<f32>, label: Label) -> Sample {
        Sample::new(
            SampleInput::Waveform(wave),
            label,
            SampleMeta {
                speaker_id: "LA_0001".into(),
                file_name:  name.into(),
                path:       String::new(),
                sys_id:     0,
                key:        label,
            },
        )
    }

    fn pipeline() -> Arc<SamplePipeline> {
        Arc::new(SamplePipeline::new(FeatureKind::Mfcc, 4_096, DEFAULT_CQCC_FRAMES))
    }

    #[test]
    fn test_get_applies_pipeline() {
        let set = SampleSet {
            samples:     vec![sample("a", vec![0.2; 1_000], Label::Bonafide)],
            sysid_names: vec!["-".into()],
            is_eval:     false,
        };
        let ds = AsvDataset::new(set, pipeline()).unwrap();
        let item = ds.get(0).unwrap();
        assert_eq!(item.features.shape[0], 3);
        assert_eq!(item.label, Label::Bonafide);
        assert!(ds.get(1).is_none());
        assert_eq!(ds.sysid_name(0), Some("-"));
        assert_eq!(ds.class_counts(), [0, 1]);
    }

    #[test]
    fn test_silent_sample_is_rejected_up_front() {
        let set = SampleSet {
            samples:     vec![sample("silent", vec![0.0; 500], Label::Spoof)],
            sysid_names: vec!["-".into()],
            is_eval:     false,
        };
        let err = AsvDataset::new(set, pipeline()).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<SpoofError>(),
            Some(SpoofError::DegenerateInput(_))
        ));
    }
}
