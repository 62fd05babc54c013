// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from protocol files on disk to tensor batches.
//
//   protocol + flac / cqcc
//       │
//       ▼
//   ProtocolLoader    → SampleSet (raw input, label, metadata)
//       │
//       ▼
//   AsvDataset        → implements Burn's Dataset trait,
//       │               runs SamplePipeline on every get()
//       ▼
//   SamplePipeline    → fit length → peak normalise → extract
//       │               → tensor → 3 channels
//       ▼
//   SpoofBatcher      → stacks items into [N, 3, rows, frames]
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads ASVspoof 2019 protocols, flac audio and precomputed CQCC maps
pub mod loader;

/// Fixed-length fitting and peak normalisation of waveforms
pub mod padding;

/// Spectrogram and MFCC extractors
pub mod features;

/// Per-sample transform composed from the steps above
pub mod pipeline;

/// Implements Burn's Dataset trait over a SampleSet
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
