// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that builds, trains or runs a network lives here.
//
//   model.rs     — SpoofClassifier trait, ModelKind selection,
//                  small ConvNet used by spect / mfcc / cqcc
//
//   resnet.rs    — ResNet-18 and SE-ResNet-20 backbones
//
//   trainer.rs   — one epoch of class-weighted training:
//                  forward → log-softmax → weighted NLL →
//                  backward → Adam step, with per-batch
//                  progress records
//
//   evaluator.rs — accuracy on a held-out split, score files
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            He et al. (2016) Deep Residual Learning
//            Hu et al. (2018) Squeeze-and-Excitation Networks

/// Classifier contract, model selection and the small CNN
pub mod model;

/// Residual backbones with optional squeeze-excitation
pub mod resnet;

/// One training epoch with weighted NLL and Adam
pub mod trainer;

/// Accuracy and score-file evaluation
pub mod evaluator;
