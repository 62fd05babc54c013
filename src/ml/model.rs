use std::fmt;
use std::str::FromStr;

use burn::{
    module::AutodiffModule,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::{activation::relu, backend::AutodiffBackend},
};
use serde::{Deserialize, Serialize};

use crate::domain::error::SpoofError;
use crate::ml::resnet::ResNetConfig;

/// Bona-fide vs spoof.
pub const NUM_CLASSES: usize = 2;

/// The contract every backbone satisfies.
pub trait SpoofClassifier<B: Backend>: Module<B> {
    /// features: [batch, 3, rows, frames] → logits: [batch, NUM_CLASSES]
    fn forward(&self, features: Tensor<B, 4>) -> Tensor<B, 2>;
}

// ─── Model selection ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Spect,
    Mfcc,
    Cqcc,
    Resnet18,
    Senet20,
}

impl FromStr for ModelKind {
    type Err = SpoofError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spect"    => Ok(ModelKind::Spect),
            "mfcc"     => Ok(ModelKind::Mfcc),
            "cqcc"     => Ok(ModelKind::Cqcc),
            "resnet18" => Ok(ModelKind::Resnet18),
            "senet20"  => Ok(ModelKind::Senet20),
            "mobilenet_v2" | "senet50" => Err(SpoofError::config(format!(
                "model '{s}' is not available in this build"
            ))),
            other => Err(SpoofError::config(format!("unknown model name '{other}'"))),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelKind::Spect    => "spect",
            ModelKind::Mfcc     => "mfcc",
            ModelKind::Cqcc     => "cqcc",
            ModelKind::Resnet18 => "resnet18",
            ModelKind::Senet20  => "senet20",
        })
    }
}

/// Receives the concrete model once `ModelKind` has been resolved.
///
/// Each backbone is a different Rust type, so the caller's logic is written
/// once as a generic `visit` and monomorphised per model.
pub trait ModelVisitor<B: AutodiffBackend> {
    type Output;

    fn visit<M>(self, model: M) -> Self::Output
    where
        M: AutodiffModule<B> + SpoofClassifier<B>,
        M::InnerModule: SpoofClassifier<B::InnerBackend>;
}

impl ModelKind {
    pub fn build<B, V>(self, device: &B::Device, visitor: V) -> V::Output
    where
        B: AutodiffBackend,
        V: ModelVisitor<B>,
    {
        match self {
            ModelKind::Spect    => visitor.visit(ConvNetConfig::spectrogram(NUM_CLASSES).init::<B>(device)),
            ModelKind::Mfcc     => visitor.visit(ConvNetConfig::mfcc(NUM_CLASSES).init::<B>(device)),
            ModelKind::Cqcc     => visitor.visit(ConvNetConfig::cqcc(NUM_CLASSES).init::<B>(device)),
            ModelKind::Resnet18 => visitor.visit(ResNetConfig::resnet18(NUM_CLASSES).init::<B>(device)),
            ModelKind::Senet20  => visitor.visit(ResNetConfig::senet20(NUM_CLASSES).init::<B>(device)),
        }
    }
}

// ─── Small CNN for the spect / mfcc / cqcc models ─────────────────────────────

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize;
// deriving them again gives conflicting impls.
#[derive(Config, Debug)]
pub struct ConvNetConfig {
    pub num_classes: usize,
    /// Output channels of each conv → BN → ReLU → max-pool stage.
    pub channels:    Vec<usize>,
    #[config(default = 0.5)]
    pub dropout:     f64,
}

impl ConvNetConfig {
    pub fn spectrogram(num_classes: usize) -> Self {
        Self::new(num_classes, vec![16, 32, 64, 64])
    }

    pub fn mfcc(num_classes: usize) -> Self {
        Self::new(num_classes, vec![16, 32, 64])
    }

    pub fn cqcc(num_classes: usize) -> Self {
        Self::new(num_classes, vec![16, 32, 64, 64])
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> ConvNet<B> {
        let mut in_channels = 3;
        let mut blocks = Vec::with_capacity(self.channels.len());
        for &out_channels in &self.channels {
            blocks.push(ConvBlock {
                conv: Conv2dConfig::new([in_channels, out_channels], [3, 3])
                    .with_padding(PaddingConfig2d::Explicit(1, 1))
                    .init(device),
                norm: BatchNormConfig::new(out_channels).init(device),
                pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            });
            in_channels = out_channels;
        }
        ConvNet {
            blocks,
            pool:    AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            dropout: DropoutConfig::new(self.dropout).init(),
            head:    LinearConfig::new(in_channels, self.num_classes).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub norm: BatchNorm<B>,
    pub pool: MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.pool.forward(relu(self.norm.forward(self.conv.forward(x))))
    }
}

#[derive(Module, Debug)]
pub struct ConvNet<B: Backend> {
    pub blocks:  Vec<ConvBlock<B>>,
    pub pool:    AdaptiveAvgPool2d,
    pub dropout: Dropout,
    pub head:    Linear<B>,
}

impl<B: Backend> SpoofClassifier<B> for ConvNet<B> {
    fn forward(&self, features: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = features;
        for block in &self.blocks {
            x = block.forward(x);
        }
        let x = self.pool.forward(x).flatten::<2>(1, 3); // [batch, channels]
        self.head.forward(self.dropout.forward(x))
    }
}
