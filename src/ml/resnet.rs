// Residual backbones: ResNet-18 (ImageNet layout) and SE-ResNet-20
// (CIFAR layout with squeeze-excitation in every block).

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Linear, LinearConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::{relu, sigmoid},
};

use crate::ml::model::SpoofClassifier;

#[derive(Config, Debug)]
pub struct ResNetConfig {
    pub num_classes: usize,
    /// Channel width of each stage.
    pub widths:      Vec<usize>,
    /// Basic blocks per stage.
    pub depths:      Vec<usize>,
    /// 7×7 stride-2 stem + 3×3 max-pool instead of a single 3×3 conv.
    pub wide_stem:   bool,
    /// Squeeze-excitation reduction ratio; 0 disables SE.
    #[config(default = 0)]
    pub se_reduction: usize,
}

impl ResNetConfig {
    pub fn resnet18(num_classes: usize) -> Self {
        Self::new(num_classes, vec![64, 128, 256, 512], vec![2, 2, 2, 2], true)
    }

    pub fn senet20(num_classes: usize) -> Self {
        Self::new(num_classes, vec![16, 32, 64], vec![3, 3, 3], false).with_se_reduction(16)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> ResNet<B> {
        let stem_width = self.widths[0];
        let (stem_conv, stem_pool) = if self.wide_stem {
            (
                conv(3, stem_width, 7, 2, 3, device),
                Some(
                    MaxPool2dConfig::new([3, 3])
                        .with_strides([2, 2])
                        .with_padding(PaddingConfig2d::Explicit(1, 1))
                        .init(),
                ),
            )
        } else {
            (conv(3, stem_width, 3, 1, 1, device), None)
        };

        let mut blocks = Vec::new();
        let mut in_channels = stem_width;
        for (stage, (&width, &depth)) in self.widths.iter().zip(&self.depths).enumerate() {
            for i in 0..depth {
                let stride = if stage > 0 && i == 0 { 2 } else { 1 };
                blocks.push(self.basic_block(in_channels, width, stride, device));
                in_channels = width;
            }
        }

        ResNet {
            stem_conv,
            stem_bn: BatchNormConfig::new(stem_width).init(device),
            stem_pool,
            blocks,
            pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            head: LinearConfig::new(in_channels, self.num_classes).init(device),
        }
    }

    fn basic_block<B: Backend>(
        &self,
        in_channels:  usize,
        out_channels: usize,
        stride:       usize,
        device:       &B::Device,
    ) -> BasicBlock<B> {
        let downsample = (stride != 1 || in_channels != out_channels).then(|| Downsample {
            conv: conv(in_channels, out_channels, 1, stride, 0, device),
            bn:   BatchNormConfig::new(out_channels).init(device),
        });
        let se = (self.se_reduction > 0).then(|| {
            let hidden = (out_channels / self.se_reduction).max(1);
            SqueezeExcite {
                pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
                fc1:  LinearConfig::new(out_channels, hidden).init(device),
                fc2:  LinearConfig::new(hidden, out_channels).init(device),
            }
        });
        BasicBlock {
            conv1: conv(in_channels, out_channels, 3, stride, 1, device),
            bn1:   BatchNormConfig::new(out_channels).init(device),
            conv2: conv(out_channels, out_channels, 3, 1, 1, device),
            bn2:   BatchNormConfig::new(out_channels).init(device),
            se,
            downsample,
        }
    }
}

fn conv<B: Backend>(
    in_channels:  usize,
    out_channels: usize,
    kernel:       usize,
    stride:       usize,
    padding:      usize,
    device:       &B::Device,
) -> Conv2d<B> {
    Conv2dConfig::new([in_channels, out_channels], [kernel, kernel])
        .with_stride([stride, stride])
        .with_padding(PaddingConfig2d::Explicit(padding, padding))
        .with_bias(false)
        .init(device)
}

#[derive(Module, Debug)]
pub struct SqueezeExcite<B: Backend> {
    pub pool: AdaptiveAvgPool2d,
    pub fc1:  Linear<B>,
    pub fc2:  Linear<B>,
}

impl<B: Backend> SqueezeExcite<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let [batch, channels, height, width] = x.dims();
        let s = self.pool.forward(x.clone()).reshape([batch, channels]);
        let s = sigmoid(self.fc2.forward(relu(self.fc1.forward(s))));
        x * s.reshape([batch, channels, 1, 1]).expand([batch, channels, height, width])
    }
}

#[derive(Module, Debug)]
pub struct Downsample<B: Backend> {
    pub conv: Conv2d<B>,
    pub bn:   BatchNorm<B>,
}

#[derive(Module, Debug)]
pub struct BasicBlock<B: Backend> {
    pub conv1:      Conv2d<B>,
    pub bn1:        BatchNorm<B>,
    pub conv2:      Conv2d<B>,
    pub bn2:        BatchNorm<B>,
    pub se:         Option<SqueezeExcite<B>>,
    pub downsample: Option<Downsample<B>>,
}

impl<B: Backend> BasicBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = match &self.downsample {
            Some(ds) => ds.bn.forward(ds.conv.forward(x.clone())),
            None => x.clone(),
        };
        let out = relu(self.bn1.forward(self.conv1.forward(x)));
        let mut out = self.bn2.forward(self.conv2.forward(out));
        if let Some(se) = &self.se {
            out = se.forward(out);
        }
        relu(out + identity)
    }
}

#[derive(Module, Debug)]
pub struct ResNet<B: Backend> {
    pub stem_conv: Conv2d<B>,
    pub stem_bn:   BatchNorm<B>,
    pub stem_pool: Option<MaxPool2d>,
    pub blocks:    Vec<BasicBlock<B>>,
    pub pool:      AdaptiveAvgPool2d,
    pub head:      Linear<B>,
}

impl<B: Backend> SpoofClassifier<B> for ResNet<B> {
    fn forward(&self, features: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = relu(self.stem_bn.forward(self.stem_conv.forward(features)));
        if let Some(pool) = &self.stem_pool {
            x = pool.forward(x);
        }
        for block in &self.blocks {
            x = block.forward(x);
        }
        let x = self.pool.forward(x).flatten::<2>(1, 3);
        self.head.forward(x)
    }
}
