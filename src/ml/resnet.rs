// ============================================================
// Layer 5 — 2D ResNet Classifier and Discriminator
// ============================================================
// Statement data [B, T, F] becomes a pseudo-image:
//
//   1. append N(0,1) columns so F grows to side² (188 → 256)
//   2. reshape to [B, T, side, side]  (statements = channels)
//   3. conv3x3 → BN → ReLU, then groups of ResNet blocks;
//      the first block of every group after the first halves
//      the spatial size (16 → 8 → 4 → 2)
//   4. flatten → Linear → sigmoid (1 class) / softmax
//
// The discriminator embeds the rounded label y ∈ {0, 1} into one
// extra side×side channel placed in front of the data channels.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Embedding, EmbeddingConfig, Linear,
        LinearConfig, PaddingConfig2d, Relu,
    },
    prelude::*,
    tensor::Distribution,
};

use crate::error;
use crate::ml::classifier::{activate, SequenceClassifier};
use crate::ml::hparams::HParams;
use crate::ml::layers::kaiming_fan_out;

// ─── ResNetBlock ──────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct ResNetBlockConfig {
    pub in_channels: usize,
    /// Only used when subsampling; otherwise the block keeps `in_channels`
    pub out_channels: usize,
    #[config(default = false)]
    pub subsample: bool,
    #[config(default = 0.5)]
    pub dropout: f64,
    #[config(default = false)]
    pub double_dropout: bool,
}

impl ResNetBlockConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ResNetBlock<B> {
        let c_out = if self.subsample { self.out_channels } else { self.in_channels };
        let stride = if self.subsample { 2 } else { 1 };

        let conv1 = Conv2dConfig::new([self.in_channels, c_out], [3, 3])
            .with_stride([stride, stride])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_bias(false)
            .with_initializer(kaiming_fan_out())
            .init(device);
        let conv2 = Conv2dConfig::new([c_out, c_out], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_bias(false)
            .with_initializer(kaiming_fan_out())
            .init(device);
        let downsample = self.subsample.then(|| {
            Conv2dConfig::new([self.in_channels, c_out], [1, 1])
                .with_stride([2, 2])
                .with_initializer(kaiming_fan_out())
                .init(device)
        });

        ResNetBlock {
            conv1,
            norm1: BatchNormConfig::new(c_out).init(device),
            conv2,
            norm2: BatchNormConfig::new(c_out).init(device),
            downsample,
            activation: Relu::new(),
            dropout: DropoutConfig::new(self.dropout).init(),
            double_dropout: self.double_dropout,
        }
    }
}

#[derive(Module, Debug)]
pub struct ResNetBlock<B: Backend> {
    pub conv1: Conv2d<B>,
    pub norm1: BatchNorm<B, 2>,
    pub conv2: Conv2d<B>,
    pub norm2: BatchNorm<B, 2>,
    pub downsample: Option<Conv2d<B>>,
    pub activation: Relu,
    pub dropout: Dropout,
    pub double_dropout: bool,
}

impl<B: Backend> ResNetBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let z = self.conv1.forward(x.clone());
        let z = self.norm1.forward(z);
        let z = self.activation.forward(z);
        let z = self.dropout.forward(z);
        let z = self.conv2.forward(z);
        let z = self.norm2.forward(z);

        let skip = match &self.downsample {
            Some(conv) => conv.forward(x),
            None => x,
        };

        let out = self.activation.forward(z + skip);
        if self.double_dropout {
            self.dropout.forward(out)
        } else {
            out
        }
    }
}

// ─── Shared trunk ─────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct ResNetConfig {
    /// Data channels (statements per customer)
    #[config(default = 13)]
    pub in_channels: usize,
    #[config(default = 188)]
    pub num_features: usize,
    #[config(default = 16)]
    pub image_side: usize,
    #[config(default = "vec![4, 4, 4, 4]")]
    pub num_blocks: Vec<usize>,
    #[config(default = "vec![32, 64, 128, 256]")]
    pub c_hidden: Vec<usize>,
    #[config(default = 1)]
    pub num_classes: usize,
}

impl ResNetConfig {
    pub fn from_hparams(h: &HParams) -> error::Result<Self> {
        h.validate()?;
        h.validate_image()?;
        Ok(Self::new()
            .with_in_channels(h.time_steps)
            .with_num_features(h.num_features)
            .with_image_side(h.image_side))
    }

    /// Side of the feature map after all subsampling groups.
    pub fn output_side(&self) -> usize {
        let groups = self.num_blocks.len();
        (1..groups).fold(self.image_side, |side, _| side.div_ceil(2))
    }

    fn init_trunk<B: Backend>(&self, input_channels: usize, device: &B::Device) -> ResNetTrunk<B> {
        let stem = Conv2dConfig::new([input_channels, self.c_hidden[0]], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_bias(false)
            .with_initializer(kaiming_fan_out())
            .init(device);

        let mut blocks = Vec::new();
        for (group, &count) in self.num_blocks.iter().enumerate() {
            for index in 0..count {
                let subsample = index == 0 && group > 0;
                let c_in = if subsample { self.c_hidden[group - 1] } else { self.c_hidden[group] };
                blocks.push(
                    ResNetBlockConfig::new(c_in, self.c_hidden[group])
                        .with_subsample(subsample)
                        .init(device),
                );
            }
        }

        let last = self.c_hidden[self.c_hidden.len() - 1];
        let side = self.output_side();

        ResNetTrunk {
            stem,
            stem_norm: BatchNormConfig::new(self.c_hidden[0]).init(device),
            activation: Relu::new(),
            blocks,
            head: LinearConfig::new(last * side * side, self.num_classes).init(device),
            num_features: self.num_features,
            image_side: self.image_side,
            num_classes: self.num_classes,
        }
    }

    pub fn init_classifier<B: Backend>(&self, device: &B::Device) -> ResNetClassifier<B> {
        ResNetClassifier {
            trunk: self.init_trunk(self.in_channels, device),
        }
    }

    pub fn init_discriminator<B: Backend>(&self, device: &B::Device) -> ResNetDiscriminator<B> {
        ResNetDiscriminator {
            trunk: self.init_trunk(self.in_channels + 1, device),
            condition: EmbeddingConfig::new(2, self.image_side * self.image_side).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct ResNetTrunk<B: Backend> {
    pub stem: Conv2d<B>,
    pub stem_norm: BatchNorm<B, 2>,
    pub activation: Relu,
    pub blocks: Vec<ResNetBlock<B>>,
    pub head: Linear<B>,
    pub num_features: usize,
    pub image_side: usize,
    pub num_classes: usize,
}

impl<B: Backend> ResNetTrunk<B> {
    /// `[B, T, F]` → `[B, T, side, side]`, padding features with N(0,1) noise.
    fn to_image(&self, x: Tensor<B, 3>) -> Tensor<B, 4> {
        let [batch, steps, features] = x.dims();
        let area = self.image_side * self.image_side;
        let x = if features < area {
            let noise = Tensor::<B, 3>::random(
                [batch, steps, area - features],
                Distribution::Normal(0.0, 1.0),
                &x.device(),
            );
            Tensor::cat(vec![x, noise], 2)
        } else {
            x
        };
        x.reshape([batch, steps, self.image_side, self.image_side])
    }

    fn forward_image(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.stem.forward(x);
        let x = self.stem_norm.forward(x);
        let x = self.activation.forward(x);
        let x = self.blocks.iter().fold(x, |x, block| block.forward(x));
        let x: Tensor<B, 2> = x.flatten(1, 3);
        self.head.forward(x)
    }
}

// ─── ResNetClassifier ─────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct ResNetClassifier<B: Backend> {
    pub trunk: ResNetTrunk<B>,
}

impl<B: Backend> ResNetClassifier<B> {
    /// `[batch, T, F]` → probabilities `[batch, num_classes]`
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        self.probabilities(x)
    }
}

impl<B: Backend> SequenceClassifier<B> for ResNetClassifier<B> {
    fn logits(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let image = self.trunk.to_image(x);
        self.trunk.forward_image(image)
    }

    fn num_classes(&self) -> usize {
        self.trunk.num_classes
    }
}

// ─── ResNetDiscriminator ──────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct ResNetDiscriminator<B: Backend> {
    pub trunk: ResNetTrunk<B>,
    pub condition: Embedding<B>,
}

impl<B: Backend> ResNetDiscriminator<B> {
    /// `x : [batch, T, F]`, `y : [batch]` (rounded to a 0/1 label)
    /// → probabilities `[batch, num_classes]`
    pub fn forward(&self, x: Tensor<B, 3>, y: Tensor<B, 1>) -> Tensor<B, 2> {
        let logits = self.logits(x, y);
        activate(logits, self.trunk.num_classes)
    }

    /// Single un-batched sample `[T, F]`.
    pub fn forward_sample(&self, x: Tensor<B, 2>, y: Tensor<B, 1>) -> Tensor<B, 2> {
        self.forward(x.unsqueeze::<3>(), y)
    }

    pub fn logits(&self, x: Tensor<B, 3>, y: Tensor<B, 1>) -> Tensor<B, 2> {
        let [batch, _, _] = x.dims();
        let side = self.trunk.image_side;

        let image = self.trunk.to_image(x);
        let labels = y.round().int().reshape([batch, 1]);
        let condition = self
            .condition
            .forward(labels)
            .reshape([batch, 1, side, side]);

        let x = Tensor::cat(vec![condition, image], 1);
        self.trunk.forward_image(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = NdArray<f32>;
    type TrainBackend = Autodiff<NdArray<f32>>;

    fn small() -> ResNetConfig {
        ResNetConfig::new()
            .with_num_blocks(vec![1, 1, 1])
            .with_c_hidden(vec![4, 8, 8])
    }

    fn statements<B: Backend>(batch: usize, device: &B::Device) -> Tensor<B, 3> {
        Tensor::random([batch, 13, 188], Distribution::Normal(0.0, 1.0), device)
    }

    #[test]
    fn test_output_side() {
        assert_eq!(ResNetConfig::new().output_side(), 2);
        assert_eq!(small().output_side(), 4);
        assert_eq!(small().with_image_side(15).output_side(), 4);
    }

    #[test]
    fn test_default_topology() {
        let device = Default::default();
        let model = ResNetConfig::new().init_classifier::<TestBackend>(&device);
        assert_eq!(model.trunk.blocks.len(), 16);
        let downsampling = model
            .trunk
            .blocks
            .iter()
            .filter(|b| b.downsample.is_some())
            .count();
        assert_eq!(downsampling, 3);
    }

    #[test]
    fn test_classifier_sigmoid_output() {
        let device = Default::default();
        let model = small().init_classifier::<TestBackend>(&device);
        let probs = model.forward(statements::<TestBackend>(3, &device));
        assert_eq!(probs.dims(), [3, 1]);
        let values = probs.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_classifier_softmax_output() {
        let device = Default::default();
        let model = small().with_num_classes(3).init_classifier::<TestBackend>(&device);
        let probs = model.forward(statements::<TestBackend>(2, &device));
        assert_eq!(probs.dims(), [2, 3]);
        let sums = probs.sum_dim(1).into_data().to_vec::<f32>().unwrap();
        assert!(sums.iter().all(|s| (s - 1.0).abs() < 1e-4));
    }

    #[test]
    fn test_classifier_trains_with_double_dropout_block() {
        let device = Default::default();
        let block = ResNetBlockConfig::new(4, 4)
            .with_double_dropout(true)
            .init::<TrainBackend>(&device);
        let x = Tensor::<TrainBackend, 4>::ones([2, 4, 8, 8], &device);
        assert_eq!(block.forward(x).dims(), [2, 4, 8, 8]);
    }

    #[test]
    fn test_discriminator_conditions_on_labels() {
        let device = Default::default();
        let model = small().init_discriminator::<TestBackend>(&device);
        let y = Tensor::<TestBackend, 1>::from_floats([0.2, 0.8], &device);
        let probs = model.forward(statements::<TestBackend>(2, &device), y);
        assert_eq!(probs.dims(), [2, 1]);
        let values = probs.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_discriminator_accepts_single_sample() {
        let device = Default::default();
        let model = small().init_discriminator::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 2>::zeros([13, 188], &device);
        let y = Tensor::<TestBackend, 1>::from_floats([1.0], &device);
        assert_eq!(model.forward_sample(x, y).dims(), [1, 1]);
    }

    #[test]
    fn test_from_hparams_rejects_oversized_features() {
        let h = HParams::new().with_num_features(400);
        assert!(ResNetConfig::from_hparams(&h).is_err());
    }
}
