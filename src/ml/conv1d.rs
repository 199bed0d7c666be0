// ============================================================
// Layer 5 — Conv1d Classifiers
// ============================================================
// All classifiers here read `[batch, channels, length]`. For the
// statement data that is `[batch, T, F]`: the 13 statements are
// the channels and the convolution slides over the features.
//
//   Conv1dClassifier      4 × block(256, k3)         → softmax
//   FitConv1dClassifier   3 × block(64, k4)          → softmax
//   Res1dClassifier       3 × residual unit(256)     → softmax
//   AmexConv1dClassifier  13→…→1024→…→128 pyramid    → sigmoid
//   FatConv1dClassifier   n × block(hidden, k3)      → sigmoid
//
// Every head is: global max over length → Linear.

use burn::{
    nn::{
        pool::{MaxPool1d, MaxPool1dConfig},
        Linear, LinearConfig,
    },
    prelude::*,
};

use crate::ml::classifier::{activate, SequenceClassifier};
use crate::ml::hparams::HParams;
use crate::ml::layers::{
    append_noise_columns, max_over_length, Conv1dBlock, Conv1dBlockConfig, Conv1dLayers,
    Conv1dLayersConfig, Conv1dResidual, Conv1dResidualConfig, GaussianNoise,
};

// ─── Pyramid of blocks with optional pooling ──────────────────────────────────

/// One `Conv1dBlock` (k=3, p=1), optionally followed by MaxPool1d(2, 2).
#[derive(Module, Debug)]
pub struct Conv1dStage<B: Backend> {
    pub block: Conv1dBlock<B>,
    pub pool: Option<MaxPool1d>,
}

impl<B: Backend> Conv1dStage<B> {
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        pool_after: bool,
        dropout: f64,
        device: &B::Device,
    ) -> Self {
        Self {
            block: Conv1dBlockConfig::same(in_channels, out_channels)
                .with_dropout(dropout)
                .init(device),
            pool: pool_after.then(|| MaxPool1dConfig::new(2).with_stride(2).init()),
        }
    }

    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let x = self.block.forward(x);
        match &self.pool {
            Some(pool) => pool.forward(x),
            None => x,
        }
    }
}

/// Build a stage chain from `(in, out, pool_after)` triples.
pub fn build_stages<B: Backend>(
    plan: &[(usize, usize, bool)],
    dropout: f64,
    device: &B::Device,
) -> Vec<Conv1dStage<B>> {
    plan.iter()
        .map(|&(c_in, c_out, pool)| Conv1dStage::new(c_in, c_out, pool, dropout, device))
        .collect()
}

pub fn forward_stages<B: Backend>(stages: &[Conv1dStage<B>], x: Tensor<B, 3>) -> Tensor<B, 3> {
    stages.iter().fold(x, |x, stage| stage.forward(x))
}

// ─── Conv1dClassifier ─────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct Conv1dClassifierConfig {
    #[config(default = 248)]
    pub in_channels: usize,
    #[config(default = 4)]
    pub num_classes: usize,
    #[config(default = 256)]
    pub hidden: usize,
}

impl Conv1dClassifierConfig {
    pub fn from_hparams(h: &HParams, num_classes: usize) -> Self {
        Self::new()
            .with_in_channels(h.time_steps)
            .with_num_classes(num_classes)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Conv1dClassifier<B> {
        let dropouts = [0.5, 0.5, 0.5, 0.0];
        let mut in_channels = self.in_channels;
        let blocks = dropouts
            .iter()
            .map(|&dropout| {
                let block = Conv1dBlockConfig::same(in_channels, self.hidden)
                    .with_dropout(dropout)
                    .init(device);
                in_channels = self.hidden;
                block
            })
            .collect();

        Conv1dClassifier {
            noise: GaussianNoise::new(0.1, true),
            blocks,
            classifier: LinearConfig::new(self.hidden, self.num_classes).init(device),
            num_classes: self.num_classes,
        }
    }
}

#[derive(Module, Debug)]
pub struct Conv1dClassifier<B: Backend> {
    pub noise: GaussianNoise,
    pub blocks: Vec<Conv1dBlock<B>>,
    pub classifier: Linear<B>,
    pub num_classes: usize,
}

impl<B: Backend> Conv1dClassifier<B> {
    /// `[batch, in_channels, length]` → class probabilities `[batch, classes]`
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        self.probabilities(x)
    }
}

impl<B: Backend> SequenceClassifier<B> for Conv1dClassifier<B> {
    fn logits(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let x = self.noise.forward(x);
        let x = self.blocks.iter().fold(x, |x, block| block.forward(x));
        self.classifier.forward(max_over_length(x))
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }
}

// ─── FitConv1dClassifier ──────────────────────────────────────────────────────
// Kernel 4 with padding 1 shortens the length by one per block,
// so inputs need at least 4 positions.

#[derive(Config, Debug)]
pub struct FitConv1dClassifierConfig {
    #[config(default = 248)]
    pub in_channels: usize,
    #[config(default = 4)]
    pub num_classes: usize,
    #[config(default = 64)]
    pub hidden: usize,
}

impl FitConv1dClassifierConfig {
    pub fn from_hparams(h: &HParams, num_classes: usize) -> Self {
        Self::new()
            .with_in_channels(h.time_steps)
            .with_num_classes(num_classes)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> FitConv1dClassifier<B> {
        let dropouts = [0.0, 0.05, 0.01];
        let mut in_channels = self.in_channels;
        let blocks = dropouts
            .iter()
            .map(|&dropout| {
                let block = Conv1dBlockConfig::new(in_channels, self.hidden, 4)
                    .with_padding(1)
                    .with_dropout(dropout)
                    .init(device);
                in_channels = self.hidden;
                block
            })
            .collect();

        FitConv1dClassifier {
            noise: GaussianNoise::new(0.01, false),
            blocks,
            classifier: LinearConfig::new(self.hidden, self.num_classes).init(device),
            num_classes: self.num_classes,
        }
    }
}

#[derive(Module, Debug)]
pub struct FitConv1dClassifier<B: Backend> {
    pub noise: GaussianNoise,
    pub blocks: Vec<Conv1dBlock<B>>,
    pub classifier: Linear<B>,
    pub num_classes: usize,
}

impl<B: Backend> FitConv1dClassifier<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        self.probabilities(x)
    }
}

impl<B: Backend> SequenceClassifier<B> for FitConv1dClassifier<B> {
    fn logits(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let x = self.noise.forward(x);
        let x = self.blocks.iter().fold(x, |x, block| block.forward(x));
        self.classifier.forward(max_over_length(x))
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }
}

// ─── Res1dClassifier ──────────────────────────────────────────────────────────
// Each residual unit shortens the length by 11 (see Conv1dResidual),
// so inputs need at least 34 positions.

#[derive(Config, Debug)]
pub struct Res1dClassifierConfig {
    #[config(default = 248)]
    pub in_channels: usize,
    #[config(default = 4)]
    pub num_classes: usize,
    #[config(default = 256)]
    pub hidden: usize,
    #[config(default = 0.01)]
    pub dropout: f64,
    #[config(default = 2.0)]
    pub noise_std: f64,
}

impl Res1dClassifierConfig {
    pub fn from_hparams(h: &HParams, num_classes: usize) -> Self {
        Self::new()
            .with_in_channels(h.time_steps)
            .with_num_classes(num_classes)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Res1dClassifier<B> {
        let units = (0..3)
            .map(|i| {
                let c_in = if i == 0 { self.in_channels } else { self.hidden };
                Conv1dResidualConfig::new(c_in, self.hidden)
                    .with_dropout(self.dropout)
                    .init(device)
            })
            .collect();

        Res1dClassifier {
            noise: GaussianNoise::new(self.noise_std, false),
            units,
            classifier: LinearConfig::new(self.hidden, self.num_classes).init(device),
            num_classes: self.num_classes,
        }
    }
}

#[derive(Module, Debug)]
pub struct Res1dClassifier<B: Backend> {
    pub noise: GaussianNoise,
    pub units: Vec<Conv1dResidual<B>>,
    pub classifier: Linear<B>,
    pub num_classes: usize,
}

impl<B: Backend> Res1dClassifier<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        self.probabilities(x)
    }
}

impl<B: Backend> SequenceClassifier<B> for Res1dClassifier<B> {
    fn logits(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let x = self.noise.forward(x);
        let x = self.units.iter().fold(x, |x, unit| unit.forward(x));
        self.classifier.forward(max_over_length(x))
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }
}

// ─── AmexConv1dClassifier ─────────────────────────────────────────────────────

/// Channel plan of the wide pyramid; `true` = MaxPool1d(2, 2) after the block.
pub const AMEX_PLAN: [(usize, usize, bool); 8] = [
    (13, 64, false),
    (64, 128, false),
    (128, 256, true),
    (256, 512, true),
    (512, 1024, true),
    (1024, 512, false),
    (512, 256, false),
    (256, 128, false),
];

#[derive(Config, Debug)]
pub struct AmexConv1dClassifierConfig {
    #[config(default = 13)]
    pub in_channels: usize,
    #[config(default = 0)]
    pub noise_dim: usize,
    #[config(default = 0.5)]
    pub dropout: f64,
}

impl AmexConv1dClassifierConfig {
    pub fn from_hparams(h: &HParams) -> Self {
        Self::new()
            .with_in_channels(h.time_steps)
            .with_noise_dim(h.noise_dim)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> AmexConv1dClassifier<B> {
        let mut plan = AMEX_PLAN;
        plan[0].0 = self.in_channels;
        let last = plan[plan.len() - 1].1;

        AmexConv1dClassifier {
            noise: GaussianNoise::new(0.1, false),
            stages: build_stages(&plan, self.dropout, device),
            classifier: LinearConfig::new(last, 1).init(device),
            noise_dim: self.noise_dim,
        }
    }
}

#[derive(Module, Debug)]
pub struct AmexConv1dClassifier<B: Backend> {
    pub noise: GaussianNoise,
    pub stages: Vec<Conv1dStage<B>>,
    pub classifier: Linear<B>,
    pub noise_dim: usize,
}

impl<B: Backend> AmexConv1dClassifier<B> {
    /// `[batch, T, F]` → default probability `[batch, 1]`
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        self.probabilities(x)
    }
}

impl<B: Backend> SequenceClassifier<B> for AmexConv1dClassifier<B> {
    fn logits(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let x = self.noise.forward(x);
        let x = append_noise_columns(x, self.noise_dim);
        let x = forward_stages(&self.stages, x);
        self.classifier.forward(max_over_length(x))
    }

    fn num_classes(&self) -> usize {
        1
    }
}

// ─── FatConv1dClassifier ──────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct FatConv1dClassifierConfig {
    #[config(default = 13)]
    pub in_channels: usize,
    #[config(default = 512)]
    pub hidden_channels: usize,
    #[config(default = 6)]
    pub num_layers: usize,
    #[config(default = 0.3)]
    pub dropout: f64,
    #[config(default = 1)]
    pub num_classes: usize,
    #[config(default = 0)]
    pub noise_dim: usize,
}

impl FatConv1dClassifierConfig {
    pub fn from_hparams(h: &HParams) -> Self {
        Self::new()
            .with_in_channels(h.time_steps)
            .with_hidden_channels(h.hidden_dim)
            .with_num_layers(h.num_layers)
            .with_dropout(h.dropout)
            .with_noise_dim(h.noise_dim)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> FatConv1dClassifier<B> {
        FatConv1dClassifier {
            noise: GaussianNoise::new(0.05, false),
            layers: Conv1dLayersConfig::new(self.num_layers, self.in_channels, self.hidden_channels)
                .with_dropout(self.dropout)
                .init(device),
            classifier: LinearConfig::new(self.hidden_channels, self.num_classes).init(device),
            num_classes: self.num_classes,
            noise_dim: self.noise_dim,
        }
    }
}

#[derive(Module, Debug)]
pub struct FatConv1dClassifier<B: Backend> {
    pub noise: GaussianNoise,
    pub layers: Conv1dLayers<B>,
    pub classifier: Linear<B>,
    pub num_classes: usize,
    pub noise_dim: usize,
}

impl<B: Backend> FatConv1dClassifier<B> {
    /// `[batch, T, F]` → probabilities `[batch, num_classes]`
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        activate(self.logits(x), self.num_classes)
    }
}

impl<B: Backend> SequenceClassifier<B> for FatConv1dClassifier<B> {
    fn logits(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let x = self.noise.forward(x);
        let x = append_noise_columns(x, self.noise_dim);
        let x = self.layers.forward(x);
        self.classifier.forward(max_over_length(x))
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }
}
