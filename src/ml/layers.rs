// ============================================================
// Layer 5 — Building Blocks
// ============================================================
// Elementary units shared by the 1D classifiers:
//
//   Conv1dBlock     conv → batch-norm → ReLU → dropout
//   Conv1dLayers    n stacked Conv1dBlocks (k=3, p=1)
//   Conv1dResidual  two convs with a shape-guarded skip
//   GaussianNoise   additive noise, training mode only
//
// "Training mode" in Burn is the backend: a module living on
// an Autodiff backend trains, the same module after `.valid()`
// evaluates. Dropout and BatchNorm already follow that switch;
// GaussianNoise checks `B::ad_enabled()` the same way.

use burn::{
    module::Param,
    nn::{
        conv::{Conv1d, Conv1dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Initializer, PaddingConfig1d, Relu,
    },
    prelude::*,
    tensor::Distribution,
};

/// Kaiming-normal, fan-out mode, ReLU gain. Conv2d only: Burn's
/// Conv1d never hands a fan-out to its initializer.
/// BatchNorm already starts at scale 1 / shift 0 in Burn.
pub fn kaiming_fan_out() -> Initializer {
    Initializer::KaimingNormal {
        gain: std::f64::consts::SQRT_2,
        fan_out_only: true,
    }
}

/// The same fan-out Kaiming draw for a Conv1d weight,
/// `std = sqrt(2 / (out_channels / groups * kernel_size))`.
pub fn conv1d_fan_out(out_channels: usize, groups: usize, kernel_size: usize) -> Initializer {
    let fan_out = (out_channels / groups.max(1) * kernel_size).max(1);
    Initializer::Normal {
        mean: 0.0,
        std: (2.0 / fan_out as f64).sqrt(),
    }
}

// ─── Conv1dBlock ──────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct Conv1dBlockConfig {
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel_size: usize,
    #[config(default = 1)]
    pub stride: usize,
    #[config(default = 0)]
    pub padding: usize,
    #[config(default = 1)]
    pub dilation: usize,
    #[config(default = 1)]
    pub groups: usize,
    #[config(default = true)]
    pub bias: bool,
    #[config(default = 0.5)]
    pub dropout: f64,
}

impl Conv1dBlockConfig {
    /// Kernel 3, padding 1: output length equals input length.
    pub fn same(in_channels: usize, out_channels: usize) -> Self {
        Self::new(in_channels, out_channels, 3).with_padding(1)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Conv1dBlock<B> {
        let mut conv = Conv1dConfig::new(self.in_channels, self.out_channels, self.kernel_size)
            .with_stride(self.stride)
            .with_padding(PaddingConfig1d::Explicit(self.padding))
            .with_dilation(self.dilation)
            .with_groups(self.groups)
            .with_bias(self.bias)
            .with_initializer(conv1d_fan_out(self.out_channels, self.groups, self.kernel_size))
            .init(device);

        // Bias starts at zero; Burn's initializer would draw it too.
        if conv.bias.is_some() {
            conv.bias = Some(Param::from_tensor(Tensor::zeros([self.out_channels], device)));
        }

        Conv1dBlock {
            conv,
            norm: BatchNormConfig::new(self.out_channels).init(device),
            activation: Relu::new(),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct Conv1dBlock<B: Backend> {
    pub conv: Conv1d<B>,
    pub norm: BatchNorm<B, 1>,
    pub activation: Relu,
    pub dropout: Dropout,
}

impl<B: Backend> Conv1dBlock<B> {
    /// `[batch, in_channels, length]` → `[batch, out_channels, length']`
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let x = self.conv.forward(x);
        let x = self.norm.forward(x);
        let x = self.activation.forward(x);
        self.dropout.forward(x)
    }
}

// ─── Conv1dLayers ─────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct Conv1dLayersConfig {
    pub num_layers: usize,
    pub in_channels: usize,
    pub out_channels: usize,
    #[config(default = 0.2)]
    pub dropout: f64,
}

impl Conv1dLayersConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Conv1dLayers<B> {
        let mut in_channels = self.in_channels;
        let blocks = (0..self.num_layers)
            .map(|_| {
                let block = Conv1dBlockConfig::same(in_channels, self.out_channels)
                    .with_dropout(self.dropout)
                    .init(device);
                in_channels = self.out_channels;
                block
            })
            .collect();
        Conv1dLayers { blocks }
    }
}

#[derive(Module, Debug)]
pub struct Conv1dLayers<B: Backend> {
    pub blocks: Vec<Conv1dBlock<B>>,
}

impl<B: Backend> Conv1dLayers<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        self.blocks.iter().fold(x, |x, block| block.forward(x))
    }
}

// ─── Conv1dResidual ───────────────────────────────────────────────────────────
// conv(k=1) then conv(k=16), both padded by 1. The skip is only
// added when the input already has the conv output's shape, so
// channel or length changes silently drop it.

#[derive(Config, Debug)]
pub struct Conv1dResidualConfig {
    pub in_channels: usize,
    pub out_channels: usize,
    #[config(default = 1)]
    pub first_kernel: usize,
    #[config(default = 16)]
    pub second_kernel: usize,
    #[config(default = 1)]
    pub padding: usize,
    #[config(default = 0.0)]
    pub dropout: f64,
}

impl Conv1dResidualConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Conv1dResidual<B> {
        let padding = PaddingConfig1d::Explicit(self.padding);
        Conv1dResidual {
            conv1: Conv1dConfig::new(self.in_channels, self.out_channels, self.first_kernel)
                .with_padding(padding.clone())
                .init(device),
            conv2: Conv1dConfig::new(self.out_channels, self.out_channels, self.second_kernel)
                .with_padding(padding)
                .init(device),
            norm: BatchNormConfig::new(self.out_channels).init(device),
            activation: Relu::new(),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct Conv1dResidual<B: Backend> {
    pub conv1: Conv1d<B>,
    pub conv2: Conv1d<B>,
    pub norm: BatchNorm<B, 1>,
    pub activation: Relu,
    pub dropout: Dropout,
}

impl<B: Backend> Conv1dResidual<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let residual = x.clone();
        let x = self.conv1.forward(x);
        let mut x = self.conv2.forward(x);

        if residual.dims() == x.dims() {
            x = x + residual;
        }

        let x = self.norm.forward(x);
        let x = self.activation.forward(x);
        self.dropout.forward(x)
    }
}

// ─── GaussianNoise ────────────────────────────────────────────────────────────

#[derive(Module, Clone, Debug)]
pub struct GaussianNoise {
    pub std: f64,
    /// Scale the noise by the batch's global value range (max - min)
    pub minmax: bool,
}

impl GaussianNoise {
    pub fn new(std: f64, minmax: bool) -> Self {
        Self { std, minmax }
    }

    pub fn forward<B: Backend>(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        if !B::ad_enabled() || self.std == 0.0 {
            return x;
        }

        let noise = Tensor::<B, 3>::random(x.shape(), Distribution::Normal(0.0, 1.0), &x.device())
            * self.std;

        let noise = if self.minmax {
            let range = (x.clone().max() - x.clone().min()).reshape([1, 1, 1]);
            noise * range
        } else {
            noise
        };

        x + noise
    }
}

/// Append `noise_dim` standard-normal columns along the last axis.
/// Applied in both modes; a no-op when `noise_dim` is 0.
pub fn append_noise_columns<B: Backend>(x: Tensor<B, 3>, noise_dim: usize) -> Tensor<B, 3> {
    if noise_dim == 0 {
        return x;
    }
    let [batch, channels, _] = x.dims();
    let noise = Tensor::<B, 3>::random(
        [batch, channels, noise_dim],
        Distribution::Normal(0.0, 1.0),
        &x.device(),
    );
    Tensor::cat(vec![x, noise], 2)
}

/// Global max-pool over the length axis: `[b, c, l]` → `[b, c]`.
pub fn max_over_length<B: Backend>(x: Tensor<B, 3>) -> Tensor<B, 2> {
    let [batch, channels, _] = x.dims();
    x.max_dim(2).reshape([batch, channels])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = NdArray<f32>;
    type TrainBackend = Autodiff<NdArray<f32>>;

    fn ramp<B: Backend>(dims: [usize; 3], device: &B::Device) -> Tensor<B, 3> {
        let n = dims.iter().product::<usize>();
        let values: Vec<f32> = (0..n).map(|i| i as f32 / n as f32).collect();
        Tensor::<B, 1>::from_floats(values.as_slice(), device).reshape(dims)
    }

    #[test]
    fn test_same_block_keeps_length() {
        let device = Default::default();
        let block = Conv1dBlockConfig::same(13, 8).init::<TestBackend>(&device);
        let out = block.forward(ramp::<TestBackend>([2, 13, 20], &device));
        assert_eq!(out.dims(), [2, 8, 20]);
    }

    #[test]
    fn test_block_bias_starts_at_zero() {
        let device = Default::default();
        let block = Conv1dBlockConfig::same(4, 6).init::<TestBackend>(&device);
        let bias = block.conv.bias.as_ref().unwrap().val();
        let values = bias.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_block_output_is_non_negative() {
        let device = Default::default();
        let block = Conv1dBlockConfig::same(3, 5).init::<TestBackend>(&device);
        let out = block.forward(ramp::<TestBackend>([2, 3, 10], &device));
        let values = out.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_layers_stack_channels() {
        let device = Default::default();
        let layers = Conv1dLayersConfig::new(3, 13, 16).init::<TestBackend>(&device);
        assert_eq!(layers.blocks.len(), 3);
        let out = layers.forward(ramp::<TestBackend>([1, 13, 12], &device));
        assert_eq!(out.dims(), [1, 16, 12]);
    }

    #[test]
    fn test_residual_skipped_when_length_changes() {
        // k=1,p=1 then k=16,p=1: length goes L → L+2 → L-11
        let device = Default::default();
        let block = Conv1dResidualConfig::new(8, 8).init::<TestBackend>(&device);
        let out = block.forward(ramp::<TestBackend>([2, 8, 40], &device));
        assert_eq!(out.dims(), [2, 8, 29]);
    }

    #[test]
    fn test_residual_added_when_shapes_match() {
        let device = Default::default();
        // k=1,p=1 then k=5,p=1: L → L+2 → L
        let mut block = Conv1dResidualConfig::new(4, 4)
            .with_second_kernel(5)
            .init::<TestBackend>(&device);

        // Silence the conv path: whatever comes out is the skip alone,
        // through an untrained BatchNorm (identity) and ReLU.
        let weight_dims = block.conv2.weight.val().dims();
        block.conv2.weight = Param::from_tensor(Tensor::zeros(weight_dims, &device));
        block.conv2.bias = Some(Param::from_tensor(Tensor::zeros([4], &device)));

        let x = ramp::<TestBackend>([1, 4, 10], &device);
        let out = block.forward(x.clone());
        assert_eq!(out.dims(), [1, 4, 10]);
        out.into_data().assert_approx_eq(&x.into_data(), 3);
    }

    #[test]
    fn test_block_weight_follows_fan_out_rule() {
        let device = Default::default();
        let block = Conv1dBlockConfig::same(32, 32).init::<TestBackend>(&device);

        // the weight is drawn lazily; the first forward must not panic
        let out = block.forward(ramp::<TestBackend>([2, 32, 8], &device));
        assert_eq!(out.dims(), [2, 32, 8]);

        let weights = block.conv.weight.val().into_data().to_vec::<f32>().unwrap();
        let n = weights.len() as f64;
        let mean = weights.iter().map(|&w| w as f64).sum::<f64>() / n;
        let var = weights.iter().map(|&w| (w as f64 - mean).powi(2)).sum::<f64>() / n;
        let expected = (2.0f64 / (32.0 * 3.0)).sqrt();
        assert!(
            (var.sqrt() - expected).abs() < 0.1 * expected,
            "std {} vs {expected}",
            var.sqrt()
        );
    }

    #[test]
    fn test_block_norm_starts_as_identity() {
        let device = Default::default();
        let block = Conv1dBlockConfig::same(4, 6).init::<TestBackend>(&device);
        let gamma = block.norm.gamma.val().into_data().to_vec::<f32>().unwrap();
        let beta = block.norm.beta.val().into_data().to_vec::<f32>().unwrap();
        assert!(gamma.iter().all(|&g| g == 1.0));
        assert!(beta.iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_noise_inactive_in_eval_mode() {
        let device = Default::default();
        let noise = GaussianNoise::new(0.5, false);
        let x = ramp::<TestBackend>([2, 3, 4], &device);
        let out = noise.forward(x.clone());
        out.into_data().assert_eq(&x.into_data(), true);
    }

    #[test]
    fn test_noise_active_in_training_mode() {
        let device = Default::default();
        let noise = GaussianNoise::new(0.5, true);
        let x = ramp::<TrainBackend>([2, 3, 4], &device);
        let out = noise.forward(x.clone());
        let before = x.into_data().to_vec::<f32>().unwrap();
        let after = out.into_data().to_vec::<f32>().unwrap();
        assert!(before.iter().zip(&after).any(|(a, b)| a != b));
    }

    #[test]
    fn test_append_noise_columns() {
        let device = Default::default();
        let x = ramp::<TestBackend>([2, 13, 10], &device);
        assert_eq!(append_noise_columns(x.clone(), 0).dims(), [2, 13, 10]);
        assert_eq!(append_noise_columns(x, 6).dims(), [2, 13, 16]);
    }

    #[test]
    fn test_max_over_length() {
        let device = Default::default();
        let x = ramp::<TestBackend>([1, 2, 3], &device);
        let out = max_over_length(x).into_data().to_vec::<f32>().unwrap();
        // values are i/6 for i in 0..6; rows end at 2/6 and 5/6
        assert!((out[0] - 2.0 / 6.0).abs() < 1e-6);
        assert!((out[1] - 5.0 / 6.0).abs() < 1e-6);
    }
}
