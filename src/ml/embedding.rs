// ============================================================
// Layer 5 — Tabular Embedding
// ============================================================
// Projects every raw feature value into its own E-dimensional
// vector:  e[b, t, f, :] = x[b, t, f] * w[f, :] + c[f, :]
//
// Missing values (NaN) take a learned per-feature vector m[f, :]
// instead, so the convolution stack never sees a NaN.
//
//   input   [batch, T, F]
//   output  [batch, T, F * E]

use burn::{
    module::Param,
    nn::{Embedding, EmbeddingConfig, Initializer},
    prelude::*,
};

#[derive(Config, Debug)]
pub struct TabularEmbeddingConfig {
    pub num_features: usize,
    pub embed_dim: usize,
    #[config(default = "Initializer::Normal { mean: 0.0, std: 1.0 }")]
    pub initializer: Initializer,
}

impl TabularEmbeddingConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TabularEmbedding<B> {
        let shape = [self.num_features, self.embed_dim];
        TabularEmbedding {
            weight: self.initializer.init(shape, device),
            bias: Initializer::Zeros.init(shape, device),
            missing: self.initializer.init(shape, device),
            num_features: self.num_features,
            embed_dim: self.embed_dim,
        }
    }
}

#[derive(Module, Debug)]
pub struct TabularEmbedding<B: Backend> {
    /// Per-feature scale vectors `[F, E]`
    pub weight: Param<Tensor<B, 2>>,
    /// Per-feature offset vectors `[F, E]`
    pub bias: Param<Tensor<B, 2>>,
    /// Per-feature vectors used for NaN inputs `[F, E]`
    pub missing: Param<Tensor<B, 2>>,
    pub num_features: usize,
    pub embed_dim: usize,
}

impl<B: Backend> TabularEmbedding<B> {
    pub fn output_dim(&self) -> usize {
        self.num_features * self.embed_dim
    }

    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, steps, features] = x.dims();
        let nan_mask = x.clone().is_nan();
        let present = x.mask_fill(nan_mask.clone(), 0.0).unsqueeze_dim::<4>(3);
        let missing = nan_mask.float().unsqueeze_dim::<4>(3);

        let weight = self.weight.val().unsqueeze::<4>();
        let bias = self.bias.val().unsqueeze::<4>();
        let nan_vec = self.missing.val().unsqueeze::<4>();

        // [b, t, f, 1] against [1, 1, f, e]
        let value = present * weight + bias;
        let embedded = value * (missing.clone().neg() + 1.0) + nan_vec * missing;

        embedded.reshape([batch, steps, features * self.embed_dim])
    }
}

/// Learned statement-position embedding `Embedding(T, D)` for positions `0..T`.
#[derive(Config, Debug)]
pub struct TimeEmbeddingConfig {
    pub time_steps: usize,
    pub dim: usize,
}

impl TimeEmbeddingConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TimeEmbedding<B> {
        TimeEmbedding {
            embedding: EmbeddingConfig::new(self.time_steps, self.dim).init(device),
            time_steps: self.time_steps,
        }
    }
}

#[derive(Module, Debug)]
pub struct TimeEmbedding<B: Backend> {
    pub embedding: Embedding<B>,
    pub time_steps: usize,
}

impl<B: Backend> TimeEmbedding<B> {
    /// Adds the position vectors to `x : [batch, T, D]`.
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, steps, dim] = x.dims();
        let positions = Tensor::<B, 1, Int>::arange(0..self.time_steps as i64, &x.device())
            .unsqueeze::<2>();
        let time = self.embedding.forward(positions).expand([batch, steps, dim]);
        x + time
    }
}
