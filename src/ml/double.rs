// ============================================================
// Layer 5 — Dual-Branch Conv1d Classifier
// ============================================================
// Training mode only: every value is set to NaN with probability
// p, where p ~ U(min_nan_prob, nan_prob) is drawn once per call.
//
//   x [B, T, F] ──► TabularEmbedding + TimeEmbedding ──► e [B, T, F*E]
//        │
//        ├─ branch A over e      (channels T)   → max → [B, 256]
//        └─ branch B over eᵀ     (channels F*E) → max → [B, 256]
//
//   A + B ──► Linear(256, 1) ──► logit (no activation)

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::Distribution,
};
use rand::Rng;

use crate::error;
use crate::ml::classifier::SequenceClassifier;
use crate::ml::conv1d::{build_stages, forward_stages, Conv1dStage};
use crate::ml::embedding::{
    TabularEmbedding, TabularEmbeddingConfig, TimeEmbedding, TimeEmbeddingConfig,
};
use crate::ml::hparams::HParams;
use crate::ml::layers::max_over_length;

#[derive(Config, Debug)]
pub struct DoubleConv1dClassifierConfig {
    #[config(default = 13)]
    pub time_steps: usize,
    #[config(default = 188)]
    pub num_features: usize,
    #[config(default = 4)]
    pub feature_embed_dim: usize,
    #[config(default = 0.2)]
    pub nan_prob: f64,
    #[config(default = 0.0)]
    pub min_nan_prob: f64,
    #[config(default = 0.5)]
    pub dropout: f64,
}

impl DoubleConv1dClassifierConfig {
    pub fn from_hparams(h: &HParams) -> error::Result<Self> {
        h.validate()?;
        Ok(Self::new()
            .with_time_steps(h.time_steps)
            .with_num_features(h.num_features)
            .with_feature_embed_dim(h.feature_embed_dim)
            .with_nan_prob(h.nan_prob)
            .with_min_nan_prob(h.min_nan_prob))
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> DoubleConv1dClassifier<B> {
        let embed_out = self.num_features * self.feature_embed_dim;

        let statement_plan = [
            (self.time_steps, 64, false),
            (64, 128, false),
            (128, 256, true),
            (256, 512, true),
            (512, 1024, true),
            (1024, 512, false),
            (512, 256, false),
        ];
        let feature_plan = [
            (embed_out, 256, false),
            (256, 512, false),
            (512, 1024, true),
            (1024, 512, false),
            (512, 256, false),
        ];

        DoubleConv1dClassifier {
            embedding: TabularEmbeddingConfig::new(self.num_features, self.feature_embed_dim)
                .init(device),
            time_embedding: TimeEmbeddingConfig::new(self.time_steps, embed_out).init(device),
            statement_branch: build_stages(&statement_plan, self.dropout, device),
            feature_branch: build_stages(&feature_plan, self.dropout, device),
            classifier: LinearConfig::new(256, 1).init(device),
            nan_prob: self.nan_prob,
            min_nan_prob: self.min_nan_prob,
        }
    }
}

#[derive(Module, Debug)]
pub struct DoubleConv1dClassifier<B: Backend> {
    pub embedding: TabularEmbedding<B>,
    pub time_embedding: TimeEmbedding<B>,
    pub statement_branch: Vec<Conv1dStage<B>>,
    pub feature_branch: Vec<Conv1dStage<B>>,
    pub classifier: Linear<B>,
    pub nan_prob: f64,
    pub min_nan_prob: f64,
}

impl<B: Backend> DoubleConv1dClassifier<B> {
    /// `[batch, T, F]` (NaN = missing) → logit `[batch, 1]`
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let x = self.mask_random_values(x);

        let x = self.embedding.forward(x);
        let x = self.time_embedding.forward(x);
        let x_t = x.clone().permute([0, 2, 1]);

        let a = max_over_length(forward_stages(&self.statement_branch, x));
        let b = max_over_length(forward_stages(&self.feature_branch, x_t));

        self.classifier.forward(a + b)
    }

    fn mask_random_values(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        if !B::ad_enabled() || self.nan_prob <= 0.0 {
            return x;
        }
        let p = self.min_nan_prob
            + (self.nan_prob - self.min_nan_prob) * rand::thread_rng().gen::<f64>();
        let draw = Tensor::<B, 3>::random(x.shape(), Distribution::Default, &x.device());
        x.mask_fill(draw.lower_elem(p), f32::NAN)
    }
}

impl<B: Backend> SequenceClassifier<B> for DoubleConv1dClassifier<B> {
    fn logits(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        self.forward(x)
    }

    fn num_classes(&self) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = NdArray<f32>;
    type TrainBackend = Autodiff<NdArray<f32>>;

    fn config() -> DoubleConv1dClassifierConfig {
        DoubleConv1dClassifierConfig::new()
            .with_num_features(10)
            .with_feature_embed_dim(2)
    }

    fn with_gaps<B: Backend>(device: &B::Device) -> Tensor<B, 3> {
        let values: Vec<f32> = (0..2 * 13 * 10)
            .map(|i| if i % 7 == 0 { f32::NAN } else { (i % 11) as f32 / 11.0 })
            .collect();
        Tensor::<B, 1>::from_floats(values.as_slice(), device).reshape([2, 13, 10])
    }

    #[test]
    fn test_logit_shape_and_finite_with_nans() {
        let device = Default::default();
        let model = config().init::<TestBackend>(&device);
        let logits = model.forward(with_gaps::<TestBackend>(&device));
        assert_eq!(logits.dims(), [2, 1]);
        let values = logits.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_eval_mode_has_no_masking() {
        let device = Default::default();
        let model = config().with_nan_prob(0.9).init::<TestBackend>(&device);
        let x = with_gaps::<TestBackend>(&device);
        let a = model.forward(x.clone());
        let b = model.forward(x);
        a.into_data().assert_eq(&b.into_data(), true);
    }

    #[test]
    fn test_training_mode_masks_but_stays_finite() {
        let device = Default::default();
        let model = config()
            .with_nan_prob(0.5)
            .with_min_nan_prob(0.5)
            .init::<TrainBackend>(&device);
        let logits = model.forward(with_gaps::<TrainBackend>(&device));
        let values = logits.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_probabilities_use_sigmoid() {
        let device = Default::default();
        let model = config().init::<TestBackend>(&device);
        let probs = model.probabilities(with_gaps::<TestBackend>(&device));
        let values = probs.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_from_hparams_rejects_bad_range() {
        let h = HParams::new().with_nan_prob(0.1).with_min_nan_prob(0.4);
        assert!(DoubleConv1dClassifierConfig::from_hparams(&h).is_err());
    }
}
