// ============================================================
// Layer 4 — Tabular Batcher
// ============================================================
// Stacks TabularSamples into the tensors the classifiers take.
//
//   Input:  N samples, each a flat T*F block
//   Output: inputs  [N, T, F]   (NaN kept, models handle it)
//           targets [N]          (0 / 1 as Int)
//
// Every sample is already padded to T*F by the dataset, so
// batching is a flatten followed by a reshape. Models without
// a missing-value embedding get NaN replaced by `nan_fill`.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::TabularSample;

#[derive(Debug, Clone)]
pub struct TabularBatch<B: Backend> {
    /// Statement blocks, shape [batch_size, T, F]
    pub inputs: Tensor<B, 3>,

    /// Binary labels, shape [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct TabularBatcher<B: Backend> {
    pub device:       B::Device,
    pub time_steps:   usize,
    pub num_features: usize,
    pub nan_fill:     Option<f32>,
}

impl<B: Backend> TabularBatcher<B> {
    pub fn new(device: B::Device, time_steps: usize, num_features: usize) -> Self {
        Self { device, time_steps, num_features, nan_fill: None }
    }

    pub fn with_nan_fill(mut self, value: Option<f32>) -> Self {
        self.nan_fill = value;
        self
    }
}

impl<B: Backend> Batcher<TabularSample, TabularBatch<B>> for TabularBatcher<B> {
    fn batch(&self, items: Vec<TabularSample>) -> TabularBatch<B> {
        let batch_size = items.len();

        // ── Flatten features ──────────────────────────────────────────────────
        let flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.features.iter().copied())
            .map(|v| match self.nan_fill {
                Some(fill) if v.is_nan() => fill,
                _ => v,
            })
            .collect();

        let labels: Vec<i32> = items
            .iter()
            .map(|s| if s.label >= 0.5 { 1 } else { 0 })
            .collect();

        // ── Create tensors ────────────────────────────────────────────────────
        let inputs = Tensor::<B, 1>::from_floats(flat.as_slice(), &self.device)
            .reshape([batch_size, self.time_steps, self.num_features]);

        let targets = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        TabularBatch { inputs, targets }
    }
}
