// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Rebuilds the trained classifier from train_config.json, loads
// the latest checkpoint into it on the inner (non-autodiff)
// backend and scores customers in fixed-size chunks. Output
// order always matches input order.

use anyhow::{Context, Result};
use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::TabularBatcher, dataset::TabularSample};
use crate::domain::sequence::CustomerSequence;
use crate::domain::traits::DefaultScorer;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::classifier::{positive_scores, SequenceClassifier};
use crate::ml::registry::{with_classifier, ModelSpec};

const DEFAULT_CHUNK: usize = 256;

pub struct Inferencer<B: Backend> {
    model:      Box<dyn SequenceClassifier<B>>,
    spec:       ModelSpec,
    batcher:    TabularBatcher<B>,
    chunk_size: usize,
}

impl<B: Backend> Inferencer<B> {
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager, device: &B::Device) -> Result<Self> {
        let cfg: TrainConfig = ckpt_manager
            .load_config()
            .context("Cannot read the run config. Have you run 'train' first?")?;
        let spec = cfg.model;
        spec.validate()?;

        let model: Box<dyn SequenceClassifier<B>> = with_classifier!(B, &spec, device, |model| {
            let loaded = ckpt_manager
                .load_model(model, device)
                .context("Cannot load model weights")?;
            Box::new(loaded) as Box<dyn SequenceClassifier<B>>
        });
        tracing::info!("Model loaded from checkpoint: {}", spec.kind);

        let batcher = TabularBatcher::new(
            device.clone(),
            spec.hparams.time_steps,
            spec.hparams.num_features,
        )
        .with_nan_fill(spec.nan_fill());

        Ok(Self { model, spec, batcher, chunk_size: DEFAULT_CHUNK })
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    fn score_chunk(&self, chunk: &[CustomerSequence]) -> Result<Vec<f32>> {
        let h = &self.spec.hparams;
        let items: Vec<TabularSample> = chunk
            .iter()
            .map(|s| TabularSample::from_sequence(s, h.time_steps, h.num_features))
            .collect();

        let batch = self.batcher.batch(items);
        let probs = self.model.probabilities(batch.inputs);
        positive_scores(probs)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Cannot read scores: {e:?}"))
    }
}

impl<B: Backend> DefaultScorer for Inferencer<B> {
    fn score(&self, sequences: &[CustomerSequence]) -> Result<Vec<f32>> {
        let mut scores = Vec::with_capacity(sequences.len());
        for chunk in sequences.chunks(self.chunk_size) {
            scores.extend(self.score_chunk(chunk)?);
        }
        tracing::debug!("Scored {} customers", scores.len());
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::backend::BackendKind;
    use crate::ml::classifier::ModelKind;
    use crate::ml::conv1d::FatConv1dClassifierConfig;
    use crate::ml::hparams::HParams;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn saved_run(dir: &std::path::Path) -> CheckpointManager {
        let hparams = HParams::new()
            .with_hidden_dim(8)
            .with_num_layers(2)
            .with_time_steps(3)
            .with_num_features(4);
        let cfg = TrainConfig {
            checkpoint_dir: dir.display().to_string(),
            model:          ModelSpec::new(ModelKind::FatConv1d, hparams.clone()),
            backend:        BackendKind::Ndarray,
            ..TrainConfig::default()
        };
        let ckpt = CheckpointManager::new(dir).unwrap();
        ckpt.save_config(&cfg).unwrap();

        let device = Default::default();
        let model = FatConv1dClassifierConfig::from_hparams(&hparams).init::<TestBackend>(&device);
        ckpt.save_model(&model, 1).unwrap();
        ckpt
    }

    fn customers(n: usize) -> Vec<CustomerSequence> {
        (0..n)
            .map(|i| {
                let row = vec![i as f32 / n as f32, f32::NAN, 0.5, -0.5];
                CustomerSequence::new(format!("c{i}"), vec![row; 1 + i % 3], None)
            })
            .collect()
    }

    #[test]
    fn test_scores_every_customer_in_range() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = saved_run(dir.path());
        let inferencer = Inferencer::<TestBackend>::from_checkpoint(&ckpt, &Default::default())
            .unwrap()
            .with_chunk_size(4);

        let scores = inferencer.score(&customers(10)).unwrap();
        assert_eq!(scores.len(), 10);
        assert!(scores.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_chunking_does_not_change_scores() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = saved_run(dir.path());
        let device = Default::default();
        let small = Inferencer::<TestBackend>::from_checkpoint(&ckpt, &device)
            .unwrap()
            .with_chunk_size(3);
        let whole = Inferencer::<TestBackend>::from_checkpoint(&ckpt, &device).unwrap();

        let seqs = customers(7);
        let a = small.score(&seqs).unwrap();
        let b = whole.score(&seqs).unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-5);
        }
    }

    #[test]
    fn test_missing_run_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let result = Inferencer::<TestBackend>::from_checkpoint(&ckpt, &Default::default());
        assert!(result.is_err());
    }
}
