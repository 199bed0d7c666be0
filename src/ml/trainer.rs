// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Full train + validation loop using Burn's DataLoader and Adam.
//
//   - Training runs on B (an AutodiffBackend), so dropout, batch
//     statistics, Gaussian noise and NaN masking are all active
//   - model.valid() returns the same weights on B::InnerBackend,
//     where all of those are switched off
//   - The validation batcher must use B::InnerBackend as well
//
// Every epoch writes one metrics row and one checkpoint.

use anyhow::{bail, Context, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::TabularBatcher, dataset::TabularDataset};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{amex_metric, EpochMetrics, MetricsLogger};
use crate::ml::backend::{BackendKind, CpuTrainBackend, GpuTrainBackend};
use crate::ml::classifier::{activate, positive_scores, predicted_labels, SequenceClassifier};
use crate::ml::registry::with_classifier;

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub epochs: Vec<EpochMetrics>,
    /// Epoch with the lowest validation loss (0 when nothing was validated)
    pub best_epoch: usize,
}

pub fn run_training(
    cfg:           &TrainConfig,
    train_dataset: TabularDataset,
    val_dataset:   TabularDataset,
    ckpt_manager:  &CheckpointManager,
) -> Result<TrainReport> {
    match cfg.backend {
        BackendKind::Wgpu => {
            let device = BackendKind::gpu_device();
            tracing::info!("Using WGPU device: {:?}", device);
            train_on::<GpuTrainBackend>(cfg, train_dataset, val_dataset, ckpt_manager, &device)
        }
        BackendKind::Ndarray => {
            let device = BackendKind::cpu_device();
            tracing::info!("Using NdArray device: {:?}", device);
            train_on::<CpuTrainBackend>(cfg, train_dataset, val_dataset, ckpt_manager, &device)
        }
    }
}

/// Build the configured classifier on `B` and train it.
pub fn train_on<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    train_dataset: TabularDataset,
    val_dataset:   TabularDataset,
    ckpt_manager:  &CheckpointManager,
    device:        &B::Device,
) -> Result<TrainReport> {
    use burn::data::dataset::Dataset;

    if train_dataset.is_empty() {
        bail!("No training samples; nothing to train on");
    }
    cfg.model.validate()?;
    B::seed(cfg.seed);

    with_classifier!(B, &cfg.model, device, |model| {
        tracing::info!(
            "Model ready: {} ({} parameters, {} classes)",
            cfg.model.kind,
            model.num_params(),
            cfg.model.num_classes
        );
        train_loop::<B, _>(cfg, model, train_dataset, val_dataset, ckpt_manager, device)
    })
}

fn train_loop<B, M>(
    cfg:           &TrainConfig,
    mut model:     M,
    train_dataset: TabularDataset,
    val_dataset:   TabularDataset,
    ckpt_manager:  &CheckpointManager,
    device:        &B::Device,
) -> Result<TrainReport>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + SequenceClassifier<B>,
    M::InnerModule: SequenceClassifier<B::InnerBackend>,
{
    let hparams = &cfg.model.hparams;
    let logger  = MetricsLogger::new(ckpt_manager.dir())?;

    // ── Adam optimiser ────────────────────────────────────────────────────────
    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_batcher = TabularBatcher::<B>::new(device.clone(), hparams.time_steps, hparams.num_features)
        .with_nan_fill(cfg.model.nan_fill());
    let train_loader  = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train_dataset);

    // ── Validation data loader (InnerBackend, no autodiff) ──────────
    let val_batcher = TabularBatcher::<B::InnerBackend>::new(device.clone(), hparams.time_steps, hparams.num_features)
        .with_nan_fill(cfg.model.nan_fill());
    let val_loader  = DataLoaderBuilder::new(val_batcher)
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val_dataset);

    let mut history       = Vec::with_capacity(cfg.epochs);
    let mut best_val_loss = f64::INFINITY;
    let mut best_epoch    = 0;

    for epoch in 1..=cfg.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for batch in train_loader.iter() {
            let (loss, _) = model.forward_loss(batch.inputs, batch.targets);

            train_loss_sum += loss.clone().into_scalar().elem::<f64>();
            train_batches  += 1;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let avg_train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();

        let mut val_loss_sum  = 0.0f64;
        let mut val_batches   = 0usize;
        let mut correct       = 0usize;
        let mut y_true        = Vec::new();
        let mut y_score       = Vec::new();

        for batch in val_loader.iter() {
            let (loss, logits) = model_valid.forward_loss(batch.inputs, batch.targets.clone());
            val_loss_sum += loss.into_scalar().elem::<f64>();
            val_batches  += 1;

            let probs = activate(logits, model_valid.num_classes());
            let hits: i64 = predicted_labels(probs.clone())
                .equal(batch.targets.clone())
                .int().sum().into_scalar().elem::<i64>();
            correct += hits as usize;

            y_score.extend(to_f32(positive_scores(probs).into_data())?);
            y_true.extend(to_f32(batch.targets.float().into_data())?);
        }

        let avg_val_loss = if val_batches > 0 { val_loss_sum / val_batches as f64 } else { f64::NAN };
        let accuracy     = if y_true.is_empty() { 0.0 } else { correct as f64 / y_true.len() as f64 };
        let amex         = amex_metric(&y_true, &y_score);

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | acc={:.1}% | amex={:.4}",
            epoch, cfg.epochs, avg_train_loss, avg_val_loss, accuracy * 100.0, amex,
        );

        let metrics = EpochMetrics::new(epoch, avg_train_loss, avg_val_loss, accuracy, amex);
        if metrics.is_improvement(best_val_loss) {
            best_val_loss = metrics.val_loss;
            best_epoch    = epoch;
        }
        logger.log(&metrics)?;

        ckpt_manager
            .save_model(&model, epoch)
            .with_context(|| format!("Saving checkpoint for epoch {epoch}"))?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);

        history.push(metrics);
    }

    tracing::info!("Training complete! Best validation loss at epoch {}", best_epoch);
    Ok(TrainReport { epochs: history, best_epoch })
}

fn to_f32(data: TensorData) -> Result<Vec<f32>> {
    data.convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("Cannot read tensor values: {e:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::SyntheticSource;
    use crate::domain::traits::SequenceSource;
    use crate::ml::backend::BackendKind;
    use crate::ml::classifier::ModelKind;
    use crate::ml::hparams::HParams;
    use crate::ml::registry::ModelSpec;

    fn tiny_config(kind: ModelKind, dir: &std::path::Path) -> TrainConfig {
        let hparams = HParams::new()
            .with_hidden_dim(8)
            .with_num_layers(2)
            .with_time_steps(4)
            .with_num_features(6)
            .with_feature_embed_dim(2);
        TrainConfig {
            checkpoint_dir: dir.display().to_string(),
            model:          ModelSpec::new(kind, hparams),
            epochs:         1,
            batch_size:     8,
            backend:        BackendKind::Ndarray,
            ..TrainConfig::default()
        }
    }

    fn datasets(cfg: &TrainConfig) -> (TabularDataset, TabularDataset) {
        let h    = &cfg.model.hparams;
        let seqs = SyntheticSource::new(24, h.time_steps, h.num_features, 3).load_all().unwrap();
        let (train, val) = seqs.split_at(18);
        (
            TabularDataset::from_sequences(train, h.time_steps, h.num_features),
            TabularDataset::from_sequences(val, h.time_steps, h.num_features),
        )
    }

    #[test]
    fn test_one_epoch_writes_checkpoint_and_metrics() {
        let dir  = tempfile::tempdir().unwrap();
        let cfg  = tiny_config(ModelKind::FatConv1d, dir.path());
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let (train, val) = datasets(&cfg);

        let report = run_training(&cfg, train, val, &ckpt).unwrap();
        assert_eq!(report.epochs.len(), 1);
        assert_eq!(report.best_epoch, 1);

        let m = &report.epochs[0];
        assert!(m.train_loss.is_finite());
        assert!(m.val_loss.is_finite());
        assert!((0.0..=1.0).contains(&m.accuracy));

        assert_eq!(ckpt.latest_epoch().unwrap(), 1);
        let csv = std::fs::read_to_string(dir.path().join("metrics.csv")).unwrap();
        assert_eq!(csv.lines().count(), 2);
    }

    #[test]
    fn test_embedding_model_trains_on_missing_values() {
        let dir  = tempfile::tempdir().unwrap();
        let cfg  = tiny_config(ModelKind::DoubleConv1d, dir.path());
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let (train, val) = datasets(&cfg);

        let report = run_training(&cfg, train, val, &ckpt).unwrap();
        assert!(report.epochs[0].train_loss.is_finite());
    }

    #[test]
    fn test_empty_training_set_is_rejected() {
        let dir  = tempfile::tempdir().unwrap();
        let cfg  = tiny_config(ModelKind::FatConv1d, dir.path());
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let empty = TabularDataset::new(Vec::new());
        let result = run_training(&cfg, empty, TabularDataset::new(Vec::new()), &ckpt);
        assert!(result.is_err());
    }
}
