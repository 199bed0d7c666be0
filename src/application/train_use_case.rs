// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load customer sequences     (Layer 4 - data)
//   Step 2: Match hparams to the data   (Layer 5 - ml)
//   Step 3: Split train/validation      (Layer 4 - data)
//   Step 4: Build datasets              (Layer 4 - data)
//   Step 5: Save config                 (Layer 6 - infra)
//   Step 6: Run training loop           (Layer 5 - ml)

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::TabularDataset,
    loader::CsvSequenceLoader,
    splitter::split_train_val,
    synthetic::SyntheticSource,
};
use crate::domain::sequence::CustomerSequence;
use crate::domain::traits::SequenceSource;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::backend::BackendKind;
use crate::ml::classifier::ModelKind;
use crate::ml::hparams::HParams;
use crate::ml::registry::ModelSpec;
use crate::ml::trainer::{run_training, TrainReport};

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything a training run needs. Saved as train_config.json
// beside the checkpoints; prediction reads `model` back from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Statement CSV; ignored when `synthetic` is set
    pub data_path:      Option<String>,
    /// Number of random customers to generate instead of reading a file
    pub synthetic:      Option<usize>,
    pub id_column:      String,
    pub target_column:  String,
    pub checkpoint_dir: String,
    pub model:          ModelSpec,
    pub epochs:         usize,
    pub batch_size:     usize,
    pub lr:             f64,
    pub seed:           u64,
    pub train_fraction: f64,
    pub backend:        BackendKind,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_path:      None,
            synthetic:      Some(512),
            id_column:      "customer_ID".to_string(),
            target_column:  "target".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            model:          ModelSpec::new(ModelKind::FatConv1d, HParams::new()),
            epochs:         10,
            batch_size:     64,
            lr:             1e-3,
            seed:           42,
            train_fraction: 0.8,
            backend:        BackendKind::Wgpu,
        }
    }
}

impl TrainConfig {
    /// The sequence source this run reads from.
    pub fn source(&self) -> Result<Box<dyn SequenceSource>> {
        let h = &self.model.hparams;
        match (&self.data_path, self.synthetic) {
            (_, Some(n)) => Ok(Box::new(SyntheticSource::new(
                n,
                h.time_steps,
                h.num_features,
                self.seed,
            ))),
            (Some(path), None) => Ok(Box::new(
                CsvSequenceLoader::new(path)
                    .with_id_column(&self.id_column)
                    .with_target_column(&self.target_column),
            )),
            (None, None) => bail!("Either a data file or a synthetic sample count is required"),
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&mut self) -> Result<TrainReport> {
        // ── Step 1: Load customers ────────────────────────────────────────────
        let sequences = self.config.source()?.load_all()?;
        if sequences.is_empty() {
            bail!("The data source produced no customers");
        }
        let unlabelled = sequences.iter().filter(|s| s.target.is_none()).count();
        if unlabelled > 0 {
            tracing::warn!("{} customers have no target and count as non-default", unlabelled);
        }

        // ── Step 2: Feature count follows the data ────────────────────────────
        adapt_to_data(&mut self.config.model.hparams, &sequences);
        self.config.model.validate()?;

        let cfg = &self.config;
        let h   = &cfg.model.hparams;

        // ── Step 3: Train / validation split ──────────────────────────────────
        let (train_seqs, val_seqs) = split_train_val(sequences, cfg.train_fraction, cfg.seed);
        tracing::info!("Split: {} train, {} validation", train_seqs.len(), val_seqs.len());

        // ── Step 4: Build Burn datasets ───────────────────────────────────────
        let train_dataset = TabularDataset::from_sequences(&train_seqs, h.time_steps, h.num_features);
        let val_dataset   = TabularDataset::from_sequences(&val_seqs, h.time_steps, h.num_features);
        tracing::info!(
            "Defaults: {} of {} training customers",
            train_dataset.positive_count(),
            train_seqs.len()
        );
        tracing::debug!("Missing cells: {:.1}%", 100.0 * train_dataset.missing_fraction());

        // ── Step 5: Save config for prediction ────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)
            .with_context(|| format!("Cannot create '{}'", cfg.checkpoint_dir))?;
        ckpt_manager.save_config(cfg)?;

        // ── Step 6: Run training loop (Layer 5) ───────────────────────────────
        run_training(cfg, train_dataset, val_dataset, &ckpt_manager)
    }
}

/// Set `num_features` to the widest statement seen in the data.
fn adapt_to_data(hparams: &mut HParams, sequences: &[CustomerSequence]) {
    let detected = sequences
        .iter()
        .map(CustomerSequence::num_features)
        .max()
        .unwrap_or(0);
    if detected > 0 && detected != hparams.num_features {
        tracing::warn!(
            "Data has {} features per statement, hparams say {}; using {}",
            detected,
            hparams.num_features,
            detected
        );
        hparams.num_features = detected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;

    #[test]
    fn test_source_requires_data() {
        let cfg = TrainConfig { synthetic: None, data_path: None, ..TrainConfig::default() };
        assert!(cfg.source().is_err());
    }

    #[test]
    fn test_adapt_to_data_uses_widest_statement() {
        let mut h = HParams::new();
        let seqs = vec![
            CustomerSequence::new("a", vec![vec![0.0; 5]], None),
            CustomerSequence::new("b", vec![vec![0.0; 7], vec![0.0; 3]], None),
        ];
        adapt_to_data(&mut h, &seqs);
        assert_eq!(h.num_features, 7);
    }

    #[test]
    fn test_config_json_round_trip() {
        let cfg = TrainConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: TrainConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.model.kind, ModelKind::FatConv1d);
        assert_eq!(back.backend, BackendKind::Wgpu);
        assert_eq!(back.synthetic, Some(512));
    }

    #[test]
    fn test_execute_on_csv() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("train.csv");
        let mut text = String::from("customer_ID,f1,f2,f3,target\n");
        for i in 0..12 {
            let label = i % 2;
            for t in 0..2 {
                text.push_str(&format!("c{i},{},{},,{label}\n", i + t, label as f32 - 0.5));
            }
        }
        std::fs::write(&csv, text).unwrap();

        let hparams = HParams::new()
            .with_hidden_dim(8)
            .with_num_layers(2)
            .with_time_steps(3);
        let cfg = TrainConfig {
            data_path:      Some(csv.display().to_string()),
            synthetic:      None,
            checkpoint_dir: dir.path().join("ckpt").display().to_string(),
            model:          ModelSpec::new(ModelKind::FatConv1d, hparams),
            epochs:         1,
            batch_size:     4,
            backend:        BackendKind::Ndarray,
            ..TrainConfig::default()
        };

        let mut use_case = TrainUseCase::new(cfg);
        let report = use_case.execute().unwrap();
        assert_eq!(report.epochs.len(), 1);
        assert_eq!(use_case.config().model.hparams.num_features, 3);

        let saved: TrainConfig = CheckpointManager::open(dir.path().join("ckpt"))
            .unwrap()
            .load_config()
            .unwrap();
        assert_eq!(saved.model.hparams.num_features, 3);
    }

    #[test]
    fn test_narrow_csv_rejected_before_training() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("narrow.csv");
        let header: Vec<String> = (0..20).map(|i| format!("f{i}")).collect();
        let mut text = format!("customer_ID,{},target\n", header.join(","));
        for i in 0..6 {
            let row = vec!["0.5"; 20].join(",");
            text.push_str(&format!("c{i},{row},{}\n", i % 2));
        }
        std::fs::write(&csv, text).unwrap();

        let cfg = TrainConfig {
            data_path:      Some(csv.display().to_string()),
            synthetic:      None,
            checkpoint_dir: dir.path().join("ckpt").display().to_string(),
            model:          ModelSpec::new(ModelKind::Res1d, HParams::new().with_time_steps(3)),
            epochs:         1,
            batch_size:     4,
            backend:        BackendKind::Ndarray,
            ..TrainConfig::default()
        };

        let err = TrainUseCase::new(cfg).execute().unwrap_err();
        let shape = err.downcast_ref::<ModelError>();
        assert!(matches!(shape, Some(ModelError::ShapeMismatch { .. })), "{err:#}");
        assert!(!dir.path().join("ckpt").join("train_config.json").exists());
    }
}
