// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// Scores every customer of a statement CSV with the latest
// checkpoint and writes one row per customer:
//
//   customer_id,prediction
//   a1,0.031877
//   b7,0.912004

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;
use crate::data::loader::CsvSequenceLoader;
use crate::domain::traits::{DefaultScorer, SequenceSource};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::backend::{BackendKind, CpuBackend, GpuBackend};
use crate::ml::inferencer::Inferencer;

#[derive(Debug, Clone)]
pub struct PredictConfig {
    pub data_path:      PathBuf,
    pub checkpoint_dir: PathBuf,
    pub output_path:    PathBuf,
    pub id_column:      String,
    /// Overrides the backend the model was trained on
    pub backend:        Option<BackendKind>,
    pub batch_size:     usize,
}

pub struct PredictUseCase {
    config: PredictConfig,
}

impl PredictUseCase {
    pub fn new(config: PredictConfig) -> Self {
        Self { config }
    }

    /// Returns the number of customers written.
    pub fn execute(&self) -> Result<usize> {
        let cfg  = &self.config;
        let ckpt = CheckpointManager::open(&cfg.checkpoint_dir)
            .with_context(|| format!("No checkpoints in '{}'", cfg.checkpoint_dir.display()))?;
        let run: TrainConfig = ckpt.load_config()?;

        // ── Load customers ────────────────────────────────────────────────────
        let sequences = CsvSequenceLoader::new(&cfg.data_path)
            .with_id_column(&cfg.id_column)
            .with_target_column(&run.target_column)
            .load_all()?;

        // ── Score on the chosen backend ───────────────────────────────────────
        let backend = cfg.backend.unwrap_or(run.backend);
        tracing::info!("Scoring {} customers on {}", sequences.len(), backend);
        let scores = match backend {
            BackendKind::Wgpu => {
                let device = BackendKind::gpu_device();
                Inferencer::<GpuBackend>::from_checkpoint(&ckpt, &device)?
                    .with_chunk_size(cfg.batch_size)
                    .score(&sequences)?
            }
            BackendKind::Ndarray => {
                let device = BackendKind::cpu_device();
                Inferencer::<CpuBackend>::from_checkpoint(&ckpt, &device)?
                    .with_chunk_size(cfg.batch_size)
                    .score(&sequences)?
            }
        };

        // ── Write predictions ─────────────────────────────────────────────────
        let mut writer = csv::Writer::from_path(&cfg.output_path)
            .with_context(|| format!("Cannot create '{}'", cfg.output_path.display()))?;
        writer.write_record(["customer_id", "prediction"])?;
        for (seq, score) in sequences.iter().zip(&scores) {
            let score = format!("{score:.6}");
            writer.write_record([seq.customer_id.as_str(), score.as_str()])?;
        }
        writer.flush()?;

        tracing::info!("Wrote {} predictions to '{}'", scores.len(), cfg.output_path.display());
        Ok(scores.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainUseCase;
    use crate::ml::classifier::ModelKind;
    use crate::ml::hparams::HParams;
    use crate::ml::registry::ModelSpec;

    #[test]
    fn test_train_then_predict() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = dir.path().join("ckpt");

        let hparams = HParams::new()
            .with_hidden_dim(8)
            .with_num_layers(2)
            .with_time_steps(3)
            .with_num_features(4);
        let train = TrainConfig {
            synthetic:      Some(20),
            checkpoint_dir: ckpt.display().to_string(),
            model:          ModelSpec::new(ModelKind::FitConv1d, hparams),
            epochs:         1,
            batch_size:     8,
            backend:        BackendKind::Ndarray,
            ..TrainConfig::default()
        };
        TrainUseCase::new(train).execute().unwrap();

        let input = dir.path().join("test.csv");
        std::fs::write(
            &input,
            "customer_ID,a,b,c,d\nx,1,2,3,4\nx,1,,3,4\ny,0,0,0,0\nz,,,,\n",
        )
        .unwrap();

        let output = dir.path().join("pred.csv");
        let written = PredictUseCase::new(PredictConfig {
            data_path:      input,
            checkpoint_dir: ckpt,
            output_path:    output.clone(),
            id_column:      "customer_ID".to_string(),
            backend:        None,
            batch_size:     2,
        })
        .execute()
        .unwrap();
        assert_eq!(written, 3);

        let text  = std::fs::read_to_string(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "customer_id,prediction");
        assert!(lines[1].starts_with("x,"));
        assert!(lines[3].starts_with("z,"));
        let p: f32 = lines[2].split(',').nth(1).unwrap().parse().unwrap();
        assert!((0.0..=1.0).contains(&p));
    }
}
