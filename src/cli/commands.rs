// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the subcommands `train`, `predict` and `summary` and
// their flags. Hyperparameters come from burn Config defaults,
// then an optional `--hparams` JSON file, then individual flags.

use anyhow::{anyhow, Result};
use burn::config::Config;
use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::predict_use_case::PredictConfig;
use crate::application::train_use_case::TrainConfig;
use crate::ml::backend::BackendKind;
use crate::ml::classifier::ModelKind;
use crate::ml::hparams::HParams;
use crate::ml::registry::ModelSpec;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a classifier on statement data and save checkpoints
    Train(TrainArgs),

    /// Score customers with the latest checkpoint
    Predict(PredictArgs),

    /// Print parameter counts of the architectures
    Summary(SummaryArgs),
}

/// Hyperparameter overrides shared by `train` and `summary`.
#[derive(Args, Debug, Default)]
pub struct HParamArgs {
    /// JSON file with hyperparameters (missing fields keep defaults)
    #[arg(long)]
    pub hparams: Option<PathBuf>,

    #[arg(long)]
    pub hidden_dim: Option<usize>,

    #[arg(long)]
    pub num_layers: Option<usize>,

    #[arg(long)]
    pub dropout: Option<f64>,

    /// Standard-normal columns appended to every input
    #[arg(long)]
    pub noise_dim: Option<usize>,

    #[arg(long)]
    pub feature_embed_dim: Option<usize>,

    /// Upper bound of the training-time NaN masking probability
    #[arg(long)]
    pub nan_prob: Option<f64>,

    #[arg(long)]
    pub min_nan_prob: Option<f64>,

    /// Statements kept per customer
    #[arg(long)]
    pub time_steps: Option<usize>,

    /// Features per statement (CSV training detects this from the data)
    #[arg(long)]
    pub num_features: Option<usize>,

    /// Side of the ResNet pseudo-image
    #[arg(long)]
    pub image_side: Option<usize>,
}

impl HParamArgs {
    pub fn resolve(&self) -> Result<HParams> {
        let mut h = match &self.hparams {
            Some(path) => HParams::load(path)
                .map_err(|e| anyhow!("Cannot read hparams '{}': {e:?}", path.display()))?,
            None => HParams::new(),
        };

        if let Some(v) = self.hidden_dim        { h.hidden_dim = v; }
        if let Some(v) = self.num_layers        { h.num_layers = v; }
        if let Some(v) = self.dropout           { h.dropout = v; }
        if let Some(v) = self.noise_dim         { h.noise_dim = v; }
        if let Some(v) = self.feature_embed_dim { h.feature_embed_dim = v; }
        if let Some(v) = self.nan_prob          { h.nan_prob = v; }
        if let Some(v) = self.min_nan_prob      { h.min_nan_prob = v; }
        if let Some(v) = self.time_steps        { h.time_steps = v; }
        if let Some(v) = self.num_features      { h.num_features = v; }
        if let Some(v) = self.image_side        { h.image_side = v; }

        h.validate()?;
        Ok(h)
    }
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Statement CSV (one row per statement)
    #[arg(long, conflicts_with = "synthetic", required_unless_present = "synthetic")]
    pub data: Option<String>,

    /// Train on N random customers instead of a file
    #[arg(long)]
    pub synthetic: Option<usize>,

    #[arg(long, default_value = "customer_ID")]
    pub id_column: String,

    #[arg(long, default_value = "target")]
    pub target_column: String,

    /// Directory to save checkpoints, config and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, value_enum, default_value_t = ModelKind::FatConv1d)]
    pub model: ModelKind,

    /// Output classes (softmax heads default to 2, sigmoid heads to 1)
    #[arg(long)]
    pub num_classes: Option<usize>,

    #[command(flatten)]
    pub hparams: HParamArgs,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Seeds the split, the loader shuffle and the backend RNG
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value_t = 0.8)]
    pub train_fraction: f64,

    #[arg(long, value_enum, default_value_t = BackendKind::Wgpu)]
    pub backend: BackendKind,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// Fails only when the hyperparameters file or values are invalid.
impl TryFrom<TrainArgs> for TrainConfig {
    type Error = anyhow::Error;

    fn try_from(a: TrainArgs) -> Result<Self> {
        let mut model = ModelSpec::new(a.model, a.hparams.resolve()?);
        if let Some(n) = a.num_classes {
            model = model.with_num_classes(n);
        }

        Ok(TrainConfig {
            data_path:      a.data,
            synthetic:      a.synthetic,
            id_column:      a.id_column,
            target_column:  a.target_column,
            checkpoint_dir: a.checkpoint_dir,
            model,
            epochs:         a.epochs,
            batch_size:     a.batch_size,
            lr:             a.lr,
            seed:           a.seed,
            train_fraction: a.train_fraction,
            backend:        a.backend,
        })
    }
}

/// All arguments for the `predict` command
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Statement CSV to score
    #[arg(long)]
    pub data: PathBuf,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Output CSV: customer_id,prediction
    #[arg(long, default_value = "predictions.csv")]
    pub output: PathBuf,

    #[arg(long, default_value = "customer_ID")]
    pub id_column: String,

    /// Backend to score on (defaults to the one used for training)
    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,

    #[arg(long, default_value_t = 256)]
    pub batch_size: usize,
}

impl From<PredictArgs> for PredictConfig {
    fn from(a: PredictArgs) -> Self {
        PredictConfig {
            data_path:      a.data,
            checkpoint_dir: a.checkpoint_dir,
            output_path:    a.output,
            id_column:      a.id_column,
            backend:        a.backend,
            batch_size:     a.batch_size,
        }
    }
}

/// All arguments for the `summary` command
#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// Only this architecture (all of them when omitted)
    #[arg(long, value_enum)]
    pub model: Option<ModelKind>,

    #[command(flatten)]
    pub hparams: HParamArgs,
}
