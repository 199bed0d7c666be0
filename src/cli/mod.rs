// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// `clap` and hands the work to Layer 2 (application).
//
//   train   : fit a classifier, checkpoint every epoch
//   predict : score a CSV with the latest checkpoint
//   summary : parameter counts per architecture

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PredictArgs, SummaryArgs, TrainArgs};

use crate::application::predict_use_case::PredictUseCase;
use crate::application::train_use_case::{TrainConfig, TrainUseCase};
use crate::ml::backend::{BackendKind, CpuBackend};
use crate::ml::classifier::ModelKind;
use crate::ml::registry::{discriminator_params, num_params, ModelSpec};

#[derive(Parser, Debug)]
#[command(
    name = "amex-nets",
    version,
    about = "Train and run convolutional default-prediction models on statement sequences."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case. Routing only.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Predict(args) => run_predict(args),
            Commands::Summary(args) => run_summary(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    let config = TrainConfig::try_from(args)?;
    match (&config.data_path, config.synthetic) {
        (_, Some(n))       => tracing::info!("Starting training on {} synthetic customers", n),
        (Some(path), None) => tracing::info!("Starting training on: {}", path),
        (None, None)       => {}
    }

    let mut use_case = TrainUseCase::new(config);
    let report = use_case.execute()?;

    println!(
        "Training complete. {} epochs, best validation loss at epoch {}. Checkpoints in '{}'.",
        report.epochs.len(),
        report.best_epoch,
        use_case.config().checkpoint_dir
    );
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    let use_case = PredictUseCase::new(args.into());
    let written = use_case.execute()?;
    println!("Wrote {written} predictions.");
    Ok(())
}

fn run_summary(args: SummaryArgs) -> Result<()> {
    let hparams = args.hparams.resolve()?;
    let device  = BackendKind::cpu_device();
    let kinds: Vec<ModelKind> = match args.model {
        Some(kind) => vec![kind],
        None       => ModelKind::ALL.to_vec(),
    };

    println!("{:<16} {:>8} {:>14}", "model", "classes", "parameters");
    for kind in kinds {
        let spec = ModelSpec::new(kind, hparams.clone());
        match num_params::<CpuBackend>(&spec, &device) {
            Ok(n)  => println!("{:<16} {:>8} {:>14}", kind.name(), spec.num_classes, n),
            Err(e) => println!("{:<16} {:>8} {:>14}", kind.name(), "-", format!("({e})")),
        }
    }
    if matches!(args.model, None | Some(ModelKind::Resnet)) {
        let n = discriminator_params::<CpuBackend>(&hparams, &device)?;
        println!("{:<16} {:>8} {:>14}", "resnet-disc", 1, n);
    }
    Ok(())
}
