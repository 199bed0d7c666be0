// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All architectures plus the code that trains and runs them.
//
//   hparams.rs    : shared hyperparameters (burn Config)
//   layers.rs     : Conv1d blocks, residual unit, Gaussian noise
//   classifier.rs : SequenceClassifier contract, losses, ModelKind
//   conv1d.rs     : the five Conv1d classifiers
//   embedding.rs  : per-feature value embedding + time embedding
//   double.rs     : dual-branch classifier over embedded input
//   resnet.rs     : 2D ResNet classifier and conditional discriminator
//   registry.rs   : ModelKind → concrete module
//   backend.rs    : wgpu / ndarray selection
//   trainer.rs    : Adam training loop with validation + checkpoints
//   inferencer.rs : checkpoint loading and batch scoring

pub mod hparams;

pub mod layers;

pub mod classifier;

pub mod conv1d;

pub mod embedding;

pub mod double;

pub mod resnet;

pub mod registry;

pub mod backend;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Loads a checkpoint and scores customers
pub mod inferencer;
