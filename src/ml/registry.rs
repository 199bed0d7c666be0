// ============================================================
// Layer 5 — Model Registry
// ============================================================
// Maps a runtime `ModelKind` to a concrete burn module. Burn
// modules are generic structs, so the dispatch is a macro that
// builds the model and runs the same body for every arm:
//
//   with_classifier!(B, &spec, &device, |model| train_loop(model, ...))

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::ml::classifier::ModelKind;
use crate::ml::hparams::HParams;

/// Everything needed to rebuild a classifier: saved with the run
/// config and read back at prediction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    pub kind: ModelKind,
    pub hparams: HParams,
    pub num_classes: usize,
}

impl ModelSpec {
    pub fn new(kind: ModelKind, hparams: HParams) -> Self {
        Self {
            kind,
            hparams,
            num_classes: default_classes(kind),
        }
    }

    pub fn with_num_classes(mut self, num_classes: usize) -> Self {
        self.num_classes = num_classes;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.hparams.validate()?;
        if self.kind == ModelKind::Resnet {
            self.hparams.validate_image()?;
        }
        if self.num_classes == 0 {
            return Err(ModelError::invalid_config("num_classes must be positive"));
        }
        if matches!(self.kind, ModelKind::AmexConv1d | ModelKind::DoubleConv1d) && self.num_classes != 1 {
            return Err(ModelError::invalid_config(format!(
                "{} has a single output, got num_classes = {}",
                self.kind, self.num_classes
            )));
        }
        self.check_lengths()
    }

    /// Each stack shortens or pools its length axis; reject inputs
    /// that would shrink to nothing before the global max.
    fn check_lengths(&self) -> Result<()> {
        let h = &self.hparams;
        let needs = |axis: &str, have: usize, need: usize| -> Result<()> {
            if have < need {
                return Err(ModelError::shape_mismatch(
                    format!("{} {axis} >= {need}", self.kind),
                    format!("{axis} = {have}"),
                ));
            }
            Ok(())
        };
        match self.kind {
            // k=4, p=1 three times: L - 3
            ModelKind::FitConv1d => needs("num_features", h.num_features, 4),
            // three residual units at L - 11 each
            ModelKind::Res1d => needs("num_features", h.num_features, 34),
            // three MaxPool1d(2, 2) over the features plus noise columns
            ModelKind::AmexConv1d => needs("num_features + noise_dim", h.num_features + h.noise_dim, 8),
            ModelKind::DoubleConv1d => {
                // statement branch pools F·E three times, feature branch pools T once
                needs("num_features * feature_embed_dim", h.num_features * h.feature_embed_dim, 8)?;
                needs("time_steps", h.time_steps, 2)
            }
            ModelKind::Conv1d | ModelKind::FatConv1d | ModelKind::Resnet => Ok(()),
        }
    }

    /// Only the embedding-based model reads NaN directly; the
    /// others need missing values replaced before batching.
    pub fn nan_fill(&self) -> Option<f32> {
        match self.kind {
            ModelKind::DoubleConv1d => None,
            _ => Some(0.0),
        }
    }
}

/// Softmax heads train on two classes for binary targets.
fn default_classes(kind: ModelKind) -> usize {
    match kind {
        ModelKind::Conv1d | ModelKind::FitConv1d | ModelKind::Res1d => 2,
        _ => 1,
    }
}

/// Build the classifier described by a `ModelSpec` on `$backend`
/// and evaluate `$body` with it bound to `$model`. Fallible
/// configs are unwrapped with `?`, so the caller must return a
/// `Result` whose error converts from `ModelError`.
macro_rules! with_classifier {
    ($backend:ty, $spec:expr, $device:expr, |$model:ident| $body:expr) => {{
        use $crate::ml::classifier::ModelKind;
        let spec: &$crate::ml::registry::ModelSpec = $spec;
        let h = &spec.hparams;
        match spec.kind {
            ModelKind::Conv1d => {
                let $model = $crate::ml::conv1d::Conv1dClassifierConfig::from_hparams(h, spec.num_classes)
                    .init::<$backend>($device);
                $body
            }
            ModelKind::FitConv1d => {
                let $model = $crate::ml::conv1d::FitConv1dClassifierConfig::from_hparams(h, spec.num_classes)
                    .init::<$backend>($device);
                $body
            }
            ModelKind::Res1d => {
                let $model = $crate::ml::conv1d::Res1dClassifierConfig::from_hparams(h, spec.num_classes)
                    .init::<$backend>($device);
                $body
            }
            ModelKind::AmexConv1d => {
                let $model = $crate::ml::conv1d::AmexConv1dClassifierConfig::from_hparams(h)
                    .init::<$backend>($device);
                $body
            }
            ModelKind::FatConv1d => {
                let $model = $crate::ml::conv1d::FatConv1dClassifierConfig::from_hparams(h)
                    .with_num_classes(spec.num_classes)
                    .init::<$backend>($device);
                $body
            }
            ModelKind::DoubleConv1d => {
                let $model = $crate::ml::double::DoubleConv1dClassifierConfig::from_hparams(h)?
                    .init::<$backend>($device);
                $body
            }
            ModelKind::Resnet => {
                let $model = $crate::ml::resnet::ResNetConfig::from_hparams(h)?
                    .with_num_classes(spec.num_classes)
                    .init_classifier::<$backend>($device);
                $body
            }
        }
    }};
}

pub(crate) use with_classifier;

/// Trainable parameter count of the classifier a spec describes.
pub fn num_params<B: burn::prelude::Backend>(spec: &ModelSpec, device: &B::Device) -> Result<usize> {
    use burn::module::Module;
    spec.validate()?;
    with_classifier!(B, spec, device, |model| Ok(model.num_params()))
}

/// Parameter count of the conditional ResNet discriminator.
pub fn discriminator_params<B: burn::prelude::Backend>(hparams: &HParams, device: &B::Device) -> Result<usize> {
    use burn::module::Module;
    let model = crate::ml::resnet::ResNetConfig::from_hparams(hparams)?.init_discriminator::<B>(device);
    Ok(model.num_params())
}
