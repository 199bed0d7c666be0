// ============================================================
// Layer 5 — Classifier Contract
// ============================================================
// Every sequence classifier exposes raw logits plus its class
// count; activation, loss and scoring are derived from those two
// so the trainer and inferencer can stay generic.
//
//   1 class   → sigmoid,  binary cross-entropy on logits
//   n classes → softmax,  cross-entropy

use burn::{
    nn::loss::{BinaryCrossEntropyLossConfig, CrossEntropyLossConfig},
    prelude::*,
    tensor::activation::{sigmoid, softmax},
};
use serde::{Deserialize, Serialize};

/// The trainable classifier architectures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    /// Four 256-wide Conv1d blocks, softmax head
    Conv1d,
    /// Three narrow Conv1d blocks (kernel 4), softmax head
    FitConv1d,
    /// Three shape-guarded residual Conv1d units, softmax head
    Res1d,
    /// Wide Conv1d pyramid with max-pooling, sigmoid head
    AmexConv1d,
    /// Configurable-depth Conv1d stack, sigmoid head
    FatConv1d,
    /// Embedded input through two Conv1d branches, logit head
    DoubleConv1d,
    /// 2D ResNet over a pseudo-image
    Resnet,
}

impl ModelKind {
    pub const ALL: [ModelKind; 7] = [
        ModelKind::Conv1d,
        ModelKind::FitConv1d,
        ModelKind::Res1d,
        ModelKind::AmexConv1d,
        ModelKind::FatConv1d,
        ModelKind::DoubleConv1d,
        ModelKind::Resnet,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Conv1d => "conv1d",
            ModelKind::FitConv1d => "fit-conv1d",
            ModelKind::Res1d => "res1d",
            ModelKind::AmexConv1d => "amex-conv1d",
            ModelKind::FatConv1d => "fat-conv1d",
            ModelKind::DoubleConv1d => "double-conv1d",
            ModelKind::Resnet => "resnet",
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Sigmoid for a single output, softmax over classes otherwise.
pub fn activate<B: Backend>(logits: Tensor<B, 2>, num_classes: usize) -> Tensor<B, 2> {
    if num_classes == 1 {
        sigmoid(logits)
    } else {
        softmax(logits, 1)
    }
}

/// Probability of the positive class (label 1) per sample.
pub fn positive_scores<B: Backend>(probs: Tensor<B, 2>) -> Tensor<B, 1> {
    let [batch, classes] = probs.dims();
    let column = if classes == 1 { 0 } else { 1 };
    probs.slice([0..batch, column..column + 1]).reshape([batch])
}

/// Hard labels: threshold 0.5 for one output, argmax otherwise.
pub fn predicted_labels<B: Backend>(probs: Tensor<B, 2>) -> Tensor<B, 1, Int> {
    let [batch, classes] = probs.dims();
    if classes == 1 {
        probs.greater_equal_elem(0.5).int().reshape([batch])
    } else {
        probs.argmax(1).reshape([batch])
    }
}

pub trait SequenceClassifier<B: Backend> {
    /// `[batch, T, F]` → pre-activation scores `[batch, num_classes]`
    fn logits(&self, x: Tensor<B, 3>) -> Tensor<B, 2>;

    fn num_classes(&self) -> usize;

    fn probabilities(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        activate(self.logits(x), self.num_classes())
    }

    /// Loss = BCE-with-logits (1 class) or cross-entropy (n classes).
    /// Returns the loss and the logits it was computed from.
    fn forward_loss(
        &self,
        x: Tensor<B, 3>,
        targets: Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.logits(x);
        let loss = classification_loss(logits.clone(), targets);
        (loss, logits)
    }
}

pub fn classification_loss<B: Backend>(
    logits: Tensor<B, 2>,
    targets: Tensor<B, 1, Int>,
) -> Tensor<B, 1> {
    let [batch, classes] = logits.dims();
    let device = logits.device();
    if classes == 1 {
        BinaryCrossEntropyLossConfig::new()
            .with_logits(true)
            .init(&device)
            .forward(logits.reshape([batch]), targets)
    } else {
        CrossEntropyLossConfig::new()
            .init(&device)
            .forward(logits, targets)
    }
}
