// ============================================================
// Layer 6 — Metrics
// ============================================================
// Per-epoch validation numbers, appended to checkpoints/metrics.csv:
//
//   epoch,train_loss,val_loss,accuracy,amex
//   1,0.693100,0.689200,0.541000,0.102300
//   2,0.640100,0.651300,0.612000,0.215800
//
// The AMEX default-prediction metric ranks customers by score:
//
//   amex = 0.5 * (G + D)
//     G  weighted Gini of the ranking, normalised by the Gini of a
//        perfect ranking
//     D  share of all defaults found in the top 4% of the ranking
//
// Non-defaults carry weight 20 in both parts, which stands in for
// the down-sampling of negatives in the scored population.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::Result;

const NEGATIVE_WEIGHT: f64 = 20.0;
const TOP_FRACTION: f64 = 0.04;

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Mean loss over all training batches
    pub train_loss: f64,

    /// Mean loss over the validation set
    pub val_loss: f64,

    /// Fraction of validation customers labelled correctly
    pub accuracy: f64,

    /// AMEX metric on the validation set; higher is better
    pub amex: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, val_loss: f64, accuracy: f64, amex: f64) -> Self {
        Self { epoch, train_loss, val_loss, accuracy, amex }
    }

    /// Returns true if this epoch improved over the previous best val_loss
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss < best_val_loss
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,train_loss,val_loss,accuracy,amex")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6}",
            m.epoch, m.train_loss, m.val_loss, m.accuracy, m.amex,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}, amex={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
            m.amex,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── AMEX metric ──────────────────────────────────────────────────────────────

/// `(label, weight)` pairs ordered by descending score.
fn ranked(y_true: &[f32], y_score: &[f32]) -> Vec<(f64, f64)> {
    let mut order: Vec<usize> = (0..y_true.len().min(y_score.len())).collect();
    order.sort_by(|&a, &b| y_score[b].total_cmp(&y_score[a]));
    order
        .into_iter()
        .map(|i| {
            let label = if y_true[i] >= 0.5 { 1.0 } else { 0.0 };
            let weight = if label == 0.0 { NEGATIVE_WEIGHT } else { 1.0 };
            (label, weight)
        })
        .collect()
}

/// Share of all defaults that land in the top 4% (by weight) of the ranking.
pub fn top_four_percent_captured(y_true: &[f32], y_score: &[f32]) -> f64 {
    let rows = ranked(y_true, y_score);
    let positives: f64 = rows.iter().map(|(label, _)| label).sum();
    if positives == 0.0 {
        return 0.0;
    }

    let total_weight: f64 = rows.iter().map(|(_, w)| w).sum();
    let cutoff = (TOP_FRACTION * total_weight).floor();

    let mut cumulative = 0.0;
    let mut captured = 0.0;
    for (label, weight) in rows {
        cumulative += weight;
        if cumulative > cutoff {
            break;
        }
        captured += label;
    }
    captured / positives
}

/// Weighted Gini of the ranking induced by `y_score`.
pub fn weighted_gini(y_true: &[f32], y_score: &[f32]) -> f64 {
    let rows = ranked(y_true, y_score);
    let total_weight: f64 = rows.iter().map(|(_, w)| w).sum();
    let total_positive: f64 = rows.iter().map(|(label, w)| label * w).sum();
    if total_weight == 0.0 || total_positive == 0.0 {
        return 0.0;
    }

    let mut random = 0.0;
    let mut found = 0.0;
    let mut gini = 0.0;
    for (label, weight) in rows {
        random += weight / total_weight;
        found += label * weight;
        let lorentz = found / total_positive;
        gini += (lorentz - random) * weight;
    }
    gini
}

/// Gini of `y_score` relative to the Gini of a perfect ranking.
pub fn normalized_weighted_gini(y_true: &[f32], y_score: &[f32]) -> f64 {
    let best = weighted_gini(y_true, y_true);
    if best == 0.0 {
        return 0.0;
    }
    weighted_gini(y_true, y_score) / best
}

/// `0.5 * (normalised weighted Gini + top-4% capture rate)`.
/// Returns 0 when there are no defaults to rank.
pub fn amex_metric(y_true: &[f32], y_score: &[f32]) -> f64 {
    0.5 * (normalized_weighted_gini(y_true, y_score) + top_four_percent_captured(y_true, y_score))
}
