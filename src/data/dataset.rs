use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::domain::sequence::CustomerSequence;

/// One customer flattened to a fixed `[time_steps, num_features]` block.
/// NaN marks a missing value or a padded statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabularSample {
    pub features: Vec<f32>,
    pub label:    f32,
}

impl TabularSample {
    pub fn from_sequence(seq: &CustomerSequence, time_steps: usize, num_features: usize) -> Self {
        Self {
            features: seq.padded(time_steps, num_features),
            label:    seq.label(),
        }
    }

    pub fn missing_count(&self) -> usize {
        self.features.iter().filter(|v| v.is_nan()).count()
    }
}

pub struct TabularDataset {
    samples: Vec<TabularSample>,
}

impl TabularDataset {
    pub fn new(samples: Vec<TabularSample>) -> Self { Self { samples } }

    pub fn from_sequences(
        sequences:    &[CustomerSequence],
        time_steps:   usize,
        num_features: usize,
    ) -> Self {
        let samples = sequences
            .iter()
            .map(|s| TabularSample::from_sequence(s, time_steps, num_features))
            .collect();
        Self { samples }
    }

    pub fn positive_count(&self) -> usize {
        self.samples.iter().filter(|s| s.label >= 0.5).count()
    }

    /// Share of NaN cells across every sample, padding included.
    pub fn missing_fraction(&self) -> f64 {
        let cells: usize = self.samples.iter().map(|s| s.features.len()).sum();
        if cells == 0 {
            return 0.0;
        }
        let missing: usize = self.samples.iter().map(TabularSample::missing_count).sum();
        missing as f64 / cells as f64
    }
}

impl Dataset<TabularSample> for TabularDataset {
    fn get(&self, index: usize) -> Option<TabularSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_sequences_pads_every_sample() {
        let seqs = vec![
            CustomerSequence::new("a", vec![vec![1.0, 2.0]], Some(1.0)),
            CustomerSequence::new("b", vec![vec![3.0], vec![4.0, 5.0]], None),
        ];
        let ds = TabularDataset::from_sequences(&seqs, 3, 2);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.positive_count(), 1);

        let a = ds.get(0).unwrap();
        assert_eq!(a.features.len(), 6);
        assert_eq!(a.missing_count(), 4);

        let b = ds.get(1).unwrap();
        assert_eq!(b.label, 0.0);
        assert_eq!(b.missing_count(), 3);
        assert!(ds.get(2).is_none());

        // 7 of 12 cells are NaN
        assert!((ds.missing_fraction() - 7.0 / 12.0).abs() < 1e-9);
        assert_eq!(TabularDataset::new(Vec::new()).missing_fraction(), 0.0);
    }
}
