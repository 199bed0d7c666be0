// ============================================================
// Layer 3 — Core Traits
// ============================================================
// The application layer talks to data sources and scorers only
// through these traits:
//
//   SequenceSource   CsvSequenceLoader, SyntheticSource
//   DefaultScorer    Inferencer

use anyhow::Result;

use crate::domain::sequence::CustomerSequence;

/// Anything that can produce customer statement sequences.
pub trait SequenceSource {
    fn load_all(&self) -> Result<Vec<CustomerSequence>>;
}

/// Anything that can assign a default probability to customers.
pub trait DefaultScorer {
    /// One score in [0, 1] per input sequence, same order.
    fn score(&self, sequences: &[CustomerSequence]) -> Result<Vec<f32>>;
}
