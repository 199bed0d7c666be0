// ============================================================
// Layer 3 — CustomerSequence Domain Type
// ============================================================
// One customer: the statements in the order they appeared in the
// source, each a row of numeric features (NaN = missing), plus the
// default label when one is known.
//
// Models expect exactly T statements, so `padded` keeps the most
// recent T and fills older missing slots with all-NaN rows:
//
//   statements  s1 s2 s3          (T = 5)
//   padded      ∅  ∅  s1 s2 s3

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSequence {
    pub customer_id: String,
    pub statements: Vec<Vec<f32>>,
    /// 1.0 = default, 0.0 = no default, None = unlabelled
    pub target: Option<f32>,
}

impl CustomerSequence {
    pub fn new(customer_id: impl Into<String>, statements: Vec<Vec<f32>>, target: Option<f32>) -> Self {
        Self {
            customer_id: customer_id.into(),
            statements,
            target,
        }
    }

    pub fn num_statements(&self) -> usize {
        self.statements.len()
    }

    /// Feature count of the widest statement (0 when empty)
    pub fn num_features(&self) -> usize {
        self.statements.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Flattened `[time_steps, num_features]` block, row-major.
    /// Short rows are NaN-filled, long rows are cut.
    pub fn padded(&self, time_steps: usize, num_features: usize) -> Vec<f32> {
        let mut out = vec![f32::NAN; time_steps * num_features];
        let kept = self.statements.len().min(time_steps);
        let first_slot = time_steps - kept;
        let recent = &self.statements[self.statements.len() - kept..];

        for (offset, statement) in recent.iter().enumerate() {
            let row = (first_slot + offset) * num_features;
            for (col, &value) in statement.iter().take(num_features).enumerate() {
                out[row + col] = value;
            }
        }
        out
    }

    /// Binary label used for training; unlabelled counts as 0.
    pub fn label(&self) -> f32 {
        match self.target {
            Some(t) if t >= 0.5 => 1.0,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_history_is_front_padded() {
        let seq = CustomerSequence::new("c1", vec![vec![1.0, 2.0], vec![3.0, 4.0]], Some(1.0));
        let out = seq.padded(3, 2);
        assert!(out[0].is_nan() && out[1].is_nan());
        assert_eq!(&out[2..], &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_long_history_keeps_most_recent() {
        let statements = (0..5).map(|i| vec![i as f32]).collect();
        let seq = CustomerSequence::new("c2", statements, None);
        assert_eq!(seq.padded(3, 1), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_ragged_rows_are_filled_or_cut() {
        let seq = CustomerSequence::new("c3", vec![vec![1.0], vec![1.0, 2.0, 3.0]], None);
        let out = seq.padded(2, 2);
        assert_eq!(out[0], 1.0);
        assert!(out[1].is_nan());
        assert_eq!(&out[2..], &[1.0, 2.0]);
        assert_eq!(seq.num_features(), 3);
    }

    #[test]
    fn test_label_rounds_and_defaults_to_zero() {
        assert_eq!(CustomerSequence::new("a", vec![], Some(0.9)).label(), 1.0);
        assert_eq!(CustomerSequence::new("b", vec![], Some(0.1)).label(), 0.0);
        assert_eq!(CustomerSequence::new("c", vec![], None).label(), 0.0);
    }
}
