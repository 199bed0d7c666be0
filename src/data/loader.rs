// ============================================================
// Layer 4 — CSV Statement Loader
// ============================================================
// Reads one statement per row:
//
//   customer_ID, S_2, P_2, D_39, ..., target
//   a1,          ...                 , 0
//   a1,          ...                 , 0
//   b7,          ...                 , 1
//
// Consecutive rows with the same id form one customer. Every
// column other than the id and the target is a feature; empty
// or non-numeric cells become NaN. The target column is optional
// (prediction inputs usually lack it).

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::domain::sequence::CustomerSequence;
use crate::domain::traits::SequenceSource;
use crate::error::ModelError;

pub struct CsvSequenceLoader {
    path: PathBuf,
    id_column: String,
    target_column: String,
}

impl CsvSequenceLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            id_column: "customer_ID".to_string(),
            target_column: "target".to_string(),
        }
    }

    pub fn with_id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = column.into();
        self
    }

    pub fn with_target_column(mut self, column: impl Into<String>) -> Self {
        self.target_column = column.into();
        self
    }
}

impl SequenceSource for CsvSequenceLoader {
    fn load_all(&self) -> Result<Vec<CustomerSequence>> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .with_context(|| format!("Cannot open '{}'", self.path.display()))?;

        let sequences = read_sequences(reader, &self.id_column, &self.target_column)
            .with_context(|| format!("Cannot parse '{}'", self.path.display()))?;

        tracing::info!(
            "Loaded {} customers ({} statements) from '{}'",
            sequences.len(),
            sequences.iter().map(CustomerSequence::num_statements).sum::<usize>(),
            self.path.display()
        );
        Ok(sequences)
    }
}

/// Group rows of any CSV reader into customer sequences.
pub fn read_sequences<R: std::io::Read>(
    mut reader: csv::Reader<R>,
    id_column: &str,
    target_column: &str,
) -> crate::error::Result<Vec<CustomerSequence>> {
    let headers = reader.headers()?.clone();
    let id_idx = headers
        .iter()
        .position(|h| h == id_column)
        .ok_or_else(|| ModelError::Csv(format!("missing id column '{id_column}'")))?;
    let target_idx = headers.iter().position(|h| h == target_column);
    let feature_idx: Vec<usize> = (0..headers.len())
        .filter(|&i| i != id_idx && Some(i) != target_idx)
        .collect();

    tracing::debug!(
        "CSV columns: id={}, target={:?}, {} features",
        id_idx,
        target_idx,
        feature_idx.len()
    );

    let mut sequences: Vec<CustomerSequence> = Vec::new();
    for record in reader.records() {
        let record = record?;
        let id = record.get(id_idx).unwrap_or_default();
        let statement: Vec<f32> = feature_idx
            .iter()
            .map(|&i| parse_cell(record.get(i)))
            .collect();
        let target = target_idx
            .and_then(|i| record.get(i))
            .and_then(|cell| cell.parse::<f32>().ok());

        match sequences.last_mut() {
            Some(current) if current.customer_id == id => {
                current.statements.push(statement);
                if target.is_some() {
                    current.target = target;
                }
            }
            _ => sequences.push(CustomerSequence::new(id, vec![statement], target)),
        }
    }
    Ok(sequences)
}

fn parse_cell(cell: Option<&str>) -> f32 {
    cell.filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f32>().ok())
        .unwrap_or(f32::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Vec<CustomerSequence> {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());
        read_sequences(reader, "customer_ID", "target").unwrap()
    }

    #[test]
    fn test_groups_consecutive_rows() {
        let seqs = parse(
            "customer_ID,a,b,target\n\
             c1,1.0,2.0,0\n\
             c1,3.0,4.0,0\n\
             c2,5.0,6.0,1\n",
        );
        assert_eq!(seqs.len(), 2);
        assert_eq!(seqs[0].statements, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(seqs[1].target, Some(1.0));
        assert_eq!(seqs[1].num_features(), 2);
    }

    #[test]
    fn test_blank_and_text_cells_are_nan() {
        let seqs = parse("customer_ID,a,b,c\nc1,,x, 2.5\n");
        let row = &seqs[0].statements[0];
        assert!(row[0].is_nan());
        assert!(row[1].is_nan());
        assert_eq!(row[2], 2.5);
        assert_eq!(seqs[0].target, None);
    }

    #[test]
    fn test_missing_id_column_is_an_error() {
        let reader = csv::Reader::from_reader("id,a\n1,2\n".as_bytes());
        let err = read_sequences(reader, "customer_ID", "target").unwrap_err();
        assert!(err.to_string().contains("customer_ID"));
    }

    #[test]
    fn test_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.csv");
        std::fs::write(&path, "cid,x,label\nu,1,1\nu,2,1\n").unwrap();

        let loader = CsvSequenceLoader::new(&path)
            .with_id_column("cid")
            .with_target_column("label");
        let seqs = loader.load_all().unwrap();
        assert_eq!(seqs.len(), 1);
        assert_eq!(seqs[0].num_statements(), 2);
        assert_eq!(seqs[0].label(), 1.0);
    }
}
