// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From statement rows to tensor batches:
//
//   CSV file / SyntheticSource
//       │
//       ▼
//   CustomerSequence    → one customer, statements in file order
//       │
//       ▼
//   split_train_val     → seeded 80/20 split by customer
//       │
//       ▼
//   TabularDataset      → padded [T * F] blocks, burn Dataset
//       │
//       ▼
//   TabularBatcher      → [N, T, F] inputs + [N] targets
//       │
//       ▼
//   DataLoader          → feeds batches to the training loop

/// Reads statement rows from CSV and groups them per customer
pub mod loader;

/// Random customers for runs without a data file
pub mod synthetic;

/// Implements Burn's Dataset trait for padded customer blocks
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Shuffles and splits data into train/validation sets
pub mod splitter;
