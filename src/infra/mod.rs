// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by the training and prediction
// paths:
//
//   checkpoint.rs  : model weights via Burn's CompactRecorder,
//                     plus the run config saved as JSON so
//                     prediction can rebuild the model
//
//   metrics.rs     : per-epoch CSV log and the AMEX
//                     default-prediction metric

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger and AMEX metric
pub mod metrics;
