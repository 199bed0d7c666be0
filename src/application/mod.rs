// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal
// (training or prediction). No model math and no printing
// here; only workflow coordination.

// The training workflow
pub mod train_use_case;

// Batch prediction from a trained checkpoint
pub mod predict_use_case;
