// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits: no Burn, no file I/O.

/// A customer's statement history and label
pub mod sequence;

/// Abstractions implemented by the data and ml layers
pub mod traits;
