// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal each
// (fetch, train, evaluate, export, predict).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern

// The training pipeline: load → fit → evaluate → save → export
pub mod train_use_case;

// Follow-up workflows over a finished run
pub mod model_use_cases;

// Offline copy of MNIST as raw IDX files
pub mod fetch_use_case;
