// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// File-system concerns shared by several use cases:
//
//   checkpoint.rs — Per-epoch snapshots, the final native model
//                   (burn named MessagePack, gzip) and the saved
//                   TrainConfig so later commands can rebuild
//                   the architecture.
//
//   exporter.rs   — Mobile bundle: compact binary weights plus a
//                   JSON manifest with the input descriptor.
//
//   metrics.rs    — Per-epoch loss/accuracy CSV.
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Mobile inference bundle export and loading
pub mod exporter;

/// Training metrics CSV logger
pub mod metrics;
