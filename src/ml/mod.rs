// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Network definition, training loop and inference.
//
//   backend.rs    — NdArray or Wgpu, chosen by cargo feature
//
//   model.rs      — conv(32, 3×3, ReLU) → maxpool(2×2) →
//                   flatten → dense(128, ReLU) → dense(10)
//
//   trainer.rs    — Adam + cross-entropy epoch loop with
//                   validation, checkpoints and metrics;
//                   also the standalone `evaluate`
//
//   inferencer.rs — Classifies single images from the exported
//                   mobile bundle
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Backend type aliases
pub mod backend;

/// Convolutional digit classifier
pub mod model;

/// Training and evaluation loops
pub mod trainer;

/// Inference from the mobile bundle
pub mod inferencer;
