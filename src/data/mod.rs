// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between raw dataset bytes and tensor batches.
//
//   MnistLoader / IdxLoader  → labelled 28×28 byte images
//       │
//       ▼
//   sample_subset            → optional seeded `--limit`
//       │
//       ▼
//   DigitDataset             → implements Burn's Dataset trait
//       │
//       ▼
//   DigitBatcher             → [N, 28, 28] scaled images + labels
//       │
//       ▼
//   DataLoader               → feeds batches to the training loop
//
// The Preprocessor is the inference-side entry point: it turns
// a user's image file into the same 28×28 byte grid.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// MNIST download and local IDX file loaders
pub mod loader;

/// Decodes and normalises user images for `predict`
pub mod preprocessor;

/// Implements Burn's Dataset trait for digit samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Seeded random subsets for short runs
pub mod sampler;
