// ============================================================
// Layer 4 — Digit Batcher
// ============================================================
// Implements Burn's Batcher trait: stacks a Vec<DigitSample>
// into one image tensor and one label tensor.
//
//   Input:  N samples, each 28×28 raw bytes
//   Output: images  [N, 28, 28]  scaled into [0, 1]
//           targets [N]          class indices
//
// Normalisation happens here, so datasets keep raw bytes and
// the same PIXEL_SCALE ends up in the exported manifest.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::DigitSample;
use crate::domain::digit::{IMAGE_HEIGHT, IMAGE_WIDTH, PIXEL_SCALE};

// ─── DigitBatch ───────────────────────────────────────────────────────────────
/// A batch ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct DigitBatch<B: Backend> {
    /// Shape: [batch_size, 28, 28], values in [0, 1]
    pub images: Tensor<B, 3>,

    /// Shape: [batch_size], one class index per image
    pub targets: Tensor<B, 1, Int>,
}

// ─── DigitBatcher ─────────────────────────────────────────────────────────────
/// Stateless; the DataLoader passes the target device on every call.
#[derive(Clone, Debug, Default)]
pub struct DigitBatcher;

impl DigitBatcher {
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Batcher<B, DigitSample, DigitBatch<B>> for DigitBatcher {
    fn batch(&self, items: Vec<DigitSample>, device: &B::Device) -> DigitBatch<B> {
        let batch_size = items.len();

        // ── Flatten and scale pixels ──────────────────────────────────────────
        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|s| s.image.scaled(PIXEL_SCALE))
            .collect();

        let labels: Vec<i32> = items
            .iter()
            .map(|s| s.label as i32)
            .collect();

        let images = Tensor::<B, 1>::from_floats(pixels.as_slice(), device)
            .reshape([batch_size, IMAGE_HEIGHT, IMAGE_WIDTH]);

        let targets = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), device);

        DigitBatch { images, targets }
    }
}
