// ============================================================
// Layer 3 — Digit Domain Types
// ============================================================
// A handwritten digit as the rest of the system sees it:
// a 28×28 grid of raw grayscale bytes, the labelled sample
// the data sources produce, and the prediction the classifier
// hands back.
//
// Pixels stay as raw u8 (0..=255) here. Scaling into [0, 1]
// happens at the tensor boundary using PIXEL_SCALE, which is
// also the scale recorded in the exported mobile manifest.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Image width in pixels
pub const IMAGE_WIDTH: usize = 28;

/// Image height in pixels
pub const IMAGE_HEIGHT: usize = 28;

/// Number of pixels in one image
pub const IMAGE_PIXELS: usize = IMAGE_WIDTH * IMAGE_HEIGHT;

/// Digits 0 through 9
pub const NUM_CLASSES: usize = 10;

/// Multiplier that maps a raw pixel byte into [0, 1]
pub const PIXEL_SCALE: f32 = 1.0 / 255.0;

/// Which partition of the dataset to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Split {
    Train,
    Test,
}

impl std::fmt::Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Split::Train => write!(f, "train"),
            Split::Test  => write!(f, "test"),
        }
    }
}

// ─── DigitImage ───────────────────────────────────────────────────────────────
/// One single-channel 28×28 image, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitImage {
    pixels: Vec<u8>,
}

impl DigitImage {
    /// Build an image from exactly IMAGE_PIXELS row-major bytes.
    pub fn new(pixels: Vec<u8>) -> Result<Self> {
        if pixels.len() != IMAGE_PIXELS {
            bail!(
                "Expected {} pixels ({}x{}), got {}",
                IMAGE_PIXELS, IMAGE_WIDTH, IMAGE_HEIGHT, pixels.len()
            );
        }
        Ok(Self { pixels })
    }

    /// Convert burn's MNIST grid (floats holding 0..=255) into raw bytes.
    pub fn from_grid(grid: &[[f32; IMAGE_WIDTH]; IMAGE_HEIGHT]) -> Self {
        let pixels = grid
            .iter()
            .flat_map(|row| row.iter().map(|&p| p.round().clamp(0.0, 255.0) as u8))
            .collect();
        Self { pixels }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Pixel at (row, col)
    pub fn pixel(&self, row: usize, col: usize) -> u8 {
        self.pixels[row * IMAGE_WIDTH + col]
    }

    /// Negative image: dark ink on paper becomes light strokes on black.
    pub fn inverted(&self) -> Self {
        Self { pixels: self.pixels.iter().map(|&p| 255 - p).collect() }
    }

    /// Pixels multiplied by `scale`, ready to become a float tensor.
    pub fn scaled(&self, scale: f32) -> Vec<f32> {
        self.pixels.iter().map(|&p| p as f32 * scale).collect()
    }
}

// ─── DigitSample ──────────────────────────────────────────────────────────────
/// One labelled training or test image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigitSample {
    pub image: DigitImage,
    pub label: u8,
}

impl DigitSample {
    pub fn new(image: DigitImage, label: u8) -> Self {
        Self { image, label }
    }
}

// ─── Prediction ───────────────────────────────────────────────────────────────
/// Classifier output for a single image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// The most likely digit
    pub digit: u8,

    /// Probability assigned to `digit`
    pub confidence: f32,

    /// Softmax output, one entry per class
    pub probabilities: Vec<f32>,
}

impl Prediction {
    /// Pick the arg-max class out of a probability vector.
    pub fn from_probabilities(probabilities: Vec<f32>) -> Result<Self> {
        if probabilities.len() != NUM_CLASSES {
            bail!(
                "Expected {} class probabilities, got {}",
                NUM_CLASSES, probabilities.len()
            );
        }

        let (digit, confidence) = probabilities
            .iter()
            .copied()
            .enumerate()
            .fold((0usize, f32::NEG_INFINITY), |best, (i, p)| {
                if p > best.1 { (i, p) } else { best }
            });

        Ok(Self {
            digit: digit as u8,
            confidence,
            probabilities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_wrong_pixel_count() {
        assert!(DigitImage::new(vec![0; 10]).is_err());
        assert!(DigitImage::new(vec![0; IMAGE_PIXELS]).is_ok());
    }

    #[test]
    fn test_from_grid_is_row_major() {
        let mut grid = [[0f32; IMAGE_WIDTH]; IMAGE_HEIGHT];
        grid[2][5] = 255.0;
        grid[27][0] = 17.4;
        let img = DigitImage::from_grid(&grid);
        assert_eq!(img.pixel(2, 5), 255);
        assert_eq!(img.pixel(27, 0), 17);
        assert_eq!(img.pixels()[2 * IMAGE_WIDTH + 5], 255);
    }

    #[test]
    fn test_scaled_maps_into_unit_range() {
        let mut pixels = vec![0u8; IMAGE_PIXELS];
        pixels[0] = 255;
        let scaled = DigitImage::new(pixels).unwrap().scaled(PIXEL_SCALE);
        assert!((scaled[0] - 1.0).abs() < 1e-6);
        assert_eq!(scaled[1], 0.0);
    }

    #[test]
    fn test_inverted_flips_every_pixel() {
        let mut pixels = vec![0u8; IMAGE_PIXELS];
        pixels[IMAGE_WIDTH + 3] = 200;
        let inv = DigitImage::new(pixels).unwrap().inverted();
        assert_eq!(inv.pixel(0, 0), 255);
        assert_eq!(inv.pixel(1, 3), 55);
    }

    #[test]
    fn test_prediction_picks_argmax() {
        let mut probs = vec![0.05f32; NUM_CLASSES];
        probs[7] = 0.55;
        let p = Prediction::from_probabilities(probs).unwrap();
        assert_eq!(p.digit, 7);
        assert!((p.confidence - 0.55).abs() < 1e-6);
    }

    #[test]
    fn test_prediction_rejects_wrong_class_count() {
        assert!(Prediction::from_probabilities(vec![1.0]).is_err());
    }
}
