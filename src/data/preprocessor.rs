// ============================================================
// Layer 4 — Image Preprocessor
// ============================================================
// Turns an arbitrary picture of a digit into the 28×28
// light-on-dark grayscale grid the model was trained on.
//
// Steps (applied in order):
//   1. Decode the file (PNG, JPEG, ... via the image crate)
//   2. Flatten transparency onto white, convert to 8-bit luma
//   3. Pad to a square with the background shade so the
//      digit keeps its aspect ratio
//   4. Resize to 28×28
//   5. Invert when the background is light, since MNIST
//      digits are white strokes on black
//
// Pixel scaling is NOT done here; the inferencer applies the
// scale stored in the mobile manifest.
//
// Reference: image crate documentation

use anyhow::{Context, Result};
use image::{imageops::FilterType, GrayAlphaImage, GrayImage, Luma, LumaA};
use std::path::Path;

use crate::domain::digit::{DigitImage, IMAGE_HEIGHT, IMAGE_WIDTH};

pub struct Preprocessor {
    filter: FilterType,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self { filter: FilterType::Triangle }
    }

    /// Decode an image file and prepare it for classification.
    pub fn load(&self, path: &Path) -> Result<DigitImage> {
        let decoded = image::open(path)
            .with_context(|| format!("Cannot decode image '{}'", path.display()))?;
        tracing::debug!(
            "Decoded '{}' ({}x{})",
            path.display(), decoded.width(), decoded.height()
        );
        self.prepare(&flatten_alpha(&decoded.to_luma_alpha8()))
    }

    /// Square up, resize and normalise polarity of an in-memory grayscale image.
    pub fn prepare(&self, luma: &GrayImage) -> Result<DigitImage> {
        let square = pad_to_square(luma, border_mean(luma));

        let resized = if square.dimensions() == (IMAGE_WIDTH as u32, IMAGE_HEIGHT as u32) {
            square
        } else {
            image::imageops::resize(&square, IMAGE_WIDTH as u32, IMAGE_HEIGHT as u32, self.filter)
        };

        let digit = DigitImage::new(resized.into_raw())?;
        if has_light_background(&digit) {
            return Ok(digit.inverted());
        }
        Ok(digit)
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Composite over a white sheet: transparent areas read as paper.
pub fn flatten_alpha(image: &GrayAlphaImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let LumaA([l, a]) = *image.get_pixel(x, y);
        let (l, a) = (l as u32, a as u32);
        Luma([((l * a + 255 * (255 - a)) / 255) as u8])
    })
}

/// Centre `image` on a square canvas filled with `fill`.
fn pad_to_square(image: &GrayImage, fill: u8) -> GrayImage {
    let (w, h) = image.dimensions();
    if w == h {
        return image.clone();
    }
    let side = w.max(h);
    let mut canvas = GrayImage::from_pixel(side, side, Luma([fill]));
    image::imageops::overlay(&mut canvas, image, ((side - w) / 2) as i64, ((side - h) / 2) as i64);
    canvas
}

/// Mean shade of the outermost ring of pixels
fn border_mean(image: &GrayImage) -> u8 {
    let (w, h) = image.dimensions();
    let (sum, count) = image
        .enumerate_pixels()
        .filter(|(x, y, _)| *x == 0 || *y == 0 || *x == w - 1 || *y == h - 1)
        .fold((0u64, 0u64), |(s, n), (_, _, p)| (s + p.0[0] as u64, n + 1));
    (sum / count.max(1)) as u8
}

/// The border pixels decide: a mostly-bright frame means dark ink on paper.
fn has_light_background(digit: &DigitImage) -> bool {
    let (mut sum, mut count) = (0u32, 0u32);
    for row in 0..IMAGE_HEIGHT {
        for col in 0..IMAGE_WIDTH {
            if row == 0 || col == 0 || row == IMAGE_HEIGHT - 1 || col == IMAGE_WIDTH - 1 {
                sum   += digit.pixel(row, col) as u32;
                count += 1;
            }
        }
    }
    sum / count.max(1) > 127
}
