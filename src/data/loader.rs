// ============================================================
// Layer 4 — Digit Loaders
// ============================================================
// Two DigitSource implementations:
//
//   MnistLoader → burn's MnistDataset. Downloads the four IDX
//                 files once into the burn-dataset cache and
//                 reads them from there afterwards.
//
//   IdxLoader   → the same four IDX files, uncompressed, from
//                 a local directory (offline machines, tests).
//
// IDX layout (all integers big-endian u32):
//   images: magic 0x00000803 | count | rows | cols | pixels...
//   labels: magic 0x00000801 | count | labels...
//
// Both loaders apply the optional seeded `limit`.
//
// Reference: burn-dataset vision::mnist
//            Rust Book §9 (Error Handling)

use anyhow::{bail, ensure, Context, Result};
use burn::data::dataset::{vision::MnistDataset, Dataset};
use std::{
    fs,
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
};

use crate::data::dataset::DigitSample;
use crate::data::sampler::sample_subset;
use crate::domain::digit::{DigitImage, Split, IMAGE_HEIGHT, IMAGE_PIXELS, IMAGE_WIDTH, NUM_CLASSES};
use crate::domain::traits::DigitSource;

const IMAGES_MAGIC: u32 = 0x0000_0803;
const LABELS_MAGIC: u32 = 0x0000_0801;

const TRAIN_IMAGES: &str = "train-images-idx3-ubyte";
const TRAIN_LABELS: &str = "train-labels-idx1-ubyte";
const TEST_IMAGES:  &str = "t10k-images-idx3-ubyte";
const TEST_LABELS:  &str = "t10k-labels-idx1-ubyte";

// ─── MnistLoader ──────────────────────────────────────────────────────────────
/// Loads MNIST through burn's built-in dataset.
pub struct MnistLoader {
    /// Keep at most this many training samples
    limit: Option<usize>,
    seed:  u64,
}

impl MnistLoader {
    pub fn new(limit: Option<usize>, seed: u64) -> Self {
        Self { limit, seed }
    }
}

impl DigitSource for MnistLoader {
    fn load_split(&self, split: Split) -> Result<Vec<DigitSample>> {
        let dataset = catch_panic(&format!("MNIST {split} download"), || match split {
            Split::Train => MnistDataset::train(),
            Split::Test  => MnistDataset::test(),
        })?;

        let samples: Vec<DigitSample> = dataset
            .iter()
            .map(|item| DigitSample::new(DigitImage::from_grid(&item.image), item.label))
            .collect();

        tracing::debug!("MNIST {} split: {} samples", split, samples.len());
        Ok(apply_limit(samples, split, self.limit, self.seed))
    }

    fn describe(&self) -> String {
        "MNIST (burn-dataset cache)".to_string()
    }
}

// ─── IdxLoader ────────────────────────────────────────────────────────────────
/// Loads uncompressed IDX files from a directory.
pub struct IdxLoader {
    dir:   PathBuf,
    limit: Option<usize>,
    seed:  u64,
}

impl IdxLoader {
    pub fn new(dir: impl Into<PathBuf>, limit: Option<usize>, seed: u64) -> Self {
        Self { dir: dir.into(), limit, seed }
    }

    /// File names (images, labels) for a split
    pub fn file_names(split: Split) -> (&'static str, &'static str) {
        match split {
            Split::Train => (TRAIN_IMAGES, TRAIN_LABELS),
            Split::Test  => (TEST_IMAGES, TEST_LABELS),
        }
    }
}

impl DigitSource for IdxLoader {
    fn load_split(&self, split: Split) -> Result<Vec<DigitSample>> {
        let (images_name, labels_name) = Self::file_names(split);

        let images = read_idx_file(&self.dir.join(images_name))
            .and_then(|bytes| parse_images(&bytes))
            .with_context(|| format!("Cannot load {} images from '{}'", split, self.dir.display()))?;
        let labels = read_idx_file(&self.dir.join(labels_name))
            .and_then(|bytes| parse_labels(&bytes))
            .with_context(|| format!("Cannot load {} labels from '{}'", split, self.dir.display()))?;

        ensure!(
            images.len() == labels.len(),
            "{} split has {} images but {} labels",
            split, images.len(), labels.len()
        );

        let samples: Vec<DigitSample> = images
            .into_iter()
            .zip(labels)
            .map(|(image, label)| DigitSample::new(image, label))
            .collect();

        tracing::debug!("IDX {} split: {} samples", split, samples.len());
        Ok(apply_limit(samples, split, self.limit, self.seed))
    }

    fn describe(&self) -> String {
        format!("IDX files in '{}'", self.dir.display())
    }
}

/// `limit` only applies to training data; evaluation always sees the full test set.
fn apply_limit(samples: Vec<DigitSample>, split: Split, limit: Option<usize>, seed: u64) -> Vec<DigitSample> {
    match split {
        Split::Train => sample_subset(samples, limit, seed),
        Split::Test  => samples,
    }
}

/// burn-dataset panics when the download or cache fails; surface that as an error.
fn catch_panic<T>(what: &str, f: impl FnOnce() -> T) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let reason = payload
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| payload.downcast_ref::<&str>().copied())
            .unwrap_or("unknown panic");
        anyhow::anyhow!("{what} failed: {reason}")
    })
}

fn read_idx_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Cannot read '{}'", path.display()))
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    let Some(chunk) = bytes.get(offset..offset + 4) else {
        bail!("IDX header truncated at byte {}", offset);
    };
    Ok(u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
}

/// Parse an IDX3 image file into 28×28 images.
pub fn parse_images(bytes: &[u8]) -> Result<Vec<DigitImage>> {
    let magic = read_u32(bytes, 0)?;
    ensure!(magic == IMAGES_MAGIC, "Bad image file magic {:#010x}", magic);

    let count = read_u32(bytes, 4)? as usize;
    let rows  = read_u32(bytes, 8)? as usize;
    let cols  = read_u32(bytes, 12)? as usize;
    ensure!(
        rows == IMAGE_HEIGHT && cols == IMAGE_WIDTH,
        "Expected {}x{} images, file holds {}x{}",
        IMAGE_HEIGHT, IMAGE_WIDTH, rows, cols
    );

    let body = &bytes[16..];
    ensure!(
        body.len() >= count * IMAGE_PIXELS,
        "Image file declares {} images but holds only {} bytes of pixels",
        count, body.len()
    );

    body.chunks_exact(IMAGE_PIXELS)
        .take(count)
        .map(|chunk| DigitImage::new(chunk.to_vec()))
        .collect()
}

/// Parse an IDX1 label file.
pub fn parse_labels(bytes: &[u8]) -> Result<Vec<u8>> {
    let magic = read_u32(bytes, 0)?;
    ensure!(magic == LABELS_MAGIC, "Bad label file magic {:#010x}", magic);

    let count = read_u32(bytes, 4)? as usize;
    let body  = &bytes[8..];
    ensure!(
        body.len() >= count,
        "Label file declares {} labels but holds only {}",
        count, body.len()
    );

    let labels = body[..count].to_vec();
    if let Some(bad) = labels.iter().find(|&&l| l as usize >= NUM_CLASSES) {
        bail!("Label {} is outside 0..{}", bad, NUM_CLASSES);
    }
    Ok(labels)
}

/// Serialise images into IDX3 bytes. Inverse of `parse_images`.
pub fn encode_images(images: &[DigitImage]) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + images.len() * IMAGE_PIXELS);
    out.extend_from_slice(&IMAGES_MAGIC.to_be_bytes());
    out.extend_from_slice(&(images.len() as u32).to_be_bytes());
    out.extend_from_slice(&(IMAGE_HEIGHT as u32).to_be_bytes());
    out.extend_from_slice(&(IMAGE_WIDTH as u32).to_be_bytes());
    for img in images {
        out.extend_from_slice(img.pixels());
    }
    out
}

/// Serialise labels into IDX1 bytes. Inverse of `parse_labels`.
pub fn encode_labels(labels: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + labels.len());
    out.extend_from_slice(&LABELS_MAGIC.to_be_bytes());
    out.extend_from_slice(&(labels.len() as u32).to_be_bytes());
    out.extend_from_slice(labels);
    out
}

/// Write a split as the two IDX files `IdxLoader` expects.
pub fn write_idx_split(dir: &Path, split: Split, samples: &[DigitSample]) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Cannot create '{}'", dir.display()))?;

    let (images_name, labels_name) = IdxLoader::file_names(split);
    let images: Vec<DigitImage> = samples.iter().map(|s| s.image.clone()).collect();
    let labels: Vec<u8> = samples.iter().map(|s| s.label).collect();

    let images_path = dir.join(images_name);
    fs::write(&images_path, encode_images(&images))
        .with_context(|| format!("Cannot write '{}'", images_path.display()))?;

    let labels_path = dir.join(labels_name);
    fs::write(&labels_path, encode_labels(&labels))
        .with_context(|| format!("Cannot write '{}'", labels_path.display()))?;

    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn samples(n: usize) -> Vec<DigitSample> {
        (0..n)
            .map(|i| {
                let label = (i % NUM_CLASSES) as u8;
                let image = DigitImage::new(vec![label * 20; IMAGE_PIXELS]).unwrap();
                DigitSample::new(image, label)
            })
            .collect()
    }

    #[test]
    fn test_catch_panic_turns_panics_into_errors() {
        let err = catch_panic("MNIST train download", || -> u8 { panic!("cache missing") }).unwrap_err();
        assert!(err.to_string().contains("MNIST train download failed: cache missing"));
        assert_eq!(catch_panic("noop", || 3).unwrap(), 3);
    }

    #[test]
    fn test_parse_labels() {
        let bytes = encode_labels(&[3, 1, 4]);
        assert_eq!(parse_labels(&bytes).unwrap(), vec![3, 1, 4]);
    }

    #[test]
    fn test_parse_images_reads_pixels() {
        let mut pixels = vec![0u8; IMAGE_PIXELS];
        pixels[30] = 200;
        let img = DigitImage::new(pixels).unwrap();
        let parsed = parse_images(&encode_images(&[img.clone(), img.clone()])).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].pixel(1, 2), 200);
    }

    #[test]
    fn test_bad_magic_is_rejected() {
        let mut bytes = encode_labels(&[1]);
        bytes[3] = 0x03;
        assert!(parse_labels(&bytes).is_err());
        assert!(parse_images(&encode_labels(&[1])).is_err());
    }

    #[test]
    fn test_truncated_files_are_rejected() {
        let mut bytes = encode_images(&[DigitImage::new(vec![1; IMAGE_PIXELS]).unwrap()]);
        bytes.truncate(100);
        assert!(parse_images(&bytes).is_err());
        assert!(parse_labels(&[0, 0]).is_err());
    }

    #[test]
    fn test_out_of_range_label_is_rejected() {
        assert!(parse_labels(&encode_labels(&[2, 10])).is_err());
    }

    #[test]
    fn test_wrong_dimensions_are_rejected() {
        let mut bytes = encode_images(&[]);
        bytes[11] = 32;
        assert!(parse_images(&bytes).is_err());
    }

    #[test]
    fn test_idx_loader_reads_written_split() {
        let dir = tempfile::tempdir().unwrap();
        write_idx_split(dir.path(), Split::Train, &samples(12)).unwrap();
        write_idx_split(dir.path(), Split::Test, &samples(5)).unwrap();

        let loader = IdxLoader::new(dir.path(), None, 0);
        let train  = loader.load_split(Split::Train).unwrap();
        let test   = loader.load_split(Split::Test).unwrap();

        assert_eq!(train.len(), 12);
        assert_eq!(test.len(), 5);
        assert_eq!(train[7].label, 7);
        assert_eq!(train[7].image.pixel(0, 0), 140);
    }

    #[test]
    fn test_limit_applies_to_train_only() {
        let dir = tempfile::tempdir().unwrap();
        write_idx_split(dir.path(), Split::Train, &samples(20)).unwrap();
        write_idx_split(dir.path(), Split::Test, &samples(20)).unwrap();

        let loader = IdxLoader::new(dir.path(), Some(6), 42);
        assert_eq!(loader.load_split(Split::Train).unwrap().len(), 6);
        assert_eq!(loader.load_split(Split::Test).unwrap().len(), 20);
    }

    #[test]
    fn test_missing_directory_errors() {
        let loader = IdxLoader::new("/definitely/not/here", None, 0);
        assert!(loader.load_split(Split::Test).is_err());
    }
}
