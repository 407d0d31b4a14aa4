// ============================================================
// Layer 2 — FetchUseCase
// ============================================================
// Downloads MNIST once through burn's dataset cache and writes
// both partitions as raw IDX files, so later runs can train
// offline with `train --data-dir <dir>`.

use anyhow::Result;
use std::path::PathBuf;

use crate::data::loader::{write_idx_split, MnistLoader};
use crate::domain::digit::Split;
use crate::domain::traits::DigitSource;

/// Number of samples written per partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchReport {
    pub train: usize,
    pub test:  usize,
}

pub struct FetchUseCase {
    out_dir: PathBuf,
    source:  Box<dyn DigitSource>,
}

impl FetchUseCase {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self::with_source(out_dir, Box::new(MnistLoader::new(None, 0)))
    }

    pub fn with_source(out_dir: impl Into<PathBuf>, source: Box<dyn DigitSource>) -> Self {
        Self { out_dir: out_dir.into(), source }
    }

    pub fn execute(&self) -> Result<FetchReport> {
        tracing::info!("Fetching {} into '{}'", self.source.describe(), self.out_dir.display());

        let train = self.source.load_split(Split::Train)?;
        write_idx_split(&self.out_dir, Split::Train, &train)?;

        let test = self.source.load_split(Split::Test)?;
        write_idx_split(&self.out_dir, Split::Test, &test)?;

        tracing::info!("Wrote {} train and {} test images", train.len(), test.len());
        Ok(FetchReport { train: train.len(), test: test.len() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{dataset::DigitSample, loader::IdxLoader};
    use crate::domain::digit::{DigitImage, IMAGE_PIXELS};

    fn samples(n: usize) -> Vec<DigitSample> {
        (0..n)
            .map(|i| DigitSample::new(DigitImage::new(vec![i as u8; IMAGE_PIXELS]).unwrap(), (i % 10) as u8))
            .collect()
    }

    #[test]
    fn test_fetch_copies_source_into_idx_dir() {
        let src = tempfile::tempdir().unwrap();
        write_idx_split(src.path(), Split::Train, &samples(7)).unwrap();
        write_idx_split(src.path(), Split::Test, &samples(3)).unwrap();

        let out = tempfile::tempdir().unwrap();
        let report = FetchUseCase::with_source(
            out.path().join("mnist"),
            Box::new(IdxLoader::new(src.path(), None, 0)),
        )
        .execute()
        .unwrap();
        assert_eq!(report, FetchReport { train: 7, test: 3 });

        let copy = IdxLoader::new(out.path().join("mnist"), None, 0);
        let test = copy.load_split(Split::Test).unwrap();
        assert_eq!(test.len(), 3);
        assert_eq!(test[2].label, 2);
    }
}
