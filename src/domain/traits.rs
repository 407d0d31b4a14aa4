// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer talks to data sources and classifiers
// through these traits, so the MNIST download and a local IDX
// directory are interchangeable, and `predict` does not care
// which backend the classifier runs on.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::digit::{DigitImage, DigitSample, Prediction, Split};

// ─── DigitSource ──────────────────────────────────────────────────────────────
/// Anything that can produce labelled digit samples.
///
/// Implementations:
///   - MnistLoader → burn's downloaded and cached MNIST
///   - IdxLoader   → raw IDX files in a local directory
pub trait DigitSource {
    /// Load every sample of the requested partition.
    fn load_split(&self, split: Split) -> Result<Vec<DigitSample>>;

    /// Short human readable name, used in log lines
    fn describe(&self) -> String;
}

// ─── DigitClassifier ──────────────────────────────────────────────────────────
/// Anything that can classify a single digit image.
///
/// Implementations:
///   - Inferencer → the exported mobile bundle
pub trait DigitClassifier {
    fn classify(&self, image: &DigitImage) -> Result<Prediction>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::digit::IMAGE_PIXELS;

    /// A source built from domain types alone
    struct InMemory(Vec<DigitSample>);

    impl DigitSource for InMemory {
        fn load_split(&self, split: Split) -> Result<Vec<DigitSample>> {
            Ok(match split {
                Split::Train => self.0.clone(),
                Split::Test  => Vec::new(),
            })
        }

        fn describe(&self) -> String {
            format!("{} in-memory samples", self.0.len())
        }
    }

    #[test]
    fn test_source_from_domain_samples() {
        let sample = DigitSample::new(DigitImage::new(vec![7; IMAGE_PIXELS]).unwrap(), 7);
        let source: Box<dyn DigitSource> = Box::new(InMemory(vec![sample]));

        let train = source.load_split(Split::Train).unwrap();
        assert_eq!(train[0].label, 7);
        assert!(source.load_split(Split::Test).unwrap().is_empty());
        assert_eq!(source.describe(), "1 in-memory samples");
    }
}
