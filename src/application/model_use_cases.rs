// ============================================================
// Layer 2 — Evaluate / Export / Predict
// ============================================================
// The follow-up workflows that start from a finished run:
//
//   EvaluateUseCase → native model (or newest epoch snapshot)
//                     + test split → Evaluation
//   ExportUseCase   → native model → mobile bundle
//   PredictUseCase  → image file + mobile bundle → Prediction
//
// The first two read train_config.json to rebuild the
// architecture; predict only needs the bundle's manifest.

use anyhow::Result;
use std::path::PathBuf;

use crate::application::train_use_case::{select_source, TrainConfig};
use crate::data::{dataset::DigitDataset, preprocessor::Preprocessor};
use crate::domain::digit::{Prediction, Split};
use crate::domain::traits::DigitClassifier;
use crate::infra::{
    checkpoint::CheckpointManager,
    exporter::{MobileBundle, MobileExporter},
};
use crate::ml::{
    backend::{default_device, InferBackend, InferDevice},
    inferencer::Inferencer,
    model::DigitCnn,
    trainer::{eval_loader, evaluate, Evaluation},
};

/// Rebuild the trained network from an artifact directory.
fn load_native(artifact_dir: &str, device: &InferDevice) -> Result<(DigitCnn<InferBackend>, TrainConfig)> {
    let ckpt  = CheckpointManager::new(artifact_dir)?;
    let cfg   = ckpt.load_config()?;
    let model = cfg.model_config().init::<InferBackend>(device);
    let model = ckpt.load_native_model(model, &cfg.model_name, device)?;
    Ok((model, cfg))
}

/// Same, from the newest per-epoch snapshot. Works for interrupted runs.
fn load_latest_checkpoint(
    artifact_dir: &str,
    device:       &InferDevice,
) -> Result<(DigitCnn<InferBackend>, TrainConfig)> {
    let ckpt  = CheckpointManager::new(artifact_dir)?;
    let cfg   = ckpt.load_run_config()?;
    let model = cfg.model_config().init::<InferBackend>(device);
    let model = ckpt.load_checkpoint(model, device)?;
    Ok((model, cfg))
}

// ─── EvaluateUseCase ─────────────────────────────────────────────────────────
pub struct EvaluateUseCase {
    artifact_dir: String,
    /// Overrides the data directory recorded at training time
    data_dir:     Option<String>,
    from_checkpoint: bool,
}

impl EvaluateUseCase {
    pub fn new(artifact_dir: impl Into<String>, data_dir: Option<String>) -> Self {
        Self { artifact_dir: artifact_dir.into(), data_dir, from_checkpoint: false }
    }

    /// Evaluate the newest epoch snapshot instead of the final model.
    pub fn from_checkpoint(mut self, yes: bool) -> Self {
        self.from_checkpoint = yes;
        self
    }

    pub fn execute(&self) -> Result<Evaluation> {
        let device = default_device();
        let (model, cfg) = if self.from_checkpoint {
            load_latest_checkpoint(&self.artifact_dir, &device)?
        } else {
            load_native(&self.artifact_dir, &device)?
        };

        let data_dir = self.data_dir.clone().or(cfg.data_dir.clone());
        let source   = select_source(data_dir.as_deref(), None, cfg.seed);
        tracing::info!("Evaluating against {}", source.describe());

        let dataset = DigitDataset::new(source.load_split(Split::Test)?);
        let loader  = eval_loader::<InferBackend>(dataset, cfg.batch_size, cfg.num_workers, &device);
        Ok(evaluate(&model, &loader))
    }
}

// ─── ExportUseCase ────────────────────────────────────────────────────────────
pub struct ExportUseCase {
    artifact_dir: String,
    /// Overrides the bundle name recorded at training time
    mobile_name:  Option<String>,
}

impl ExportUseCase {
    pub fn new(artifact_dir: impl Into<String>, mobile_name: Option<String>) -> Self {
        Self { artifact_dir: artifact_dir.into(), mobile_name }
    }

    pub fn execute(&self) -> Result<MobileBundle> {
        let device = default_device();
        let (model, cfg) = load_native(&self.artifact_dir, &device)?;

        let name = self.mobile_name.clone().unwrap_or_else(|| cfg.mobile_name.clone());
        MobileExporter::new(&self.artifact_dir, name).export(&model, &cfg.model_config())
    }
}

// ─── PredictUseCase ───────────────────────────────────────────────────────────
pub struct PredictUseCase {
    inferencer:   Inferencer<InferBackend>,
    preprocessor: Preprocessor,
}

impl PredictUseCase {
    pub fn new(artifact_dir: impl Into<PathBuf>, mobile_name: impl Into<String>) -> Result<Self> {
        let exporter   = MobileExporter::new(artifact_dir, mobile_name);
        let inferencer = Inferencer::from_bundle(&exporter, default_device())?;
        Ok(Self { inferencer, preprocessor: Preprocessor::new() })
    }

    pub fn predict(&self, image_path: &std::path::Path) -> Result<Prediction> {
        let image = self.preprocessor.load(image_path)?;
        self.inferencer.classify(&image)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{dataset::DigitSample, loader::write_idx_split};
    use crate::domain::digit::{DigitImage, IMAGE_PIXELS};
    use image::{GrayImage, Luma};

    /// Artifact dir holding a config and an untrained native model.
    fn prepared_artifacts() -> (tempfile::TempDir, TrainConfig) {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            artifact_dir:  dir.path().to_string_lossy().into_owned(),
            batch_size:    4,
            num_workers:   0,
            conv_channels: 2,
            hidden_size:   4,
            ..TrainConfig::default()
        };
        let ckpt  = CheckpointManager::new(dir.path()).unwrap();
        ckpt.save_config(&cfg).unwrap();
        let model = cfg.model_config().init::<InferBackend>(&default_device());
        ckpt.save_native_model(&model, &cfg.model_name).unwrap();
        (dir, cfg)
    }

    #[test]
    fn test_evaluate_reads_test_split() {
        let (dir, cfg) = prepared_artifacts();
        let data = tempfile::tempdir().unwrap();
        let samples: Vec<DigitSample> = (0..6u8)
            .map(|l| DigitSample::new(DigitImage::new(vec![l * 40; IMAGE_PIXELS]).unwrap(), l))
            .collect();
        write_idx_split(data.path(), Split::Test, &samples).unwrap();

        let eval = EvaluateUseCase::new(
            cfg.artifact_dir.clone(),
            Some(data.path().to_string_lossy().into_owned()),
        )
        .execute()
        .unwrap();

        assert_eq!(eval.samples, 6);
        assert!((0.0..=1.0).contains(&eval.accuracy));
        drop(dir);
    }

    #[test]
    fn test_evaluate_from_checkpoint() {
        let (dir, cfg) = prepared_artifacts();
        let ckpt  = CheckpointManager::new(dir.path()).unwrap();
        let model = cfg.model_config().init::<InferBackend>(&default_device());
        ckpt.begin_run(&cfg).unwrap();
        ckpt.save_checkpoint(&model, 1).unwrap();

        let data = tempfile::tempdir().unwrap();
        let samples: Vec<DigitSample> = (0..4u8)
            .map(|l| DigitSample::new(DigitImage::new(vec![l * 60; IMAGE_PIXELS]).unwrap(), l))
            .collect();
        write_idx_split(data.path(), Split::Test, &samples).unwrap();

        let eval = EvaluateUseCase::new(
            cfg.artifact_dir.clone(),
            Some(data.path().to_string_lossy().into_owned()),
        )
        .from_checkpoint(true)
        .execute()
        .unwrap();
        assert_eq!(eval.samples, 4);
    }

    #[test]
    fn test_export_then_predict() {
        let (dir, cfg) = prepared_artifacts();

        let bundle = ExportUseCase::new(cfg.artifact_dir.clone(), Some("Digits".to_string()))
            .execute()
            .unwrap();
        assert!(bundle.weights.exists());

        let image_path = dir.path().join("digit.png");
        let mut img = GrayImage::new(28, 28);
        for y in 5..23 {
            img.put_pixel(14, y, Luma([255]));
        }
        img.save(&image_path).unwrap();

        let p = PredictUseCase::new(dir.path(), "Digits")
            .unwrap()
            .predict(&image_path)
            .unwrap();
        assert!(p.digit < 10);
        assert_eq!(p.probabilities.len(), 10);
    }

    #[test]
    fn test_commands_fail_without_training() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_string_lossy().into_owned();
        assert!(EvaluateUseCase::new(path.clone(), None).execute().is_err());
        assert!(ExportUseCase::new(path, None).execute().is_err());
        assert!(PredictUseCase::new(dir.path(), "MNISTClassifier").is_err());
    }
}
