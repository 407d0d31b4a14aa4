// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full pipeline in order:
//
//   Step 0: Validate the configuration
//   Step 1: Load train + test partitions  (Layer 4 - data)
//   Step 2: Build Burn datasets           (Layer 4 - data)
//   Step 3: Start a checkpoint run        (Layer 6 - infra)
//   Step 4: Fit, validating every epoch   (Layer 5 - ml)
//   Step 5: Evaluate on the test set      (Layer 5 - ml)
//   Step 6: Save native model + config    (Layer 6 - infra)
//   Step 7: Export the mobile bundle      (Layer 6 - infra)
//
// Reference: Burn Book §5 (Training)

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{
    dataset::DigitDataset,
    loader::{IdxLoader, MnistLoader},
};
use crate::domain::digit::{Split, NUM_CLASSES};
use crate::domain::traits::DigitSource;
use crate::infra::{
    checkpoint::CheckpointManager,
    exporter::{MobileBundle, MobileExporter},
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::{
    backend::{default_device, InferBackend, TrainBackend},
    model::DigitCnnConfig,
    trainer::{eval_loader, evaluate, run_training, Evaluation},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings for a training run. Saved to train_config.json so
// `evaluate` and `export` can rebuild the same architecture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub artifact_dir:  String,
    pub data_dir:      Option<String>,
    pub epochs:        usize,
    pub batch_size:    usize,
    pub lr:            f64,
    pub num_workers:   usize,
    pub seed:          u64,
    pub limit:         Option<usize>,
    pub conv_channels: usize,
    pub hidden_size:   usize,
    pub model_name:    String,
    pub mobile_name:   String,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            artifact_dir:  "artifacts".to_string(),
            data_dir:      None,
            epochs:        5,
            batch_size:    32,
            lr:            1e-3,
            num_workers:   2,
            seed:          42,
            limit:         None,
            conv_channels: 32,
            hidden_size:   128,
            model_name:    "mnist_model".to_string(),
            mobile_name:   "MNISTClassifier".to_string(),
        }
    }
}

impl TrainConfig {
    /// Reject settings that would panic inside burn or silently misbehave.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.epochs > 0, "epochs must be at least 1");
        ensure!(self.batch_size > 0, "batch_size must be at least 1");
        ensure!(self.conv_channels > 0, "conv_channels must be at least 1");
        ensure!(self.hidden_size > 0, "hidden_size must be at least 1");
        ensure!(self.limit != Some(0), "limit must be at least 1 when given");
        ensure!(
            self.lr.is_finite() && self.lr > 0.0,
            "lr must be a positive number, got {}", self.lr
        );
        Ok(())
    }

    /// Architecture hyper-parameters for the network
    pub fn model_config(&self) -> DigitCnnConfig {
        DigitCnnConfig::new()
            .with_num_classes(NUM_CLASSES)
            .with_conv_channels(self.conv_channels)
            .with_hidden_size(self.hidden_size)
    }
}

/// Pick the IDX directory when one is given, otherwise burn's MNIST download.
pub fn select_source(data_dir: Option<&str>, limit: Option<usize>, seed: u64) -> Box<dyn DigitSource> {
    match data_dir {
        Some(dir) => Box::new(IdxLoader::new(dir, limit, seed)),
        None      => Box::new(MnistLoader::new(limit, seed)),
    }
}

/// What a completed run produced
#[derive(Debug)]
pub struct TrainReport {
    pub history:      Vec<EpochMetrics>,
    pub test:         Evaluation,
    pub native_model: PathBuf,
    pub bundle:       MobileBundle,
}

impl TrainReport {
    /// Epoch with the highest validation accuracy; the first one wins ties.
    pub fn best_epoch(&self) -> Option<&EpochMetrics> {
        self.history.iter().fold(None, |best: Option<&EpochMetrics>, m| match best {
            Some(b) if !m.is_improvement(b.val_acc) => Some(b),
            _ => Some(m),
        })
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full pipeline end to end
    pub fn execute(&self) -> Result<TrainReport> {
        let cfg = &self.config;

        // ── Step 0: Validate ─────────────────────────────────────────────────
        cfg.validate()?;

        // ── Step 1: Load both partitions ─────────────────────────────────────
        let source = select_source(cfg.data_dir.as_deref(), cfg.limit, cfg.seed);
        tracing::info!("Loading digits from {}", source.describe());
        let train_samples = source.load_split(Split::Train)?;
        let test_samples  = source.load_split(Split::Test)?;
        tracing::info!(
            "Loaded {} train, {} test samples",
            train_samples.len(),
            test_samples.len()
        );

        // ── Step 2: Build Burn datasets ──────────────────────────────────────
        // The test set is used twice: validation during fit, then the final report.
        let train_dataset = DigitDataset::new(train_samples);
        let valid_dataset = DigitDataset::new(test_samples.clone());
        let test_dataset  = DigitDataset::new(test_samples);
        tracing::debug!("Train class histogram: {:?}", train_dataset.class_histogram());

        // ── Step 3: Fresh checkpoint run; train_config.json waits for step 6 ──
        let ckpt_manager = CheckpointManager::new(&cfg.artifact_dir)?;
        ckpt_manager.begin_run(cfg)?;
        let metrics = MetricsLogger::new(&cfg.artifact_dir)?;
        tracing::info!("Per-epoch metrics go to '{}'", metrics.csv_path().display());

        // ── Step 4: Fit ──────────────────────────────────────────────────────
        let device  = default_device();
        let outcome = run_training::<TrainBackend>(
            cfg, train_dataset, valid_dataset, &ckpt_manager, &metrics, device.clone(),
        )?;

        // ── Step 5: Evaluate ─────────────────────────────────────────────────
        let loader = eval_loader::<InferBackend>(test_dataset, cfg.batch_size, cfg.num_workers, &device);
        let test   = evaluate(&outcome.model, &loader);
        println!("\ntest accuracy: {}", test.accuracy);
        tracing::info!("Test loss {:.4}, accuracy {:.4} over {} samples", test.loss, test.accuracy, test.samples);

        // ── Step 6: Save native model, then the config that describes it ─────
        let native_model = ckpt_manager.save_native_model(&outcome.model, &cfg.model_name)?;
        ckpt_manager.save_config(cfg)?;

        // ── Step 7: Convert to the mobile bundle ─────────────────────────────
        let exporter = MobileExporter::new(&cfg.artifact_dir, &cfg.mobile_name);
        let bundle   = exporter.export(&outcome.model, &cfg.model_config())?;

        Ok(TrainReport {
            history: outcome.history,
            test,
            native_model,
            bundle,
        })
    }
}
