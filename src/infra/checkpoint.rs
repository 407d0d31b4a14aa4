// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores everything a later `evaluate`, `export`
// or re-run needs, all inside one artifact directory:
//
//   <artifact-dir>/
//     train_config.json          ← TrainConfig of the saved native model
//     checkpoints/
//       run_config.json          ← TrainConfig of the run in progress
//       model_epoch_1.mpk        ← CompactRecorder, one per epoch
//       ...
//       latest_epoch.json        ← number of the newest epoch
//     mnist_model.mpk.gz         ← final native model, full precision
//
// train_config.json is only replaced once the native model has
// been written, so a run that fails midway leaves the previous
// config, model and bundle untouched. Epoch snapshots carry their
// own run_config.json and are wiped when a new run begins.
//
// CompactRecorder stores half precision and is only used for
// per-epoch snapshots; the final model keeps full precision so
// the mobile export starts from exact weights.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::{CompactRecorder, FullPrecisionSettings, NamedMpkGzFileRecorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::DigitCnn;

/// Extension burn's NamedMpkGzFileRecorder appends to the native model
pub const NATIVE_MODEL_EXTENSION: &str = "mpk.gz";

type NativeRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

/// Manages model checkpoints and the saved training configuration.
pub struct CheckpointManager {
    /// Root artifact directory
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager, creating the directory tree.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let checkpoints = dir.join("checkpoints");
        fs::create_dir_all(&checkpoints)
            .with_context(|| format!("Cannot create '{}'", checkpoints.display()))?;
        Ok(Self { dir })
    }

    fn checkpoint_dir(&self) -> PathBuf {
        self.dir.join("checkpoints")
    }

    /// Drop the previous run's epoch snapshots and record `cfg` for this one.
    pub fn begin_run(&self, cfg: &TrainConfig) -> Result<()> {
        let dir = self.checkpoint_dir();
        let entries = fs::read_dir(&dir)
            .with_context(|| format!("Cannot list '{}'", dir.display()))?;

        for entry in entries {
            let entry = entry?;
            let name  = entry.file_name();
            let name  = name.to_string_lossy();
            let stale = name.starts_with("model_epoch_") || name == "latest_epoch.json";
            if stale && entry.file_type()?.is_file() {
                fs::remove_file(entry.path())
                    .with_context(|| format!("Cannot remove '{}'", entry.path().display()))?;
            }
        }

        write_json_atomic(&dir.join("run_config.json"), cfg)?;
        tracing::debug!("Started a fresh checkpoint run in '{}'", dir.display());
        Ok(())
    }

    /// Configuration of the run the epoch snapshots belong to.
    pub fn load_run_config(&self) -> Result<TrainConfig> {
        let path = self.checkpoint_dir().join("run_config.json");
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot find '{}'. Have you run 'train' first?", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Snapshot model weights after an epoch and move the latest pointer.
    pub fn save_checkpoint<B: Backend>(&self, model: &DigitCnn<B>, epoch: usize) -> Result<()> {
        let path = self.checkpoint_dir().join(format!("model_epoch_{epoch}"));

        model
            .clone()
            .save_file(path.clone(), &CompactRecorder::new())
            .map_err(|e| anyhow::anyhow!(
                "Failed to save checkpoint to '{}': {}", path.display(), e
            ))?;

        let latest_path = self.checkpoint_dir().join("latest_epoch.json");
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write '{}'", latest_path.display()))?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Load weights from the newest epoch snapshot into `model`.
    pub fn load_checkpoint<B: Backend>(
        &self,
        model:  DigitCnn<B>,
        device: &B::Device,
    ) -> Result<DigitCnn<B>> {
        let epoch = self.latest_epoch()?;
        let path  = self.checkpoint_dir().join(format!("model_epoch_{epoch}"));

        tracing::info!("Loading checkpoint from epoch {}", epoch);

        model
            .load_file(path.clone(), &CompactRecorder::new(), device)
            .map_err(|e| anyhow::anyhow!(
                "Cannot load checkpoint '{}': {}", path.display(), e
            ))
    }

    /// Read latest_epoch.json. Errors if training never saved an epoch.
    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.checkpoint_dir().join("latest_epoch.json");

        let s = fs::read_to_string(&path)
            .with_context(|| {
                format!("Cannot find '{}'. Have you run 'train' first?", path.display())
            })?;

        Ok(serde_json::from_str::<usize>(&s)?)
    }

    /// Path the native model is written to, extension included.
    pub fn native_model_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{NATIVE_MODEL_EXTENSION}"))
    }

    /// Save the trained model in burn's native format at full precision.
    pub fn save_native_model<B: Backend>(&self, model: &DigitCnn<B>, name: &str) -> Result<PathBuf> {
        let stem = self.dir.join(name);

        model
            .clone()
            .save_file(stem, &NativeRecorder::new())
            .map_err(|e| anyhow::anyhow!("Failed to save model '{}': {}", name, e))?;

        let path = self.native_model_path(name);
        tracing::info!("Saved native model to '{}'", path.display());
        Ok(path)
    }

    /// Load a previously saved native model into `model`.
    pub fn load_native_model<B: Backend>(
        &self,
        model:  DigitCnn<B>,
        name:   &str,
        device: &B::Device,
    ) -> Result<DigitCnn<B>> {
        let path = self.native_model_path(name);
        if !path.exists() {
            anyhow::bail!(
                "Native model '{}' not found. Have you run 'train' first?",
                path.display()
            );
        }

        model
            .load_file(self.dir.join(name), &NativeRecorder::new(), device)
            .map_err(|e| anyhow::anyhow!("Cannot load model '{}': {}", path.display(), e))
    }

    /// Save the training configuration to JSON.
    ///
    /// Called right after the native model is saved so the two
    /// always describe the same architecture.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        write_json_atomic(&path, cfg)?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    /// Load the training configuration from JSON.
    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");

        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read config from '{}'. \
                     Make sure you have run 'train' first.",
                    path.display()
                )
            })?;

        Ok(serde_json::from_str(&json)?)
    }
}

/// Write to a sibling temp file, then rename over `path`.
fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let tmp  = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(value)?;
    fs::write(&tmp, json)
        .with_context(|| format!("Cannot write '{}'", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("Cannot move '{}' into place", path.display()))?;
    Ok(())
}
