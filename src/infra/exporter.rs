// ============================================================
// Layer 6 — Mobile Exporter
// ============================================================
// Converts a trained model into the on-device bundle:
//
//   <name>.bin   ← weights, BinFileRecorder, full precision.
//                  The same bytes load with BinBytesRecorder
//                  when embedded via include_bytes! in an
//                  Android / iOS / wasm build.
//   <name>.json  ← MobileManifest: architecture, one input
//                  descriptor, one output descriptor, labels.
//
// The single input descriptor is fixed:
//   name "image", shape [1, 28, 28, 1], scale 1/255, grayscale
//
// Reference: Burn Book §5 (Records), burn mnist-inference-web

use anyhow::{bail, Context, Result};
use burn::{
    prelude::*,
    record::{BinFileRecorder, FullPrecisionSettings},
};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::digit::{IMAGE_HEIGHT, IMAGE_WIDTH, NUM_CLASSES, PIXEL_SCALE};
use crate::ml::model::{DigitCnn, DigitCnnConfig};

/// Identifies bundles this crate knows how to read
pub const BUNDLE_FORMAT: &str = "burn-bin/digit-cnn";
pub const BUNDLE_VERSION: u32 = 1;

pub type BundleRecorder = BinFileRecorder<FullPrecisionSettings>;

/// Describes a model input to the host application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDescriptor {
    pub name:  String,
    /// NHWC, batch first
    pub shape: [usize; 4],
    /// Multiplier applied to each raw 0..=255 pixel
    pub scale: f32,
    pub color_layout: String,
}

impl InputDescriptor {
    /// The one input the digit classifier accepts
    pub fn image() -> Self {
        Self {
            name:  "image".to_string(),
            shape: [1, IMAGE_HEIGHT, IMAGE_WIDTH, 1],
            scale: PIXEL_SCALE,
            color_layout: "grayscale".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDescriptor {
    pub name:  String,
    pub shape: [usize; 2],
    pub activation: String,
}

/// Everything a host needs besides the raw weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobileManifest {
    pub format:  String,
    pub version: u32,
    pub model:   DigitCnnConfig,
    pub inputs:  Vec<InputDescriptor>,
    pub outputs: Vec<OutputDescriptor>,
    pub class_labels: Vec<String>,
}

impl MobileManifest {
    pub fn new(model: DigitCnnConfig) -> Self {
        let outputs = vec![OutputDescriptor {
            name:  "classLabelProbs".to_string(),
            shape: [1, model.num_classes],
            activation: "softmax".to_string(),
        }];
        Self {
            format:  BUNDLE_FORMAT.to_string(),
            version: BUNDLE_VERSION,
            inputs:  vec![InputDescriptor::image()],
            outputs,
            class_labels: (0..model.num_classes).map(|c| c.to_string()).collect(),
            model,
        }
    }

    /// The image input; a bundle without exactly one is unusable.
    pub fn image_input(&self) -> Result<&InputDescriptor> {
        match self.inputs.as_slice() {
            [input] => Ok(input),
            other => bail!("Expected exactly one input descriptor, found {}", other.len()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.format != BUNDLE_FORMAT {
            bail!("Unknown bundle format '{}'", self.format);
        }
        if self.version > BUNDLE_VERSION {
            bail!("Bundle version {} is newer than supported {}", self.version, BUNDLE_VERSION);
        }
        let input = self.image_input()?;
        if input.shape != [1, IMAGE_HEIGHT, IMAGE_WIDTH, 1] {
            bail!("Unsupported input shape {:?}", input.shape);
        }
        if self.class_labels.len() != self.model.num_classes {
            bail!(
                "Manifest lists {} labels for {} classes",
                self.class_labels.len(), self.model.num_classes
            );
        }
        Ok(())
    }
}

/// Paths written by one export
#[derive(Debug, Clone)]
pub struct MobileBundle {
    pub weights:  PathBuf,
    pub manifest: PathBuf,
}

pub struct MobileExporter {
    dir:  PathBuf,
    name: String,
}

impl MobileExporter {
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self { dir: dir.into(), name: name.into() }
    }

    pub fn weights_path(&self) -> PathBuf {
        self.dir.join(format!("{}.bin", self.name))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.name))
    }

    /// Write weights and manifest for `model`.
    pub fn export<B: Backend>(&self, model: &DigitCnn<B>, config: &DigitCnnConfig) -> Result<MobileBundle> {
        if config.num_classes != NUM_CLASSES {
            bail!("Digit bundles need {} classes, model has {}", NUM_CLASSES, config.num_classes);
        }

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        model
            .clone()
            .save_file(self.dir.join(&self.name), &BundleRecorder::new())
            .map_err(|e| anyhow::anyhow!("Failed to write mobile weights '{}': {}", self.name, e))?;

        let manifest      = MobileManifest::new(config.clone());
        let manifest_path = self.manifest_path();
        fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)
            .with_context(|| format!("Cannot write '{}'", manifest_path.display()))?;

        let bundle = MobileBundle { weights: self.weights_path(), manifest: manifest_path };
        tracing::info!(
            "Exported mobile bundle: '{}' + '{}'",
            bundle.weights.display(), bundle.manifest.display()
        );
        Ok(bundle)
    }

    /// Read and validate the manifest.
    pub fn load_manifest(&self) -> Result<MobileManifest> {
        read_manifest(&self.manifest_path())
    }

    /// Rebuild the model described by the manifest and load the weights.
    pub fn load<B: Backend>(&self, device: &B::Device) -> Result<(DigitCnn<B>, MobileManifest)> {
        let manifest = self.load_manifest()?;
        let weights  = self.weights_path();
        if !weights.exists() {
            bail!("Mobile weights '{}' not found", weights.display());
        }

        let model = manifest
            .model
            .init::<B>(device)
            .load_file(self.dir.join(&self.name), &BundleRecorder::new(), device)
            .map_err(|e| anyhow::anyhow!("Cannot load '{}': {}", weights.display(), e))?;

        Ok((model, manifest))
    }
}

pub fn read_manifest(path: &Path) -> Result<MobileManifest> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read manifest '{}'. Has the model been exported?", path.display()))?;
    let manifest: MobileManifest = serde_json::from_str(&json)
        .with_context(|| format!("Malformed manifest '{}'", path.display()))?;
    manifest.validate()?;
    Ok(manifest)
}
