// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Runs the exported mobile bundle the way a device would:
// read the manifest, rebuild the network, load the binary
// weights, scale raw pixels by the manifest's input scale,
// softmax the logits.

use anyhow::Result;
use burn::prelude::*;

use crate::domain::digit::{DigitImage, Prediction, IMAGE_HEIGHT, IMAGE_WIDTH};
use crate::domain::traits::DigitClassifier;
use crate::infra::exporter::{MobileExporter, MobileManifest};
use crate::ml::model::DigitCnn;

pub struct Inferencer<B: Backend> {
    model:    DigitCnn<B>,
    manifest: MobileManifest,
    device:   B::Device,
}

impl<B: Backend> Inferencer<B> {
    pub fn from_bundle(exporter: &MobileExporter, device: B::Device) -> Result<Self> {
        let (model, manifest) = exporter.load::<B>(&device)?;
        tracing::info!(
            "Mobile model loaded ({} classes, input '{}')",
            manifest.class_labels.len(),
            manifest.image_input()?.name,
        );
        Ok(Self { model, manifest, device })
    }
}

impl<B: Backend> DigitClassifier for Inferencer<B> {
    fn classify(&self, image: &DigitImage) -> Result<Prediction> {
        let scale = self.manifest.image_input()?.scale;
        let input = Tensor::<B, 1>::from_floats(image.scaled(scale).as_slice(), &self.device)
            .reshape([1, IMAGE_HEIGHT, IMAGE_WIDTH]);

        let probabilities: Vec<f32> = self
            .model
            .forward_probabilities(input)
            .into_data()
            .convert::<f32>()
            .to_vec()
            .map_err(|e| anyhow::anyhow!("Cannot read model output: {e:?}"))?;

        let prediction = Prediction::from_probabilities(probabilities)?;
        tracing::debug!("Predicted {} (p={:.4})", prediction.digit, prediction.confidence);
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::digit::IMAGE_PIXELS;
    use crate::ml::model::DigitCnnConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_classify_with_exported_bundle() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let config = DigitCnnConfig::new().with_conv_channels(2).with_hidden_size(4);
        let model  = config.init::<TestBackend>(&device);

        let exporter = MobileExporter::new(dir.path(), "MNISTClassifier");
        exporter.export(&model, &config).unwrap();

        let inferencer = Inferencer::<TestBackend>::from_bundle(&exporter, device).unwrap();
        let image = DigitImage::new(vec![128; IMAGE_PIXELS]).unwrap();
        let p = inferencer.classify(&image).unwrap();

        assert!(p.digit < 10);
        assert_eq!(p.probabilities.len(), 10);
        let total: f32 = p.probabilities.iter().sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert!((0.0..=1.0).contains(&p.confidence));
    }
}
