// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validate loop using Burn's DataLoader and Adam.
//
//   - Training runs on an AutodiffBackend B
//   - model.valid() returns the model on B::InnerBackend,
//     which is what evaluation and export use
//   - The test partition doubles as validation data after
//     every epoch, then once more for the final report
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use std::sync::Arc;
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::{DigitBatch, DigitBatcher}, dataset::DigitDataset};
use crate::infra::{checkpoint::CheckpointManager, metrics::{EpochMetrics, MetricsLogger}};
use crate::ml::model::DigitCnn;

/// Keras' Adam epsilon
const ADAM_EPSILON: f32 = 1e-7;

pub type DigitLoader<B> = Arc<dyn DataLoader<B, DigitBatch<B>>>;

/// Loss and accuracy over a whole dataset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub loss:     f64,
    pub accuracy: f64,
    pub samples:  usize,
}

/// The trained model, detached from autodiff, plus per-epoch metrics
pub struct TrainingOutcome<B: Backend> {
    pub model:   DigitCnn<B>,
    pub history: Vec<EpochMetrics>,
}

/// Build an unshuffled loader for evaluation.
pub fn eval_loader<B: Backend>(
    dataset:     DigitDataset,
    batch_size:  usize,
    num_workers: usize,
    device:      &B::Device,
) -> DigitLoader<B> {
    let builder = DataLoaderBuilder::new(DigitBatcher::new())
        .batch_size(batch_size)
        .set_device(device.clone());
    let builder = if num_workers > 0 { builder.num_workers(num_workers) } else { builder };
    builder.build(dataset)
}

/// Build the training loader; the order is reshuffled on every pass.
pub fn train_loader<B: Backend>(
    dataset:     DigitDataset,
    batch_size:  usize,
    num_workers: usize,
    seed:        u64,
    device:      &B::Device,
) -> DigitLoader<B> {
    let builder = DataLoaderBuilder::new(DigitBatcher::new())
        .batch_size(batch_size)
        .shuffle(seed)
        .set_device(device.clone());
    let builder = if num_workers > 0 { builder.num_workers(num_workers) } else { builder };
    builder.build(dataset)
}

/// Mean loss and accuracy of `model` over every batch of `loader`.
///
/// An empty loader yields NaN loss and zero accuracy.
pub fn evaluate<B: Backend>(model: &DigitCnn<B>, loader: &DigitLoader<B>) -> Evaluation {
    let mut loss_sum = 0.0f64;
    let mut correct  = 0usize;
    let mut samples  = 0usize;

    for batch in loader.iter() {
        let n = batch.targets.dims()[0];
        let output = model.forward_classification(batch.images, batch.targets);

        loss_sum += output.loss.clone().into_scalar().elem::<f64>() * n as f64;
        correct  += output.correct();
        samples  += n;
    }

    summarise(loss_sum, correct, samples)
}

fn summarise(loss_sum: f64, correct: usize, samples: usize) -> Evaluation {
    if samples == 0 {
        return Evaluation { loss: f64::NAN, accuracy: 0.0, samples };
    }
    Evaluation {
        loss:     loss_sum / samples as f64,
        accuracy: correct as f64 / samples as f64,
        samples,
    }
}

pub fn run_training<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    train_dataset: DigitDataset,
    valid_dataset: DigitDataset,
    ckpt_manager:  &CheckpointManager,
    metrics:       &MetricsLogger,
    device:        B::Device,
) -> Result<TrainingOutcome<B::InnerBackend>> {
    B::seed(&device, cfg.seed);

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = cfg.model_config();
    let mut model: DigitCnn<B> = model_cfg.init(&device);
    tracing::info!(
        "Model ready: conv_channels={}, hidden_size={}, flattened={}",
        model_cfg.conv_channels, model_cfg.hidden_size, model_cfg.flattened_size()
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    let mut optim = AdamConfig::new().with_epsilon(ADAM_EPSILON).init();

    // ── Training data loader (AutodiffBackend, reshuffled each epoch) ─────────
    let train_loader = train_loader::<B>(
        train_dataset, cfg.batch_size, cfg.num_workers, cfg.seed, &device,
    );

    // ── Validation data loader (InnerBackend, no autodiff overhead) ───────────
    let valid_loader = eval_loader::<B::InnerBackend>(
        valid_dataset, cfg.batch_size, cfg.num_workers, &device,
    );

    let mut history = Vec::with_capacity(cfg.epochs);
    let mut best_val_acc = f64::NEG_INFINITY;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {
        let mut loss_sum = 0.0f64;
        let mut correct  = 0usize;
        let mut samples  = 0usize;

        for batch in train_loader.iter() {
            let n = batch.targets.dims()[0];
            let output = model.forward_classification(batch.images, batch.targets);

            loss_sum += output.loss.clone().into_scalar().elem::<f64>() * n as f64;
            correct  += output.correct();
            samples  += n;

            // Backward pass + Adam update
            let grads = output.loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let train = summarise(loss_sum, correct, samples);
        let valid = evaluate(&model.valid(), &valid_loader);

        println!(
            "Epoch {:>3}/{} | loss={:.4} | accuracy={:.4} | val_loss={:.4} | val_accuracy={:.4}",
            epoch, cfg.epochs, train.loss, train.accuracy, valid.loss, valid.accuracy,
        );

        let row = EpochMetrics::new(epoch, train.loss, train.accuracy, valid.loss, valid.accuracy);
        if row.is_improvement(best_val_acc) {
            best_val_acc = row.val_acc;
            tracing::info!("New best validation accuracy {:.4} at epoch {}", best_val_acc, epoch);
        }
        metrics.log(&row)?;
        history.push(row);

        ckpt_manager.save_checkpoint(&model, epoch)?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);
    }

    tracing::info!("Training complete!");
    Ok(TrainingOutcome { model: model.valid(), history })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::DigitSample;
    use crate::domain::digit::{DigitImage, IMAGE_PIXELS, IMAGE_WIDTH};
    use crate::ml::model::DigitCnnConfig;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    /// Class 0 lights the top half of the image, class 1 the bottom half.
    fn toy_samples(n: usize) -> Vec<DigitSample> {
        (0..n)
            .map(|i| {
                let label = (i % 2) as u8;
                let pixels: Vec<u8> = (0..IMAGE_PIXELS)
                    .map(|p| {
                        let top = p / IMAGE_WIDTH < 14;
                        if top == (label == 0) { 255 } else { 0 }
                    })
                    .collect();
                DigitSample::new(DigitImage::new(pixels).unwrap(), label)
            })
            .collect()
    }

    fn toy_config() -> TrainConfig {
        TrainConfig {
            epochs:        2,
            batch_size:    4,
            num_workers:   0,
            conv_channels: 2,
            hidden_size:   8,
            ..TrainConfig::default()
        }
    }

    /// Labels of every batch in one pass, in delivery order
    fn pass_labels(loader: &DigitLoader<NdArray>) -> Vec<i64> {
        loader
            .iter()
            .flat_map(|batch| batch.targets.into_data().convert::<i64>().to_vec::<i64>().unwrap())
            .collect()
    }

    fn labelled_samples(n: usize) -> Vec<DigitSample> {
        (0..n)
            .map(|i| DigitSample::new(DigitImage::new(vec![0; IMAGE_PIXELS]).unwrap(), i as u8))
            .collect()
    }

    #[test]
    fn test_train_loader_reshuffles_every_pass() {
        let device = Default::default();
        let loader = train_loader::<NdArray>(DigitDataset::new(labelled_samples(10)), 4, 0, 42, &device);

        let first  = pass_labels(&loader);
        let second = pass_labels(&loader);
        assert_ne!(first, second);

        for pass in [first, second] {
            let mut sorted = pass.clone();
            sorted.sort();
            assert_eq!(sorted, (0..10).collect::<Vec<i64>>());
        }
    }

    #[test]
    fn test_eval_loader_keeps_order() {
        let device = Default::default();
        let loader = eval_loader::<NdArray>(DigitDataset::new(labelled_samples(10)), 4, 0, &device);
        assert_eq!(pass_labels(&loader), (0..10).collect::<Vec<i64>>());
    }

    #[test]
    fn test_summarise_empty() {
        let e = summarise(0.0, 0, 0);
        assert!(e.loss.is_nan());
        assert_eq!(e.accuracy, 0.0);
    }

    #[test]
    fn test_evaluate_accuracy_in_unit_range() {
        let device = Default::default();
        let model: DigitCnn<NdArray> = DigitCnnConfig::new()
            .with_conv_channels(2)
            .with_hidden_size(4)
            .init(&device);
        let loader = eval_loader::<NdArray>(DigitDataset::new(toy_samples(6)), 4, 0, &device);

        let e = evaluate(&model, &loader);
        assert_eq!(e.samples, 6);
        assert!((0.0..=1.0).contains(&e.accuracy));
        assert!(e.loss.is_finite());
    }

    #[test]
    fn test_training_runs_and_records_history() {
        let dir     = tempfile::tempdir().unwrap();
        let ckpt    = CheckpointManager::new(dir.path()).unwrap();
        let metrics = MetricsLogger::new(dir.path()).unwrap();
        let cfg     = toy_config();

        let outcome = run_training::<TestBackend>(
            &cfg,
            DigitDataset::new(toy_samples(16)),
            DigitDataset::new(toy_samples(8)),
            &ckpt,
            &metrics,
            Default::default(),
        )
        .unwrap();

        assert_eq!(outcome.history.len(), 2);
        for row in &outcome.history {
            assert!((0.0..=1.0).contains(&row.train_acc));
            assert!((0.0..=1.0).contains(&row.val_acc));
            assert!(row.train_loss.is_finite());
        }
        assert_eq!(ckpt.latest_epoch().unwrap(), 2);
        assert_eq!(metrics.read_all().unwrap().len(), 2);

        let images = Tensor::<NdArray, 3>::zeros([1, 28, 28], &Default::default());
        assert_eq!(outcome.model.forward(images).dims(), [1, 10]);
    }
}
