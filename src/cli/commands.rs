// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// The subcommands and their flags. Defaults reproduce the
// reference pipeline: 5 epochs, batch 32, Adam at 1e-3,
// conv(32) + dense(128).

use clap::{builder::RangedU64ValueParser, Args, Subcommand};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;

/// Sizes and counts of zero are rejected at parse time.
fn at_least_one() -> RangedU64ValueParser<usize> {
    RangedU64ValueParser::<usize>::new().range(1..)
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train on MNIST, evaluate, save the model and export the mobile bundle
    Train(TrainArgs),

    /// Evaluate the saved model on the test split
    Evaluate(EvaluateArgs),

    /// Convert the saved model into the mobile bundle again
    Export(ExportArgs),

    /// Classify an image file with the exported mobile bundle
    Predict(PredictArgs),

    /// Download MNIST and store it as raw IDX files for `train --data-dir`
    Fetch(FetchArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory for the config, checkpoints, metrics and exported models
    #[arg(long, default_value = "artifacts")]
    pub artifact_dir: String,

    /// Read raw IDX files from this directory instead of downloading MNIST
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 5, value_parser = at_least_one())]
    pub epochs: usize,

    #[arg(long, default_value_t = 32, value_parser = at_least_one())]
    pub batch_size: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Data loader worker threads (0 loads on the training thread)
    #[arg(long, default_value_t = 2)]
    pub num_workers: usize,

    /// Seed for weight init, shuffling and `--limit` sampling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Train on a random subset of this many images
    #[arg(long, value_parser = at_least_one())]
    pub limit: Option<usize>,

    /// Filters in the convolution layer
    #[arg(long, default_value_t = 32, value_parser = at_least_one())]
    pub conv_channels: usize,

    /// Units in the hidden dense layer
    #[arg(long, default_value_t = 128, value_parser = at_least_one())]
    pub hidden_size: usize,

    /// File stem of the native model
    #[arg(long, default_value = "mnist_model")]
    pub model_name: String,

    /// File stem of the mobile bundle
    #[arg(long, default_value = "MNISTClassifier")]
    pub mobile_name: String,
}

/// Boundary between Layer 1 and Layer 2: the application never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            artifact_dir:  a.artifact_dir,
            data_dir:      a.data_dir,
            epochs:        a.epochs,
            batch_size:    a.batch_size,
            lr:            a.lr,
            num_workers:   a.num_workers,
            seed:          a.seed,
            limit:         a.limit,
            conv_channels: a.conv_channels,
            hidden_size:   a.hidden_size,
            model_name:    a.model_name,
            mobile_name:   a.mobile_name,
        }
    }
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[arg(long, default_value = "artifacts")]
    pub artifact_dir: String,

    /// Overrides the data directory used at training time
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Evaluate the newest epoch checkpoint instead of the final model
    #[arg(long)]
    pub checkpoint: bool,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[arg(long, default_value = "artifacts")]
    pub artifact_dir: String,

    /// Overrides the bundle name used at training time
    #[arg(long)]
    pub mobile_name: Option<String>,
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Image to classify (PNG, JPEG, ...)
    #[arg(long)]
    pub image: PathBuf,

    #[arg(long, default_value = "artifacts")]
    pub artifact_dir: String,

    #[arg(long, default_value = "MNISTClassifier")]
    pub mobile_name: String,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Directory the four IDX files are written to
    #[arg(long, default_value = "mnist")]
    pub out_dir: PathBuf,
}
