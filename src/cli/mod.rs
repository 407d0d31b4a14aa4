// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with clap.
// All business logic is delegated to Layer 2 (application).
//
// Commands:
//   1. `train`    — load MNIST, fit, evaluate, save, export
//   2. `evaluate` — re-run test evaluation on the saved model
//   3. `export`   — re-convert the saved model to the mobile bundle
//   4. `predict`  — classify an image file with the mobile bundle
//   5. `fetch`    — store MNIST locally as IDX files
//
// Reference: Rust Book §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::{ArgAction, Parser};
use commands::{Commands, EvaluateArgs, ExportArgs, FetchArgs, PredictArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "digit-classifier",
    version,
    about = "Train a small CNN on MNIST and export it for on-device inference."
)]
pub struct Cli {
    /// Log more (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// tracing filter directive for this crate at the requested verbosity
    pub fn log_directive(&self) -> String {
        let level = match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        format!("digit_classifier={level}")
    }

    /// Dispatch to the matching use case. The CLI only routes and prints.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
            Commands::Export(args)   => run_export(args),
            Commands::Predict(args)  => run_predict(args),
            Commands::Fetch(args)    => run_fetch(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training, artifacts go to '{}'", args.artifact_dir);

    let report = TrainUseCase::new(args.into()).execute()?;

    if let Some(best) = report.best_epoch() {
        println!(
            "Best epoch:    {} (val_accuracy={:.4})",
            best.epoch, best.val_acc
        );
    }
    println!("Test loss:     {:.4} over {} samples", report.test.loss, report.test.samples);
    println!("Saved model:   {}", report.native_model.display());
    println!("Mobile model:  {}", report.bundle.weights.display());
    println!("Manifest:      {}", report.bundle.manifest.display());
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::model_use_cases::EvaluateUseCase;

    let eval = EvaluateUseCase::new(args.artifact_dir, args.data_dir)
        .from_checkpoint(args.checkpoint)
        .execute()?;
    println!("test loss: {:.4}", eval.loss);
    println!("test accuracy: {}", eval.accuracy);
    Ok(())
}

fn run_export(args: ExportArgs) -> Result<()> {
    use crate::application::model_use_cases::ExportUseCase;

    let bundle = ExportUseCase::new(args.artifact_dir, args.mobile_name).execute()?;
    println!("Mobile model:  {}", bundle.weights.display());
    println!("Manifest:      {}", bundle.manifest.display());
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::model_use_cases::PredictUseCase;

    let prediction = PredictUseCase::new(&args.artifact_dir, args.mobile_name)?
        .predict(&args.image)?;
    println!(
        "\nDigit: {} (confidence {:.1}%)",
        prediction.digit,
        prediction.confidence * 100.0
    );
    Ok(())
}

fn run_fetch(args: FetchArgs) -> Result<()> {
    use crate::application::fetch_use_case::FetchUseCase;

    let report = FetchUseCase::new(&args.out_dir).execute()?;
    println!(
        "Wrote {} train and {} test images to '{}'",
        report.train, report.test, args.out_dir.display()
    );
    Ok(())
}
