// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Metrics recorded per epoch:
//   - epoch:      the epoch number (1, 2, 3, ...)
//   - train_loss: mean cross-entropy over the training set
//   - train_acc:  fraction of training images classified correctly
//   - val_loss:   mean cross-entropy over the test set
//   - val_acc:    fraction of test images classified correctly
//
// Output file: <artifact-dir>/metrics.csv
//
// Example CSV output:
//   epoch,train_loss,train_acc,val_loss,val_acc
//   1,0.152210,0.954200,0.061700,0.980100
//   2,0.051900,0.984300,0.049800,0.983600
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

const CSV_HEADER: &str = "epoch,train_loss,train_acc,val_loss,val_acc";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Mean cross-entropy loss over all training samples
    pub train_loss: f64,

    /// Training accuracy in [0.0, 1.0]
    pub train_acc: f64,

    /// Mean cross-entropy loss over the validation (test) set
    pub val_loss: f64,

    /// Validation accuracy in [0.0, 1.0]
    pub val_acc: f64,
}

impl EpochMetrics {
    pub fn new(
        epoch:      usize,
        train_loss: f64,
        train_acc:  f64,
        val_loss:   f64,
        val_acc:    f64,
    ) -> Self {
        Self { epoch, train_loss, train_acc, val_loss, val_acc }
    }

    /// Returns true if this epoch improved over the previous best val_acc
    pub fn is_improvement(&self, best_val_acc: f64) -> bool {
        self.val_acc > best_val_acc
    }

    fn to_csv_row(&self) -> String {
        format!(
            "{},{:.6},{:.6},{:.6},{:.6}",
            self.epoch, self.train_loss, self.train_acc, self.val_loss, self.val_acc,
        )
    }

    #[cfg(test)]
    fn from_csv_row(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.trim().split(',').collect();
        anyhow::ensure!(fields.len() == 5, "Expected 5 metric columns, got {}", fields.len());
        Ok(Self {
            epoch:      fields[0].parse()?,
            train_loss: fields[1].parse()?,
            train_acc:  fields[2].parse()?,
            val_loss:   fields[3].parse()?,
            val_acc:    fields[4].parse()?,
        })
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    /// Full path to the CSV file
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger, truncating any log left by a previous run.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "{CSV_HEADER}")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(f, "{}", m.to_csv_row())?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_acc={:.4}",
            m.epoch,
            m.train_loss,
            m.val_acc,
        );

        Ok(())
    }

    /// Read every logged row back, skipping the header.
    #[cfg(test)]
    pub fn read_all(&self) -> Result<Vec<EpochMetrics>> {
        let text = fs::read_to_string(&self.csv_path)
            .with_context(|| format!("Cannot read '{}'", self.csv_path.display()))?;
        text.lines()
            .skip(1)
            .filter(|l| !l.trim().is_empty())
            .map(EpochMetrics::from_csv_row)
            .collect()
    }

    /// Return the path to the metrics CSV file
    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_improvement() {
        let m = EpochMetrics::new(2, 0.2, 0.95, 0.1, 0.97);
        assert!(m.is_improvement(0.96));
        assert!(!m.is_improvement(0.98));
    }

    #[test]
    fn test_log_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&EpochMetrics::new(1, 0.5, 0.8, 0.4, 0.85)).unwrap();
        logger.log(&EpochMetrics::new(2, 0.25, 0.9, 0.3, 0.9)).unwrap();

        let rows = logger.read_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].epoch, 2);
        assert!((rows[0].val_acc - 0.85).abs() < 1e-9);

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        assert!(text.starts_with(CSV_HEADER));
    }

    #[test]
    fn test_new_run_truncates_old_log() {
        let dir = tempfile::tempdir().unwrap();
        MetricsLogger::new(dir.path())
            .unwrap()
            .log(&EpochMetrics::new(1, 1.0, 0.1, 1.0, 0.1))
            .unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        assert!(logger.read_all().unwrap().is_empty());
    }
}
