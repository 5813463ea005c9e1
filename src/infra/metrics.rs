// ============================================================
// Layer 6 - Epoch Metrics Log
// ============================================================
// Appends one CSV row per training epoch:
//
//   epoch,train_loss,val_loss,token_acc
//   1,2.913400,2.702100,0.214000
//   2,2.118700,2.050300,0.377000
//
// token_acc is the fraction of non-padding equation positions
// whose teacher-forced argmax equals the target symbol.
//
// Output file: <checkpoint_dir>/metrics.csv

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};
use serde::{Deserialize, Serialize};

const HEADER: &str = "epoch,train_loss,val_loss,token_acc";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:      usize,
    /// Mean cross-entropy over training batches (padding ignored)
    pub train_loss: f64,
    pub val_loss:   f64,
    pub token_acc:  f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, val_loss: f64, token_acc: f64) -> Self {
        Self { epoch, train_loss, val_loss, token_acc }
    }

    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss < best_val_loss
    }

    fn csv_row(&self) -> String {
        format!(
            "{},{:.6},{:.6},{:.6}",
            self.epoch, self.train_loss, self.val_loss, self.token_acc
        )
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the header if the file does not exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            fs::write(&csv_path, format!("{HEADER}\n"))
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }
        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;
        writeln!(f, "{}", m.csv_row())?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch, m.train_loss, m.val_loss,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
