// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load problems             (Layer 4 - data)
//   Step 2: Split train/test          (Layer 4 - data)
//   Step 3: Build vocabularies        (Layer 6 - infra)
//   Step 4: Index with the dataloader (Layer 4 - data)
//   Step 5: Build datasets            (Layer 4 - data)
//   Step 6: Save config               (Layer 6 - infra)
//   Step 7: Run training loop         (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use std::{fmt, str::FromStr, sync::Arc};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataloader::{DataLoaderConfig, DataLoaderCore, MwpDataLoader, SingleEquationLoader},
    dataset::MwpDataset,
    loader::JsonProblemLoader,
    splitter::split_train_test,
};
use crate::domain::traits::ProblemSource;
use crate::infra::{
    checkpoint::CheckpointManager,
    vocab_store::{VocabBuilder, VocabStore},
};
use crate::ml::{model::TransformerConfig, trainer::run_training};

// ─── Device Selection ────────────────────────────────────────────────────────
/// `cpu` runs on NdArray, `gpu` on Wgpu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    Cpu,
    Gpu,
}

impl FromStr for DeviceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cpu" => Ok(Self::Cpu),
            "gpu" => Ok(Self::Gpu),
            other => bail!("unknown device '{other}' (expected cpu or gpu)"),
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Gpu => write!(f, "gpu"),
        }
    }
}

pub type CpuBackend = burn::backend::NdArray;
pub type GpuBackend = burn::backend::Wgpu;

// ─── Training Configuration ──────────────────────────────────────────────────
// Saved as train_config.json so the solver can rebuild the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_path:      String,
    pub checkpoint_dir: String,
    pub device:         DeviceKind,
    pub epochs:         usize,
    pub lr:             f64,
    pub seed:           u64,
    /// Fraction of problems used for training, the rest is the test set
    pub train_fraction: f64,
    /// Question words seen fewer times become <UNK>
    pub min_word_keep:  usize,
    pub data:           DataLoaderConfig,
    pub model:          TransformerConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_path:      "data/problems.json".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            device:         DeviceKind::Cpu,
            epochs:         10,
            lr:             1e-4,
            seed:           42,
            train_fraction: 0.8,
            min_word_keep:  1,
            data:           DataLoaderConfig::default(),
            model:          TransformerConfig::new(),
        }
    }
}

impl TrainConfig {
    /// The model configuration, with the sharing mode taken from the data side.
    pub fn model_config(&self) -> TransformerConfig {
        self.model.clone().with_share_vocab(self.data.share_vocab)
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

    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;

        if cfg.data.equation_fix.is_tree() {
            bail!("The Transformer decodes flat equations; use infix, postfix or prefix");
        }

        // ── Step 1: Load problems ─────────────────────────────────────────────
        let problems = JsonProblemLoader::new(&cfg.data_path).load_all()?;
        if problems.is_empty() {
            bail!("No problems found in '{}'", cfg.data_path);
        }

        // ── Step 2: Train / test split ────────────────────────────────────────
        let (train_problems, test_problems) = split_train_test(problems, cfg.train_fraction, cfg.seed);
        tracing::info!(
            "Split: {} train, {} test",
            train_problems.len(),
            test_problems.len()
        );

        // ── Step 3: Build / load vocabularies ─────────────────────────────────
        let builder = VocabBuilder {
            min_word_keep: cfg.min_word_keep,
            share_vocab:   cfg.data.share_vocab,
        };
        let vocabs = VocabStore::new(&cfg.checkpoint_dir).load_or_build(&train_problems, &builder)?;

        // ── Step 4: Index problems ────────────────────────────────────────────
        let core = DataLoaderCore::new(cfg.data.clone(), Arc::new(vocabs))?;
        let mut loader = SingleEquationLoader::new(core, train_problems, test_problems);
        loader.load_data()?;

        // ── Step 5: Burn datasets ─────────────────────────────────────────────
        let train_dataset = MwpDataset::new(loader.trainset().to_vec());
        let val_dataset   = MwpDataset::new(loader.testset().to_vec());

        // ── Step 6: Save config for the solver ────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt_manager.save_config(cfg)?;

        // ── Step 7: Training loop (Layer 5) ───────────────────────────────────
        let core = loader.core();
        match cfg.device {
            DeviceKind::Cpu => {
                let device = burn::backend::ndarray::NdArrayDevice::default();
                tracing::info!("Using NdArray device: {:?}", device);
                run_training::<burn::backend::Autodiff<CpuBackend>>(
                    cfg, core, train_dataset, val_dataset, &ckpt_manager, device,
                )?;
            }
            DeviceKind::Gpu => {
                let device = burn::backend::wgpu::WgpuDevice::default();
                tracing::info!("Using WGPU device: {:?}", device);
                run_training::<burn::backend::Autodiff<GpuBackend>>(
                    cfg, core, train_dataset, val_dataset, &ckpt_manager, device,
                )?;
            }
        }

        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::equation::FixType;

    #[test]
    fn test_config_json_round_trip() {
        let cfg = TrainConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: TrainConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.device, DeviceKind::Cpu);
        assert_eq!(back.model.max_output_len, cfg.model.max_output_len);
        assert_eq!(back.data.equation_fix, cfg.data.equation_fix);
    }

    #[test]
    fn test_model_config_follows_data_sharing() {
        let mut cfg = TrainConfig::default();
        cfg.data.share_vocab = true;
        assert!(cfg.model_config().share_vocab);
    }

    #[test]
    fn test_tree_format_is_rejected() {
        let mut cfg = TrainConfig::default();
        cfg.data.equation_fix = FixType::MultiWayTree;
        assert!(TrainUseCase::new(cfg).execute().is_err());
    }

    #[test]
    fn test_device_parse() {
        assert_eq!("gpu".parse::<DeviceKind>().unwrap(), DeviceKind::Gpu);
        assert!("tpu".parse::<DeviceKind>().is_err());
    }
}
