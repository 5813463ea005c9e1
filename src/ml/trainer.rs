// ============================================================
// Layer 5 - Training Loop
// ============================================================
// Teacher-forced training with Adam and cross-entropy over the
// equation positions. The output <PAD> id is ignored by the
// loss and by the token accuracy.
//
// Per epoch:
//   1. train on shuffled mini-batches (autodiff backend)
//   2. validate with model.valid() on the inner backend,
//      so dropout is off and no graph is recorded
//   3. log one line + one CSV row, save a checkpoint
//
// The loop is generic over the autodiff backend; the
// application layer picks Wgpu or NdArray.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{bail, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::MwpBatcher, dataloader::DataLoaderCore, dataset::MwpDataset};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::model::Transformer;

pub fn run_training<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    core:          &DataLoaderCore,
    train_dataset: MwpDataset,
    val_dataset:   MwpDataset,
    ckpt_manager:  &CheckpointManager,
    device:        B::Device,
) -> Result<Transformer<B>> {
    if train_dataset.sample_count() == 0 {
        bail!("No training samples left after indexing; check the dataset and filt_dirty");
    }

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = cfg.model_config();
    let mut model: Transformer<B> = model_cfg.init(&core.vocabs, &device)?;
    tracing::info!(
        "Model ready: {}+{} layers, embedding_size={}, decoding={}",
        model_cfg.num_encoder_layers,
        model_cfg.num_decoder_layers,
        model_cfg.embedding_size,
        model_cfg.decoding_strategy,
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    let mut optim = AdamConfig::new()
        .with_epsilon(1e-8)
        .init::<B, Transformer<B>>();

    // ── Data loaders ──────────────────────────────────────────────────────────
    let train_loader = DataLoaderBuilder::new(MwpBatcher::<B>::new(core, device.clone()))
        .batch_size(cfg.data.train_batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train_dataset);

    let val_loader = DataLoaderBuilder::new(MwpBatcher::<B::InnerBackend>::new(core, device.clone()))
        .batch_size(cfg.data.test_batch_size)
        .num_workers(1)
        .build(val_dataset);

    let pad = core.out_pad_token();
    let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;
    let mut best_val_loss = f64::INFINITY;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for batch in train_loader.iter() {
            let Some(target) = batch.equation else { continue };

            let logits = model.forward_teacher_forced(batch.question, target.clone());
            let loss = sequence_loss(logits, target, pad);

            train_loss_sum += loss.clone().into_scalar().elem::<f64>();
            train_batches  += 1;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        // ── Validation ────────────────────────────────────────────────────────
        let model_valid = model.valid();

        let mut val_loss_sum = 0.0f64;
        let mut val_batches  = 0usize;
        let mut correct      = 0usize;
        let mut total        = 0usize;

        for batch in val_loader.iter() {
            let Some(target) = batch.equation else { continue };

            let logits = model_valid.forward_teacher_forced(batch.question, target.clone());
            let (batch_correct, batch_total) = token_matches(logits.clone(), target.clone(), pad);
            correct += batch_correct;
            total   += batch_total;

            val_loss_sum += sequence_loss(logits, target, pad).into_scalar().elem::<f64>();
            val_batches  += 1;
        }

        let m = EpochMetrics::new(
            epoch,
            mean(train_loss_sum, train_batches),
            mean(val_loss_sum, val_batches),
            if total > 0 { correct as f64 / total as f64 } else { 0.0 },
        );

        tracing::info!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | token_acc={:.1}%",
            epoch, cfg.epochs, m.train_loss, m.val_loss, m.token_acc * 100.0,
        );
        if m.is_improvement(best_val_loss) {
            best_val_loss = m.val_loss;
            tracing::debug!("New best validation loss {:.4}", best_val_loss);
        }
        metrics.log(&m)?;

        ckpt_manager.save_model(&model, epoch)?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);
    }

    tracing::info!("Training complete!");
    Ok(model)
}

/// Cross-entropy over every equation position, padding excluded.
///
/// logits: [batch, len, symbol_size], target: [batch, len]
pub fn sequence_loss<B: Backend>(logits: Tensor<B, 3>, target: Tensor<B, 2, Int>, pad: usize) -> Tensor<B, 1> {
    let [batch_size, len, symbol_size] = logits.dims();
    let ce = CrossEntropyLossConfig::new()
        .with_pad_tokens(Some(vec![pad]))
        .init(&logits.device());
    ce.forward(
        logits.reshape([batch_size * len, symbol_size]),
        target.reshape([batch_size * len]),
    )
}

/// (correct, counted) over non-padding positions.
pub fn token_matches<B: Backend>(logits: Tensor<B, 3>, target: Tensor<B, 2, Int>, pad: usize) -> (usize, usize) {
    let [batch_size, len, _] = logits.dims();
    // argmax(2) returns [batch, len, 1]
    let predicted = logits.argmax(2).reshape([batch_size, len]);
    let real = target.clone().equal_elem(pad as i64).bool_not().int();

    let correct: i64 = predicted
        .equal(target)
        .int()
        .mul(real.clone())
        .sum()
        .into_scalar()
        .elem::<i64>();
    let counted: i64 = real.sum().into_scalar().elem::<i64>();
    (correct as usize, counted as usize)
}

fn mean(sum: f64, count: usize) -> f64 {
    if count > 0 { sum / count as f64 } else { f64::NAN }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::data::dataloader::{DataLoaderConfig, MwpDataLoader, SingleEquationLoader};
    use crate::domain::problem::MwpProblem;
    use crate::domain::vocab::{Vocabulary, VocabularySet};
    use crate::ml::model::TransformerConfig;

    type TestBackend = burn::backend::NdArray;
    type TestAutodiff = burn::backend::Autodiff<TestBackend>;

    #[test]
    fn test_token_matches_ignores_padding() {
        let device = Default::default();
        // Row 0 predicts [1, 2], row 1 predicts [2, 2]
        let logits = Tensor::<TestBackend, 3>::from_data(
            TensorData::new(
                vec![0.0f32, 5.0, 0.0, 0.0, 0.0, 5.0, 0.0, 0.0, 5.0, 0.0, 0.0, 5.0],
                [2, 2, 3],
            ),
            &device,
        );
        let target = Tensor::<TestBackend, 1, Int>::from_ints([1, 2, 2, 0], &device).reshape([2, 2]);
        assert_eq!(token_matches(logits, target, 0), (3, 3));
    }

    #[test]
    fn test_loss_is_finite_with_padding() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 3>::zeros([1, 3, 4], &device);
        let target = Tensor::<TestBackend, 1, Int>::from_ints([2, 3, 0], &device).reshape([1, 3]);
        let loss = sequence_loss(logits, target, 0).into_scalar().elem::<f64>();
        // Uniform over 4 symbols; the padded position adds nothing
        assert!(loss.is_finite());
        assert!(loss > 0.0 && loss <= 4f64.ln() + 1e-4);
    }

    #[test]
    fn test_one_epoch_smoke() {
        let dir = std::env::temp_dir().join("mwp_trainer_smoke");
        std::fs::remove_dir_all(&dir).ok();

        let vocabs = Arc::new(VocabularySet::separate(
            Vocabulary::new(["tom", "has", "NUM_0", "NUM_1", "apples"]),
            Vocabulary::new(["+", "-", "NUM_0", "NUM_1"]),
            None,
        ));
        let problems = vec![
            MwpProblem::new("1", "tom has NUM_0 and NUM_1 apples", &["NUM_0", "+", "NUM_1"], &["3", "5"]),
            MwpProblem::new("2", "tom has NUM_0 apples", &["NUM_0", "-", "NUM_1"], &["4", "1"]),
        ];

        let cfg = TrainConfig {
            checkpoint_dir: dir.to_string_lossy().into_owned(),
            epochs: 1,
            data: DataLoaderConfig { train_batch_size: 2, test_batch_size: 2, ..Default::default() },
            model: TransformerConfig::new()
                .with_embedding_size(8)
                .with_ffn_size(16)
                .with_num_encoder_layers(1)
                .with_num_decoder_layers(1)
                .with_num_heads(2)
                .with_max_output_len(4),
            ..Default::default()
        };

        let core = DataLoaderCore::new(cfg.data.clone(), vocabs).unwrap();
        let mut loader = SingleEquationLoader::new(core.clone(), problems.clone(), problems);
        loader.load_data().unwrap();

        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir);
        let model = run_training::<TestAutodiff>(
            &cfg,
            &core,
            MwpDataset::new(loader.trainset().to_vec()),
            MwpDataset::new(loader.testset().to_vec()),
            &ckpt,
            Default::default(),
        )
        .unwrap();

        assert_eq!(model.max_output_len, 4);
        assert!(dir.join("latest_epoch.json").exists());
        assert!(dir.join("metrics.csv").exists());
        std::fs::remove_dir_all(&dir).ok();
    }
}
