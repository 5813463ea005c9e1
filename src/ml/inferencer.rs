// ============================================================
// Layer 5 - Solver
// ============================================================
// Loads a trained checkpoint and turns a question into an
// equation:
//
//   question ─► word ids (+SOS/EOS per config) ─► pad ─► generate
//            ─► output ids ─► symbols, cut at <EOS>
//            ─► NUM_i replaced by the i-th number
//
// The model always generates max_output_len symbols; anything
// after the first <EOS> (and any <PAD>) is discarded here.

use std::sync::Arc;

use anyhow::Result;
use burn::prelude::*;

use crate::data::batcher::rows_to_tensor;
use crate::data::dataloader::DataLoaderCore;
use crate::data::num_stack::placeholder_index;
use crate::domain::vocab::{Vocabulary, EOS_TOKEN, PAD_TOKEN, UNK_TOKEN};
use crate::infra::{checkpoint::CheckpointManager, vocab_store::VocabStore};
use crate::ml::decoding::DecodingStrategy;
use crate::ml::model::Transformer;

/// A solved problem, ready to print.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Generated symbols up to (not including) <EOS>
    pub symbols:    Vec<String>,
    /// Same symbols with placeholders replaced by numbers
    pub expression: String,
}

pub struct Solver<B: Backend> {
    model:  Transformer<B>,
    core:   DataLoaderCore,
    device: B::Device,
}

impl<B: Backend> Solver<B> {
    pub fn new(model: Transformer<B>, core: DataLoaderCore, device: B::Device) -> Self {
        Self { model, core, device }
    }

    /// Rebuild the trained model from `ckpt_manager`'s directory.
    pub fn from_checkpoint(
        ckpt_manager: &CheckpointManager,
        strategy:     Option<DecodingStrategy>,
        device:       B::Device,
    ) -> Result<Self> {
        let cfg = ckpt_manager.load_config()?;
        let vocabs = VocabStore::new(ckpt_manager.dir()).load()?;

        let mut model_cfg = cfg.model_config();
        if let Some(strategy) = strategy {
            model_cfg = model_cfg.with_decoding_strategy(strategy);
        }

        let model: Transformer<B> = model_cfg.init(&vocabs, &device)?;
        let model = ckpt_manager.load_model(model, &device)?;
        let core = DataLoaderCore::new(cfg.data, Arc::new(vocabs))?;
        tracing::info!("Model loaded from checkpoint ({})", model_cfg.decoding_strategy);

        Ok(Self::new(model, core, device))
    }

    /// `question` is whitespace tokenised with numbers already replaced
    /// by NUM_i placeholders; `numbers[i]` is substituted back.
    pub fn solve(&self, question: &str, numbers: &[String]) -> Result<Solution> {
        let cfg = &self.core.config;
        let tokens: Vec<String> = question.split_whitespace().map(String::from).collect();

        let mut ids = self.core.word2idx(&tokens);
        if cfg.add_sos {
            ids.insert(0, self.core.vocabs.input.sos_id());
        }
        if cfg.add_eos {
            ids.push(self.core.vocabs.input.eos_id());
        }
        if ids.is_empty() {
            ids.push(self.core.in_unk_token());
        }

        let len = [ids.len()];
        let rows = self.core.pad_input_batch(vec![ids], &len);
        let src = rows_to_tensor::<B>(&rows, &self.device);

        let generated: Vec<usize> = self
            .model
            .generate(src)
            .into_data()
            .iter::<i64>()
            .map(|id| id.max(0) as usize)
            .collect();

        let symbols = render_symbols(&generated, &self.core.vocabs.output);
        let expression = substitute_numbers(&symbols, numbers);
        tracing::debug!("Generated ids {:?} -> '{}'", generated, expression);

        Ok(Solution { symbols, expression })
    }
}

/// Output ids → symbols, stopping at the first <EOS> and skipping <PAD>.
pub fn render_symbols(ids: &[usize], output: &Vocabulary) -> Vec<String> {
    ids.iter()
        .map(|&id| output.token(id).unwrap_or(UNK_TOKEN))
        .take_while(|&symbol| symbol != EOS_TOKEN)
        .filter(|&symbol| symbol != PAD_TOKEN)
        .map(String::from)
        .collect()
}

/// Join symbols with spaces, replacing NUM_i by `numbers[i]` when present.
pub fn substitute_numbers(symbols: &[String], numbers: &[String]) -> String {
    symbols
        .iter()
        .map(|symbol| {
            placeholder_index(symbol)
                .and_then(|i| numbers.get(i))
                .unwrap_or(symbol)
                .as_str()
        })
        .collect::<Vec<_>>()
        .join(" ")
}
