// ============================================================
// Layer 5 - Transformer Seq2Seq Model
// ============================================================
// Encodes a problem statement and decodes an equation.
//
//   src ids ─► embed + positions ─► N × EncoderBlock ─► memory
//                                                        │
//   target ids (shifted right) ─► embed + positions      │
//        ─► M × DecoderBlock (causal self-attn, cross-attn)
//        ─► Linear ─► logits over output symbols
//
// Two entry points, selected by whether a target is given:
//
//   training   forward_teacher_forced  → [batch, tgt_len, symbol_size]
//   inference  generate                → [batch, max_output_len]
//
// Generation always runs max_output_len steps; trimming at
// <EOS> is left to whoever renders the output.
//
// With a shared vocabulary the decoder reuses the encoder's
// embedding table, and output ids are mapped to the input id of
// the same symbol before being embedded.
//
// Reference: Vaswani et al. (2017) Attention Is All You Need
//            Burn Book §3 (Building Blocks)

use anyhow::{bail, Result};
use burn::{
    module::Ignored,
    nn::{
        attention::generate_autoregressive_mask,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

use crate::domain::vocab::VocabularySet;
use crate::ml::decoding::DecodingStrategy;
use crate::ml::layers::{add_positions, BlockDims, DecoderBlock, DecoderContext, EncoderBlock};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct TransformerConfig {
    #[config(default = 512)]
    pub embedding_size: usize,
    #[config(default = 2048)]
    pub ffn_size: usize,
    #[config(default = 6)]
    pub num_encoder_layers: usize,
    #[config(default = 6)]
    pub num_decoder_layers: usize,
    #[config(default = 8)]
    pub num_heads: usize,
    #[config(default = 0.1)]
    pub embedding_dropout_ratio: f64,
    #[config(default = 0.1)]
    pub attn_dropout_ratio: f64,
    #[config(default = 0.1)]
    pub attn_weight_dropout_ratio: f64,
    #[config(default = 0.1)]
    pub ffn_dropout_ratio: f64,
    /// Generation steps; every generated sequence has exactly this length
    #[config(default = 30)]
    pub max_output_len: usize,
    #[config(default = "DecodingStrategy::GreedySearch")]
    pub decoding_strategy: DecodingStrategy,
    #[config(default = false)]
    pub share_vocab: bool,
}

impl TransformerConfig {
    /// Build the model. Vocabulary and symbol sizes come from the tables.
    pub fn init<B: Backend>(&self, vocabs: &VocabularySet, device: &B::Device) -> Result<Transformer<B>> {
        self.validate(vocabs)?;

        let block = BlockDims {
            d_model:             self.embedding_size,
            d_ff:                self.ffn_size,
            num_heads:           self.num_heads,
            attn_dropout:        self.attn_dropout_ratio,
            attn_weight_dropout: self.attn_weight_dropout_ratio,
            ffn_dropout:         self.ffn_dropout_ratio,
        };

        let vocab_size = vocabs.input.len();
        let symbol_size = vocabs.output.len();

        let in_embedder = EmbeddingConfig::new(vocab_size, self.embedding_size).init(device);
        let (out_embedder, out_to_in) = if self.share_vocab {
            (None, Some(vocabs.output_to_input_ids()))
        } else {
            (Some(EmbeddingConfig::new(symbol_size, self.embedding_size).init(device)), None)
        };

        let encoder = (0..self.num_encoder_layers).map(|_| block.encoder_block(device)).collect();
        let decoder = (0..self.num_decoder_layers).map(|_| block.decoder_block(device)).collect();

        tracing::debug!(
            "Transformer: vocab_size={} symbol_size={} d={} heads={} enc={} dec={}",
            vocab_size, symbol_size, self.embedding_size, self.num_heads,
            self.num_encoder_layers, self.num_decoder_layers,
        );

        Ok(Transformer {
            in_embedder,
            out_embedder,
            encoder,
            decoder,
            out: LinearConfig::new(self.embedding_size, symbol_size).init(device),
            embedding_dropout: DropoutConfig::new(self.embedding_dropout_ratio).init(),
            in_pad_id: vocabs.input.pad_id(),
            out_pad_id: vocabs.output.pad_id(),
            out_sos_id: vocabs.output.sos_id(),
            max_output_len: self.max_output_len,
            decoding_strategy: Ignored(self.decoding_strategy),
            out_to_in: Ignored(out_to_in),
        })
    }

    fn validate(&self, vocabs: &VocabularySet) -> Result<()> {
        if self.max_output_len == 0 {
            bail!("max_output_len must be at least 1");
        }
        if self.num_heads == 0 || self.embedding_size % self.num_heads != 0 {
            bail!(
                "embedding_size ({}) must be divisible by num_heads ({})",
                self.embedding_size,
                self.num_heads
            );
        }
        if self.share_vocab != vocabs.share_vocab {
            bail!(
                "share_vocab is {} in the model configuration but the vocabularies were built with share_vocab={}",
                self.share_vocab,
                vocabs.share_vocab
            );
        }
        Ok(())
    }
}

#[derive(Module, Debug)]
pub struct Transformer<B: Backend> {
    pub in_embedder:       Embedding<B>,
    /// None when the vocabulary is shared: the decoder uses `in_embedder`
    pub out_embedder:      Option<Embedding<B>>,
    pub encoder:           Vec<EncoderBlock<B>>,
    pub decoder:           Vec<DecoderBlock<B>>,
    pub out:               Linear<B>,
    pub embedding_dropout: Dropout,
    pub in_pad_id:         usize,
    pub out_pad_id:        usize,
    pub out_sos_id:        usize,
    pub max_output_len:    usize,
    pub decoding_strategy: Ignored<DecodingStrategy>,
    /// Output id → input id of the same symbol (shared vocabulary only).
    /// A shared set uses one table for both sides, so this is the
    /// identity; it only keeps the decoder ids valid if the tables differ.
    pub out_to_in:         Ignored<Option<Vec<usize>>>,
}

/// What `forward` produces, depending on whether a target was given.
#[derive(Debug, Clone)]
pub enum Seq2SeqOutput<B: Backend> {
    /// [batch, tgt_len, symbol_size]
    Logits(Tensor<B, 3>),
    /// [batch, max_output_len], output-vocabulary ids
    Generated(Tensor<B, 2, Int>),
}

impl<B: Backend> Transformer<B> {
    /// Training when `target` is given, generation otherwise.
    pub fn forward(&self, src: Tensor<B, 2, Int>, target: Option<Tensor<B, 2, Int>>) -> Seq2SeqOutput<B> {
        match target {
            Some(target) => Seq2SeqOutput::Logits(self.forward_teacher_forced(src, target)),
            None => Seq2SeqOutput::Generated(self.generate(src)),
        }
    }

    /// src: [batch, src_len], target: [batch, tgt_len] (output ids, padded
    /// with the output pad id) → logits [batch, tgt_len, symbol_size]
    pub fn forward_teacher_forced(&self, src: Tensor<B, 2, Int>, target: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let (memory, memory_pad) = self.encode(src);
        let [batch_size, tgt_len] = target.dims();
        let device = target.device();

        // Shift right: <SOS> in front, last position dropped
        let sos = self.sos_column(batch_size, &device);
        let decoder_input = Tensor::cat(vec![sos, target], 1).slice([0..batch_size, 0..tgt_len]);
        let self_pad = decoder_input.clone().equal_elem(self.out_pad_id as i64);

        let ctx = DecoderContext {
            causal_mask: generate_autoregressive_mask::<B>(batch_size, tgt_len, &device),
            self_pad: Some(self_pad),
            memory,
            memory_pad,
        };
        let hidden = self.decode(decoder_input, &ctx);
        self.out.forward(hidden)
    }

    /// src: [batch, src_len] → generated output ids [batch, max_output_len]
    pub fn generate(&self, src: Tensor<B, 2, Int>) -> Tensor<B, 2, Int> {
        let (memory, memory_pad) = self.encode(src);
        let [batch_size, _, d_model] = memory.dims();
        let device = memory.device();

        let mut prefix = self.sos_column(batch_size, &device);
        let mut outputs = Vec::with_capacity(self.max_output_len);

        for _ in 0..self.max_output_len {
            let len = prefix.dims()[1];
            let ctx = DecoderContext {
                causal_mask: generate_autoregressive_mask::<B>(batch_size, len, &device),
                self_pad: None,
                memory: memory.clone(),
                memory_pad: memory_pad.clone(),
            };
            let hidden = self.decode(prefix.clone(), &ctx);
            let last = hidden
                .slice([0..batch_size, len - 1..len, 0..d_model])
                .reshape([batch_size, d_model]);
            let next = self.decoding_strategy.0.next_tokens(self.out.forward(last));

            outputs.push(next.clone());
            prefix = Tensor::cat(vec![prefix, next], 1);
        }

        Tensor::cat(outputs, 1)
    }

    /// src: [batch, src_len] → (memory [batch, src_len, d], pad mask [batch, src_len])
    fn encode(&self, src: Tensor<B, 2, Int>) -> (Tensor<B, 3>, Tensor<B, 2, Bool>) {
        let pad_mask = src.clone().equal_elem(self.in_pad_id as i64);
        let mut x = self.embed(&self.in_embedder, src);
        for layer in &self.encoder {
            x = layer.forward(x, pad_mask.clone());
        }
        (x, pad_mask)
    }

    /// Output-vocabulary ids → decoder hidden states [batch, len, d]
    fn decode(&self, output_ids: Tensor<B, 2, Int>, ctx: &DecoderContext<B>) -> Tensor<B, 3> {
        let ids = self.to_decoder_ids(output_ids);
        let embedder = self.out_embedder.as_ref().unwrap_or(&self.in_embedder);
        let mut x = self.embed(embedder, ids);
        for layer in &self.decoder {
            x = layer.forward(x, ctx);
        }
        x
    }

    fn embed(&self, embedder: &Embedding<B>, ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        self.embedding_dropout.forward(add_positions(embedder.forward(ids)))
    }

    // Shared vocabulary: look every output id up in the output → input table.
    fn to_decoder_ids(&self, output_ids: Tensor<B, 2, Int>) -> Tensor<B, 2, Int> {
        let Some(table) = &self.out_to_in.0 else { return output_ids };
        let [batch_size, len] = output_ids.dims();
        let device = output_ids.device();
        let table: Vec<i32> = table.iter().map(|&id| id as i32).collect();
        let table = Tensor::<B, 1, Int>::from_ints(table.as_slice(), &device);
        table
            .select(0, output_ids.reshape([batch_size * len]))
            .reshape([batch_size, len])
    }

    fn sos_column(&self, batch_size: usize, device: &B::Device) -> Tensor<B, 2, Int> {
        Tensor::full([batch_size, 1], self.out_sos_id as i64, device)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vocab::Vocabulary;

    type TestBackend = burn::backend::NdArray;

    fn small_config() -> TransformerConfig {
        TransformerConfig::new()
            .with_embedding_size(16)
            .with_ffn_size(32)
            .with_num_encoder_layers(2)
            .with_num_decoder_layers(2)
            .with_num_heads(4)
            .with_embedding_dropout_ratio(0.0)
            .with_attn_dropout_ratio(0.0)
            .with_attn_weight_dropout_ratio(0.0)
            .with_ffn_dropout_ratio(0.0)
            .with_max_output_len(6)
    }

    fn separate() -> VocabularySet {
        VocabularySet::separate(
            Vocabulary::new(["tom", "has", "NUM_0", "apples"]),
            Vocabulary::new(["+", "-", "NUM_0", "NUM_1"]),
            None,
        )
    }

    fn ids(rows: Vec<i32>, shape: [usize; 2]) -> Tensor<TestBackend, 2, Int> {
        Tensor::<TestBackend, 1, Int>::from_ints(rows.as_slice(), &Default::default()).reshape(shape)
    }

    #[test]
    fn test_teacher_forced_logits_shape() {
        let model = small_config().init::<TestBackend>(&separate(), &Default::default()).unwrap();
        let src = ids(vec![4, 5, 6, 7, 4, 6, 0, 0], [2, 4]);
        let target = ids(vec![4, 6, 7, 3, 5, 6, 3, 0], [2, 4]);
        let logits = model.forward_teacher_forced(src, target);
        // 4 + 4 output symbols
        assert_eq!(logits.dims(), [2, 4, 8]);
    }

    #[test]
    fn test_generation_length_is_max_output_len() {
        let model = small_config().init::<TestBackend>(&separate(), &Default::default()).unwrap();
        let src = ids(vec![4, 5, 6, 0], [1, 4]);
        match model.forward(src, None) {
            Seq2SeqOutput::Generated(out) => {
                assert_eq!(out.dims(), [1, 6]);
                assert!(out.into_data().iter::<i64>().all(|id| (0..8).contains(&id)));
            }
            Seq2SeqOutput::Logits(_) => panic!("expected generated ids"),
        }
    }

    #[test]
    fn test_generation_length_ignores_source_length() {
        let cfg = small_config().with_max_output_len(3);
        let model = cfg.init::<TestBackend>(&separate(), &Default::default()).unwrap();
        let short = model.generate(ids(vec![4], [1, 1]));
        let long = model.generate(ids(vec![4, 5, 6, 7, 4, 5, 6, 7], [1, 8]));
        assert_eq!(short.dims(), [1, 3]);
        assert_eq!(long.dims(), [1, 3]);
    }

    #[test]
    fn test_greedy_generation_is_deterministic() {
        let model = small_config().init::<TestBackend>(&separate(), &Default::default()).unwrap();
        let src = ids(vec![4, 5, 6, 7], [1, 4]);
        let a: Vec<i64> = model.generate(src.clone()).into_data().iter::<i64>().collect();
        let b: Vec<i64> = model.generate(src).into_data().iter::<i64>().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_shared_vocab_uses_one_embedding_table() {
        let vocabs = VocabularySet::shared(Vocabulary::new(["tom", "+", "NUM_0"]), None);
        let cfg = small_config().with_share_vocab(true);
        let model = cfg.init::<TestBackend>(&vocabs, &Default::default()).unwrap();
        assert!(model.out_embedder.is_none());

        let src = ids(vec![4, 5, 6], [1, 3]);
        let logits = model.forward_teacher_forced(src.clone(), ids(vec![6, 5, 6], [1, 3]));
        assert_eq!(logits.dims(), [1, 3, vocabs.output.len()]);
        assert_eq!(model.generate(src).dims(), [1, 6]);
    }

    #[test]
    fn test_shared_remap_translates_output_ids() {
        let vocabs = VocabularySet::shared(Vocabulary::new(["x", "y"]), None);
        let model = small_config()
            .with_share_vocab(true)
            .init::<TestBackend>(&vocabs, &Default::default())
            .unwrap();
        let mapped: Vec<i64> = model
            .to_decoder_ids(ids(vec![2, 5, 4, 0], [2, 2]))
            .into_data()
            .iter::<i64>()
            .collect();
        assert_eq!(mapped, vec![2, 5, 4, 0]);
    }

    #[test]
    fn test_invalid_configurations_are_rejected() {
        let device = Default::default();
        assert!(small_config().with_max_output_len(0).init::<TestBackend>(&separate(), &device).is_err());
        assert!(small_config().with_num_heads(3).init::<TestBackend>(&separate(), &device).is_err());
        assert!(small_config().with_share_vocab(true).init::<TestBackend>(&separate(), &device).is_err());
    }
}
