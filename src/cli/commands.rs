// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `solve`, and all
// their configurable flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::train_use_case::{DeviceKind, TrainConfig};
use crate::data::dataloader::DataLoaderConfig;
use crate::domain::equation::FixType;
use crate::ml::{decoding::DecodingStrategy, model::TransformerConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the Transformer on a JSON problem file
    Train(TrainArgs),

    /// Solve a question using a trained checkpoint
    Solve(SolveArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// JSON array of problems {id, question, equation, numbers}
    #[arg(long, default_value = "data/problems.json")]
    pub data_path: String,

    /// Directory for checkpoints, vocabularies and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// cpu (NdArray) or gpu (Wgpu)
    #[arg(long, default_value = "cpu")]
    pub device: DeviceKind,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    #[arg(long, default_value_t = 1e-4)]
    pub lr: f64,

    /// Seed for the train/test split and batch shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value_t = 0.8)]
    pub train_fraction: f64,

    #[arg(long, default_value_t = 1)]
    pub min_word_keep: usize,

    // ── Data ──────────────────────────────────────────────────────────────────
    /// infix, postfix or prefix
    #[arg(long, default_value = "prefix")]
    pub equation_fix: FixType,

    #[arg(long, default_value_t = 64)]
    pub train_batch_size: usize,

    #[arg(long, default_value_t = 64)]
    pub test_batch_size: usize,

    /// One vocabulary for question words and equation symbols
    #[arg(long)]
    pub share_vocab: bool,

    /// Pad/truncate questions to this length (default: batch max)
    #[arg(long)]
    pub max_len: Option<usize>,

    /// Pad/truncate equations to this length (default: batch max)
    #[arg(long)]
    pub max_equ_len: Option<usize>,

    #[arg(long)]
    pub add_sos: bool,

    #[arg(long)]
    pub add_eos: bool,

    /// Drop problems whose equation has unknown symbols or bad NUM_i
    #[arg(long)]
    pub filt_dirty: bool,

    // ── Model ─────────────────────────────────────────────────────────────────
    #[arg(long, default_value_t = 512)]
    pub embedding_size: usize,

    #[arg(long, default_value_t = 2048)]
    pub ffn_size: usize,

    #[arg(long, default_value_t = 6)]
    pub num_encoder_layers: usize,

    #[arg(long, default_value_t = 6)]
    pub num_decoder_layers: usize,

    /// embedding_size must be divisible by num_heads
    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 0.1)]
    pub embedding_dropout_ratio: f64,

    #[arg(long, default_value_t = 0.1)]
    pub attn_dropout_ratio: f64,

    #[arg(long, default_value_t = 0.1)]
    pub attn_weight_dropout_ratio: f64,

    #[arg(long, default_value_t = 0.1)]
    pub ffn_dropout_ratio: f64,

    #[arg(long, default_value_t = 30)]
    pub max_output_len: usize,

    /// greedy_search or topk_sampling
    #[arg(long, default_value = "greedy_search")]
    pub decoding_strategy: DecodingStrategy,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        let data = DataLoaderConfig {
            model:            "Transformer".to_string(),
            equation_fix:     a.equation_fix,
            train_batch_size: a.train_batch_size,
            test_batch_size:  a.test_batch_size,
            symbol_for_tree:  false,
            share_vocab:      a.share_vocab,
            max_len:          a.max_len,
            max_equ_len:      a.max_equ_len,
            add_sos:          a.add_sos,
            add_eos:          a.add_eos,
            filt_dirty:       a.filt_dirty,
        };
        let model = TransformerConfig::new()
            .with_embedding_size(a.embedding_size)
            .with_ffn_size(a.ffn_size)
            .with_num_encoder_layers(a.num_encoder_layers)
            .with_num_decoder_layers(a.num_decoder_layers)
            .with_num_heads(a.num_heads)
            .with_embedding_dropout_ratio(a.embedding_dropout_ratio)
            .with_attn_dropout_ratio(a.attn_dropout_ratio)
            .with_attn_weight_dropout_ratio(a.attn_weight_dropout_ratio)
            .with_ffn_dropout_ratio(a.ffn_dropout_ratio)
            .with_max_output_len(a.max_output_len)
            .with_decoding_strategy(a.decoding_strategy)
            .with_share_vocab(a.share_vocab);

        TrainConfig {
            data_path:      a.data_path,
            checkpoint_dir: a.checkpoint_dir,
            device:         a.device,
            epochs:         a.epochs,
            lr:             a.lr,
            seed:           a.seed,
            train_fraction: a.train_fraction,
            min_word_keep:  a.min_word_keep,
            data,
            model,
        }
    }
}

#[derive(Args, Debug)]
pub struct SolveArgs {
    /// The question; numbers are masked as NUM_i unless --numbers is given
    #[arg(long)]
    pub question: String,

    /// Numbers for NUM_0, NUM_1, ... when the question is already masked
    #[arg(long, value_delimiter = ',')]
    pub numbers: Vec<String>,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Override the device the model was trained on
    #[arg(long)]
    pub device: Option<DeviceKind>,

    /// Override the decoding strategy the model was trained with
    #[arg(long)]
    pub decoding_strategy: Option<DecodingStrategy>,
}
