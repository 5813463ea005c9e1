// ============================================================
// Layer 5 - Transformer Layers
// ============================================================
// Encoder and decoder blocks plus the sinusoidal position
// table they share.
//
// Encoder block (post-norm, as in Vaswani et al.):
//   x = norm1(x + drop(self_attn(x, pad_mask)))
//   x = norm2(x + drop(ffn(x)))
//
// Decoder block adds a cross-attention sub-layer between the
// masked self-attention and the feed-forward network:
//   x = norm1(x + drop(self_attn(x, causal_mask, pad_mask)))
//   x = norm2(x + drop(cross_attn(x, memory, memory_pad_mask)))
//   x = norm3(x + drop(ffn(x)))
//
// Masks follow Burn's convention: `true` marks a position that
// must NOT be attended to.
//
// Reference: Vaswani et al. (2017) Attention Is All You Need
//            Burn Book §3 (Building Blocks)

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::gelu,
};

/// Dimensions and dropout ratios shared by every block.
#[derive(Debug, Clone, Copy)]
pub struct BlockDims {
    pub d_model:              usize,
    pub d_ff:                 usize,
    pub num_heads:            usize,
    /// Residual dropout after each attention sub-layer
    pub attn_dropout:         f64,
    /// Dropout on the attention weights
    pub attn_weight_dropout:  f64,
    /// Dropout inside and after the feed-forward network
    pub ffn_dropout:          f64,
}

impl BlockDims {
    fn attention<B: Backend>(&self, device: &B::Device) -> MultiHeadAttention<B> {
        MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.attn_weight_dropout)
            .init(device)
    }

    fn feed_forward<B: Backend>(&self, device: &B::Device) -> FeedForward<B> {
        FeedForward {
            linear1: LinearConfig::new(self.d_model, self.d_ff).init(device),
            linear2: LinearConfig::new(self.d_ff, self.d_model).init(device),
            dropout: DropoutConfig::new(self.ffn_dropout).init(),
        }
    }

    pub fn encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        EncoderBlock {
            self_attn: self.attention(device),
            ffn:       self.feed_forward(device),
            norm1:     LayerNormConfig::new(self.d_model).init(device),
            norm2:     LayerNormConfig::new(self.d_model).init(device),
            attn_drop: DropoutConfig::new(self.attn_dropout).init(),
            ffn_drop:  DropoutConfig::new(self.ffn_dropout).init(),
        }
    }

    pub fn decoder_block<B: Backend>(&self, device: &B::Device) -> DecoderBlock<B> {
        DecoderBlock {
            self_attn:  self.attention(device),
            cross_attn: self.attention(device),
            ffn:        self.feed_forward(device),
            norm1:      LayerNormConfig::new(self.d_model).init(device),
            norm2:      LayerNormConfig::new(self.d_model).init(device),
            norm3:      LayerNormConfig::new(self.d_model).init(device),
            attn_drop:  DropoutConfig::new(self.attn_dropout).init(),
            ffn_drop:   DropoutConfig::new(self.ffn_dropout).init(),
        }
    }
}

// ─── Feed-Forward ─────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct FeedForward<B: Backend> {
    pub linear1: Linear<B>,
    pub linear2: Linear<B>,
    pub dropout: Dropout,
}

impl<B: Backend> FeedForward<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let hidden = self.dropout.forward(gelu(self.linear1.forward(x)));
        self.linear2.forward(hidden)
    }
}

// ─── Encoder Block ────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn: MultiHeadAttention<B>,
    pub ffn:       FeedForward<B>,
    pub norm1:     LayerNorm<B>,
    pub norm2:     LayerNorm<B>,
    pub attn_drop: Dropout,
    pub ffn_drop:  Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// x: [batch, src_len, d_model], pad_mask: [batch, src_len]
    pub fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn = self
            .self_attn
            .forward(MhaInput::self_attn(x.clone()).mask_pad(pad_mask))
            .context;
        let x = self.norm1.forward(x + self.attn_drop.forward(attn));
        let ffn_out = self.ffn.forward(x.clone());
        self.norm2.forward(x + self.ffn_drop.forward(ffn_out))
    }
}

// ─── Decoder Block ────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct DecoderBlock<B: Backend> {
    pub self_attn:  MultiHeadAttention<B>,
    pub cross_attn: MultiHeadAttention<B>,
    pub ffn:        FeedForward<B>,
    pub norm1:      LayerNorm<B>,
    pub norm2:      LayerNorm<B>,
    pub norm3:      LayerNorm<B>,
    pub attn_drop:  Dropout,
    pub ffn_drop:   Dropout,
}

/// Everything the decoder attends to besides its own prefix.
#[derive(Debug, Clone)]
pub struct DecoderContext<B: Backend> {
    /// [batch, tgt_len, tgt_len], true above the diagonal
    pub causal_mask: Tensor<B, 3, Bool>,
    /// [batch, tgt_len], true on target padding (training only)
    pub self_pad:    Option<Tensor<B, 2, Bool>>,
    /// Encoder output: [batch, src_len, d_model]
    pub memory:      Tensor<B, 3>,
    /// [batch, src_len], true on source padding
    pub memory_pad:  Tensor<B, 2, Bool>,
}

impl<B: Backend> DecoderBlock<B> {
    pub fn forward(&self, x: Tensor<B, 3>, ctx: &DecoderContext<B>) -> Tensor<B, 3> {
        let mut self_input = MhaInput::self_attn(x.clone()).mask_attn(ctx.causal_mask.clone());
        if let Some(pad) = &ctx.self_pad {
            self_input = self_input.mask_pad(pad.clone());
        }
        let attn = self.self_attn.forward(self_input).context;
        let x = self.norm1.forward(x + self.attn_drop.forward(attn));

        let cross_input = MhaInput::new(x.clone(), ctx.memory.clone(), ctx.memory.clone())
            .mask_pad(ctx.memory_pad.clone());
        let cross = self.cross_attn.forward(cross_input).context;
        let x = self.norm2.forward(x + self.attn_drop.forward(cross));

        let ffn_out = self.ffn.forward(x.clone());
        self.norm3.forward(x + self.ffn_drop.forward(ffn_out))
    }
}

// ─── Positional Encoding ──────────────────────────────────────────────────────
// PE(pos, 2i)   = sin(pos / 10000^(2i/d))
// PE(pos, 2i+1) = cos(pos / 10000^(2i/d))
//
// Built for the exact length requested, so there is no maximum
// sequence length to configure.

/// Sinusoidal position table: [seq_len, d_model]
pub fn sinusoids<B: Backend>(seq_len: usize, d_model: usize, device: &B::Device) -> Tensor<B, 2> {
    let mut table = Vec::with_capacity(seq_len * d_model);
    for pos in 0..seq_len {
        for j in 0..d_model {
            let exponent = (2 * (j / 2)) as f32 / d_model as f32;
            let angle = pos as f32 / 10_000_f32.powf(exponent);
            table.push(if j % 2 == 0 { angle.sin() } else { angle.cos() });
        }
    }
    Tensor::from_data(TensorData::new(table, [seq_len, d_model]), device)
}

/// Add the position table to a batch of embeddings.
pub fn add_positions<B: Backend>(x: Tensor<B, 3>) -> Tensor<B, 3> {
    let [_, seq_len, d_model] = x.dims();
    let table = sinusoids::<B>(seq_len, d_model, &x.device());
    x + table.unsqueeze::<3>()
}
