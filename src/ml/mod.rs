// ============================================================
// Layer 5 - ML / Model Layer (Burn)
// ============================================================
// The sequence model and everything that runs it.
//
//   layers.rs     - encoder / decoder blocks, sinusoidal
//                   positions, feed-forward (GELU)
//
//   model.rs      - the Transformer seq2seq model:
//                   • teacher-forced logits for training
//                   • autoregressive generation for inference
//                   • shared or separate embedding tables
//
//   decoding.rs   - next-symbol choice during generation
//                   (greedy argmax, top-k sampling)
//
//   trainer.rs    - Adam + cross-entropy loop with validation,
//                   metrics and a checkpoint per epoch
//
//   inferencer.rs - loads a checkpoint and solves a question
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Vaswani et al. (2017) Attention Is All You Need

/// Encoder and decoder blocks
pub mod layers;

/// Transformer seq2seq model
pub mod model;

/// Greedy and top-k decoding
pub mod decoding;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Checkpoint loading and question solving
pub mod inferencer;
