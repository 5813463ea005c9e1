// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Everything that touches the checkpoint directory:
//
//   checkpoint.rs   - model weights (CompactRecorder), the
//                     latest epoch pointer and the TrainConfig
//                     the solver rebuilds the model from
//
//   vocab_store.rs  - builds the vocabularies from the training
//                     problems and persists them, so training
//                     and solving share every id
//
//   metrics.rs      - one CSV row per epoch (loss, accuracy)
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Vocabulary building, saving, and loading
pub mod vocab_store;

/// Training metrics CSV logger
pub mod metrics;
