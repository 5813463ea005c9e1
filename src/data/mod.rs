// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything from a problem file to tensor batches:
//
//   problems.json
//       │
//       ▼
//   JsonProblemLoader   → reads MwpProblems
//       │
//       ▼
//   split_train_test    → seeded train / test split
//       │
//       ▼
//   SingleEquationLoader (DataLoaderCore)
//       │                 indexes words and symbols, injects
//       │                 SOS/EOS, builds number stacks
//       ▼
//   MwpDataset          → implements Burn's Dataset trait
//       │
//       ▼
//   MwpBatcher          → pads, masks, stacks into tensors
//       │
//       ▼
//   DataLoader          → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads problems from a JSON file
pub mod loader;

/// Token → id lookup with unknown-token fallback
pub mod indexer;

/// Batch padding and attention masks
pub mod padder;

/// Candidate number positions for equation tokens
pub mod num_stack;

/// DataLoaderCore, the MwpDataLoader trait and the seq2seq loader
pub mod dataloader;

/// Implements Burn's Dataset trait for indexed samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Seeded train/test split
pub mod splitter;
