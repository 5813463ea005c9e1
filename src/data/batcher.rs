// ============================================================
// Layer 4 - MWP Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<MwpSample>
// into tensors.
//
// Samples reach the batcher indexed but unpadded, so this is
// where the per-batch work happens:
//
//   1. collect question ids + true lengths
//   2. pad with the input padder, build the input mask
//   3. for flat equations: pad with the output padder and build
//      the equation mask (batch-max policy)
//   4. flatten rows and reshape to [batch, len] tensors
//
// Tree equations cannot be a rectangular tensor; they travel
// alongside the tensors as indexed Equation values.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataloader::DataLoaderCore;
use crate::data::dataset::MwpSample;
use crate::data::padder::{build_mask, BatchPadder};
use crate::domain::equation::Equation;

// ─── MwpBatch ─────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct MwpBatch<B: Backend> {
    /// [batch_size, question_len]
    pub question: Tensor<B, 2, Int>,
    /// [batch_size, question_len], 1 = real token
    pub question_mask: Tensor<B, 2, Int>,
    pub question_len: Vec<usize>,

    /// [batch_size, equation_len]; None when equations are trees
    pub equation: Option<Tensor<B, 2, Int>>,
    pub equation_mask: Option<Tensor<B, 2, Int>>,
    pub equation_len: Vec<usize>,

    /// Indexed equations as they were, flat or tree
    pub equations: Vec<Equation<usize>>,
    /// Indexed templates, for template-driven decoders; the Transformer
    /// ignores them
    pub templates: Vec<Option<Equation<usize>>>,
    pub num_stack: Vec<Vec<Vec<usize>>>,
    pub num_size: Vec<usize>,
    pub ids: Vec<String>,
}

// ─── MwpBatcher ───────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct MwpBatcher<B: Backend> {
    pub device:    B::Device,
    input_padder:  BatchPadder,
    output_padder: BatchPadder,
}

impl<B: Backend> MwpBatcher<B> {
    pub fn new(core: &DataLoaderCore, device: B::Device) -> Self {
        Self {
            device,
            input_padder:  core.input_padder().clone(),
            output_padder: core.output_padder().clone(),
        }
    }
}

impl<B: Backend> Batcher<MwpSample, MwpBatch<B>> for MwpBatcher<B> {
    fn batch(&self, items: Vec<MwpSample>) -> MwpBatch<B> {
        // ── Questions ─────────────────────────────────────────────────────────
        let question_len: Vec<usize> = items.iter().map(MwpSample::question_len).collect();
        let questions = items.iter().map(|s| s.question_ids.clone()).collect();
        let questions = self.input_padder.pad(questions, &question_len);
        let question_mask = self.input_padder.mask(&question_len);

        // ── Equations ─────────────────────────────────────────────────────────
        let equation_len: Vec<usize> = items.iter().map(MwpSample::equation_len).collect();
        let flat: Option<Vec<Vec<usize>>> = items
            .iter()
            .map(|s| s.equation_ids.as_flat().map(<[usize]>::to_vec))
            .collect();

        let (equation, equation_mask) = match flat {
            Some(rows) => {
                let rows = self.output_padder.pad(rows, &equation_len);
                let width = rows.first().map_or(0, Vec::len);
                let mask = build_mask(&equation_len, width);
                (
                    Some(rows_to_tensor(&rows, &self.device)),
                    Some(mask_to_tensor(&mask, &self.device)),
                )
            }
            None => (None, None),
        };

        MwpBatch {
            question: rows_to_tensor(&questions, &self.device),
            question_mask: mask_to_tensor(&question_mask, &self.device),
            question_len,
            equation,
            equation_mask,
            equation_len,
            equations: items.iter().map(|s| s.equation_ids.clone()).collect(),
            templates: items.iter().map(|s| s.template_ids.clone()).collect(),
            num_stack: items.iter().map(|s| s.num_stack.clone()).collect(),
            num_size: items.iter().map(|s| s.numbers.len()).collect(),
            ids: items.into_iter().map(|s| s.id).collect(),
        }
    }
}

/// Stack equal-length id rows into an Int tensor of shape [rows, width].
pub fn rows_to_tensor<B: Backend>(rows: &[Vec<usize>], device: &B::Device) -> Tensor<B, 2, Int> {
    let flat = rows.iter().flat_map(|row| row.iter().map(|&x| x as i32)).collect();
    flat_to_tensor(flat, rows.len(), rows.first().map_or(0, Vec::len), device)
}

/// Same as `rows_to_tensor`, for 0/1 masks.
pub fn mask_to_tensor<B: Backend>(rows: &[Vec<u8>], device: &B::Device) -> Tensor<B, 2, Int> {
    let flat = rows.iter().flat_map(|row| row.iter().map(|&x| x as i32)).collect();
    flat_to_tensor(flat, rows.len(), rows.first().map_or(0, Vec::len), device)
}

fn flat_to_tensor<B: Backend>(
    flat:       Vec<i32>,
    batch_size: usize,
    width:      usize,
    device:     &B::Device,
) -> Tensor<B, 2, Int> {
    Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device).reshape([batch_size, width])
}
