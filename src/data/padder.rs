// ============================================================
// Layer 4 - Batch Padder and Mask Builder
// ============================================================
// Brings a mini-batch of variable-length id sequences to one
// length, and builds the 0/1 masks that go with it.
//
// Two padders are configured per dataloader:
//
//   input   pad = input <PAD>,  length = max_len     or batch max
//   output  pad = output <PAD>, length = max_equ_len or batch max
//
// Rows shorter than the target are right-padded. Rows at or
// over the target are cut:
//
//   input, add_sos && add_eos:  [SOS, a, b, c, EOS], target 4
//                               -> [SOS, a, b, EOS]
//   everything else:            keep the first `target` ids
//
// Padding consumes the batch and returns the padded rows, so a
// caller can never observe a half-padded batch through an alias.
//
// Reference: Rust Book §8 (Vectors)

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPadder {
    pad_id:          usize,
    max_len:         Option<usize>,
    keep_boundaries: bool,
}

impl BatchPadder {
    /// Padder for problem text. Boundary tokens survive truncation
    /// only when both SOS and EOS were added.
    pub fn input(pad_id: usize, max_len: Option<usize>, add_sos: bool, add_eos: bool) -> Self {
        Self { pad_id, max_len, keep_boundaries: add_sos && add_eos }
    }

    /// Padder for equations. Truncation is always a plain cut.
    pub fn output(pad_id: usize, max_equ_len: Option<usize>) -> Self {
        Self { pad_id, max_len: max_equ_len, keep_boundaries: false }
    }

    pub fn pad_id(&self) -> usize {
        self.pad_id
    }

    /// The configured bound, or the longest length in the batch.
    pub fn target_len(&self, lengths: &[usize]) -> usize {
        self.max_len
            .unwrap_or_else(|| lengths.iter().copied().max().unwrap_or(0))
    }

    /// Pad or truncate every row to `target_len(lengths)`.
    pub fn pad(&self, batch: Vec<Vec<usize>>, lengths: &[usize]) -> Vec<Vec<usize>> {
        let target = self.target_len(lengths);
        batch
            .into_iter()
            .zip(lengths)
            .map(|(row, &len)| self.pad_row(row, len, target))
            .collect()
    }

    fn pad_row(&self, mut row: Vec<usize>, len: usize, target: usize) -> Vec<usize> {
        if len < target {
            row.resize(target, self.pad_id);
            return row;
        }
        // A single slot cannot hold both boundaries.
        if self.keep_boundaries && target >= 2 && row.len() >= target {
            let last = row[row.len() - 1];
            row.truncate(target - 1);
            row.push(last);
            return row;
        }
        row.truncate(target);
        row
    }

    /// Mask aligned with this padder's target length.
    pub fn mask(&self, lengths: &[usize]) -> Vec<Vec<u8>> {
        build_mask(lengths, self.target_len(lengths))
    }
}

/// Mask over the batch's own longest length.
pub fn batch_mask(lengths: &[usize]) -> Vec<Vec<u8>> {
    let max_length = lengths.iter().copied().max().unwrap_or(0);
    build_mask(lengths, max_length)
}

/// Row i: `min(lengths[i], max_length)` ones followed by zeros.
pub fn build_mask(lengths: &[usize], max_length: usize) -> Vec<Vec<u8>> {
    lengths
        .iter()
        .map(|&len| {
            let ones = len.min(max_length);
            let mut row = vec![1u8; ones];
            row.resize(max_length, 0);
            row
        })
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    const PAD: usize = 0;
    const SOS: usize = 2;
    const EOS: usize = 3;

    fn lens(batch: &[Vec<usize>]) -> Vec<usize> {
        batch.iter().map(Vec::len).collect()
    }

    #[test]
    fn test_pads_to_batch_max_when_unconfigured() {
        let batch = vec![vec![5, 6], vec![7, 8, 9, 10], vec![11]];
        let l = lens(&batch);
        let out = BatchPadder::input(PAD, None, false, false).pad(batch, &l);
        assert!(out.iter().all(|r| r.len() == 4));
        assert_eq!(out[0], vec![5, 6, PAD, PAD]);
        assert_eq!(out[2], vec![11, PAD, PAD, PAD]);
    }

    #[test]
    fn test_pads_to_configured_max_len() {
        let batch = vec![vec![5, 6]];
        let out = BatchPadder::output(PAD, Some(5)).pad(batch, &[2]);
        assert_eq!(out, vec![vec![5, 6, PAD, PAD, PAD]]);
    }

    #[test]
    fn test_boundary_tokens_survive_truncation() {
        let batch = vec![vec![SOS, 10, 11, 12, EOS]];
        let out = BatchPadder::input(PAD, Some(4), true, true).pad(batch, &[5]);
        assert_eq!(out, vec![vec![SOS, 10, 11, EOS]]);
    }

    #[test]
    fn test_plain_truncation_without_both_boundaries() {
        let batch = vec![vec![SOS, 10, 11, 12, EOS]];
        let out = BatchPadder::input(PAD, Some(4), true, false).pad(batch, &[5]);
        assert_eq!(out, vec![vec![SOS, 10, 11, 12]]);
    }

    #[test]
    fn test_output_truncation_ignores_boundaries() {
        let batch = vec![vec![4, 5, 6, EOS]];
        let out = BatchPadder::output(PAD, Some(2)).pad(batch, &[4]);
        assert_eq!(out, vec![vec![4, 5]]);
    }

    #[test]
    fn test_padding_a_sized_batch_is_identity() {
        let batch = vec![vec![SOS, 4, 5, EOS], vec![SOS, 6, EOS, PAD]];
        let padder = BatchPadder::input(PAD, Some(4), true, true);
        let out = padder.pad(batch.clone(), &[4, 4]);
        assert_eq!(out, batch);
    }

    #[test]
    fn test_masks_match_padded_length() {
        let lengths = [2, 4, 1];
        let mask = batch_mask(&lengths);
        assert_eq!(mask[0], vec![1, 1, 0, 0]);
        assert_eq!(mask[2], vec![1, 0, 0, 0]);

        let input_mask = BatchPadder::input(PAD, Some(6), false, false).mask(&lengths);
        assert!(input_mask.iter().all(|r| r.len() == 6));
        for (row, &len) in input_mask.iter().zip(&lengths) {
            assert_eq!(row.iter().filter(|&&b| b == 1).count(), len);
            assert!(row[..len].iter().all(|&b| b == 1));
        }
    }

    #[test]
    fn test_mask_clamps_rows_longer_than_bound() {
        let mask = BatchPadder::input(PAD, Some(3), false, false).mask(&[5]);
        assert_eq!(mask, vec![vec![1, 1, 1]]);
    }
}
