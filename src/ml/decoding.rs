// ============================================================
// Layer 5 - Decoding Strategies
// ============================================================
// Picks the next output symbol from the logits of the last
// decoder position during generation.
//
//   greedy_search  - argmax over the symbol dimension
//   topk_sampling  - keep the 5 best logits, softmax over them,
//                    sample one
//
// The strategy is parsed when the model is configured, so an
// unknown name never reaches the generation loop.
//
// Reference: Holtzman et al. (2020) The Curious Case of Neural
//            Text Degeneration (top-k vs nucleus sampling)

use std::{fmt, str::FromStr};

use anyhow::{bail, Result};
use burn::prelude::*;
use rand::{
    distributions::{Distribution, WeightedIndex},
    Rng,
};
use serde::{Deserialize, Serialize};

/// Candidates kept by top-k sampling.
pub const TOP_K: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodingStrategy {
    #[default]
    GreedySearch,
    TopkSampling,
}

impl FromStr for DecodingStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "greedy_search" => Ok(Self::GreedySearch),
            "topk_sampling" => Ok(Self::TopkSampling),
            other => bail!(
                "unknown decoding strategy '{other}' (expected greedy_search or topk_sampling)"
            ),
        }
    }
}

impl fmt::Display for DecodingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GreedySearch => write!(f, "greedy_search"),
            Self::TopkSampling => write!(f, "topk_sampling"),
        }
    }
}

impl DecodingStrategy {
    /// logits: [batch, symbol_size] → next symbol ids: [batch, 1]
    pub fn next_tokens<B: Backend>(&self, logits: Tensor<B, 2>) -> Tensor<B, 2, Int> {
        match self {
            Self::GreedySearch => logits.argmax(1),
            Self::TopkSampling => topk_sampling(logits, TOP_K, &mut rand::thread_rng()),
        }
    }
}

/// Sample one id per row from the `k` most likely symbols.
///
/// Runs on the host: the rows are small (one per problem) and the
/// weighted draw needs `rand` anyway.
pub fn topk_sampling<B: Backend, R: Rng>(
    logits: Tensor<B, 2>,
    k:      usize,
    rng:    &mut R,
) -> Tensor<B, 2, Int> {
    let [batch_size, symbol_size] = logits.dims();
    let device = logits.device();

    let values: Vec<f32> = logits.into_data().iter::<f32>().collect();
    let picks: Vec<i32> = values
        .chunks(symbol_size.max(1))
        .map(|row| sample_row(row, k, rng) as i32)
        .collect();

    Tensor::<B, 1, Int>::from_ints(picks.as_slice(), &device).reshape([batch_size, 1])
}

fn sample_row<R: Rng>(row: &[f32], k: usize, rng: &mut R) -> usize {
    let mut order: Vec<usize> = (0..row.len()).collect();
    order.sort_by(|&a, &b| row[b].partial_cmp(&row[a]).unwrap_or(std::cmp::Ordering::Equal));
    order.truncate(k.max(1));

    let Some(&best) = order.first() else { return 0 };
    let max = row[best];
    let weights: Vec<f32> = order.iter().map(|&i| (row[i] - max).exp()).collect();

    match WeightedIndex::new(&weights) {
        Ok(dist) => order[dist.sample(rng)],
        // All weights zero or NaN: fall back to the best candidate
        Err(_) => best,
    }
}
