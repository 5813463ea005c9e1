// ============================================================
// Layer 2 - SolveUseCase
// ============================================================
// Solves one question with a trained checkpoint:
//
//   Step 1: Mask numbers as NUM_i (unless given explicitly)
//   Step 2: Rebuild the model from the checkpoint  (Layer 6)
//   Step 3: Generate and render the equation       (Layer 5)
//
// The backend follows the device the model was trained on
// unless the caller overrides it.

use anyhow::Result;

use crate::application::train_use_case::{CpuBackend, DeviceKind, GpuBackend};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    decoding::DecodingStrategy,
    inferencer::{Solution, Solver},
};

pub struct SolveUseCase {
    ckpt_manager: CheckpointManager,
    device:       Option<DeviceKind>,
    strategy:     Option<DecodingStrategy>,
}

impl SolveUseCase {
    pub fn new(
        checkpoint_dir: String,
        device:         Option<DeviceKind>,
        strategy:       Option<DecodingStrategy>,
    ) -> Self {
        Self {
            ckpt_manager: CheckpointManager::new(checkpoint_dir),
            device,
            strategy,
        }
    }

    /// With an empty `numbers` list, numeric tokens in the question are
    /// replaced by NUM_0, NUM_1, ... and used as the number list.
    pub fn solve(&self, question: &str, numbers: &[String]) -> Result<Solution> {
        let (question, numbers) = if numbers.is_empty() {
            mask_numbers(question)
        } else {
            (question.to_string(), numbers.to_vec())
        };
        tracing::info!("Solving '{}' with numbers {:?}", question, numbers);

        let device = match self.device {
            Some(device) => device,
            None => self.ckpt_manager.load_config()?.device,
        };

        match device {
            DeviceKind::Cpu => {
                let device = burn::backend::ndarray::NdArrayDevice::default();
                Solver::<CpuBackend>::from_checkpoint(&self.ckpt_manager, self.strategy, device)?
                    .solve(&question, &numbers)
            }
            DeviceKind::Gpu => {
                let device = burn::backend::wgpu::WgpuDevice::default();
                Solver::<GpuBackend>::from_checkpoint(&self.ckpt_manager, self.strategy, device)?
                    .solve(&question, &numbers)
            }
        }
    }
}

/// Replace every numeric token with NUM_i, returning the rewritten
/// question and the numbers in order of appearance.
pub fn mask_numbers(question: &str) -> (String, Vec<String>) {
    let mut numbers = Vec::new();
    let tokens: Vec<String> = question
        .split_whitespace()
        .map(|token| {
            if is_number(token) {
                let placeholder = format!("NUM_{}", numbers.len());
                numbers.push(token.to_string());
                placeholder
            } else {
                token.to_string()
            }
        })
        .collect();
    (tokens.join(" "), numbers)
}

fn is_number(token: &str) -> bool {
    let body = token.strip_suffix('%').unwrap_or(token);
    if let Some((num, den)) = body.split_once('/') {
        return num.parse::<f64>().is_ok() && den.parse::<f64>().is_ok();
    }
    body.parse::<f64>().is_ok_and(f64::is_finite)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_numbers_in_order() {
        let (q, nums) = mask_numbers("tom has 3 apples and buys 2.5 kg , 40% off , 1/2 left");
        assert_eq!(q, "tom has NUM_0 apples and buys NUM_1 kg , NUM_2 off , NUM_3 left");
        assert_eq!(nums, vec!["3", "2.5", "40%", "1/2"]);
    }

    #[test]
    fn test_words_are_not_numbers() {
        let (q, nums) = mask_numbers("inf apples nan");
        assert_eq!(q, "inf apples nan");
        assert!(nums.is_empty());
    }

    #[test]
    fn test_solve_without_checkpoint_fails() {
        let dir = std::env::temp_dir().join("mwp_solve_no_checkpoint");
        std::fs::remove_dir_all(&dir).ok();
        let use_case = SolveUseCase::new(dir.to_string_lossy().into_owned(), None, None);
        assert!(use_case.solve("tom has 3 apples", &[]).is_err());
    }
}
