use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::domain::equation::Equation;

/// One indexed (but not yet padded) problem.
/// Padding happens per mini-batch in MwpBatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MwpSample {
    pub id:           String,
    pub question_ids: Vec<usize>,
    pub equation_ids: Equation<usize>,
    pub template_ids: Option<Equation<usize>>,
    pub num_stack:    Vec<Vec<usize>>,
    pub numbers:      Vec<String>,
}

impl MwpSample {
    pub fn question_len(&self) -> usize {
        self.question_ids.len()
    }

    pub fn equation_len(&self) -> usize {
        self.equation_ids.len()
    }
}

pub struct MwpDataset {
    samples: Vec<MwpSample>,
}

impl MwpDataset {
    pub fn new(samples: Vec<MwpSample>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }
}

impl Dataset<MwpSample> for MwpDataset {
    fn get(&self, index: usize) -> Option<MwpSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
