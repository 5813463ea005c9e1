// ============================================================
// Layer 3 - Math Word Problem Domain Type
// ============================================================
// One labelled math word problem as it comes from the dataset:
//
//   question  - the problem text, already tokenised, with the
//               numbers replaced by NUM_i placeholders
//   equation  - the answer equation in infix order; may nest
//               (a nested list is a multi-way tree group)
//   template  - optional template form of the equation
//   numbers   - the numbers extracted from the question, in
//               order, as they were written ("3", "0.5", ...)
//
// Example:
//   question: "tom has NUM_0 apples and buys NUM_1 more"
//   equation: ["NUM_0", "+", "NUM_1"]
//   numbers:  ["3", "5"]
//
// Reference: Rust Book §5 (Structs)

use serde::{Deserialize, Serialize};

use crate::domain::equation::EquationNode;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MwpProblem {
    #[serde(default)]
    pub id: String,

    /// Whitespace separated tokens
    pub question: String,

    pub equation: Vec<EquationNode<String>>,

    #[serde(default)]
    pub template: Option<Vec<EquationNode<String>>>,

    #[serde(default)]
    pub numbers: Vec<String>,
}

impl MwpProblem {
    pub fn new(
        id:       impl Into<String>,
        question: impl Into<String>,
        equation: &[&str],
        numbers:  &[&str],
    ) -> Self {
        Self {
            id:       id.into(),
            question: question.into(),
            equation: equation.iter().map(|s| EquationNode::Leaf(s.to_string())).collect(),
            template: None,
            numbers:  numbers.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn question_tokens(&self) -> Vec<String> {
        self.question.split_whitespace().map(String::from).collect()
    }
}
