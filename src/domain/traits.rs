// ============================================================
// Layer 3 - Core Traits (Abstractions)
// ============================================================
// By programming against traits instead of concrete types the
// application layer can swap the problem source without any
// other change:
//   - JsonProblemLoader implements ProblemSource
//   - an in-memory list (tests) can implement it too
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::problem::MwpProblem;

/// Any component that can load math word problems.
pub trait ProblemSource {
    /// Load every available problem, in file order.
    fn load_all(&self) -> Result<Vec<MwpProblem>>;
}

impl ProblemSource for Vec<MwpProblem> {
    fn load_all(&self) -> Result<Vec<MwpProblem>> {
        Ok(self.clone())
    }
}
