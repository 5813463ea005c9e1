// ============================================================
// Layer 4 - Problem File Loader
// ============================================================
// Reads a dataset file: a JSON array of problems.
//
//   [
//     {
//       "id": "1",
//       "question": "tom has NUM_0 apples and buys NUM_1 more",
//       "equation": ["NUM_0", "+", "NUM_1"],
//       "numbers": ["3", "5"]
//     },
//     ...
//   ]
//
// "template" is optional; "equation" may contain nested arrays
// (multi-way tree groups).
//
// Reference: serde_json documentation
//            Rust Book §9 (Error Handling)

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};

use crate::domain::problem::MwpProblem;
use crate::domain::traits::ProblemSource;

pub struct JsonProblemLoader {
    path: PathBuf,
}

impl JsonProblemLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ProblemSource for JsonProblemLoader {
    fn load_all(&self) -> Result<Vec<MwpProblem>> {
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read problem file '{}'", self.path.display()))?;

        let mut problems: Vec<MwpProblem> = serde_json::from_str(&json)
            .with_context(|| format!("'{}' is not a JSON array of problems", self.path.display()))?;

        // Problems without an id get their position
        for (i, p) in problems.iter_mut().enumerate() {
            if p.id.is_empty() {
                p.id = i.to_string();
            }
        }

        let skipped = problems.iter().filter(|p| p.equation.is_empty()).count();
        if skipped > 0 {
            tracing::warn!("Skipping {} problems with an empty equation", skipped);
            problems.retain(|p| !p.equation.is_empty());
        }

        // An empty question would become a zero-width encoder input
        let skipped = problems.iter().filter(|p| p.question_tokens().is_empty()).count();
        if skipped > 0 {
            tracing::warn!("Skipping {} problems with an empty question", skipped);
            problems.retain(|p| !p.question_tokens().is_empty());
        }

        tracing::info!("Loaded {} problems from '{}'", problems.len(), self.path.display());
        Ok(problems)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loads_problems_and_assigns_ids() {
        let path = std::env::temp_dir().join("mwp_loader_test_problems.json");
        fs::write(
            &path,
            r#"[
                {"question": "a NUM_0", "equation": ["NUM_0", "*", "2"], "numbers": ["4"]},
                {"id": "q9", "question": "b", "equation": []}
            ]"#,
        )
        .unwrap();

        let problems = JsonProblemLoader::new(&path).load_all().unwrap();
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].id, "0");
        assert_eq!(problems[0].numbers, vec!["4"]);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_empty_questions_are_skipped() {
        let path = std::env::temp_dir().join("mwp_loader_test_empty_question.json");
        fs::write(
            &path,
            r#"[
                {"id": "a", "question": "", "equation": ["NUM_0"], "numbers": ["3"]},
                {"id": "b", "question": "   ", "equation": ["NUM_0"], "numbers": ["3"]},
                {"id": "c", "question": "tom has NUM_0", "equation": ["NUM_0"], "numbers": ["3"]}
            ]"#,
        )
        .unwrap();

        let problems = JsonProblemLoader::new(&path).load_all().unwrap();
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].id, "c");
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let loader = JsonProblemLoader::new("/definitely/not/here.json");
        assert!(loader.load_all().is_err());
    }
}
