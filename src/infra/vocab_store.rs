// ============================================================
// Layer 6 - Vocabulary Store
// ============================================================
// Builds the dataset vocabularies from the training problems and
// saves them so training and solving agree on every id. Saved
// tables are reused only when a fresh build gives the same ones.
//
//   input     question words seen at least `min_word_keep` times
//   output    equation symbols, plus NUM_0..NUM_{n-1} for the
//             largest number list n in the data
//   template  template symbols, only if some problem has one
//
// With share_vocab, input words and equation symbols go into a
// single table. Tokens are ordered by frequency (most frequent
// first, ties in first-seen order) after the special tokens.
//
// Saved as <checkpoint_dir>/vocab.json

use std::{collections::HashMap, fs, path::PathBuf};

use anyhow::{Context, Result};

use crate::domain::equation::Equation;
use crate::domain::problem::MwpProblem;
use crate::domain::vocab::{Vocabulary, VocabularySet};

// ─── Frequency Counting ──────────────────────────────────────────────────────
#[derive(Default)]
struct Counter {
    order:  Vec<(String, usize)>,
    lookup: HashMap<String, usize>,
}

impl Counter {
    fn add(&mut self, token: &str) {
        match self.lookup.get(token) {
            Some(&i) => self.order[i].1 += 1,
            None => {
                self.lookup.insert(token.to_string(), self.order.len());
                self.order.push((token.to_string(), 1));
            }
        }
    }

    /// Tokens with at least `min_count` occurrences, most frequent first.
    fn ranked(mut self, min_count: usize) -> Vec<String> {
        // sort_by is stable, so ties keep first-seen order
        self.order.sort_by(|a, b| b.1.cmp(&a.1));
        self.order
            .into_iter()
            .filter(|(_, count)| *count >= min_count)
            .map(|(token, _)| token)
            .collect()
    }
}

// ─── Builder ─────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy)]
pub struct VocabBuilder {
    pub min_word_keep: usize,
    pub share_vocab:   bool,
}

impl VocabBuilder {
    pub fn build(&self, problems: &[MwpProblem]) -> VocabularySet {
        let mut words = Counter::default();
        let mut symbols = Counter::default();
        let mut templates = Counter::default();
        let mut has_template = false;
        let mut max_numbers = 0;

        for p in problems {
            for word in p.question_tokens() {
                words.add(&word);
            }
            for symbol in Equation::Tree(p.equation.clone()).leaves() {
                symbols.add(symbol);
            }
            if let Some(template) = &p.template {
                has_template = true;
                for symbol in Equation::Tree(template.clone()).leaves() {
                    templates.add(symbol);
                }
            }
            max_numbers = max_numbers.max(p.numbers.len());
        }

        let placeholders: Vec<String> = (0..max_numbers).map(|i| format!("NUM_{i}")).collect();
        let mut symbol_list = symbols.ranked(1);
        symbol_list.extend(placeholders);
        let template = has_template.then(|| Vocabulary::new(templates.ranked(1)));

        let set = if self.share_vocab {
            let combined = words.ranked(self.min_word_keep).into_iter().chain(symbol_list);
            VocabularySet::shared(Vocabulary::new(combined), template)
        } else {
            VocabularySet::separate(
                Vocabulary::new(words.ranked(self.min_word_keep)),
                Vocabulary::new(symbol_list),
                template,
            )
        };

        tracing::info!(
            "Built vocabularies: {} words, {} symbols{}",
            set.input.len(),
            set.output.len(),
            set.template
                .as_ref()
                .map(|t| format!(", {} template symbols", t.len()))
                .unwrap_or_default(),
        );
        set
    }
}

// ─── Persistence ─────────────────────────────────────────────────────────────
pub struct VocabStore {
    dir: PathBuf,
}

impl VocabStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self) -> PathBuf {
        self.dir.join("vocab.json")
    }

    /// Build the tables for `problems` and keep the saved ones only
    /// if they are identical. A changed dataset or builder setting
    /// replaces vocab.json.
    pub fn load_or_build(&self, problems: &[MwpProblem], builder: &VocabBuilder) -> Result<VocabularySet> {
        let built = builder.build(problems);
        if self.path().exists() {
            let saved = self.load()?;
            if same_tables(&saved, &built) {
                tracing::info!("Saved vocabularies match the training data; reusing them");
                return Ok(saved);
            }
            tracing::warn!(
                "Saved vocabularies in '{}' do not match the training data; rebuilding",
                self.dir.display()
            );
        }
        self.save(&built)?;
        Ok(built)
    }

    pub fn save(&self, set: &VocabularySet) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        let path = self.path();
        fs::write(&path, serde_json::to_string_pretty(set)?)
            .with_context(|| format!("Cannot write vocabularies to '{}'", path.display()))?;
        tracing::debug!("Saved vocabularies to '{}'", path.display());
        Ok(())
    }

    pub fn load(&self) -> Result<VocabularySet> {
        let path = self.path();
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read vocabularies from '{}'. Have you run 'train' first?",
                path.display()
            )
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("'{}' is not a valid vocabulary file", path.display()))
    }
}

fn same_tables(a: &VocabularySet, b: &VocabularySet) -> bool {
    a.share_vocab == b.share_vocab
        && a.input.tokens() == b.input.tokens()
        && a.output.tokens() == b.output.tokens()
        && a.template.as_ref().map(Vocabulary::tokens) == b.template.as_ref().map(Vocabulary::tokens)
}
