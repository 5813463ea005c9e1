// ============================================================
// Layer 4 - Dataloaders
// ============================================================
// DataLoaderCore is the part every dataloader shares: the
// configuration, the dataset vocabularies, the special-token
// ids, and the indexing / padding / mask / number-stack
// operations built on top of them.
//
// A concrete loader wraps a core and implements MwpDataLoader,
// whose `load_data` has no default body. SingleEquationLoader
// is the loader for seq2seq models: one equation per problem,
// optional SOS/EOS around the question, EOS after the equation.
//
//   MwpProblem ──load_data──► MwpSample ──MwpBatcher──► MwpBatch
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

use std::sync::Arc;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::data::dataset::MwpSample;
use crate::data::indexer::{SymbolSide, VocabIndexer};
use crate::data::num_stack::{build_num_stack, placeholder_index};
use crate::data::padder::{batch_mask, BatchPadder};
use crate::domain::equation::{Equation, FixType};
use crate::domain::problem::MwpProblem;
use crate::domain::vocab::VocabularySet;

// ─── Configuration ───────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataLoaderConfig {
    /// Model name, used in log lines only
    pub model:            String,
    pub equation_fix:     FixType,
    pub train_batch_size: usize,
    pub test_batch_size:  usize,
    /// Equations feed a tree decoder: no EOS is appended
    pub symbol_for_tree:  bool,
    pub share_vocab:      bool,
    /// None = pad to the longest question in each batch
    pub max_len:          Option<usize>,
    /// None = pad to the longest equation in each batch
    pub max_equ_len:      Option<usize>,
    pub add_sos:          bool,
    pub add_eos:          bool,
    /// Drop problems whose equation cannot be indexed cleanly
    pub filt_dirty:       bool,
}

impl Default for DataLoaderConfig {
    fn default() -> Self {
        Self {
            model:            "Transformer".to_string(),
            equation_fix:     FixType::Prefix,
            train_batch_size: 64,
            test_batch_size:  64,
            symbol_for_tree:  false,
            share_vocab:      false,
            max_len:          None,
            max_equ_len:      None,
            add_sos:          false,
            add_eos:          false,
            filt_dirty:       false,
        }
    }
}

// ─── Shared Core ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct DataLoaderCore {
    pub config:    DataLoaderConfig,
    pub vocabs:    Arc<VocabularySet>,
    input_padder:  BatchPadder,
    output_padder: BatchPadder,
}

impl DataLoaderCore {
    pub fn new(config: DataLoaderConfig, vocabs: Arc<VocabularySet>) -> Result<Self> {
        if config.share_vocab != vocabs.share_vocab {
            bail!(
                "share_vocab is {} in the configuration but the vocabularies were built with share_vocab={}",
                config.share_vocab,
                vocabs.share_vocab
            );
        }
        let indexer = VocabIndexer::new(&vocabs, config.share_vocab);
        let input_padder = BatchPadder::input(
            vocabs.input.pad_id(),
            config.max_len,
            config.add_sos,
            config.add_eos,
        );
        let output_padder = BatchPadder::output(
            indexer.symbol_table(SymbolSide::Equation).pad_id(),
            config.max_equ_len,
        );
        Ok(Self { config, vocabs, input_padder, output_padder })
    }

    pub fn indexer(&self) -> VocabIndexer<'_> {
        VocabIndexer::new(&self.vocabs, self.config.share_vocab)
    }

    pub fn in_pad_token(&self) -> usize { self.vocabs.input.pad_id() }

    pub fn in_unk_token(&self) -> usize { self.vocabs.input.unk_id() }

    pub fn out_pad_token(&self) -> usize {
        self.indexer().symbol_table(SymbolSide::Equation).pad_id()
    }

    pub fn out_unk_token(&self) -> usize {
        self.indexer().symbol_table(SymbolSide::Equation).unk_id()
    }

    pub fn temp_pad_token(&self) -> usize {
        self.indexer().symbol_table(SymbolSide::Template).pad_id()
    }

    pub fn temp_unk_token(&self) -> usize {
        self.indexer().symbol_table(SymbolSide::Template).unk_id()
    }

    pub fn input_padder(&self) -> &BatchPadder { &self.input_padder }

    pub fn output_padder(&self) -> &BatchPadder { &self.output_padder }

    pub fn pad_input_batch(&self, batch: Vec<Vec<usize>>, lengths: &[usize]) -> Vec<Vec<usize>> {
        self.input_padder.pad(batch, lengths)
    }

    pub fn pad_output_batch(&self, batch: Vec<Vec<usize>>, lengths: &[usize]) -> Vec<Vec<usize>> {
        self.output_padder.pad(batch, lengths)
    }

    pub fn word2idx(&self, sentence: &[String]) -> Vec<usize> {
        self.indexer().word2idx(sentence)
    }

    pub fn equ_symbol2idx(&self, equation: &Equation<String>) -> Equation<usize> {
        self.indexer().equ_symbol2idx(equation)
    }

    pub fn temp_symbol2idx(&self, template: &Equation<String>) -> Equation<usize> {
        self.indexer().temp_symbol2idx(template)
    }

    /// Mask over the longest length in the batch.
    pub fn get_mask(&self, lengths: &[usize]) -> Vec<Vec<u8>> {
        batch_mask(lengths)
    }

    /// Mask over the same length the input padder pads to.
    pub fn get_input_mask(&self, lengths: &[usize]) -> Vec<Vec<u8>> {
        self.input_padder.mask(lengths)
    }

    pub fn build_num_stack<S: AsRef<str>>(&self, equation: &[S], num_list: &[String]) -> Vec<Vec<usize>> {
        build_num_stack(equation, num_list, &self.vocabs.output)
    }

    /// Index one problem. Returns None for a question without tokens,
    /// and for a dirty problem when `filt_dirty` is set.
    pub fn build_sample(&self, problem: &MwpProblem) -> Option<MwpSample> {
        let cfg = &self.config;
        let indexer = self.indexer();

        let tokens = problem.question_tokens();
        if tokens.is_empty() {
            tracing::debug!("Dropping problem '{}' with an empty question", problem.id);
            return None;
        }

        let mut question_ids = self.word2idx(&tokens);
        if cfg.add_sos {
            question_ids.insert(0, self.vocabs.input.sos_id());
        }
        if cfg.add_eos {
            question_ids.push(self.vocabs.input.eos_id());
        }

        let equation = Equation::from_nodes(&problem.equation, cfg.equation_fix);
        let num_stack = self.build_num_stack(&equation.leaves(), &problem.numbers);
        let mut equation_ids = self.equ_symbol2idx(&equation);

        let template_ids = problem.template.as_ref().map(|nodes| {
            let template = Equation::from_nodes(nodes, cfg.equation_fix);
            let mut ids = self.temp_symbol2idx(&template);
            if !cfg.symbol_for_tree {
                ids.push(indexer.symbol_table(SymbolSide::Template).eos_id());
            }
            ids
        });

        if cfg.filt_dirty && self.is_dirty(&equation, &equation_ids, problem.numbers.len()) {
            tracing::debug!("Dropping dirty problem '{}'", problem.id);
            return None;
        }

        if !cfg.symbol_for_tree {
            equation_ids.push(self.out_eos_token());
        }

        Some(MwpSample {
            id: problem.id.clone(),
            question_ids,
            equation_ids,
            template_ids,
            num_stack,
            numbers: problem.numbers.clone(),
        })
    }

    fn out_eos_token(&self) -> usize {
        self.indexer().symbol_table(SymbolSide::Equation).eos_id()
    }

    // Dirty: an equation symbol fell back to <UNK>, or a NUM_i
    // placeholder points past the end of the number list.
    fn is_dirty(&self, equation: &Equation<String>, equation_ids: &Equation<usize>, num_count: usize) -> bool {
        let unk = self.out_unk_token();
        let has_unknown = equation_ids.leaves().into_iter().any(|&id| id == unk);
        let bad_reference = equation
            .leaves()
            .into_iter()
            .filter_map(|symbol| placeholder_index(symbol))
            .any(|i| i >= num_count);
        has_unknown || bad_reference
    }
}

// ─── Dataloader Contract ─────────────────────────────────────────────────────
/// A dataloader turning problems into indexed samples.
pub trait MwpDataLoader {
    /// Shared configuration, vocabularies and batch helpers.
    fn core(&self) -> &DataLoaderCore;

    /// Index the dataset into train/test samples.
    fn load_data(&mut self) -> Result<()>;

    fn trainset(&self) -> &[MwpSample];

    fn testset(&self) -> &[MwpSample];
}

// ─── Seq2Seq Loader ──────────────────────────────────────────────────────────
pub struct SingleEquationLoader {
    core:           DataLoaderCore,
    train_problems: Vec<MwpProblem>,
    test_problems:  Vec<MwpProblem>,
    trainset:       Vec<MwpSample>,
    testset:        Vec<MwpSample>,
}

impl SingleEquationLoader {
    pub fn new(
        core:           DataLoaderCore,
        train_problems: Vec<MwpProblem>,
        test_problems:  Vec<MwpProblem>,
    ) -> Self {
        Self {
            core,
            train_problems,
            test_problems,
            trainset: Vec::new(),
            testset:  Vec::new(),
        }
    }

    fn index_all(&self, problems: &[MwpProblem]) -> Vec<MwpSample> {
        problems.iter().filter_map(|p| self.core.build_sample(p)).collect()
    }
}

impl MwpDataLoader for SingleEquationLoader {
    fn core(&self) -> &DataLoaderCore {
        &self.core
    }

    fn load_data(&mut self) -> Result<()> {
        self.trainset = self.index_all(&self.train_problems);
        self.testset  = self.index_all(&self.test_problems);

        let dropped = self.train_problems.len() + self.test_problems.len()
            - self.trainset.len() - self.testset.len();
        tracing::info!(
            "{} dataloader: {} train / {} test samples ({} dropped)",
            self.core.config.model,
            self.trainset.len(),
            self.testset.len(),
            dropped,
        );
        Ok(())
    }

    fn trainset(&self) -> &[MwpSample] {
        &self.trainset
    }

    fn testset(&self) -> &[MwpSample] {
        &self.testset
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vocab::Vocabulary;

    fn vocabs() -> Arc<VocabularySet> {
        let input = Vocabulary::new(["tom", "has", "NUM_0", "and", "NUM_1", "apples"]);
        let output = Vocabulary::new(["+", "-", "*", "/", "NUM_0", "NUM_1"]);
        Arc::new(VocabularySet::separate(input, output, None))
    }

    fn problems() -> Vec<MwpProblem> {
        vec![
            MwpProblem::new("1", "tom has NUM_0 and NUM_1 apples", &["NUM_0", "+", "NUM_1"], &["3", "5"]),
            MwpProblem::new("2", "tom has NUM_0 apples", &["NUM_0", "^", "NUM_0"], &["2"]),
            MwpProblem::new("3", "tom has NUM_0 apples", &["NUM_0", "-", "NUM_1"], &["4"]),
        ]
    }

    #[test]
    fn test_share_vocab_mismatch_is_rejected() {
        let cfg = DataLoaderConfig { share_vocab: true, ..Default::default() };
        assert!(DataLoaderCore::new(cfg, vocabs()).is_err());
    }

    #[test]
    fn test_build_sample_prefix_with_boundaries() {
        let cfg = DataLoaderConfig { add_sos: true, add_eos: true, ..Default::default() };
        let core = DataLoaderCore::new(cfg, vocabs()).unwrap();
        let sample = core.build_sample(&problems()[0]).unwrap();

        let v = &core.vocabs;
        assert_eq!(sample.question_ids.first(), Some(&v.input.sos_id()));
        assert_eq!(sample.question_ids.last(), Some(&v.input.eos_id()));
        assert_eq!(sample.question_len(), 8);

        // prefix "+ NUM_0 NUM_1" then <EOS>
        let expected: Vec<usize> = ["+", "NUM_0", "NUM_1", "<EOS>"]
            .iter()
            .map(|s| v.output.get(s).unwrap())
            .collect();
        assert_eq!(sample.equation_ids, Equation::Flat(expected));
        assert_eq!(sample.num_stack, Vec::<Vec<usize>>::new());
    }

    #[test]
    fn test_dirty_problems_are_filtered() {
        let cfg = DataLoaderConfig { filt_dirty: true, ..Default::default() };
        let core = DataLoaderCore::new(cfg, vocabs()).unwrap();
        let mut loader = SingleEquationLoader::new(core, problems(), Vec::new());
        loader.load_data().unwrap();
        // "^" is not an output symbol; NUM_1 points past a one-number list
        assert_eq!(loader.trainset().len(), 1);
        assert_eq!(loader.trainset()[0].id, "1");
    }

    #[test]
    fn test_unfiltered_keeps_everything_and_substitutes_unknown() {
        let core = DataLoaderCore::new(DataLoaderConfig::default(), vocabs()).unwrap();
        let mut loader = SingleEquationLoader::new(core, Vec::new(), problems());
        loader.load_data().unwrap();
        assert_eq!(loader.testset().len(), 3);
        let unk = loader.core().out_unk_token();
        assert!(loader.testset()[1].equation_ids.leaves().contains(&&unk));
    }

    #[test]
    fn test_tree_mode_keeps_groups_and_skips_eos() {
        let cfg = DataLoaderConfig {
            equation_fix: FixType::MultiWayTree,
            symbol_for_tree: true,
            ..Default::default()
        };
        let core = DataLoaderCore::new(cfg, vocabs()).unwrap();
        let mut p = problems().remove(0);
        p.equation = serde_json::from_str(r#"["+", ["NUM_0", "NUM_1"]]"#).unwrap();
        let sample = core.build_sample(&p).unwrap();
        assert!(matches!(sample.equation_ids, Equation::Tree(_)));
        assert_eq!(sample.equation_len(), 2);
    }

    #[test]
    fn test_empty_question_yields_no_sample() {
        let core = DataLoaderCore::new(DataLoaderConfig::default(), vocabs()).unwrap();
        let empty = MwpProblem::new("e", "", &["NUM_0"], &["3"]);
        assert!(core.build_sample(&empty).is_none());

        let mut loader = SingleEquationLoader::new(core, vec![empty, problems().remove(0)], Vec::new());
        loader.load_data().unwrap();
        assert_eq!(loader.trainset().len(), 1);
        assert!(loader.trainset().iter().all(|s| s.question_len() > 0));
    }

    #[test]
    fn test_core_num_stack_accepts_str_slices() {
        let core = DataLoaderCore::new(DataLoaderConfig::default(), vocabs()).unwrap();
        let numbers = vec!["3".to_string(), "3".to_string()];
        let from_str = core.build_num_stack(&["3", "+", "NUM_0"], &numbers);
        let owned: Vec<String> = ["3", "+", "NUM_0"].iter().map(|s| s.to_string()).collect();
        assert_eq!(from_str, core.build_num_stack(&owned, &numbers));
        assert_eq!(from_str, vec![vec![0, 1]]);
    }

    #[test]
    fn test_core_masks_follow_padders() {
        let cfg = DataLoaderConfig { max_len: Some(5), ..Default::default() };
        let core = DataLoaderCore::new(cfg, vocabs()).unwrap();
        assert_eq!(core.get_input_mask(&[2])[0], vec![1, 1, 0, 0, 0]);
        assert_eq!(core.get_mask(&[2, 3])[0], vec![1, 1, 0]);
        let padded = core.pad_input_batch(vec![vec![4, 5]], &[2]);
        assert_eq!(padded[0], vec![4, 5, 0, 0, 0]);
    }
}
