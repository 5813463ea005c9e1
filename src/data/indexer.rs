// ============================================================
// Layer 4 - Vocabulary Indexer
// ============================================================
// Maps raw tokens to integer ids using the dataset vocabularies.
//
//   problem words      -> input table
//   equation symbols   -> output table   (input table if shared)
//   template symbols   -> template table (input table if shared)
//
// A token missing from its table becomes that table's <UNK> id.
// Nothing is reported: batches stay dense and rare tokens lose
// their identity.
//
// Tree equations go through Equation::map_leaves, so nesting is
// kept and the share-vocab choice applies at every depth.

use crate::domain::equation::Equation;
use crate::domain::vocab::{Vocabulary, VocabularySet};

/// Which symbol table an equation-like sequence is indexed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolSide {
    Equation,
    Template,
}

#[derive(Debug, Clone, Copy)]
pub struct VocabIndexer<'a> {
    vocabs:      &'a VocabularySet,
    share_vocab: bool,
}

impl<'a> VocabIndexer<'a> {
    pub fn new(vocabs: &'a VocabularySet, share_vocab: bool) -> Self {
        Self { vocabs, share_vocab }
    }

    /// Index a problem sentence with the input table.
    pub fn word2idx(&self, sentence: &[String]) -> Vec<usize> {
        let table = &self.vocabs.input;
        sentence.iter().map(|w| lookup(table, w)).collect()
    }

    /// Index an equation (flat or tree) with the output table.
    pub fn equ_symbol2idx(&self, equation: &Equation<String>) -> Equation<usize> {
        self.symbols2idx(equation, SymbolSide::Equation)
    }

    /// Index a template (flat or tree) with the template table.
    pub fn temp_symbol2idx(&self, template: &Equation<String>) -> Equation<usize> {
        self.symbols2idx(template, SymbolSide::Template)
    }

    pub fn symbols2idx(&self, equation: &Equation<String>, side: SymbolSide) -> Equation<usize> {
        let table = self.symbol_table(side);
        equation.map_leaves(|symbol| lookup(table, symbol))
    }

    /// The table used for `side`. Without a template table the
    /// output table (and its <UNK>) is used for templates.
    pub fn symbol_table(&self, side: SymbolSide) -> &'a Vocabulary {
        if self.share_vocab {
            return &self.vocabs.input;
        }
        match side {
            SymbolSide::Equation => &self.vocabs.output,
            SymbolSide::Template => self.vocabs.template.as_ref().unwrap_or(&self.vocabs.output),
        }
    }
}

/// Table lookup with the table's own unknown id on a miss.
pub fn lookup(table: &Vocabulary, token: &str) -> usize {
    table.get(token).unwrap_or_else(|| table.unk_id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::equation::EquationNode;

    fn vocabs() -> VocabularySet {
        let input = Vocabulary::new(["tom", "has", "NUM_0", "apples", "+"]);
        let output = Vocabulary::new(["+", "-", "NUM_0", "NUM_1"]);
        let template = Vocabulary::new(["op", "num"]);
        VocabularySet::separate(input, output, Some(template))
    }

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_known_words_round_trip_and_unknown_falls_back() {
        let v = vocabs();
        let idx = VocabIndexer::new(&v, false);
        let ids = idx.word2idx(&toks("tom has NUM_0 pears"));
        assert_eq!(ids.len(), 4);
        let back: Vec<&str> = ids.iter().map(|&i| v.input.token(i).unwrap()).collect();
        assert_eq!(back, vec!["tom", "has", "NUM_0", "<UNK>"]);
    }

    #[test]
    fn test_equation_uses_output_table_unless_shared() {
        let v = vocabs();
        let eq = Equation::Flat(toks("NUM_0 + NUM_1"));

        let separate = VocabIndexer::new(&v, false).equ_symbol2idx(&eq);
        assert_eq!(separate, Equation::Flat(vec![6, 4, 7]));

        // Shared: "+" and NUM_0 exist in the input table, NUM_1 does not
        let shared = VocabIndexer::new(&v, true).equ_symbol2idx(&eq);
        assert_eq!(shared, Equation::Flat(vec![6, 8, v.input.unk_id()]));
    }

    #[test]
    fn test_tree_equation_keeps_nesting() {
        let v = vocabs();
        let eq = Equation::Tree(vec![
            EquationNode::Leaf("+".to_string()),
            EquationNode::Group(vec![
                EquationNode::Leaf("NUM_1".to_string()),
                EquationNode::Leaf("?".to_string()),
            ]),
        ]);
        let ids = VocabIndexer::new(&v, false).equ_symbol2idx(&eq);
        assert_eq!(
            ids,
            Equation::Tree(vec![
                EquationNode::Leaf(4),
                EquationNode::Group(vec![EquationNode::Leaf(7), EquationNode::Leaf(1)]),
            ])
        );
    }

    #[test]
    fn test_template_miss_uses_template_unknown() {
        let v = vocabs();
        let ids = VocabIndexer::new(&v, false)
            .temp_symbol2idx(&Equation::Flat(toks("op num zzz")));
        let unk = v.template.as_ref().unwrap().unk_id();
        assert_eq!(ids, Equation::Flat(vec![4, 5, unk]));
    }
}
