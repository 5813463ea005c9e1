// ============================================================
// Layer 3 - Vocabulary Tables
// ============================================================
// A Vocabulary is a fixed, bidirectional token <-> index table.
// The dataset builds one table per side:
//
//   input     - problem words          (in_word2idx / in_idx2word)
//   output    - equation symbols       (out_symbol2idx / out_idx2symbol)
//   template  - template symbols       (temp_symbol2idx), optional
//
// Every table reserves the same four special tokens at the
// front so pad / unknown / start / end ids are stable:
//
//   0 <PAD>   1 <UNK>   2 <SOS>   3 <EOS>
//
// Tables are immutable once built. Lookups return Option so a
// miss is an explicit value, never a panic.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const PAD_TOKEN: &str = "<PAD>";
pub const UNK_TOKEN: &str = "<UNK>";
pub const SOS_TOKEN: &str = "<SOS>";
pub const EOS_TOKEN: &str = "<EOS>";

/// Reserved tokens in index order.
pub const SPECIAL_TOKENS: [&str; 4] = [PAD_TOKEN, UNK_TOKEN, SOS_TOKEN, EOS_TOKEN];

/// A bidirectional token table.
///
/// Only `idx2token` is serialised; the reverse map is rebuilt on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "VocabularyRepr", into = "VocabularyRepr")]
pub struct Vocabulary {
    idx2token: Vec<String>,
    token2idx: HashMap<String, usize>,
}

#[derive(Serialize, Deserialize)]
struct VocabularyRepr {
    idx2token: Vec<String>,
}

impl From<VocabularyRepr> for Vocabulary {
    fn from(repr: VocabularyRepr) -> Self {
        Self::from_tokens(repr.idx2token)
    }
}

impl From<Vocabulary> for VocabularyRepr {
    fn from(vocab: Vocabulary) -> Self {
        Self { idx2token: vocab.idx2token }
    }
}

impl Vocabulary {
    /// Build a table with the special tokens followed by `tokens`.
    /// Duplicates (including special tokens) keep their first index.
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let all = SPECIAL_TOKENS
            .iter()
            .map(|t| t.to_string())
            .chain(tokens.into_iter().map(Into::into));
        Self::from_tokens(all)
    }

    /// Build a table from an explicit index order.
    /// Used when reloading, so the special tokens must already be present.
    fn from_tokens<I: IntoIterator<Item = String>>(tokens: I) -> Self {
        let mut idx2token = Vec::new();
        let mut token2idx = HashMap::new();
        for token in tokens {
            if token2idx.contains_key(&token) {
                continue;
            }
            token2idx.insert(token.clone(), idx2token.len());
            idx2token.push(token);
        }
        Self { idx2token, token2idx }
    }

    pub fn get(&self, token: &str) -> Option<usize> {
        self.token2idx.get(token).copied()
    }

    pub fn token(&self, idx: usize) -> Option<&str> {
        self.idx2token.get(idx).map(String::as_str)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.token2idx.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.idx2token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idx2token.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.idx2token
    }

    pub fn pad_id(&self) -> usize {
        self.special(PAD_TOKEN)
    }

    pub fn unk_id(&self) -> usize {
        self.special(UNK_TOKEN)
    }

    pub fn sos_id(&self) -> usize {
        self.special(SOS_TOKEN)
    }

    pub fn eos_id(&self) -> usize {
        self.special(EOS_TOKEN)
    }

    // Reserved tokens are inserted first by `new`, so their index
    // equals their position in SPECIAL_TOKENS.
    fn special(&self, token: &str) -> usize {
        self.get(token).unwrap_or_else(|| {
            SPECIAL_TOKENS
                .iter()
                .position(|t| *t == token)
                .unwrap_or(0)
        })
    }
}

/// All vocabularies a dataset exposes to the dataloaders and the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularySet {
    pub input: Vocabulary,
    pub output: Vocabulary,
    pub template: Option<Vocabulary>,
    pub share_vocab: bool,
}

impl VocabularySet {
    /// Separate input/output symbol spaces.
    pub fn separate(input: Vocabulary, output: Vocabulary, template: Option<Vocabulary>) -> Self {
        Self { input, output, template, share_vocab: false }
    }

    /// One combined table used for both the problem text and the equations.
    pub fn shared(combined: Vocabulary, template: Option<Vocabulary>) -> Self {
        Self {
            output: combined.clone(),
            input: combined,
            template,
            share_vocab: true,
        }
    }

    /// For each output symbol id, the input-vocabulary id of the same symbol.
    ///
    /// Symbols absent from the input table map to the input unknown id.
    pub fn output_to_input_ids(&self) -> Vec<usize> {
        let unk = self.input.unk_id();
        self.output
            .tokens()
            .iter()
            .map(|symbol| self.input.get(symbol).unwrap_or(unk))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_special_tokens_come_first() {
        let v = Vocabulary::new(["x", "+"]);
        assert_eq!(v.pad_id(), 0);
        assert_eq!(v.unk_id(), 1);
        assert_eq!(v.sos_id(), 2);
        assert_eq!(v.eos_id(), 3);
        assert_eq!(v.get("x"), Some(4));
        assert_eq!(v.len(), 6);
    }

    #[test]
    fn test_duplicates_keep_first_index() {
        let v = Vocabulary::new(["a", "b", "a", "<PAD>"]);
        assert_eq!(v.len(), 6);
        assert_eq!(v.get("a"), Some(4));
        assert_eq!(v.token(5), Some("b"));
    }

    #[test]
    fn test_json_reload_rebuilds_reverse_map() {
        let v = Vocabulary::new(["apples", "has"]);
        let json = serde_json::to_string(&v).unwrap();
        let back: Vocabulary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get("has"), Some(5));
        assert_eq!(back.tokens(), v.tokens());
    }

    #[test]
    fn test_output_to_input_ids() {
        let input = Vocabulary::new(["tom", "+", "NUM_0"]);
        let output = Vocabulary::new(["NUM_0", "+", "-"]);
        let set = VocabularySet::separate(input, output, None);
        let map = set.output_to_input_ids();
        // specials line up, then NUM_0 -> 6, + -> 5, - -> <UNK>
        assert_eq!(map, vec![0, 1, 2, 3, 6, 5, 1]);
    }

    #[test]
    fn test_shared_set_is_identity_mapping() {
        let set = VocabularySet::shared(Vocabulary::new(["x", "*"]), None);
        let map = set.output_to_input_ids();
        assert_eq!(map, (0..set.output.len()).collect::<Vec<_>>());
    }
}
