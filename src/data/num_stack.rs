// ============================================================
// Layer 4 - Number Stack Builder
// ============================================================
// Template and tree decoders emit number placeholders that must
// be resolved back to positions in the problem's number list.
// The number stack records, for every equation token that is
// not an output symbol, which positions it could refer to:
//
//   "NUM_2"  -> the index written in the name        -> [2]
//   "5"      -> every i where numbers[i] == "5"      -> [1]
//   "x"      -> no reference found, any number fits  -> [0, 1, ..]
//
// Operators and constants in the output vocabulary push nothing.
// The stack is returned reversed: decoders pop from the back,
// resolving the equation right to left.

use crate::domain::vocab::Vocabulary;

/// Marker of a number placeholder token ("NUM_0", "NUM1", ...).
const NUM_MARKER: &str = "NUM";

pub fn build_num_stack<S: AsRef<str>>(
    equation:      &[S],
    num_list:      &[String],
    output_vocab:  &Vocabulary,
) -> Vec<Vec<usize>> {
    let mut num_stack = Vec::new();

    for word in equation.iter().map(AsRef::as_ref) {
        if output_vocab.contains(word) {
            continue;
        }

        let mut candidates = Vec::new();
        if let Some(idx) = placeholder_index(word) {
            candidates.push(idx);
        }
        candidates.extend(
            num_list
                .iter()
                .enumerate()
                .filter(|(_, n)| n.as_str() == word)
                .map(|(i, _)| i),
        );

        if candidates.is_empty() {
            candidates = (0..num_list.len()).collect();
        }
        num_stack.push(candidates);
    }

    num_stack.reverse();
    num_stack
}

/// The index embedded after the NUM marker, e.g. "NUM_3" -> 3.
pub fn placeholder_index(word: &str) -> Option<usize> {
    let start = word.find(NUM_MARKER)? + NUM_MARKER.len();
    let digits = word[start..].trim_start_matches('_');
    digits.parse().ok()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn nums(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_placeholder_and_literal_match() {
        let vocab = Vocabulary::new(["+", "-", "*"]);
        let stack = build_num_stack(&["NUM_1", "+", "5"], &nums(&["3", "5"]), &vocab);
        assert_eq!(stack, vec![vec![1], vec![1]]);
    }

    #[test]
    fn test_stack_is_reversed() {
        let vocab = Vocabulary::new(["+"]);
        let stack = build_num_stack(&["NUM_0", "+", "NUM_2"], &nums(&["3", "5", "7"]), &vocab);
        assert_eq!(stack, vec![vec![2], vec![0]]);
    }

    #[test]
    fn test_unresolved_token_gets_every_position() {
        let vocab = Vocabulary::new(["+"]);
        let stack = build_num_stack(&["x", "+", "NUM_0"], &nums(&["4", "9"]), &vocab);
        assert_eq!(stack, vec![vec![0], vec![0, 1]]);
    }

    #[test]
    fn test_vocabulary_symbols_push_nothing() {
        let vocab = Vocabulary::new(["NUM_0", "+", "1"]);
        let stack = build_num_stack(&["NUM_0", "+", "1"], &nums(&["1"]), &vocab);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_placeholder_index_forms() {
        assert_eq!(placeholder_index("NUM_12"), Some(12));
        assert_eq!(placeholder_index("NUM1"), Some(1));
        assert_eq!(placeholder_index("NUMBER"), None);
        assert_eq!(placeholder_index("3.5"), None);
    }
}
