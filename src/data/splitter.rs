// ============================================================
// Layer 4 - Train/Test Splitter
// ============================================================
// Shuffles problems with a fixed seed and splits them into a
// training and a test portion. The seed makes the split
// reproducible across training runs.
//
// Reference: rand crate documentation (SeedableRng, SliceRandom)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `items` with `seed` and split into (train, test).
///
/// `train_fraction` is clamped to [0, 1].
pub fn split_train_test<T>(mut items: Vec<T>, train_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);

    let total    = items.len();
    let fraction = train_fraction.clamp(0.0, 1.0);
    let split_at = ((total as f64) * fraction).round() as usize;
    let test     = items.split_off(split_at.min(total));

    tracing::debug!("Dataset split: {} train, {} test", items.len(), test.len());
    (items, test)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_split_sizes() {
        let (train, test) = split_train_test((0..100).collect::<Vec<usize>>(), 0.8, 7);
        assert_eq!(train.len(), 80);
        assert_eq!(test.len(),  20);
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = split_train_test((0..30).collect::<Vec<usize>>(), 0.5, 42);
        let b = split_train_test((0..30).collect::<Vec<usize>>(), 0.5, 42);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_input() {
        let (train, test) = split_train_test(Vec::<usize>::new(), 0.8, 1);
        assert!(train.is_empty());
        assert!(test.is_empty());
    }

    #[test]
    fn test_fraction_is_clamped() {
        let (train, test) = split_train_test((0..10).collect::<Vec<usize>>(), 1.5, 3);
        assert_eq!(train.len(), 10);
        assert!(test.is_empty());
    }
}
