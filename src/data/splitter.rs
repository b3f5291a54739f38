// ============================================================
// Layer 4 — Train/Test Splitter
// ============================================================
// Shuffles samples with a SEEDED generator and splits them
// into two disjoint sets:
//   - Training set: balanced, then used to fit every candidate
//   - Test set:     never resampled, the only data behind the
//                   reported accuracy / ROC numbers
//
// The seed makes the split reproducible: the same dataset and
// the same seed always produce the same partitions, so a
// re-run of training evaluates on exactly the same rows.
//
// Test size = ceil(n × test_fraction), the rest is training.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom
// driven by StdRng::seed_from_u64.
//
// Reference: rand crate documentation

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and split into (train, test).
///
/// # Arguments
/// * `samples`       - All available samples (consumed by this function)
/// * `test_fraction` - Proportion held out for testing, e.g. 0.2 = 20%
/// * `seed`          - Seed for the shuffle
pub fn split_train_test<T>(mut samples: Vec<T>, test_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total  = samples.len();
    let n_test = ((total as f64) * test_fraction.clamp(0.0, 1.0)).ceil() as usize;
    let n_test = n_test.min(total);

    // split_off(n) keeps [0..n) and returns [n..total)
    let test = samples.split_off(total - n_test);

    tracing::debug!(
        "Dataset split (seed {}): {} train, {} test",
        seed,
        samples.len(),
        test.len(),
    );

    (samples, test)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_split_sizes() {
        let items: Vec<usize> = (0..100).collect();
        let (train, test)     = split_train_test(items, 0.2, 42);
        assert_eq!(train.len(), 80);
        assert_eq!(test.len(),  20);
    }

    #[test]
    fn test_test_size_rounds_up() {
        let items: Vec<usize> = (0..11).collect();
        let (train, test)     = split_train_test(items, 0.2, 42);
        // ceil(2.2) = 3
        assert_eq!(test.len(),  3);
        assert_eq!(train.len(), 8);
    }

    #[test]
    fn test_all_items_preserved_and_disjoint() {
        let items: Vec<usize> = (0..50).collect();
        let (train, test)     = split_train_test(items, 0.3, 7);
        let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = split_train_test((0..200).collect::<Vec<usize>>(), 0.2, 42);
        let b = split_train_test((0..200).collect::<Vec<usize>>(), 0.2, 42);
        assert_eq!(a, b);

        let c = split_train_test((0..200).collect::<Vec<usize>>(), 0.2, 43);
        assert_ne!(a.1, c.1);
    }

    #[test]
    fn test_empty_dataset() {
        let items: Vec<usize> = Vec::new();
        let (train, test)     = split_train_test(items, 0.2, 42);
        assert!(train.is_empty());
        assert!(test.is_empty());
    }
}
