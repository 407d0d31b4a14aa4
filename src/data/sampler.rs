// ============================================================
// Layer 4 — Subset Sampler
// ============================================================
// Draws a seeded random subset of samples for short smoke runs
// (`--limit`). The same seed always yields the same subset, so
// two runs with identical flags see identical data.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom.
//
// Reference: rand crate documentation

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and keep the first `limit`.
///
/// `None`, or a limit at least as large as the input, returns
/// the samples untouched and in their original order.
pub fn sample_subset<T>(mut samples: Vec<T>, limit: Option<usize>, seed: u64) -> Vec<T> {
    let Some(limit) = limit else {
        return samples;
    };
    if limit >= samples.len() {
        return samples;
    }

    let total   = samples.len();
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);
    samples.truncate(limit);

    tracing::debug!("Sampled {} of {} items (seed {})", limit, total, seed);

    samples
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_limit_keeps_everything_in_order() {
        let items: Vec<usize> = (0..10).collect();
        assert_eq!(sample_subset(items.clone(), None, 1), items);
    }

    #[test]
    fn test_limit_truncates() {
        let items: Vec<usize> = (0..100).collect();
        let subset = sample_subset(items, Some(25), 7);
        assert_eq!(subset.len(), 25);
        assert!(subset.iter().all(|&x| x < 100));
    }

    #[test]
    fn test_same_seed_same_subset() {
        let items: Vec<usize> = (0..100).collect();
        let a = sample_subset(items.clone(), Some(10), 42);
        let b = sample_subset(items, Some(10), 42);
        assert_eq!(a, b);
    }

    #[test]
    fn test_oversized_limit() {
        let items: Vec<usize> = (0..5).collect();
        assert_eq!(sample_subset(items, Some(50), 0).len(), 5);
    }

    #[test]
    fn test_empty_input() {
        let items: Vec<usize> = Vec::new();
        assert!(sample_subset(items, Some(3), 0).is_empty());
    }
}
