//! Synthetic workload generation.
//!
//! The random source is always passed in. Runs seed it from OS entropy so
//! every run sees fresh content; tests and reproducible runs pin a seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Alphabet for generated content: ASCII letters, digits and space.
const CONTENT_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789 ";

/// Build the run's random source: pinned when `seed` is set, entropy otherwise.
#[must_use]
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}

/// Random text of exactly `size` characters.
pub fn random_content<R: Rng + ?Sized>(rng: &mut R, size: usize) -> String {
    (0..size)
        .map(|_| char::from(CONTENT_ALPHABET[rng.gen_range(0..CONTENT_ALPHABET.len())]))
        .collect()
}

/// Random embedding of exactly `dim` values, each in `[0, 1)`.
pub fn random_embedding<R: Rng + ?Sized>(rng: &mut R, dim: usize) -> Vec<f32> {
    (0..dim).map(|_| rng.gen_range(0.0_f32..1.0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_sizes_produce_empty_outputs() {
        let mut rng = seeded_rng(Some(7));
        assert!(random_content(&mut rng, 0).is_empty());
        assert!(random_embedding(&mut rng, 0).is_empty());
    }

    #[test]
    fn pinned_seed_is_reproducible() {
        let a = random_content(&mut seeded_rng(Some(42)), 64);
        let b = random_content(&mut seeded_rng(Some(42)), 64);
        assert_eq!(a, b);
    }

    #[test]
    fn content_uses_only_alphanumerics_and_space() {
        let content = random_content(&mut seeded_rng(Some(1)), 4096);
        assert!(
            content
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == ' ')
        );
    }

    proptest! {
        #[test]
        fn content_length_is_exact(size in 0usize..5000, seed in any::<u64>()) {
            let content = random_content(&mut seeded_rng(Some(seed)), size);
            prop_assert_eq!(content.chars().count(), size);
            prop_assert_eq!(content.len(), size);
        }

        #[test]
        fn embedding_has_dim_values_in_unit_interval(dim in 0usize..2048, seed in any::<u64>()) {
            let embedding = random_embedding(&mut seeded_rng(Some(seed)), dim);
            prop_assert_eq!(embedding.len(), dim);
            prop_assert!(embedding.iter().all(|v| (0.0..1.0).contains(v)));
        }
    }
}
