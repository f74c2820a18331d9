//! Deterministic RNG keyed by seed strings, using PCG32 with BLAKE3 seed
//! derivation.
//!
//! All randomness in the engine flows through this module. A [`SeedRng`] is a
//! pure function of its seed string: the same string always produces the same
//! stream, and different strings produce independent streams. Components that
//! need uncorrelated streams derived from the same logical seed namespace
//! themselves by appending a suffix to the seed string before construction
//! (see [`SeedRng::with_suffix`]); there is no separate namespacing API.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// A deterministic stream of floats in `[0, 1)` keyed by a seed string.
pub struct SeedRng {
    rng: Pcg32,
}

impl SeedRng {
    /// Creates a generator from an arbitrary seed string.
    ///
    /// The string's UTF-8 bytes are hashed with BLAKE3 and the first 8 bytes
    /// of the digest (little-endian) seed a PCG32 generator.
    pub fn new(seed: &str) -> Self {
        let hash = blake3::hash(seed.as_bytes());
        let bytes: [u8; 8] = hash.as_bytes()[0..8]
            .try_into()
            .expect("BLAKE3 digest is 32 bytes");
        Self {
            rng: Pcg32::seed_from_u64(u64::from_le_bytes(bytes)),
        }
    }

    /// Creates a generator namespaced by string concatenation.
    ///
    /// `with_suffix(seed, "_x")` is exactly `new(&format!("{seed}_x"))`; the
    /// helper only exists so call sites spell the namespace once.
    pub fn with_suffix(seed: &str, suffix: &str) -> Self {
        Self::new(&format!("{seed}{suffix}"))
    }

    /// Returns the next float in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Returns a uniformly distributed integer in `[lo, hi]`.
    ///
    /// Consumes exactly one draw from the stream.
    pub fn rand_int_inclusive(&mut self, lo: usize, hi: usize) -> usize {
        debug_assert!(lo <= hi);
        lo + (self.next_f64() * (hi - lo + 1) as f64).floor() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_determinism() {
        let mut rng1 = SeedRng::new("abc");
        let mut rng2 = SeedRng::new("abc");

        let values1: Vec<f64> = (0..100).map(|_| rng1.next_f64()).collect();
        let values2: Vec<f64> = (0..100).map(|_| rng2.next_f64()).collect();

        assert_eq!(values1, values2);
    }

    #[test]
    fn test_different_seeds_produce_different_streams() {
        let mut rng1 = SeedRng::new("abc");
        let mut rng2 = SeedRng::new("abd");

        let values1: Vec<f64> = (0..10).map(|_| rng1.next_f64()).collect();
        let values2: Vec<f64> = (0..10).map(|_| rng2.next_f64()).collect();

        assert_ne!(values1, values2);
    }

    #[test]
    fn test_suffix_namespacing_decorrelates() {
        let mut mapping = SeedRng::with_suffix("abc", "_unique_algo_mapping");
        let mut content = SeedRng::with_suffix("abc", "_audio_signature_v1");

        let values1: Vec<f64> = (0..10).map(|_| mapping.next_f64()).collect();
        let values2: Vec<f64> = (0..10).map(|_| content.next_f64()).collect();

        assert_ne!(values1, values2);
    }

    #[test]
    fn test_output_range() {
        let mut rng = SeedRng::new("range-check");
        for _ in 0..1000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_rand_int_inclusive_bounds() {
        let mut rng = SeedRng::new("bounds");
        let mut seen_lo = false;
        let mut seen_hi = false;
        for _ in 0..1000 {
            let v = rng.rand_int_inclusive(2, 5);
            assert!((2..=5).contains(&v));
            seen_lo |= v == 2;
            seen_hi |= v == 5;
        }
        assert!(seen_lo && seen_hi);
    }
}
