//! Seed-keyed assignment of generation algorithms to palette items.

use crate::algorithm::Algorithm;
use crate::rng::SeedRng;

/// RNG namespace suffix for the mapping shuffle, kept distinct from every
/// sequence-content namespace so the two never correlate.
const MAPPING_SUFFIX: &str = "_unique_algo_mapping";

/// Deterministically assigns one algorithm to each palette item.
///
/// The returned vector is indexed by palette item index (0 = hum item). The
/// pool of ten algorithm ids is tiled until it covers `item_count`, truncated,
/// and shuffled once with a seeded Fisher-Yates pass; for `item_count <= 10`
/// the assignment is therefore a permutation of distinct ids, and above 10
/// ids repeat cyclically through the tiled pool. Stable for the life of the
/// seed.
pub fn map_algorithms(seed: &str, item_count: usize) -> Vec<Algorithm> {
    let mut rng = SeedRng::with_suffix(seed, MAPPING_SUFFIX);

    let mut pool: Vec<Algorithm> = Vec::with_capacity(item_count.max(Algorithm::ALL.len()));
    while pool.len() < item_count {
        pool.extend(Algorithm::ALL);
    }
    pool.truncate(item_count);

    // Fisher-Yates, high index to low, matching one rng draw per swap.
    for i in (1..pool.len()).rev() {
        let j = (rng.next_f64() * (i + 1) as f64).floor() as usize;
        pool.swap(i, j);
    }

    pool
}
