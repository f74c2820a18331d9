//! Deterministic signature sequence generation.
//!
//! A signature is a fixed-length ordered list of nullable item values: `None`
//! is a silent step, `Some(0)` the hum item, `Some(k)` content item `k - 1`.
//! Each algorithm body is a pure function of `(seed, algorithm, palette,
//! length)` driven by its own namespaced [`SeedRng`] stream; generation never
//! fails for any seed string and always returns exactly `length` entries.

use crate::algorithm::Algorithm;
use crate::palette::Palette;
use crate::rng::SeedRng;

/// One generated sequence: nullable item values in `0..=N`.
pub type Signature = Vec<Option<usize>>;

/// Canonical signature length.
pub const SIGNATURE_STEPS: usize = 32;

/// Motif length for [`Algorithm::MotifRepeat`].
const MOTIF_LEN: usize = 8;

/// Redraw cap for the constrained walk's back-and-forth avoidance. The
/// original retried unboundedly; after this many collisions the colliding
/// value is accepted.
const AVOID_RETRY_CAP: usize = 8;

/// Tunable probabilities for the constrained palette walk.
#[derive(Clone, Copy, Debug)]
pub struct ConstraintParams {
    /// Number of content items eligible for fresh picks, clamped to the
    /// palette at generation time.
    pub palette_size: usize,
    /// Chance a step repeats the previous non-hum value.
    pub p_repeat: f64,
    /// Chance a step lands on the hum item.
    pub p_hum: f64,
    /// Chance a step is silent (`None`).
    pub p_silence: f64,
    /// Forbid an immediate A,B,A pattern among fresh picks.
    pub avoid_back_and_forth: bool,
}

impl ConstraintParams {
    /// The fixed parameter set used by algorithm 2 and the fallback.
    pub fn for_palette(palette: Palette) -> Self {
        Self {
            palette_size: palette.content_count().clamp(1, 6),
            p_repeat: 0.35,
            p_hum: 0.15,
            p_silence: 0.2,
            avoid_back_and_forth: true,
        }
    }
}

/// Generates the signature for a numeric algorithm id.
///
/// Ids outside `1..=10` fall back to the constrained walk with its fixed
/// parameter set; this is defined behavior, not an error.
pub fn generate(seed: &str, algorithm_id: u8, palette: Palette, length: usize) -> Signature {
    match Algorithm::from_id(algorithm_id) {
        Some(algorithm) => generate_with(seed, algorithm, palette, length),
        None => {
            tracing::debug!(algorithm_id, "unknown algorithm id, using constrained fallback");
            constrained_walk(seed, palette, length, ConstraintParams::for_palette(palette))
        }
    }
}

/// Generates the signature for a known algorithm.
pub fn generate_with(seed: &str, algorithm: Algorithm, palette: Palette, length: usize) -> Signature {
    if algorithm == Algorithm::ConstrainedWalk {
        return constrained_walk(seed, palette, length, ConstraintParams::for_palette(palette));
    }
    let mut rng = SeedRng::with_suffix(seed, &format!("_audio_signature_v{}", algorithm.id()));
    match algorithm {
        Algorithm::Uniform => uniform(&mut rng, palette, length),
        Algorithm::ConstrainedWalk => unreachable!("handled above"),
        Algorithm::MotifRepeat => motif_repeat(&mut rng, palette, length),
        Algorithm::BoundedWalk => bounded_walk(&mut rng, palette, length),
        Algorithm::ClusteredRuns => clustered_runs(&mut rng, palette, length),
        Algorithm::SparseAccents => sparse_accents(&mut rng, palette, length),
        Algorithm::FibonacciAccents => fibonacci_accents(&mut rng, palette, length),
        Algorithm::AlternatingPair => alternating_pair(&mut rng, palette, length),
        Algorithm::DecayingWalk => decaying_walk(&mut rng, palette, length),
        Algorithm::BlockClusters => block_clusters(&mut rng, palette, length),
    }
}

/// Uniform draw over the full item range, hum included.
fn rand_value(rng: &mut SeedRng, palette: Palette) -> usize {
    rng.rand_int_inclusive(0, palette.content_count())
}

/// Uniform draw over content items only; 0 when the palette has none.
fn rand_non_hum(rng: &mut SeedRng, palette: Palette) -> usize {
    let n = palette.content_count();
    if n > 0 {
        rng.rand_int_inclusive(1, n)
    } else {
        0
    }
}

fn uniform(rng: &mut SeedRng, palette: Palette, length: usize) -> Signature {
    (0..length).map(|_| Some(rand_value(rng, palette))).collect()
}

fn motif_repeat(rng: &mut SeedRng, palette: Palette, length: usize) -> Signature {
    let motif: Vec<usize> = (0..MOTIF_LEN).map(|_| rand_value(rng, palette)).collect();
    (0..length).map(|i| Some(motif[i % MOTIF_LEN])).collect()
}

fn bounded_walk(rng: &mut SeedRng, palette: Palette, length: usize) -> Signature {
    let max = palette.content_count() as i64;
    let mut seq = Vec::with_capacity(length);
    if length > 0 {
        seq.push(Some(0));
    }
    let mut cur: i64 = 0;
    for _ in 1..length {
        let dir: i64 = if rng.next_f64() > 0.5 { 1 } else { -1 };
        let step = (rng.next_f64() * 3.0).floor() as i64 + 1;
        cur = (cur + dir * step).clamp(0, max);
        seq.push(Some(cur as usize));
    }
    seq
}

fn clustered_runs(rng: &mut SeedRng, palette: Palette, length: usize) -> Signature {
    let mut seq = Vec::with_capacity(length);
    let mut cluster = rand_value(rng, palette);
    while seq.len() < length {
        let run = ((rng.next_f64() * 6.0).floor() as usize + 2).min(length - seq.len());
        for _ in 0..run {
            seq.push(Some(cluster));
        }
        cluster = rand_value(rng, palette);
    }
    seq
}

fn sparse_accents(rng: &mut SeedRng, palette: Palette, length: usize) -> Signature {
    (0..length)
        .map(|_| {
            if rng.next_f64() > 0.7 {
                Some(rand_non_hum(rng, palette))
            } else {
                Some(0)
            }
        })
        .collect()
}

fn fibonacci_accents(rng: &mut SeedRng, palette: Palette, length: usize) -> Signature {
    let mut seq: Signature = vec![Some(0); length];
    let (mut a, mut b) = (1usize, 1usize);
    let mut pos = 0usize;
    while pos < length {
        seq[pos] = Some(rand_non_hum(rng, palette));
        let next = a + b;
        a = b;
        b = next;
        pos += next;
    }
    seq
}

fn alternating_pair(rng: &mut SeedRng, palette: Palette, length: usize) -> Signature {
    let a = rand_value(rng, palette);
    let b = rand_value(rng, palette);
    (0..length)
        .map(|i| Some(if i % 2 == 0 { a } else { b }))
        .collect()
}

fn decaying_walk(rng: &mut SeedRng, palette: Palette, length: usize) -> Signature {
    let mut v = rand_non_hum(rng, palette);
    let mut seq = Vec::with_capacity(length);
    for _ in 0..length {
        if rng.next_f64() < 0.2 || v == 0 {
            v = rand_value(rng, palette);
        }
        seq.push(Some(v));
        if rng.next_f64() > 0.7 {
            v = v.saturating_sub(1);
        }
    }
    seq
}

fn block_clusters(rng: &mut SeedRng, palette: Palette, length: usize) -> Signature {
    let mut c = rand_value(rng, palette);
    let mut seq = Vec::with_capacity(length);
    for i in 0..length {
        if i % 8 == 0 || rng.next_f64() > 0.6 {
            c = rand_value(rng, palette);
        }
        seq.push(Some(c));
    }
    seq
}

/// Constrained palette walk, shared by algorithm 2 and the fallback.
///
/// Uses its own `_audio_signature_constrained` namespace regardless of the
/// id it was reached through, so the fallback reproduces algorithm 2 exactly.
pub fn constrained_walk(
    seed: &str,
    palette: Palette,
    length: usize,
    params: ConstraintParams,
) -> Signature {
    let mut rng = SeedRng::with_suffix(seed, "_audio_signature_constrained");
    let n = palette.content_count();
    let palette_count = params.palette_size.min(n).max(1);

    let mut seq: Signature = Vec::with_capacity(length);
    let mut last: Option<usize> = None;
    let mut prev_non_hum: Option<usize> = None;

    for _ in 0..length {
        if rng.next_f64() < params.p_silence {
            seq.push(None);
            continue;
        }
        let roll = rng.next_f64();
        let next = if roll < params.p_hum {
            0
        } else if roll < params.p_hum + params.p_repeat && prev_non_hum.is_some() {
            prev_non_hum.unwrap_or(0)
        } else {
            let mut pick = rng.rand_int_inclusive(1, palette_count);
            if params.avoid_back_and_forth {
                let mut attempts = 0;
                while attempts < AVOID_RETRY_CAP && is_back_and_forth(&seq, last, pick) {
                    pick = rng.rand_int_inclusive(1, palette_count);
                    attempts += 1;
                }
            }
            pick
        };
        seq.push(Some(next));
        if next >= 1 {
            prev_non_hum = Some(next);
        }
        last = Some(next);
    }
    seq
}

/// True when emitting `pick` after `last` would recreate the value two steps
/// back (an A,B,A oscillation among non-hum picks).
fn is_back_and_forth(seq: &[Option<usize>], last: Option<usize>, pick: usize) -> bool {
    last.is_some_and(|l| l >= 1)
        && pick >= 1
        && seq.len() >= 2
        && seq[seq.len() - 2] == Some(pick)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn palette() -> Palette {
        Palette::new(10)
    }

    #[test]
    fn test_generate_determinism() {
        for id in 0..=11u8 {
            let a = generate("abc", id, palette(), SIGNATURE_STEPS);
            let b = generate("abc", id, palette(), SIGNATURE_STEPS);
            assert_eq!(a, b, "algorithm id {id} must be deterministic");
        }
    }

    #[test]
    fn test_length_invariant() {
        for id in 1..=10u8 {
            for length in [0, 1, 7, 32, 33, 64] {
                let seq = generate("abc", id, palette(), length);
                assert_eq!(seq.len(), length, "algorithm id {id}, length {length}");
            }
        }
    }

    #[test]
    fn test_silence_only_in_constrained_family() {
        for id in [1u8, 3, 4, 5, 6, 7, 8, 9, 10] {
            let seq = generate("abc", id, palette(), SIGNATURE_STEPS);
            assert!(
                seq.iter().all(|s| s.is_some()),
                "algorithm id {id} must never emit silence"
            );
        }
    }

    #[test]
    fn test_values_stay_in_item_range() {
        let max = palette().content_count();
        for id in 1..=10u8 {
            for step in generate("range", id, palette(), SIGNATURE_STEPS).into_iter().flatten() {
                assert!(step <= max, "algorithm id {id} emitted {step}");
            }
        }
    }

    #[test]
    fn test_motif_tiles_every_eight_steps() {
        let seq = generate("abc", 3, palette(), SIGNATURE_STEPS);
        for i in 0..SIGNATURE_STEPS - MOTIF_LEN {
            assert_eq!(seq[i], seq[i + MOTIF_LEN], "position {i}");
        }
    }

    #[test]
    fn test_bounded_walk_starts_at_zero_and_moves_gently() {
        let seq = generate("walk", 4, palette(), SIGNATURE_STEPS);
        assert_eq!(seq[0], Some(0));
        for w in seq.windows(2) {
            let (a, b) = (w[0].unwrap() as i64, w[1].unwrap() as i64);
            assert!((a - b).abs() <= 3, "step from {a} to {b} too large");
        }
    }

    #[test]
    fn test_clustered_runs_hold_values() {
        let seq = generate("cluster", 5, palette(), SIGNATURE_STEPS);
        // Runs of length >= 2 mean at least one adjacent pair matches.
        let repeats = seq.windows(2).filter(|w| w[0] == w[1]).count();
        assert!(repeats >= SIGNATURE_STEPS / 4, "only {repeats} repeats");
    }

    #[test]
    fn test_fibonacci_accents_are_hum_elsewhere() {
        let seq = generate("fib", 7, palette(), SIGNATURE_STEPS);
        // Advance deltas 2, 3, 5, 8, 13 from position 0.
        let accent_positions = [0usize, 2, 5, 10, 18, 31];
        for (i, step) in seq.iter().enumerate() {
            if !accent_positions.contains(&i) {
                assert_eq!(*step, Some(0), "position {i} should be hum");
            }
        }
        for pos in accent_positions {
            assert_ne!(seq[pos], Some(0), "position {pos} should be an accent");
        }
    }

    #[test]
    fn test_alternating_pair_by_parity() {
        let seq = generate("pair", 8, palette(), SIGNATURE_STEPS);
        for i in 2..SIGNATURE_STEPS {
            assert_eq!(seq[i], seq[i - 2], "position {i}");
        }
    }

    #[test]
    fn test_block_clusters_change_on_block_boundaries() {
        let seq = generate("blocks", 10, palette(), 64);
        // Within any 8-step block every value equals some held value until
        // the next redraw; the weakest stable property is that the sequence
        // contains held runs at all.
        let repeats = seq.windows(2).filter(|w| w[0] == w[1]).count();
        assert!(repeats > 0);
    }

    #[test]
    fn test_constrained_walk_emits_silence_and_stays_in_palette() {
        let seq = generate("abc", 2, palette(), 256);
        assert!(seq.iter().any(|s| s.is_none()), "expected silent steps");
        let params = ConstraintParams::for_palette(palette());
        for step in seq.into_iter().flatten() {
            assert!(step <= params.palette_size);
        }
    }

    #[test]
    fn test_constrained_walk_single_item_palette() {
        // Content count 0 clamps the pick range to 1..=1; must not loop or
        // panic even though every fresh pick collides.
        let seq = generate("tiny", 2, Palette::new(1), SIGNATURE_STEPS);
        assert_eq!(seq.len(), SIGNATURE_STEPS);
    }

    #[test]
    fn test_unknown_id_falls_back_to_constrained() {
        let fallback = generate("abc", 42, palette(), SIGNATURE_STEPS);
        let constrained = constrained_walk(
            "abc",
            palette(),
            SIGNATURE_STEPS,
            ConstraintParams::for_palette(palette()),
        );
        assert_eq!(fallback, constrained);
    }

    #[test]
    fn test_empty_palette_never_panics() {
        for id in 0..=11u8 {
            let seq = generate("empty", id, Palette::new(0), SIGNATURE_STEPS);
            assert_eq!(seq.len(), SIGNATURE_STEPS);
        }
    }
}
