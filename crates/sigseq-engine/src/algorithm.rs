//! The ten generation algorithm identifiers and their timing rules.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// One of the ten sequence generation strategies.
///
/// Each variant corresponds to a stable numeric id in `1..=10`; the ids are
/// what [`crate::mapping::map_algorithms`] permutes across the palette and
/// what hosts pass through control entry points. Unknown ids fall back to
/// [`Algorithm::ConstrainedWalk`] semantics at the generator level rather
/// than failing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// 1: each step drawn uniformly from the full item range.
    Uniform,
    /// 2: constrained palette walk with silence, hum, and repeat biases.
    ConstrainedWalk,
    /// 3: an 8-step motif generated once, then tiled.
    MotifRepeat,
    /// 4: random walk with step magnitude 1..=3, clamped to the palette.
    BoundedWalk,
    /// 5: random values repeated in runs of 2..=7.
    ClusteredRuns,
    /// 6: mostly hum with sparse non-hum accents.
    SparseAccents,
    /// 7: non-hum accents at Fibonacci-spaced positions over hum.
    FibonacciAccents,
    /// 8: two values drawn once, alternated by index parity.
    AlternatingPair,
    /// 9: held random value that occasionally redraws and decays toward 0.
    DecayingWalk,
    /// 10: value held per 8-step block with occasional mid-block changes.
    BlockClusters,
}

impl Algorithm {
    /// All algorithms in id order.
    pub const ALL: [Algorithm; 10] = [
        Algorithm::Uniform,
        Algorithm::ConstrainedWalk,
        Algorithm::MotifRepeat,
        Algorithm::BoundedWalk,
        Algorithm::ClusteredRuns,
        Algorithm::SparseAccents,
        Algorithm::FibonacciAccents,
        Algorithm::AlternatingPair,
        Algorithm::DecayingWalk,
        Algorithm::BlockClusters,
    ];

    /// Looks up an algorithm by numeric id; `None` for ids outside `1..=10`.
    pub fn from_id(id: u8) -> Option<Algorithm> {
        match id {
            1..=10 => Some(Self::ALL[(id - 1) as usize]),
            _ => None,
        }
    }

    /// The stable numeric id in `1..=10`.
    pub fn id(&self) -> u8 {
        Self::ALL
            .iter()
            .position(|a| a == self)
            .expect("algorithm present in ALL") as u8
            + 1
    }

    /// Playback interval between ticks for this algorithm.
    ///
    /// Fixed lookup by id, independent of sequence content.
    pub fn step_interval(&self) -> Duration {
        Duration::from_millis(self.step_interval_ms())
    }

    /// Playback interval in milliseconds.
    pub fn step_interval_ms(&self) -> u64 {
        match self {
            Algorithm::MotifRepeat | Algorithm::FibonacciAccents => 100,
            Algorithm::ClusteredRuns => 150,
            Algorithm::BlockClusters => 200,
            _ => 125,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Algorithm::Uniform => "uniform",
            Algorithm::ConstrainedWalk => "constrained-walk",
            Algorithm::MotifRepeat => "motif-repeat",
            Algorithm::BoundedWalk => "bounded-walk",
            Algorithm::ClusteredRuns => "clustered-runs",
            Algorithm::SparseAccents => "sparse-accents",
            Algorithm::FibonacciAccents => "fibonacci-accents",
            Algorithm::AlternatingPair => "alternating-pair",
            Algorithm::DecayingWalk => "decaying-walk",
            Algorithm::BlockClusters => "block-clusters",
        };
        write!(f, "{name}")
    }
}
