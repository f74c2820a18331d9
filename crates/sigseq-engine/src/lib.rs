//! sigseq engine - deterministic generative sequencing and playback.
//!
//! This crate turns a seed string plus an algorithm selector into a
//! reproducible, finite sequence of symbolic selection events, plays such
//! sequences back with per-algorithm timing rules, and nests the generator
//! inside a fixed-length step sequencer so each manually-recorded step can
//! trigger a full generative sub-pass.
//!
//! # Determinism
//!
//! All randomness flows through seed-string-keyed PCG32 streams (BLAKE3 seed
//! derivation). Given the same seed, algorithm id, and palette, generation is
//! bit-identical across runs; independent concerns (algorithm mapping versus
//! sequence content) use string-suffix namespaces so their streams never
//! correlate.
//!
//! # Playback and arbitration
//!
//! Playback is single-threaded cooperative scheduling on tokio: one delayed
//! tick at a time, cooperative cancellation checked at every suspension
//! point. At most one of stand-alone signature playback, fixed-cadence step
//! playback, and nested step playback is ever active; starting any one stops
//! the others first ([`Engine`] owns that rule).
//!
//! The engine never draws, never makes sound, and never owns a UI: its only
//! outward effects are `on_select(item)` notifications and step-sequencer
//! state mirrors pushed to host callbacks.
//!
//! # Example
//!
//! ```ignore
//! use sigseq_engine::{Engine, EngineConfig, EngineHooks, SignatureOptions};
//! use std::sync::Arc;
//!
//! let mut engine = Engine::new(
//!     EngineConfig {
//!         seed: "abc".into(),
//!         palette_items: 6,
//!         ..EngineConfig::default()
//!     },
//!     EngineHooks {
//!         on_select: Some(Arc::new(|item| println!("select {item}"))),
//!         on_state_change: None,
//!     },
//! );
//! engine.start_signature(3, SignatureOptions::default());
//! ```
//!
//! # Module Structure
//!
//! - [`rng`]: seed-string-keyed deterministic RNG
//! - [`mapping`]: seeded algorithm-to-item assignment
//! - [`algorithm`]: the ten algorithm identifiers and timing table
//! - [`signature`]: the ten generation bodies
//! - [`player`]: single-session signature playback
//! - [`clock`]: external step clock interface for fixed-cadence mode
//! - [`sequencer`]: recorded slots, both step playback strategies
//! - [`engine`]: host-facing façade and mode arbitration

pub mod algorithm;
pub mod clock;
pub mod engine;
pub mod error;
pub mod mapping;
pub mod palette;
pub mod player;
pub mod rng;
pub mod sequencer;
pub mod signature;

// Re-export main types at crate root
pub use algorithm::Algorithm;
pub use clock::{AdvanceFn, StepAdvance, StepClock, TokioStepClock};
pub use engine::{Engine, EngineConfig, EngineHooks, PlaybackMode, SignatureOptions};
pub use error::{EngineError, EngineResult};
pub use mapping::map_algorithms;
pub use palette::{ItemRef, Palette};
pub use player::{CompleteFn, PlayOptions, SelectFn, SignaturePlayer};
pub use rng::SeedRng;
pub use sequencer::{StateFn, StepSequencerBridge, StepSequencerState, DEFAULT_SLOT_COUNT};
pub use signature::{generate, generate_with, Signature, SIGNATURE_STEPS};
