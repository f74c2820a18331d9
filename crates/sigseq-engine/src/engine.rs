//! Engine façade and playback-mode arbitration.
//!
//! The [`Engine`] is the single-owner entry point hosts talk to. It owns the
//! seed, the palette dimensions, both playback components, and the one rule
//! that keeps them honest: at most one of stand-alone signature playback,
//! fixed-cadence step playback, and nested step playback is active at any
//! instant. Every start entry point funnels through the same transition that
//! tears the others down, pending timers and async continuations included,
//! before the new mode begins.

use crate::algorithm::Algorithm;
use crate::clock::{StepClock, TokioStepClock};
use crate::error::{EngineError, EngineResult};
use crate::mapping::map_algorithms;
use crate::palette::Palette;
use crate::player::{CompleteFn, PlayOptions, SelectFn, SignaturePlayer};
use crate::sequencer::{
    lock, StateFn, StepSequencerBridge, StepSequencerState, DEFAULT_SLOT_COUNT,
    DEFAULT_STEP_INTERVAL_MS,
};
use crate::signature::{self, SIGNATURE_STEPS};
use std::sync::{Arc, Mutex};

/// Which playback mode is currently active.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackMode {
    Idle,
    /// Stand-alone signature playback.
    Signature,
    /// Step playback at the external clock's cadence.
    FixedStep,
    /// Step playback where each slot runs a full signature pass.
    NestedStep,
}

/// Engine construction parameters.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Seed string parameterizing all randomness.
    pub seed: String,
    /// Palette length, hum item included. Zero means "not provided yet";
    /// playback entry points no-op until the host supplies one.
    pub palette_items: usize,
    /// Number of step sequencer slots.
    pub slot_count: usize,
    /// Step interval for step playback, milliseconds.
    pub step_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: String::new(),
            palette_items: 0,
            slot_count: DEFAULT_SLOT_COUNT,
            step_interval_ms: DEFAULT_STEP_INTERVAL_MS,
        }
    }
}

/// Host callbacks. Both are optional; absent hooks degrade to no-ops.
#[derive(Default)]
pub struct EngineHooks {
    /// Selection-change sink, the engine's only per-tick side effect.
    pub on_select: Option<SelectFn>,
    /// State mirror for the step sequencer.
    pub on_state_change: Option<StateFn>,
}

/// Options for a stand-alone signature session.
#[derive(Default)]
pub struct SignatureOptions {
    /// Loop instead of completing after one pass.
    pub loop_playback: bool,
    /// Invoked once on natural completion of a one-shot session.
    pub on_complete: Option<CompleteFn>,
}

/// The deterministic sequencing and playback engine.
pub struct Engine {
    seed: String,
    palette: Palette,
    on_select: Option<SelectFn>,
    player: Arc<Mutex<SignaturePlayer>>,
    bridge: StepSequencerBridge,
    mode: PlaybackMode,
}

impl Engine {
    /// Creates an engine with the provided tokio-interval step clock.
    pub fn new(config: EngineConfig, hooks: EngineHooks) -> Self {
        Self::with_clock(config, hooks, Box::new(TokioStepClock::new()))
    }

    /// Creates an engine around a host-supplied step clock.
    pub fn with_clock(
        config: EngineConfig,
        hooks: EngineHooks,
        clock: Box<dyn StepClock>,
    ) -> Self {
        let player = Arc::new(Mutex::new(SignaturePlayer::new()));
        let bridge = StepSequencerBridge::new(
            config.slot_count,
            config.step_interval_ms,
            clock,
            player.clone(),
            hooks.on_select.clone(),
            hooks.on_state_change,
        );
        Self {
            seed: config.seed,
            palette: Palette::new(config.palette_items),
            on_select: hooks.on_select,
            player,
            bridge,
            mode: PlaybackMode::Idle,
        }
    }

    /// The active playback mode.
    pub fn mode(&self) -> PlaybackMode {
        match self.mode {
            PlaybackMode::Signature if lock(&self.player).is_playing() => PlaybackMode::Signature,
            PlaybackMode::FixedStep | PlaybackMode::NestedStep if self.bridge.is_playing() => {
                self.mode
            }
            _ => PlaybackMode::Idle,
        }
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    /// Replaces the seed, stopping all playback first; the seed is immutable
    /// for as long as any session runs.
    pub fn set_seed(&mut self, seed: impl Into<String>) {
        self.stop_all();
        self.seed = seed.into();
    }

    /// Supplies or replaces the palette dimensions.
    pub fn set_palette_items(&mut self, total: usize) {
        self.palette = Palette::new(total);
    }

    /// Stops whichever mode is active. The single transition point: every
    /// start call goes through here before spawning anything new.
    fn stop_all(&mut self) {
        lock(&self.player).stop();
        self.bridge.stop();
        self.mode = PlaybackMode::Idle;
    }

    // ---- stand-alone signature playback ----

    /// Generates and plays the signature for `algorithm_id`.
    ///
    /// Unknown ids use the constrained fallback. With no palette configured
    /// this is a no-op (expected during host initialization races).
    pub fn start_signature(&mut self, algorithm_id: u8, opts: SignatureOptions) {
        if self.palette.is_empty() {
            tracing::warn!("no palette configured, ignoring signature start");
            return;
        }
        self.stop_all();

        let sequence = signature::generate(&self.seed, algorithm_id, self.palette, SIGNATURE_STEPS);
        let algorithm =
            Algorithm::from_id(algorithm_id).unwrap_or(Algorithm::ConstrainedWalk);
        lock(&self.player).start(
            sequence,
            algorithm,
            self.palette,
            self.on_select.clone(),
            PlayOptions {
                loop_playback: opts.loop_playback,
                on_complete: opts.on_complete,
            },
        );
        self.mode = PlaybackMode::Signature;
    }

    /// Plays the signature mapped to a palette item: the item's algorithm is
    /// looked up via the seed-keyed mapping, then generated and played.
    pub fn start_signature_for_item(
        &mut self,
        item_index: usize,
        opts: SignatureOptions,
    ) -> EngineResult<()> {
        if self.palette.is_empty() {
            tracing::warn!("no palette configured, ignoring signature start");
            return Ok(());
        }
        if item_index >= self.palette.len() {
            return Err(EngineError::ItemOutOfRange {
                index: item_index,
                palette_len: self.palette.len(),
            });
        }
        let mapping = map_algorithms(&self.seed, self.palette.len());
        let algorithm = mapping[item_index];
        self.start_signature(algorithm.id(), opts);
        Ok(())
    }

    /// Stops stand-alone signature playback. No-op in any other mode.
    pub fn stop_signature(&mut self) {
        if self.mode == PlaybackMode::Signature {
            lock(&self.player).stop();
            self.mode = PlaybackMode::Idle;
        }
    }

    // ---- step playback ----

    /// Starts step playback in whichever strategy `nested_mode` selects.
    ///
    /// With no palette configured this is a no-op.
    pub fn start_step_playback(&mut self) {
        if self.palette.is_empty() {
            tracing::warn!("no palette configured, ignoring step playback start");
            return;
        }
        self.stop_all();
        if self.bridge.nested_mode() {
            self.bridge.start_nested(self.seed.clone(), self.palette);
            self.mode = PlaybackMode::NestedStep;
        } else {
            self.bridge.start_fixed(self.palette);
            self.mode = PlaybackMode::FixedStep;
        }
    }

    /// Stops step playback in either strategy, including any in-flight
    /// nested sub-signature. No-op when idle or in signature mode.
    pub fn stop_step_playback(&mut self) {
        if matches!(self.mode, PlaybackMode::FixedStep | PlaybackMode::NestedStep) {
            self.bridge.stop();
            self.mode = PlaybackMode::Idle;
        }
    }

    // ---- recording and configuration passthrough ----

    pub fn start_recording(&mut self, slot: usize) {
        self.bridge.start_recording(slot);
    }

    pub fn record(&mut self, value: usize) {
        self.bridge.record_value(value);
    }

    pub fn clear_slot(&mut self, index: usize) {
        self.bridge.clear_slot(index);
    }

    pub fn set_loop(&mut self, enabled: bool) {
        self.bridge.set_loop(enabled);
    }

    /// Switches between fixed-cadence and nested step playback. Toggling
    /// while step playback runs stops it; the new strategy applies on the
    /// next start.
    pub fn set_nested_mode(&mut self, enabled: bool) {
        if matches!(self.mode(), PlaybackMode::FixedStep | PlaybackMode::NestedStep) {
            self.stop_step_playback();
        }
        self.bridge.set_nested_mode(enabled);
    }

    pub fn set_step_interval(&mut self, step_interval_ms: u64) {
        self.bridge.set_step_interval(step_interval_ms);
    }

    pub fn resize(&mut self, new_len: usize) {
        self.bridge.resize(new_len);
    }

    /// Step sequencer state snapshot.
    pub fn state(&self) -> StepSequencerState {
        self.bridge.state()
    }
}
