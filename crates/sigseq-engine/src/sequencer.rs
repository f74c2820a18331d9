//! Step sequencer bridge: recorded slots, two playback strategies, and the
//! host-facing state mirror.
//!
//! The bridge owns a fixed number of manually-recorded slots. Fixed-cadence
//! playback delegates timing to an external [`StepClock`] and translates each
//! advance event into the selection effect; nested playback walks the slots
//! itself and runs one full non-looping signature pass per non-empty slot.
//! Both strategies mirror every state mutation to the host through the
//! `on_state_change` hook so a UI can reflect progress without polling.

use crate::algorithm::Algorithm;
use crate::clock::{StepAdvance, StepClock};
use crate::mapping::map_algorithms;
use crate::palette::{ItemRef, Palette};
use crate::player::{PlayOptions, SelectFn, SignaturePlayer};
use crate::signature::{self, SIGNATURE_STEPS};
use serde::Serialize;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Default slot count.
pub const DEFAULT_SLOT_COUNT: usize = 8;

/// Default step interval in milliseconds.
pub const DEFAULT_STEP_INTERVAL_MS: u64 = 200;

/// Floor for the empty-slot dwell in nested mode, milliseconds.
const NESTED_EMPTY_DWELL_FLOOR_MS: u64 = 50;

/// Floor for the between-signatures gap in nested mode, milliseconds.
const NESTED_GAP_FLOOR_MS: u64 = 30;

/// State-mirror sink.
pub type StateFn = Arc<dyn Fn(StepSequencerState) + Send + Sync>;

/// Snapshot pushed to the host after every state mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StepSequencerState {
    pub slots: Vec<Option<usize>>,
    pub record_cursor: usize,
    pub is_recording: bool,
    pub playing: bool,
    pub current_index: usize,
    pub step_interval_ms: u64,
    pub loop_enabled: bool,
    pub nested_mode: bool,
}

struct SeqInner {
    slots: Vec<Option<usize>>,
    record_cursor: usize,
    is_recording: bool,
    playing: bool,
    current_index: usize,
    step_interval_ms: u64,
    loop_enabled: bool,
    nested_mode: bool,
    /// Wrap detection for fixed-cadence mode. Index 0 is visited at the very
    /// start, so "back at 0" only means "cycle complete" once this is set.
    first_cycle_started: bool,
}

impl SeqInner {
    fn snapshot(&self) -> StepSequencerState {
        StepSequencerState {
            slots: self.slots.clone(),
            record_cursor: self.record_cursor,
            is_recording: self.is_recording,
            playing: self.playing,
            current_index: self.current_index,
            step_interval_ms: self.step_interval_ms,
            loop_enabled: self.loop_enabled,
            nested_mode: self.nested_mode,
        }
    }
}

/// Recovers the guard from a poisoned lock; engine state stays usable even
/// if a hook panicked on another task.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct NestedSession {
    live: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// The 8 (or N)-slot step sequencer with its two playback strategies.
pub struct StepSequencerBridge {
    inner: Arc<Mutex<SeqInner>>,
    on_select: Option<SelectFn>,
    on_state_change: Option<StateFn>,
    clock: Box<dyn StepClock>,
    player: Arc<Mutex<SignaturePlayer>>,
    nested: Option<NestedSession>,
}

impl StepSequencerBridge {
    pub fn new(
        slot_count: usize,
        step_interval_ms: u64,
        clock: Box<dyn StepClock>,
        player: Arc<Mutex<SignaturePlayer>>,
        on_select: Option<SelectFn>,
        on_state_change: Option<StateFn>,
    ) -> Self {
        let slot_count = slot_count.max(1);
        Self {
            inner: Arc::new(Mutex::new(SeqInner {
                slots: vec![None; slot_count],
                record_cursor: 0,
                is_recording: false,
                playing: false,
                current_index: 0,
                step_interval_ms,
                loop_enabled: false,
                nested_mode: false,
                first_cycle_started: false,
            })),
            on_select,
            on_state_change,
            clock,
            player,
            nested: None,
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> StepSequencerState {
        lock(&self.inner).snapshot()
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.inner).playing
    }

    pub fn nested_mode(&self) -> bool {
        lock(&self.inner).nested_mode
    }

    /// Delivers a snapshot taken earlier, with no lock held, so a hook may
    /// re-enter the bridge.
    fn emit_state(snapshot: StepSequencerState, hook: &Option<StateFn>) {
        if let Some(on_state_change) = hook {
            on_state_change(snapshot);
        }
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut SeqInner) -> R) -> R {
        let (result, snapshot) = {
            let mut inner = lock(&self.inner);
            let result = f(&mut inner);
            (result, inner.snapshot())
        };
        Self::emit_state(snapshot, &self.on_state_change);
        result
    }

    // ---- recording sub-protocol ----

    /// Arms recording at `slot`.
    pub fn start_recording(&mut self, slot: usize) {
        let len = lock(&self.inner).slots.len();
        if slot >= len {
            tracing::warn!(slot, len, "record start index out of range, ignoring");
            return;
        }
        self.mutate(|inner| {
            inner.record_cursor = slot;
            inner.is_recording = true;
        });
    }

    /// Writes `value` at the record cursor and advances it, wrapping modulo
    /// the slot count. Wrapping to 0 finishes the lap and clears the
    /// recording flag.
    pub fn record_value(&mut self, value: usize) {
        self.mutate(|inner| {
            let cursor = inner.record_cursor;
            inner.slots[cursor] = Some(value);
            inner.record_cursor = (cursor + 1) % inner.slots.len();
            if inner.record_cursor == 0 {
                inner.is_recording = false;
            }
        });
    }

    /// Clears one slot. If recording is parked on that slot the cursor
    /// advances exactly as for a normal record step.
    pub fn clear_slot(&mut self, index: usize) {
        let len = lock(&self.inner).slots.len();
        if index >= len {
            tracing::warn!(index, len, "clear index out of range, ignoring");
            return;
        }
        self.mutate(|inner| {
            inner.slots[index] = None;
            if inner.is_recording && inner.record_cursor == index {
                inner.record_cursor = (index + 1) % inner.slots.len();
                if inner.record_cursor == 0 {
                    inner.is_recording = false;
                }
            }
        });
    }

    // ---- configuration ----

    pub fn set_loop(&mut self, enabled: bool) {
        self.mutate(|inner| inner.loop_enabled = enabled);
    }

    pub fn set_nested_mode(&mut self, enabled: bool) {
        self.mutate(|inner| inner.nested_mode = enabled);
    }

    pub fn set_step_interval(&mut self, step_interval_ms: u64) {
        self.mutate(|inner| inner.step_interval_ms = step_interval_ms);
    }

    /// Resizes the slot array, preserving values up to the shorter length and
    /// padding with empty slots. The current index and record cursor are
    /// clamped into the new range.
    pub fn resize(&mut self, new_len: usize) {
        if new_len == 0 {
            tracing::warn!("refusing to resize step sequencer to zero slots");
            return;
        }
        self.mutate(|inner| {
            inner.slots.resize(new_len, None);
            if inner.current_index >= new_len {
                inner.current_index = new_len - 1;
            }
            if inner.record_cursor >= new_len {
                inner.record_cursor = 0;
            }
        });
    }

    // ---- fixed-cadence playback ----

    /// Starts fixed-cadence playback driven by the external clock.
    ///
    /// The clock is handed a snapshot of the slots and emits `(step_index,
    /// value, interval)` events; the bridge translates values to items and
    /// detects the end of cycle one with an explicit flag so non-looping
    /// playback stops instead of silently cycling.
    pub fn start_fixed(&mut self, palette: Palette) {
        let (slots, interval) = self.mutate(|inner| {
            inner.playing = true;
            inner.current_index = 0;
            inner.first_cycle_started = false;
            (
                inner.slots.clone(),
                Duration::from_millis(inner.step_interval_ms),
            )
        });

        let inner = self.inner.clone();
        let on_select = self.on_select.clone();
        let on_state_change = self.on_state_change.clone();
        let on_advance = Box::new(move |advance: StepAdvance| {
            let snapshot = {
                let mut guard = lock(&inner);
                if !guard.playing {
                    return ControlFlow::Break(());
                }
                if advance.step_index == 0 {
                    if guard.first_cycle_started {
                        if !guard.loop_enabled {
                            guard.playing = false;
                            guard.current_index = 0;
                            guard.first_cycle_started = false;
                            let snapshot = guard.snapshot();
                            drop(guard);
                            Self::emit_state(snapshot, &on_state_change);
                            return ControlFlow::Break(());
                        }
                    } else {
                        guard.first_cycle_started = true;
                    }
                }
                guard.current_index = advance.step_index;
                guard.snapshot()
            };
            Self::emit_state(snapshot, &on_state_change);

            if let Some(value) = advance.value {
                match ItemRef::from_value(value, palette) {
                    Some(item) => {
                        if let Some(select) = &on_select {
                            select(item);
                        }
                    }
                    None => tracing::warn!(value, "slot value outside palette, skipping"),
                }
            }
            ControlFlow::Continue(())
        });

        self.clock.play(slots, interval, on_advance);
    }

    // ---- nested playback ----

    /// Starts nested playback: one full signature pass per non-empty slot.
    ///
    /// The pass re-checks the liveness flag before and after every await so
    /// an external stop interrupts promptly even mid-signature.
    pub fn start_nested(&mut self, seed: String, palette: Palette) {
        self.stop_nested_session();
        let live = Arc::new(AtomicBool::new(true));
        self.mutate(|inner| {
            inner.playing = true;
            inner.current_index = 0;
        });

        let inner = self.inner.clone();
        let on_select = self.on_select.clone();
        let on_state_change = self.on_state_change.clone();
        let player = self.player.clone();
        let task_live = live.clone();

        let handle = tokio::spawn(async move {
            let mapping = map_algorithms(&seed, palette.len());
            'pass: loop {
                let slot_count = lock(&inner).slots.len();
                for i in 0..slot_count {
                    if !task_live.load(Ordering::SeqCst) {
                        return;
                    }
                    let (value, step_ms, snapshot) = {
                        let mut guard = lock(&inner);
                        if i >= guard.slots.len() {
                            break;
                        }
                        guard.current_index = i;
                        (guard.slots[i], guard.step_interval_ms, guard.snapshot())
                    };
                    Self::emit_state(snapshot, &on_state_change);

                    let item = value.and_then(|v| ItemRef::from_value(v, palette));
                    let Some(item) = item else {
                        if value.is_some() {
                            tracing::warn!(?value, "slot value outside palette, dwelling");
                        }
                        sleep(Duration::from_millis(step_ms.max(NESTED_EMPTY_DWELL_FLOOR_MS)))
                            .await;
                        continue;
                    };

                    let algorithm = mapping
                        .get(item.palette_index())
                        .copied()
                        .unwrap_or(Algorithm::Uniform);
                    let sub_sequence =
                        signature::generate_with(&seed, algorithm, palette, SIGNATURE_STEPS);

                    if !task_live.load(Ordering::SeqCst) {
                        return;
                    }
                    let (done_tx, done_rx) = oneshot::channel::<()>();
                    lock(&player).start(
                        sub_sequence,
                        algorithm,
                        palette,
                        on_select.clone(),
                        PlayOptions {
                            loop_playback: false,
                            on_complete: Some(Box::new(move || {
                                let _ = done_tx.send(());
                            })),
                        },
                    );
                    // Err here means the sub-session was torn down externally;
                    // the liveness check below decides what that means.
                    let _ = done_rx.await;
                    if !task_live.load(Ordering::SeqCst) {
                        return;
                    }
                    sleep(Duration::from_millis(step_ms.max(NESTED_GAP_FLOOR_MS))).await;
                    if !task_live.load(Ordering::SeqCst) {
                        return;
                    }
                }
                let loop_enabled = lock(&inner).loop_enabled;
                if !task_live.load(Ordering::SeqCst) || !loop_enabled {
                    break 'pass;
                }
            }
            // Natural completion: quiesce and mirror the stop.
            if task_live.swap(false, Ordering::SeqCst) {
                let snapshot = {
                    let mut guard = lock(&inner);
                    guard.playing = false;
                    guard.current_index = 0;
                    guard.snapshot()
                };
                Self::emit_state(snapshot, &on_state_change);
            }
        });

        self.nested = Some(NestedSession { live, handle });
    }

    /// Kills the running nested pass, its sub-signature session included.
    fn stop_nested_session(&mut self) {
        if let Some(session) = self.nested.take() {
            session.live.store(false, Ordering::SeqCst);
            session.handle.abort();
            lock(&self.player).stop();
        }
    }

    /// Stops whichever playback strategy is active, including any in-flight
    /// nested sub-signature. Safe to call when idle.
    pub fn stop(&mut self) {
        self.clock.stop();
        self.stop_nested_session();
        self.mutate(|inner| {
            inner.playing = false;
            inner.current_index = 0;
            inner.first_cycle_started = false;
        });
    }
}

impl Drop for StepSequencerBridge {
    fn drop(&mut self) {
        self.stop_nested_session();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TokioStepClock;
    use pretty_assertions::assert_eq;

    fn bridge_with_hooks() -> (StepSequencerBridge, Arc<Mutex<Vec<ItemRef>>>) {
        let seen: Arc<Mutex<Vec<ItemRef>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let on_select: SelectFn = Arc::new(move |item| sink.lock().unwrap().push(item));
        let bridge = StepSequencerBridge::new(
            DEFAULT_SLOT_COUNT,
            100,
            Box::new(TokioStepClock::new()),
            Arc::new(Mutex::new(SignaturePlayer::new())),
            Some(on_select),
            None,
        );
        (bridge, seen)
    }

    #[test]
    fn test_record_wrap_finishes_lap() {
        let (mut bridge, _) = bridge_with_hooks();
        bridge.start_recording(6);
        bridge.record_value(3);
        bridge.record_value(1);
        bridge.record_value(2);

        let state = bridge.state();
        assert_eq!(state.slots[6], Some(3));
        assert_eq!(state.slots[7], Some(1));
        assert_eq!(state.slots[0], Some(2));
        assert_eq!(state.record_cursor, 1);
        assert!(!state.is_recording, "wrap to 0 ends the recording lap");
    }

    #[test]
    fn test_clear_slot_advances_like_record() {
        let (mut bridge, _) = bridge_with_hooks();
        bridge.start_recording(7);
        bridge.clear_slot(7);

        let state = bridge.state();
        assert_eq!(state.slots[7], None);
        assert_eq!(state.record_cursor, 0);
        assert!(!state.is_recording);
    }

    #[test]
    fn test_clear_elsewhere_leaves_cursor() {
        let (mut bridge, _) = bridge_with_hooks();
        bridge.start_recording(2);
        bridge.clear_slot(5);

        let state = bridge.state();
        assert_eq!(state.record_cursor, 2);
        assert!(state.is_recording);
    }

    #[test]
    fn test_out_of_range_indices_are_noops() {
        let (mut bridge, _) = bridge_with_hooks();
        bridge.start_recording(99);
        assert!(!bridge.state().is_recording);
        bridge.clear_slot(99);
        assert_eq!(bridge.state().slots.len(), DEFAULT_SLOT_COUNT);
    }

    #[test]
    fn test_resize_preserves_and_clamps() {
        let (mut bridge, _) = bridge_with_hooks();
        bridge.start_recording(0);
        for v in [1, 2, 3, 4, 5, 6, 7, 0] {
            bridge.record_value(v);
        }

        bridge.resize(4);
        let state = bridge.state();
        assert_eq!(state.slots, vec![Some(1), Some(2), Some(3), Some(4)]);

        bridge.resize(6);
        let state = bridge.state();
        assert_eq!(
            state.slots,
            vec![Some(1), Some(2), Some(3), Some(4), None, None]
        );
    }

    #[test]
    fn test_state_mirror_fires_on_mutation() {
        let states: Arc<Mutex<Vec<StepSequencerState>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = states.clone();
        let on_state: StateFn = Arc::new(move |s| sink.lock().unwrap().push(s));
        let mut bridge = StepSequencerBridge::new(
            8,
            100,
            Box::new(TokioStepClock::new()),
            Arc::new(Mutex::new(SignaturePlayer::new())),
            None,
            Some(on_state),
        );

        bridge.start_recording(3);
        bridge.record_value(1);
        bridge.set_loop(true);

        let states = states.lock().unwrap();
        assert_eq!(states.len(), 3);
        assert!(states[0].is_recording);
        assert_eq!(states[1].slots[3], Some(1));
        assert!(states[2].loop_enabled);
    }

    #[test]
    fn test_state_snapshot_serializes() {
        let (mut bridge, _) = bridge_with_hooks();
        bridge.start_recording(1);
        bridge.record_value(2);

        let json = serde_json::to_value(bridge.state()).unwrap();
        assert_eq!(json["slots"].as_array().unwrap().len(), DEFAULT_SLOT_COUNT);
        assert_eq!(json["slots"][1], serde_json::json!(2));
        assert_eq!(json["record_cursor"], serde_json::json!(2));
        assert_eq!(json["nested_mode"], serde_json::json!(false));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_cadence_stops_after_one_cycle() {
        let (mut bridge, seen) = bridge_with_hooks();
        bridge.start_recording(0);
        for v in [1, 0, 2, 0, 1, 0, 2, 1] {
            bridge.record_value(v);
        }
        bridge.start_fixed(Palette::new(4));

        sleep(Duration::from_secs(3)).await;
        assert!(!bridge.is_playing(), "non-looping playback stops at wrap");
        assert_eq!(seen.lock().unwrap().len(), 8, "one select per slot, once");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_cadence_loops_when_enabled() {
        let (mut bridge, seen) = bridge_with_hooks();
        bridge.set_loop(true);
        bridge.start_recording(0);
        for v in [1, 2, 1, 2, 1, 2, 1, 2] {
            bridge.record_value(v);
        }
        bridge.start_fixed(Palette::new(4));

        sleep(Duration::from_secs(3)).await;
        assert!(bridge.is_playing());
        assert!(seen.lock().unwrap().len() > 8, "loop keeps emitting");
        bridge.stop();
        assert!(!bridge.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_hook_may_reenter_the_bridge() {
        use std::sync::OnceLock;

        // The hook reads back through the public API; this must not deadlock
        // on the bridge's internal lock.
        let cell: Arc<OnceLock<Arc<StepSequencerBridge>>> = Arc::new(OnceLock::new());
        let hook_cell = cell.clone();
        let reentered = Arc::new(AtomicBool::new(false));
        let hit = reentered.clone();
        let on_state: StateFn = Arc::new(move |pushed| {
            if let Some(bridge) = hook_cell.get() {
                assert_eq!(bridge.state().current_index, pushed.current_index);
                hit.store(true, Ordering::SeqCst);
            }
        });

        let mut bridge = StepSequencerBridge::new(
            4,
            100,
            Box::new(TokioStepClock::new()),
            Arc::new(Mutex::new(SignaturePlayer::new())),
            None,
            Some(on_state),
        );
        bridge.set_loop(true);
        bridge.start_recording(0);
        for v in [1, 2, 1, 2] {
            bridge.record_value(v);
        }
        bridge.start_fixed(Palette::new(4));

        let bridge = Arc::new(bridge);
        assert!(cell.set(bridge.clone()).is_ok());
        sleep(Duration::from_secs(1)).await;
        assert!(reentered.load(Ordering::SeqCst));
        assert!(bridge.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_nested_replaces_session() {
        let collect = |restart: bool| async move {
            let (mut bridge, seen) = bridge_with_hooks();
            bridge.start_recording(0);
            bridge.record_value(1);
            bridge.start_nested("abc".into(), Palette::new(4));
            if restart {
                bridge.start_nested("abc".into(), Palette::new(4));
            }
            sleep(Duration::from_secs(60)).await;
            assert!(!bridge.is_playing());
            let seen = seen.lock().unwrap().clone();
            seen
        };

        let single = collect(false).await;
        let double = collect(true).await;
        assert!(!single.is_empty());
        assert_eq!(
            double, single,
            "restart leaves exactly one session driving selections"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_cadence_skips_empty_slots() {
        let (mut bridge, seen) = bridge_with_hooks();
        bridge.start_recording(0);
        bridge.record_value(1);
        // Only slot 0 holds a value; the rest stay empty.
        bridge.start_fixed(Palette::new(4));

        sleep(Duration::from_secs(3)).await;
        assert_eq!(*seen.lock().unwrap(), vec![ItemRef::Content(0)]);
    }
}
