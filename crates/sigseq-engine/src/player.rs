//! Single-session signature playback.
//!
//! A [`SignaturePlayer`] steps through one generated [`Signature`] at the
//! algorithm's fixed cadence, emitting the selection effect per non-silent
//! tick. At most one session (and therefore one pending tick) exists at a
//! time: starting while playing performs an implicit stop first.
//!
//! Cancellation is cooperative. Every session carries a shared liveness flag
//! checked at each tick boundary; `stop` clears the flag and aborts the task,
//! so no side effect from the old session can fire after `stop` returns.

use crate::algorithm::Algorithm;
use crate::palette::{ItemRef, Palette};
use crate::signature::Signature;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Selection-change sink shared across playback modes.
pub type SelectFn = Arc<dyn Fn(ItemRef) + Send + Sync>;

/// One-shot completion callback.
pub type CompleteFn = Box<dyn FnOnce() + Send>;

/// Options for one playback session.
#[derive(Default)]
pub struct PlayOptions {
    /// Loop indefinitely instead of completing after one pass.
    pub loop_playback: bool,
    /// Invoked exactly once when a one-shot session completes naturally.
    /// Never invoked after `stop`.
    pub on_complete: Option<CompleteFn>,
}

struct Session {
    live: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Scheduler for stand-alone and nested signature playback.
///
/// Must be driven from within a tokio runtime; `start` spawns the session
/// task on the current runtime.
#[derive(Default)]
pub struct SignaturePlayer {
    session: Option<Session>,
}

impl SignaturePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a session is currently active.
    pub fn is_playing(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.live.load(Ordering::SeqCst))
    }

    /// Starts playback of `sequence`, implicitly stopping any prior session.
    ///
    /// Each tick resolves the current entry against `palette` (0 is the hum
    /// item, `k` content item `k - 1`) and invokes `on_select`; silent (`None`)
    /// entries advance without an effect. One-shot sessions emit a final
    /// return-to-hum selection one interval after the last step, then go idle
    /// and fire `on_complete` once.
    ///
    /// An empty sequence has no ticks to schedule and completes immediately,
    /// even with `loop_playback` set.
    pub fn start(
        &mut self,
        sequence: Signature,
        algorithm: Algorithm,
        palette: Palette,
        on_select: Option<SelectFn>,
        opts: PlayOptions,
    ) {
        self.stop();

        let mut on_complete = opts.on_complete;
        if sequence.is_empty() {
            if let Some(complete) = on_complete.take() {
                complete();
            }
            return;
        }

        let live = Arc::new(AtomicBool::new(true));
        let task_live = live.clone();
        let interval = algorithm.step_interval();
        let loop_playback = opts.loop_playback;

        let handle = tokio::spawn(async move {
            loop {
                for &entry in &sequence {
                    if !task_live.load(Ordering::SeqCst) {
                        return;
                    }
                    if let Some(value) = entry {
                        match ItemRef::from_value(value, palette) {
                            Some(item) => {
                                if let Some(select) = &on_select {
                                    select(item);
                                }
                            }
                            None => {
                                tracing::warn!(value, "sequence value outside palette, skipping")
                            }
                        }
                    }
                    sleep(interval).await;
                    if !task_live.load(Ordering::SeqCst) {
                        return;
                    }
                }
                if !loop_playback {
                    break;
                }
            }
            // One-shot epilogue: return to the hum item after the final
            // interval, go idle, and complete exactly once.
            if let Some(select) = &on_select {
                if !palette.is_empty() {
                    select(ItemRef::Hum);
                }
            }
            task_live.store(false, Ordering::SeqCst);
            if let Some(complete) = on_complete.take() {
                complete();
            }
        });

        self.session = Some(Session { live, handle });
    }

    /// Stops the current session, if any.
    ///
    /// Cancels the pending tick, clears the completion callback without
    /// invoking it, and is a no-op when idle.
    pub fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            session.live.store(false, Ordering::SeqCst);
            session.handle.abort();
        }
    }
}

impl Drop for SignaturePlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    fn collector() -> (SelectFn, Arc<Mutex<Vec<ItemRef>>>) {
        let seen: Arc<Mutex<Vec<ItemRef>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let select: SelectFn = Arc::new(move |item| sink.lock().unwrap().push(item));
        (select, seen)
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_shot_selects_and_completes_once() {
        let (select, seen) = collector();
        let completions = Arc::new(AtomicBool::new(false));
        let done = completions.clone();

        let mut player = SignaturePlayer::new();
        player.start(
            vec![Some(1), Some(2), Some(0), Some(3)],
            Algorithm::Uniform,
            Palette::new(5),
            Some(select),
            PlayOptions {
                loop_playback: false,
                on_complete: Some(Box::new(move || done.store(true, Ordering::SeqCst))),
            },
        );

        sleep(Duration::from_secs(2)).await;
        let seen = seen.lock().unwrap();
        // Four steps plus the final return-to-hum.
        assert_eq!(seen.len(), 5);
        assert_eq!(seen[4], ItemRef::Hum);
        assert!(completions.load(Ordering::SeqCst));
        assert!(!player.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_steps_emit_nothing() {
        let (select, seen) = collector();
        let mut player = SignaturePlayer::new();
        player.start(
            vec![Some(1), None, None, Some(2)],
            Algorithm::Uniform,
            Palette::new(5),
            Some(select),
            PlayOptions::default(),
        );

        sleep(Duration::from_secs(2)).await;
        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![ItemRef::Content(0), ItemRef::Content(1), ItemRef::Hum]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_looped_session_never_completes_on_its_own() {
        let (select, seen) = collector();
        let completed = Arc::new(AtomicBool::new(false));
        let done = completed.clone();

        let mut player = SignaturePlayer::new();
        player.start(
            vec![Some(1), Some(2)],
            Algorithm::Uniform,
            Palette::new(5),
            Some(select),
            PlayOptions {
                loop_playback: true,
                on_complete: Some(Box::new(move || done.store(true, Ordering::SeqCst))),
            },
        );

        sleep(Duration::from_secs(3)).await;
        assert!(player.is_playing());
        assert!(seen.lock().unwrap().len() > 2, "loop must wrap around");
        assert!(!completed.load(Ordering::SeqCst));

        player.stop();
        assert!(!player.is_playing());
        let count = seen.lock().unwrap().len();
        sleep(Duration::from_secs(2)).await;
        assert_eq!(seen.lock().unwrap().len(), count, "no ticks after stop");
        assert!(!completed.load(Ordering::SeqCst), "stop clears on_complete");
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_session() {
        let (select, seen) = collector();
        let mut player = SignaturePlayer::new();
        player.start(
            vec![Some(1); 8],
            Algorithm::Uniform,
            Palette::new(5),
            Some(select.clone()),
            PlayOptions {
                loop_playback: true,
                on_complete: None,
            },
        );
        sleep(Duration::from_millis(300)).await;

        // Restart while playing: the old session must leak no pending tick.
        player.start(
            vec![Some(2); 4],
            Algorithm::Uniform,
            Palette::new(5),
            Some(select),
            PlayOptions::default(),
        );
        sleep(Duration::from_secs(2)).await;

        let seen = seen.lock().unwrap();
        let after_restart: Vec<_> = seen
            .iter()
            .rev()
            .take_while(|i| **i != ItemRef::Content(0))
            .collect();
        // The tail contains only the second session's item and the hum exit.
        assert!(after_restart.len() >= 5);
        assert!(!player.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_sequence_completes_without_spinning() {
        let (select, seen) = collector();
        let completed = Arc::new(AtomicBool::new(false));
        let done = completed.clone();

        let mut player = SignaturePlayer::new();
        player.start(
            Vec::new(),
            Algorithm::Uniform,
            Palette::new(5),
            Some(select),
            PlayOptions {
                loop_playback: true,
                on_complete: Some(Box::new(move || done.store(true, Ordering::SeqCst))),
            },
        );

        // No task to run: completion is synchronous and the player is idle,
        // so stop has nothing left to interrupt.
        assert!(!player.is_playing());
        assert!(completed.load(Ordering::SeqCst));
        sleep(Duration::from_secs(2)).await;
        assert!(seen.lock().unwrap().is_empty());
        player.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_when_idle_is_noop() {
        let mut player = SignaturePlayer::new();
        player.stop();
        assert!(!player.is_playing());
    }
}
