//! External step clock interface for fixed-cadence playback.
//!
//! In fixed-cadence mode the bridge does not drive its own timing: a clock
//! collaborator emits advance events at its own cadence against the slot
//! snapshot it was handed at `play` time. [`TokioStepClock`] is the provided
//! implementation; hosts with their own transport can substitute any
//! [`StepClock`].

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// One step-advance event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepAdvance {
    /// Position within the slot cycle, starting at 0.
    pub step_index: usize,
    /// The value recorded at that position, if any.
    pub value: Option<usize>,
    /// The cadence the clock is running at.
    pub step_interval: Duration,
}

/// Advance callback; returning `Break` tells the clock to stop emitting.
pub type AdvanceFn = Box<dyn FnMut(StepAdvance) -> ControlFlow<()> + Send>;

/// A collaborator that emits step-advance events at its own cadence.
pub trait StepClock: Send + Sync {
    /// Begins emitting advance events over `slots`, index 0 first, cycling
    /// indefinitely until stopped or until the callback breaks.
    fn play(&mut self, slots: Vec<Option<usize>>, step_interval: Duration, on_advance: AdvanceFn);

    /// Stops emitting. Safe to call when idle.
    fn stop(&mut self);
}

/// Tokio-interval step clock.
#[derive(Default)]
pub struct TokioStepClock {
    session: Option<(Arc<AtomicBool>, JoinHandle<()>)>,
}

impl TokioStepClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StepClock for TokioStepClock {
    fn play(&mut self, slots: Vec<Option<usize>>, step_interval: Duration, mut on_advance: AdvanceFn) {
        self.stop();
        if slots.is_empty() {
            return;
        }
        let live = Arc::new(AtomicBool::new(true));
        let task_live = live.clone();
        let handle = tokio::spawn(async move {
            let mut index = 0usize;
            loop {
                if !task_live.load(Ordering::SeqCst) {
                    return;
                }
                let advance = StepAdvance {
                    step_index: index,
                    value: slots[index],
                    step_interval,
                };
                if on_advance(advance).is_break() {
                    task_live.store(false, Ordering::SeqCst);
                    return;
                }
                index = (index + 1) % slots.len();
                sleep(step_interval).await;
            }
        });
        self.session = Some((live, handle));
    }

    fn stop(&mut self) {
        if let Some((live, handle)) = self.session.take() {
            live.store(false, Ordering::SeqCst);
            handle.abort();
        }
    }
}

impl Drop for TokioStepClock {
    fn drop(&mut self) {
        self.stop();
    }
}
