//! Steps command implementation
//!
//! Records a slot program into the step sequencer and plays it back, either
//! at the fixed cadence or as nested signature passes. Playback progress is
//! taken from the engine's state mirror rather than polled.

use anyhow::{Context, Result};
use colored::Colorize;
use sigseq_engine::{
    Engine, EngineConfig, EngineError, EngineHooks, ItemRef, StepSequencerState,
};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Parses a slot program like `1,-,0,3`; `-` (or `.`) marks an empty slot.
fn parse_slots(spec: &str) -> Result<Vec<Option<usize>>, EngineError> {
    spec.split(',')
        .map(str::trim)
        .map(|token| match token {
            "-" | "." => Ok(None),
            _ => token
                .parse::<usize>()
                .map(Some)
                .map_err(|_| EngineError::invalid_slot_value(token, "expected an integer or '-'")),
        })
        .collect()
}

/// Run the steps command.
pub async fn run(
    seed: &str,
    slots_spec: &str,
    items: usize,
    nested: bool,
    loop_playback: bool,
    step_ms: u64,
) -> Result<ExitCode> {
    let slots = parse_slots(slots_spec).context("invalid --slots program")?;

    let started = Instant::now();
    let (state_tx, mut state_rx) = mpsc::unbounded_channel::<StepSequencerState>();
    let mut engine = Engine::new(
        EngineConfig {
            seed: seed.into(),
            palette_items: items,
            slot_count: slots.len(),
            step_interval_ms: step_ms,
        },
        EngineHooks {
            on_select: Some(Arc::new(move |item_ref: ItemRef| {
                let elapsed = started.elapsed().as_millis();
                let name = match item_ref {
                    ItemRef::Hum => "hum".blue().to_string(),
                    ItemRef::Content(k) => format!("item {k}").cyan().to_string(),
                };
                println!("{elapsed:>6} ms  {name}");
            })),
            on_state_change: Some(Arc::new(move |state| {
                let _ = state_tx.send(state);
            })),
        },
    );

    // One recording lap writes the whole program: record advances the
    // cursor, and clearing the slot under the cursor advances it the same
    // way.
    engine.start_recording(0);
    for (index, slot) in slots.iter().enumerate() {
        match slot {
            Some(value) => engine.record(*value),
            None => engine.clear_slot(index),
        }
    }

    engine.set_nested_mode(nested);
    engine.set_loop(loop_playback);
    engine.start_step_playback();
    println!(
        "{} {} mode over {} slots{}",
        "::".dimmed(),
        if nested { "nested" } else { "fixed-cadence" },
        slots.len(),
        if loop_playback { ", looping (ctrl-c to stop)" } else { "" }
    );

    // Recording and configuration already pushed mirror updates into the
    // channel; playback completion is the first not-playing state after a
    // playing one.
    let mut playback_seen = false;
    let mut last_index = usize::MAX;
    loop {
        tokio::select! {
            state = state_rx.recv() => {
                match state {
                    Some(state) if state.playing => {
                        playback_seen = true;
                        if state.current_index != last_index {
                            last_index = state.current_index;
                            println!("{}", format!("-- step {}", state.current_index).dimmed());
                        }
                    }
                    Some(_) if playback_seen => {
                        println!("{}", "complete".green());
                        break;
                    }
                    Some(_) => {}
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                engine.stop_step_playback();
                println!("{}", "stopped".dimmed());
                break;
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
