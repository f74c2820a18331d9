//! Play command implementation
//!
//! Plays one signature session to stdout at the algorithm's real cadence.

use anyhow::Result;
use colored::Colorize;
use sigseq_engine::{
    map_algorithms, Engine, EngineConfig, EngineHooks, ItemRef, SignatureOptions,
};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;

/// Run the play command.
pub async fn run(
    seed: &str,
    algorithm_id: Option<u8>,
    item: usize,
    items: usize,
    loop_playback: bool,
) -> Result<ExitCode> {
    let algorithm_id = match algorithm_id {
        Some(id) => id,
        None => {
            let mapping = map_algorithms(seed, items);
            let algo = mapping
                .get(item)
                .ok_or_else(|| anyhow::anyhow!("item {item} out of range for {items} items"))?;
            println!(
                "{} item {item} maps to #{} {}",
                "::".dimmed(),
                algo.id(),
                algo
            );
            algo.id()
        }
    };

    let started = Instant::now();
    let mut engine = Engine::new(
        EngineConfig {
            seed: seed.into(),
            palette_items: items,
            ..EngineConfig::default()
        },
        EngineHooks {
            on_select: Some(Arc::new(move |item_ref: ItemRef| {
                let elapsed = started.elapsed().as_millis();
                let name = match item_ref {
                    ItemRef::Hum => "hum".blue().to_string(),
                    ItemRef::Content(k) => format!("item {k}").cyan().to_string(),
                };
                println!("{:>6} ms  {name}", elapsed);
            })),
            on_state_change: None,
        },
    );

    let (done_tx, done_rx) = oneshot::channel::<()>();
    engine.start_signature(
        algorithm_id,
        SignatureOptions {
            loop_playback,
            on_complete: Some(Box::new(move || {
                let _ = done_tx.send(());
            })),
        },
    );

    if loop_playback {
        println!("{}", "looping, press ctrl-c to stop".dimmed());
        tokio::signal::ctrl_c().await?;
        engine.stop_signature();
        println!("{}", "stopped".dimmed());
    } else {
        tokio::select! {
            _ = done_rx => println!("{}", "complete".green()),
            _ = tokio::signal::ctrl_c() => {
                engine.stop_signature();
                println!("{}", "stopped".dimmed());
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
