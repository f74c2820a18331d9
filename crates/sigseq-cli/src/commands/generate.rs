//! Generate command implementation
//!
//! Dumps one generated signature sequence, either as a compact human-readable
//! strip or as JSON.

use anyhow::Result;
use colored::Colorize;
use sigseq_engine::{generate, Algorithm, Palette};
use std::process::ExitCode;

/// Run the generate command.
pub fn run(seed: &str, algorithm_id: u8, items: usize, length: usize, json: bool) -> Result<ExitCode> {
    let palette = Palette::new(items);
    let sequence = generate(seed, algorithm_id, palette, length);

    if json {
        println!("{}", serde_json::to_string_pretty(&sequence)?);
        return Ok(ExitCode::SUCCESS);
    }

    let label = match Algorithm::from_id(algorithm_id) {
        Some(algo) => format!("#{} {} ({} ms/step)", algo.id(), algo, algo.step_interval_ms()),
        None => format!("#{algorithm_id} -> constrained fallback"),
    };
    println!("{} {}  {}", "seed".dimmed(), seed.bold(), label.cyan());

    let strip: String = sequence
        .iter()
        .map(|step| match step {
            None => ". ".dimmed().to_string(),
            Some(0) => "~ ".blue().to_string(),
            Some(v) => format!("{v:<2}"),
        })
        .collect();
    println!("  {strip}");
    println!(
        "  {} {} steps, {} silent",
        "->".dimmed(),
        sequence.len(),
        sequence.iter().filter(|s| s.is_none()).count()
    );
    Ok(ExitCode::SUCCESS)
}
