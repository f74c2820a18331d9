//! Map command implementation
//!
//! Prints the deterministic algorithm-to-item assignment for a seed.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use sigseq_engine::map_algorithms;
use std::process::ExitCode;

#[derive(Serialize)]
struct MappingEntry {
    item: usize,
    algorithm_id: u8,
    algorithm: String,
}

/// Run the map command.
pub fn run(seed: &str, items: usize, json: bool) -> Result<ExitCode> {
    let mapping = map_algorithms(seed, items);

    if json {
        let entries: Vec<MappingEntry> = mapping
            .iter()
            .enumerate()
            .map(|(item, algo)| MappingEntry {
                item,
                algorithm_id: algo.id(),
                algorithm: algo.to_string(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("{} {}", "seed".dimmed(), seed.bold());
    for (item, algo) in mapping.iter().enumerate() {
        let label = if item == 0 {
            "hum".dimmed().to_string()
        } else {
            format!("item {}", item - 1)
        };
        println!(
            "  {label:>8}  {} {}",
            format!("#{}", algo.id()).yellow(),
            algo.to_string().cyan()
        );
    }
    Ok(ExitCode::SUCCESS)
}
