//! sigseq CLI - headless driver for the deterministic sequencing engine.
//!
//! This binary provides commands for inspecting seed-keyed algorithm
//! mappings, dumping generated signature sequences, and playing signatures
//! or recorded step programs to stdout in real time.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;

/// sigseq - Deterministic Generative Sequencing Engine
#[derive(Parser)]
#[command(name = "sigseq")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the seed-keyed algorithm-to-item mapping
    Map {
        /// Seed string
        #[arg(short, long)]
        seed: String,

        /// Palette size, hum item included
        #[arg(short, long, default_value_t = 10)]
        items: usize,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Generate a signature sequence and print it
    Generate {
        /// Seed string
        #[arg(short, long)]
        seed: String,

        /// Algorithm id (1-10; other ids use the constrained fallback)
        #[arg(short, long)]
        algorithm: u8,

        /// Palette size, hum item included
        #[arg(short, long, default_value_t = 10)]
        items: usize,

        /// Sequence length
        #[arg(short, long, default_value_t = 32)]
        length: usize,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Play a signature to stdout at its algorithm's cadence
    Play {
        /// Seed string
        #[arg(short, long)]
        seed: String,

        /// Algorithm id; omit to map one from the item palette
        #[arg(short, long)]
        algorithm: Option<u8>,

        /// Palette item to derive the algorithm from (with no --algorithm)
        #[arg(long, default_value_t = 0)]
        item: usize,

        /// Palette size, hum item included
        #[arg(short, long, default_value_t = 10)]
        items: usize,

        /// Loop until interrupted instead of completing after one pass
        #[arg(long = "loop")]
        loop_playback: bool,
    },

    /// Record a step program and play it back
    Steps {
        /// Seed string
        #[arg(short, long)]
        seed: String,

        /// Comma-separated slot values; `-` marks an empty slot (e.g. "1,-,0,3")
        #[arg(long)]
        slots: String,

        /// Palette size, hum item included
        #[arg(short, long, default_value_t = 10)]
        items: usize,

        /// Run each step as a full nested signature pass
        #[arg(long)]
        nested: bool,

        /// Loop until interrupted
        #[arg(long = "loop")]
        loop_playback: bool,

        /// Step interval in milliseconds
        #[arg(long, default_value_t = 200)]
        step_ms: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Map { seed, items, json } => commands::map::run(&seed, items, json),
        Commands::Generate {
            seed,
            algorithm,
            items,
            length,
            json,
        } => commands::generate::run(&seed, algorithm, items, length, json),
        Commands::Play {
            seed,
            algorithm,
            item,
            items,
            loop_playback,
        } => commands::play::run(&seed, algorithm, item, items, loop_playback).await,
        Commands::Steps {
            seed,
            slots,
            items,
            nested,
            loop_playback,
            step_ms,
        } => commands::steps::run(&seed, &slots, items, nested, loop_playback, step_ms).await,
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::from(1)
        }
    }
}
