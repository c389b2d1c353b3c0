use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Key the profiler history is stored under unless told otherwise.
pub const DEFAULT_KEY: &str = "tickprof";

#[derive(Parser, Debug)]
#[command(name = "tickprof")]
#[command(about = "Record and inspect per-tick call-tree profiles")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a synthetic tick loop through the profiler and store its history
    Record {
        /// Store database path
        #[arg(long)]
        db: PathBuf,

        /// Number of ticks to run
        #[arg(long, short = 'n', default_value = "100")]
        ticks: u64,

        /// Number of ticks kept in the history ring
        #[arg(long, default_value = "30")]
        history: usize,

        /// Storage key for the serialized history
        #[arg(long, short = 'k', default_value = DEFAULT_KEY)]
        key: String,

        /// Number of simulated rooms
        #[arg(long, default_value = "3")]
        rooms: usize,

        /// Pause between ticks
        #[arg(long, short = 'i', default_value = "0s", value_parser = parse_duration)]
        interval: Duration,
    },

    /// List the ticks held in a stored history
    Ticks {
        /// Store database path
        file: PathBuf,

        /// Storage key for the serialized history
        #[arg(long, short = 'k', default_value = DEFAULT_KEY)]
        key: String,
    },

    /// Show where CPU went, per call-site key
    Top {
        /// Store database path
        file: PathBuf,

        /// Storage key for the serialized history
        #[arg(long, short = 'k', default_value = DEFAULT_KEY)]
        key: String,

        /// Tick to summarize (defaults to the most recently captured)
        #[arg(long, conflicts_with = "all")]
        tick: Option<u64>,

        /// Sum over every stored tick
        #[arg(long)]
        all: bool,

        /// Number of entries to display
        #[arg(long, short = 'n', default_value = "20")]
        top: usize,

        /// Minimum percentage to display
        #[arg(long, short = 't', default_value = "0")]
        threshold: f64,

        /// Output as JSON
        #[arg(long, conflicts_with = "csv")]
        json: bool,

        /// Output as CSV
        #[arg(long)]
        csv: bool,
    },

    /// Print the stored history as JSON, folded stacks or a flame graph
    Export {
        /// Store database path
        file: PathBuf,

        /// Storage key for the serialized history
        #[arg(long, short = 'k', default_value = DEFAULT_KEY)]
        key: String,

        /// Emit the compact stored blob instead of full trees
        #[arg(long, conflicts_with_all = ["folded", "flamegraph"])]
        raw: bool,

        /// Emit folded stacks (self time in microseconds) for flame graph tools
        #[arg(long, conflicts_with = "flamegraph")]
        folded: bool,

        /// Emit a flame graph SVG
        #[arg(long)]
        flamegraph: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    // Try humantime first
    if let Ok(d) = humantime::parse_duration(s) {
        return Ok(d);
    }

    // Try bare number as milliseconds
    if let Ok(ms) = s.parse::<u64>() {
        return Ok(Duration::from_millis(ms));
    }

    Err(format!(
        "Invalid duration '{}'. Examples: 50ms, 1s, 250, 0s",
        s
    ))
}

impl Cli {
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            Command::Record {
                ticks,
                history,
                key,
                rooms,
                ..
            } => {
                if *ticks == 0 {
                    return Err("--ticks must be at least 1".to_string());
                }
                if *history == 0 || *history > 10_000 {
                    return Err(format!(
                        "History size must be between 1 and 10000 ticks, got {}",
                        history
                    ));
                }
                if *rooms == 0 {
                    return Err("--rooms must be at least 1".to_string());
                }
                validate_key(key)
            }
            Command::Ticks { key, .. } | Command::Export { key, .. } => validate_key(key),
            Command::Top {
                key, threshold, ..
            } => {
                if !(0.0..=100.0).contains(threshold) {
                    return Err(format!(
                        "Threshold must be a percentage between 0 and 100, got {}",
                        threshold
                    ));
                }
                validate_key(key)
            }
            Command::Completions { .. } => Ok(()),
        }
    }
}

fn validate_key(key: &str) -> Result<(), String> {
    if key.is_empty() {
        return Err("Storage key must not be empty".to_string());
    }
    Ok(())
}
