use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use tickprof::cli::{Cli, Command};
use tickprof::error::exit_code;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(exit_code::SUCCESS as u8),
        Err(e) => {
            eprintln!("Error: {e:#}");
            if let Some(tickprof_err) = e.downcast_ref::<tickprof::Error>() {
                ExitCode::from(tickprof_err.exit_code() as u8)
            } else {
                ExitCode::from(exit_code::GENERAL_ERROR as u8)
            }
        }
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Validate CLI arguments
    cli.validate()
        .map_err(|e| anyhow::anyhow!("{}", e))
        .context("Invalid arguments")?;

    match cli.command {
        Command::Record {
            db,
            ticks,
            history,
            key,
            rooms,
            interval,
        } => {
            let options = tickprof::commands::record::RecordOptions {
                ticks,
                history,
                key,
                rooms,
                interval,
            };
            tickprof::commands::record::run(&db, &options)?;
        }
        Command::Ticks { file, key } => {
            tickprof::commands::ticks::run(&file, &key)?;
        }
        Command::Top {
            file,
            key,
            tick,
            all,
            top,
            threshold,
            json,
            csv,
        } => {
            let selection = match (tick, all) {
                (_, true) => tickprof::commands::top::Selection::All,
                (Some(tick), false) => tickprof::commands::top::Selection::Tick(tick),
                (None, false) => tickprof::commands::top::Selection::Latest,
            };
            let format = if json {
                tickprof::commands::top::OutputFormat::Json
            } else if csv {
                tickprof::commands::top::OutputFormat::Csv
            } else {
                tickprof::commands::top::OutputFormat::Table
            };
            tickprof::commands::top::run(&file, &key, selection, top, threshold, format)?;
        }
        Command::Export {
            file,
            key,
            raw,
            folded,
            flamegraph,
        } => {
            let format = if raw {
                tickprof::commands::export::ExportFormat::Raw
            } else if folded {
                tickprof::commands::export::ExportFormat::Folded
            } else if flamegraph {
                tickprof::commands::export::ExportFormat::Flamegraph
            } else {
                tickprof::commands::export::ExportFormat::Json
            };
            tickprof::commands::export::run(&file, &key, format)?;
        }
        Command::Completions { shell } => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "tickprof", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Log to stderr. RUST_LOG wins over `-v`.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
