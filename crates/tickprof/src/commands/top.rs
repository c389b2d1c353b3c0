use crate::error::{Error, Result};
use crate::storage::SqliteSink;
use serde::Serialize;
use std::path::Path;
use tickprof_trace::History;
use tickprof_trace::analysis::{SummaryItem, decompress_dump, summarize, summarize_all};

/// Which stored ticks to summarize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The stored tick with the highest number.
    Latest,
    Tick(u64),
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

/// Per-key totals for the selected ticks, plus the label used in headers.
pub fn select(history: &History, selection: Selection) -> Result<(String, Vec<SummaryItem>)> {
    match selection {
        Selection::All => {
            let roots = history.decompress()?;
            let label = format!("{} ticks", roots.len());
            Ok((label, summarize_all(&roots)))
        }
        Selection::Latest => {
            let (_, dump) = history.latest()?.ok_or(Error::EmptyHistory)?;
            let root = decompress_dump(&history.key_map, dump)?;
            Ok((root.key.to_string(), summarize(&root)))
        }
        Selection::Tick(tick) => {
            let dump = history.tick(tick)?.ok_or(Error::TickNotFound { tick })?;
            let root = decompress_dump(&history.key_map, dump)?;
            Ok((root.key.to_string(), summarize(&root)))
        }
    }
}

/// Drop entries below `threshold` percent, then keep the first `top`.
pub fn filter(items: Vec<SummaryItem>, top: usize, threshold: f64) -> Vec<SummaryItem> {
    items
        .into_iter()
        .filter(|item| item.percent >= threshold)
        .take(top)
        .collect()
}

pub fn run(
    file: &Path,
    key: &str,
    selection: Selection,
    top: usize,
    threshold: f64,
    format: OutputFormat,
) -> Result<()> {
    let store = SqliteSink::open(file)?;
    let history = store.load_history(key)?;
    let (label, items) = select(&history, selection)?;
    let items = filter(items, top, threshold);

    match format {
        OutputFormat::Json => print_json(file, &label, &items)?,
        OutputFormat::Csv => print_csv(&items),
        OutputFormat::Table => print_table(file, &label, &items),
    }

    Ok(())
}

fn print_table(file: &Path, label: &str, items: &[SummaryItem]) {
    println!("# {} | {}", file.display(), label);
    println!();
    println!(
        "{:>8}  {:>10}  {:>7}  FUNCTION",
        "TOTAL%", "CPU (ms)", "CALLS"
    );
    println!("{}", "-".repeat(60));

    for item in items {
        println!(
            "{:>7.2}%  {:>10.3}  {:>7}  {}",
            item.percent, item.total, item.count, item.key
        );
    }
}

#[derive(Serialize)]
struct TopReport<'a> {
    file: String,
    selection: &'a str,
    entries: &'a [SummaryItem],
}

fn print_json(file: &Path, label: &str, items: &[SummaryItem]) -> Result<()> {
    let report = TopReport {
        file: file.display().to_string(),
        selection: label,
        entries: items,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn print_csv(items: &[SummaryItem]) {
    println!("percent,total_ms,calls,function");
    for item in items {
        println!(
            "{:.4},{:.4},{},\"{}\"",
            item.percent,
            item.total,
            item.count,
            item.key.replace('"', "\"\"")
        );
    }
}
