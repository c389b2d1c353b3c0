use crate::error::Result;
use crate::storage::SqliteSink;
use comfy_table::{Cell, CellAlignment, Table, presets};
use std::path::Path;
use tickprof_trace::{CpuStats, History, average_cpu};

/// One populated slot of a stored history.
#[derive(Debug, Clone, PartialEq)]
pub struct TickRow {
    pub slot: usize,
    pub tick: u64,
    pub captured_at: i64,
    pub cpu: f64,
    pub intents: u32,
    pub marks: usize,
    /// Number of top-level calls made during the tick.
    pub calls: usize,
}

/// Rows for every populated slot, oldest tick first.
pub fn tick_rows(history: &History) -> Result<Vec<TickRow>> {
    Ok(history
        .ticks()?
        .into_iter()
        .map(|(tick, dump)| TickRow {
            slot: history.slot_index(tick).unwrap_or_default(),
            tick,
            captured_at: dump.captured_at,
            cpu: dump.cpu(),
            intents: dump.root.intents(),
            marks: dump.marks.len(),
            calls: dump.root.children().len(),
        })
        .collect())
}

pub fn run(file: &Path, key: &str) -> Result<()> {
    let store = SqliteSink::open(file)?;
    let history = store.load_history(key)?;
    let rows = tick_rows(&history)?;

    println!("# {} [{}]", file.display(), key);
    if let Some(entry) = store.entries()?.into_iter().find(|e| e.key == key) {
        println!(
            "# {} bytes | last written {} | store created {}",
            entry.bytes,
            entry.updated_at,
            store.created_at()?.unwrap_or_else(|| "unknown".to_string())
        );
    }
    match CpuStats::collect(history.dumps()) {
        Some(stats) => println!(
            "# {}/{} slots | avg {:.3}ms | min {:.3}ms | max {:.3}ms | {} keys",
            stats.ticks,
            history.capacity(),
            average_cpu(history.dumps()),
            stats.min,
            stats.max,
            history.key_map.len()
        ),
        None => {
            println!("# 0/{} slots populated", history.capacity());
            return Ok(());
        }
    }
    println!();

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_header(vec![
        "SLOT", "TICK", "CAPTURED", "CPU (ms)", "INTENTS", "MARKS", "CALLS",
    ]);
    for row in rows {
        table.add_row(vec![
            Cell::new(row.slot).set_alignment(CellAlignment::Right),
            Cell::new(row.tick).set_alignment(CellAlignment::Right),
            Cell::new(format_captured_at(row.captured_at)),
            Cell::new(format!("{:.3}", row.cpu)).set_alignment(CellAlignment::Right),
            Cell::new(row.intents).set_alignment(CellAlignment::Right),
            Cell::new(row.marks).set_alignment(CellAlignment::Right),
            Cell::new(row.calls).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{table}");

    Ok(())
}

fn format_captured_at(ms: i64) -> String {
    match chrono::DateTime::from_timestamp_millis(ms) {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        None => ms.to_string(),
    }
}
