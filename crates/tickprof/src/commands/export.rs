use crate::error::{Error, Result};
use crate::storage::SqliteSink;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tickprof_trace::History;
use tickprof_trace::analysis::fold_stacks;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Decompressed trees as pretty JSON.
    Json,
    /// The stored blob, unchanged.
    Raw,
    /// `frame;frame weight` lines, weights in microseconds of self time.
    Folded,
    /// Flame graph SVG drawn from the folded stacks.
    Flamegraph,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Export {
    format_version: u32,
    capacity: usize,
    ticks: Vec<tickprof_trace::Node>,
}

/// Decompressed history as pretty JSON, one full tree per stored tick,
/// oldest tick first.
pub fn render(history: &History) -> Result<String> {
    let export = Export {
        format_version: history.format_version,
        capacity: history.capacity(),
        ticks: history.decompress()?,
    };
    Ok(serde_json::to_string_pretty(&export)?)
}

/// Folded stacks over every stored tick, one `stack weight` line each.
pub fn folded(history: &History) -> Result<Vec<String>> {
    Ok(fold_stacks(&history.decompress()?)
        .into_iter()
        .map(|(stack, weight)| format!("{stack} {weight}"))
        .collect())
}

pub fn write_flamegraph(history: &History, title: &str, writer: impl Write) -> Result<()> {
    let lines = folded(history)?;
    if lines.is_empty() {
        return Err(Error::EmptyHistory);
    }

    let mut options = inferno::flamegraph::Options::default();
    options.title = title.to_string();
    options.count_name = "us".to_string();
    inferno::flamegraph::from_lines(&mut options, lines.iter().map(String::as_str), writer)?;
    Ok(())
}

pub fn run(file: &Path, key: &str, format: ExportFormat) -> Result<()> {
    let store = SqliteSink::open(file)?;
    if format == ExportFormat::Raw {
        let blob = store.read(key)?.ok_or_else(|| Error::HistoryNotFound {
            key: key.to_string(),
        })?;
        println!("{blob}");
        return Ok(());
    }

    let history = store.load_history(key)?;
    match format {
        ExportFormat::Json => println!("{}", render(&history)?),
        ExportFormat::Folded => {
            for line in folded(&history)? {
                println!("{line}");
            }
        }
        ExportFormat::Flamegraph => {
            let title = format!("{} [{}]", file.display(), key);
            write_flamegraph(&history, &title, std::io::stdout().lock())?;
        }
        ExportFormat::Raw => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickprof_trace::{ManualClock, Profiler, ProfilerConfig};

    /// Ticks 0..3 in a ring of two, all stamped with one wall-clock millisecond.
    fn recorded() -> History {
        let profiler = Profiler::with_config(
            ManualClock::new(),
            ProfilerConfig::default().with_max_history(2),
        )
        .unwrap();
        profiler.clock().set_wall_time_ms(100);
        for tick in 0..3u64 {
            profiler.clock().set(0.0);
            profiler.start_tick(tick);
            profiler.profile("work", || {
                profiler.clock().advance(0.25);
                profiler.profile("inner", || profiler.clock().advance(0.5));
            });
            profiler.clock().advance(0.125);
            profiler.end_tick();
        }
        profiler.history()
    }

    #[test]
    fn ticks_come_out_oldest_first() {
        let json = render(&recorded()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["formatVersion"], 1);
        assert_eq!(value["capacity"], 2);
        let keys: Vec<&str> = value["ticks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|tick| tick["key"].as_str().unwrap())
            .collect();
        assert_eq!(keys, vec!["Tick 1", "Tick 2"]);
        assert_eq!(value["ticks"][0]["children"][0]["key"], "work");
    }

    #[test]
    fn folded_lines_sum_self_time_over_ticks() {
        let lines = folded(&recorded()).unwrap();
        assert_eq!(
            lines,
            vec!["tick 250", "tick;work 500", "tick;work;inner 1000"]
        );
    }

    #[test]
    fn flamegraph_is_svg() {
        let mut svg = Vec::new();
        write_flamegraph(&recorded(), "colony", &mut svg).unwrap();
        let svg = String::from_utf8(svg).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("inner"));
    }

    #[test]
    fn flamegraph_of_nothing_is_an_error() {
        let history = Profiler::new(ManualClock::new()).history();
        let err = write_flamegraph(&history, "empty", Vec::new()).unwrap_err();
        assert!(matches!(err, Error::EmptyHistory));
    }
}
