use crate::error::Result;
use crate::storage::SqliteSink;
use crate::workload::Colony;
use std::path::Path;
use std::time::Duration;
use tickprof_trace::{Clock, CpuClock, CpuStats, Profiler, ProfilerConfig};

/// Work units per creep action in the synthetic colony.
const WORK_PER_ACTION: u32 = 2_000;

#[derive(Debug, Clone)]
pub struct RecordOptions {
    pub ticks: u64,
    pub history: usize,
    pub key: String,
    pub rooms: usize,
    pub interval: Duration,
}

/// Drive `ticks` colony ticks through `profiler`, numbered from 1.
///
/// `on_tick_start` runs before each tick opens, which is where a CPU clock
/// gets rebased.
pub fn run_ticks<C: Clock>(
    profiler: &Profiler<C>,
    colony: &mut Colony,
    ticks: u64,
    interval: Duration,
    mut on_tick_start: impl FnMut(),
) {
    for tick in 1..=ticks {
        on_tick_start();
        profiler.start_tick(tick);
        colony.run_tick(profiler, tick);
        if profiler.end_tick().is_none() {
            tracing::warn!(tick, "tick produced no dump");
        }

        if !interval.is_zero() && tick < ticks {
            std::thread::sleep(interval);
        }
    }
}

pub fn run(db: &Path, options: &RecordOptions) -> Result<()> {
    let config = ProfilerConfig::default()
        .with_max_history(options.history)
        .with_auto_save_key(options.key.clone());
    let profiler = Profiler::with_config(CpuClock::new(), config)?;
    profiler.set_sink(SqliteSink::open(db)?);

    eprintln!(
        "Recording {} ticks ({} rooms) into {}",
        options.ticks,
        options.rooms,
        db.display()
    );

    let mut colony = Colony::new(options.rooms, WORK_PER_ACTION);
    run_ticks(
        &profiler,
        &mut colony,
        options.ticks,
        options.interval,
        || profiler.clock().reset(),
    );

    // Auto-save only logs failures; surface them here.
    profiler.save(&options.key)?;
    profiler.log_info();

    let history = profiler.history();
    match CpuStats::collect(history.dumps()) {
        Some(stats) => eprintln!(
            "Stored {} of {} ticks under '{}': avg {:.3}ms, min {:.3}ms, max {:.3}ms",
            stats.ticks,
            options.ticks,
            options.key,
            stats.mean(),
            stats.min,
            stats.max
        ),
        None => eprintln!("No ticks stored under '{}'", options.key),
    }

    Ok(())
}
