use std::time::Duration;

use tickprof::Error;
use tickprof::commands::record::run_ticks;
use tickprof::commands::ticks::tick_rows;
use tickprof::commands::top::{Selection, select};
use tickprof::storage::SqliteSink;
use tickprof::workload::Colony;
use tickprof_trace::{FORMAT_VERSION, ManualClock, Profiler, ProfilerConfig};

#[test]
fn recorded_history_survives_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("colony.db");

    let profiler = Profiler::with_config(
        ManualClock::new(),
        ProfilerConfig::default()
            .with_max_history(4)
            .with_auto_save_key("colony"),
    )
    .unwrap();
    profiler.set_sink(SqliteSink::open(&db).unwrap());

    let mut colony = Colony::new(2, 1);
    let mut wall = 0;
    run_ticks(&profiler, &mut colony, 10, Duration::ZERO, || {
        wall += 1;
        profiler.clock().set(0.0);
        profiler.clock().set_wall_time_ms(wall);
    });
    let live = profiler.history();
    drop(profiler);

    let store = SqliteSink::open(&db).unwrap();
    let stored = store.load_history("colony").unwrap();
    assert_eq!(stored, live);
    assert_eq!(stored.format_version, FORMAT_VERSION);
    assert_eq!(stored.capacity(), 4);

    let rows = tick_rows(&stored).unwrap();
    let ticks: Vec<u64> = rows.iter().map(|row| row.tick).collect();
    assert_eq!(ticks, vec![7, 8, 9, 10]);

    // Tick 10 is a cleanup tick.
    assert_eq!(rows[3].marks, 1);
    let (label, items) = select(&stored, Selection::Latest).unwrap();
    assert_eq!(label, "Tick 10");
    assert!(items.iter().any(|item| item.key == "Memory:cleanup"));

    let err = select(&stored, Selection::Tick(3)).unwrap_err();
    assert!(matches!(err, Error::TickNotFound { tick: 3 }));
}

#[test]
fn missing_key_maps_to_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteSink::open(&dir.path().join("empty.db")).unwrap();
    let err = store.load_history("nothing").unwrap_err();
    assert_eq!(err.exit_code(), tickprof::error::exit_code::HISTORY_NOT_FOUND);
}

#[test]
fn incompatible_blob_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteSink::open(&dir.path().join("old.db")).unwrap();
    store
        .put("colony", r#"{"formatVersion":99,"keyMap":{},"slots":[]}"#)
        .unwrap();
    let err = store.load_history("colony").unwrap_err();
    assert_eq!(
        err.exit_code(),
        tickprof::error::exit_code::INCOMPATIBLE_FORMAT
    );
}
