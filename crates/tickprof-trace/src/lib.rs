//! Call-tree profiler for hosts that run in fixed CPU-budget ticks.
//!
//! Each tick is an independent recording session. Instrumented code opens
//! and closes spans on a [`Profiler`]; when the tick ends the finished call
//! tree is compressed against an interned key table and stored in a
//! fixed-size history ring, which can be serialized into a compact blob for
//! a small key/value store.
//!
//! # Usage
//!
//! ```rust
//! use tickprof_trace::{ManualClock, Profiler};
//!
//! let profiler = Profiler::new(ManualClock::new());
//!
//! profiler.start_tick(5);
//! profiler.profile("Room:run", || {
//!     profiler.clock().advance(1.0);
//!     profiler.add_intent();
//! });
//! profiler.end_tick();
//!
//! let dump = profiler.current_tick_dump().unwrap();
//! assert_eq!(dump.root.children()[0].cpu(), 1.0);
//! ```
//!
//! Call sites that cannot use closures pair [`Profiler::begin`] with
//! [`Profiler::end`], or hold the guard returned by [`Profiler::enter`].

mod aggregate;
pub mod analysis;
pub mod clock;
mod compress;
mod config;
mod error;
mod history;
mod intern;
mod node;
mod profiler;
mod session;
mod sink;
mod stack;

pub use aggregate::{CpuStats, average_cpu};
#[cfg(all(feature = "cpu-clock", unix))]
pub use clock::CpuClock;
pub use clock::{Clock, ManualClock};
pub use compress::{
    CompressedDump, CompressedNode, PRECISION_DIGITS, compress, compress_dump, round_precision,
};
pub use config::ProfilerConfig;
pub use error::{Error, Result};
pub use history::{DEFAULT_CAPACITY, FORMAT_VERSION, History, HistoryRing};
pub use intern::KeyMap;
pub use node::{Mark, Node, SpanKey, parse_tick_key};
pub use profiler::{Profiler, SpanGuard};
pub use sink::{MemorySink, PersistenceSink};
