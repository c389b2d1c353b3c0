//! Time sources for the profiler.
//!
//! The engine never resets a clock itself. A reading of `now()` is the CPU
//! time used so far in the current tick, in milliseconds, and it is the
//! host's job to start each tick near zero.

use std::cell::Cell;

/// CPU-time source consumed by the engine.
pub trait Clock {
    /// Milliseconds of CPU used in the current tick. Must not decrease
    /// within a tick.
    fn now(&self) -> f64;

    /// Wall-clock time in epoch milliseconds, stamped on each finished dump.
    fn wall_time_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

impl<F> Clock for F
where
    F: Fn() -> f64,
{
    #[inline]
    fn now(&self) -> f64 {
        self()
    }
}

/// A clock driven entirely by the host.
///
/// Useful when the host already exposes a "CPU used this tick" counter, and
/// in tests where time has to be exact.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
    wall_ms: Cell<i64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set_wall_time_ms(&self, ms: i64) {
        self.wall_ms.set(ms);
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> f64 {
        self.now.get()
    }

    fn wall_time_ms(&self) -> i64 {
        self.wall_ms.get()
    }
}

/// Thread CPU time via `clock_gettime(CLOCK_THREAD_CPUTIME_ID)`.
///
/// Only time the calling thread spends on a core is counted; sleeps and I/O
/// waits read as zero. Readings are relative to the last `reset()`.
#[cfg(all(feature = "cpu-clock", unix))]
#[derive(Debug)]
pub struct CpuClock {
    baseline_ns: Cell<u64>,
}

#[cfg(all(feature = "cpu-clock", unix))]
impl CpuClock {
    pub fn new() -> Self {
        Self {
            baseline_ns: Cell::new(thread_cpu_ns()),
        }
    }

    /// Move the baseline to "now". Call at the start of every tick.
    pub fn reset(&self) {
        self.baseline_ns.set(thread_cpu_ns());
    }
}

#[cfg(all(feature = "cpu-clock", unix))]
impl Default for CpuClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(feature = "cpu-clock", unix))]
impl Clock for CpuClock {
    #[inline]
    fn now(&self) -> f64 {
        let elapsed = thread_cpu_ns().saturating_sub(self.baseline_ns.get());
        elapsed as f64 / 1_000_000.0
    }
}

#[cfg(all(feature = "cpu-clock", unix))]
fn thread_cpu_ns() -> u64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `ts` is a valid, writable timespec for the duration of the call.
    let ret = unsafe { libc::clock_gettime(libc::CLOCK_THREAD_CPUTIME_ID, &mut ts) };
    if ret != 0 {
        return 0;
    }
    ts.tv_sec as u64 * 1_000_000_000 + ts.tv_nsec as u64
}
