//! Statistics over the stored history.

use crate::compress::CompressedDump;

/// Mean root cpu over `dumps`.
///
/// With no dumps this is `0.0 / 0.0`, i.e. NaN. Callers decide how to show
/// an empty history; the value is not masked here.
pub fn average_cpu<'a>(dumps: impl IntoIterator<Item = &'a CompressedDump>) -> f64 {
    let (count, total) = dumps
        .into_iter()
        .fold((0u32, 0.0f64), |(count, total), dump| {
            (count + 1, total + dump.cpu())
        });
    total / f64::from(count)
}

/// Summary of per-tick cpu over a set of dumps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuStats {
    pub ticks: usize,
    pub total: f64,
    pub min: f64,
    pub max: f64,
}

impl CpuStats {
    pub fn collect<'a>(dumps: impl IntoIterator<Item = &'a CompressedDump>) -> Option<Self> {
        let mut stats: Option<CpuStats> = None;
        for dump in dumps {
            let cpu = dump.cpu();
            stats = Some(match stats {
                None => CpuStats {
                    ticks: 1,
                    total: cpu,
                    min: cpu,
                    max: cpu,
                },
                Some(s) => CpuStats {
                    ticks: s.ticks + 1,
                    total: s.total + cpu,
                    min: s.min.min(cpu),
                    max: s.max.max(cpu),
                },
            });
        }
        stats
    }

    pub fn mean(&self) -> f64 {
        self.total / self.ticks as f64
    }
}
