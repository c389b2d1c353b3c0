//! The engine object instrumented code talks to.
//!
//! A `Profiler` is created once by the host and shared by reference with
//! every instrumented call site. It is single-threaded by construction
//! (`RefCell` inside, so it is `!Sync`) and takes no locks. Outside an open
//! tick every instrumentation call is a silent no-op, so the same code runs
//! whether or not a tick is being recorded.

use crate::aggregate::average_cpu;
use crate::clock::Clock;
use crate::compress::{CompressedDump, compress_dump};
use crate::config::ProfilerConfig;
use crate::error::Result;
use crate::history::{History, HistoryRing};
use crate::intern::KeyMap;
use crate::node::{Node, SpanKey};
use crate::session::{Outcome, TickSession};
use crate::sink::PersistenceSink;
use std::cell::RefCell;

struct State {
    config: ProfilerConfig,
    session: Option<TickSession>,
    /// Bumped on every `start_tick`; lets span guards detect a reset session.
    generation: u64,
    last_tick: Option<u64>,
    keys: KeyMap,
    history: HistoryRing,
}

pub struct Profiler<C: Clock> {
    clock: C,
    state: RefCell<State>,
    sink: RefCell<Option<Box<dyn PersistenceSink>>>,
}

impl<C: Clock> Profiler<C> {
    pub fn new(clock: C) -> Self {
        let config = ProfilerConfig::default();
        Profiler {
            clock,
            state: RefCell::new(State {
                history: HistoryRing::new(config.max_history),
                config,
                session: None,
                generation: 0,
                last_tick: None,
                keys: KeyMap::new(),
            }),
            sink: RefCell::new(None),
        }
    }

    pub fn with_config(clock: C, config: ProfilerConfig) -> Result<Self> {
        let profiler = Self::new(clock);
        profiler.init(config)?;
        Ok(profiler)
    }

    /// Apply `config`. The history ring is rebuilt, so every stored tick is
    /// dropped; interned keys are kept.
    pub fn init(&self, config: ProfilerConfig) -> Result<()> {
        config.validate()?;
        let mut state = self.state.borrow_mut();
        if let Some(session) = state.session.take() {
            tracing::warn!(tick = session.tick(), "init called mid-tick, session dropped");
        }
        state.history = HistoryRing::new(config.max_history);
        state.last_tick = None;
        state.config = config;
        Ok(())
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn set_sink(&self, sink: impl PersistenceSink + 'static) {
        *self.sink.borrow_mut() = Some(Box::new(sink));
    }

    pub fn is_enabled(&self) -> bool {
        self.state.borrow().config.enabled
    }

    pub fn is_recording(&self) -> bool {
        self.state.borrow().session.is_some()
    }

    /// Number of spans currently open, zero when idle.
    pub fn stack_depth(&self) -> usize {
        self.state
            .borrow()
            .session
            .as_ref()
            .map_or(0, TickSession::depth)
    }

    /// Open a recording session for `tick`.
    ///
    /// An already open session is thrown away rather than treated as an
    /// error, so one missed `end_tick` cannot wedge the profiler.
    pub fn start_tick(&self, tick: u64) {
        let mut state = self.state.borrow_mut();
        if !state.config.enabled {
            return;
        }
        if let Some(abandoned) = state.session.take() {
            tracing::warn!(
                abandoned = abandoned.tick(),
                tick,
                "start_tick while recording, previous session reset"
            );
        }
        state.session = Some(TickSession::new(tick));
        state.generation += 1;
        state.last_tick = Some(tick);
        tracing::debug!(tick, "tick started");
    }

    /// Close the session, compress its tree and store it in the history.
    ///
    /// Returns the finished tree, or `None` when idle or when the tick hit a
    /// stack-discipline error (its slot is cleared instead).
    pub fn end_tick(&self) -> Option<Node> {
        let now = self.clock.now();
        let (root, save_key) = {
            let mut state = self.state.borrow_mut();
            if !state.config.enabled {
                return None;
            }
            let Some(session) = state.session.take() else {
                tracing::warn!("end_tick called with no open tick");
                return None;
            };
            let tick = session.tick();
            match session.finish(now) {
                Outcome::Finished(root) => {
                    let captured_at = self.clock.wall_time_ms();
                    let dump = compress_dump(&root, &mut state.keys, captured_at);
                    state.history.put(tick, dump);
                    tracing::debug!(tick, cpu = root.cpu, "tick recorded");
                    (root, state.config.auto_save_key.clone())
                }
                Outcome::Discarded => {
                    state.history.clear_slot(tick);
                    tracing::warn!(tick, "tick discarded after unbalanced spans");
                    return None;
                }
            }
        };

        if let Some(key) = save_key
            && let Err(e) = self.save(&key)
        {
            tracing::warn!(key = %key, error = %e, "auto-save failed");
        }
        Some(root)
    }

    fn begin_span(&self, key: SpanKey) -> Option<u64> {
        let now = self.clock.now();
        let mut state = self.state.borrow_mut();
        let generation = state.generation;
        let session = state.session.as_mut()?;
        session.begin(key, now);
        Some(generation)
    }

    /// Open a span. No-op outside a tick.
    pub fn begin(&self, key: impl Into<SpanKey>) {
        self.begin_span(key.into());
    }

    /// Close the innermost span, which must be named `key`.
    ///
    /// A failure leaves the stack untouched and marks the tick as faulted: it
    /// keeps recording but will not be stored. No-op outside a tick.
    pub fn end(&self, key: &str) -> Result<()> {
        let now = self.clock.now();
        let mut state = self.state.borrow_mut();
        let Some(session) = state.session.as_mut() else {
            return Ok(());
        };
        let tick = session.tick();
        session.end(key, now).inspect_err(|e| {
            tracing::warn!(tick, error = %e, "unbalanced span");
        })
    }

    /// Open a span that is closed when the returned guard drops, on every
    /// exit path including unwinding.
    pub fn enter(&self, key: impl Into<SpanKey>) -> SpanGuard<'_, C> {
        let key = key.into();
        let generation = self.begin_span(key.clone());
        SpanGuard {
            profiler: self,
            key,
            generation,
        }
    }

    /// Run `f` inside a span named `key`.
    pub fn profile<R>(&self, key: impl Into<SpanKey>, f: impl FnOnce() -> R) -> R {
        let _guard = self.enter(key);
        f()
    }

    /// Count one intent against the innermost open span. Dropped when no
    /// span is open.
    pub fn add_intent(&self) {
        let mut state = self.state.borrow_mut();
        if let Some(session) = state.session.as_mut() {
            session.add_intent();
        }
    }

    /// Record a point event for the current tick. `short_name` defaults to
    /// `full_name`.
    pub fn add_mark(&self, full_name: &str, short_name: Option<&str>) {
        let now = self.clock.now();
        let mut state = self.state.borrow_mut();
        if let Some(session) = state.session.as_mut() {
            session.add_mark(
                full_name.to_owned(),
                short_name.unwrap_or(full_name).to_owned(),
                now,
            );
        }
    }

    /// Dump stored for the most recently started tick.
    pub fn current_tick_dump(&self) -> Option<CompressedDump> {
        let state = self.state.borrow();
        if !state.config.enabled {
            return None;
        }
        state.history.get(state.last_tick?).cloned()
    }

    /// Dump stored for the tick before the most recently started one.
    pub fn previous_tick_dump(&self) -> Option<CompressedDump> {
        let state = self.state.borrow();
        if !state.config.enabled {
            return None;
        }
        let previous = state.last_tick?.checked_sub(1)?;
        state.history.get(previous).cloned()
    }

    pub fn previous_tick_cpu(&self) -> Option<f64> {
        self.previous_tick_dump().map(|dump| dump.cpu())
    }

    /// Mean cpu per stored tick. NaN when nothing is stored, `0.0` when the
    /// profiler is disabled.
    pub fn average_cpu_used(&self) -> f64 {
        let state = self.state.borrow();
        if !state.config.enabled {
            return 0.0;
        }
        average_cpu(state.history.iter())
    }

    /// Snapshot of the serializable history.
    pub fn history(&self) -> History {
        let state = self.state.borrow();
        History::new(state.keys.clone(), &state.history)
    }

    /// Serialize the history and write it to the sink under `key`.
    pub fn save(&self, key: &str) -> Result<()> {
        let json = self.history().to_json()?;
        match self.sink.borrow_mut().as_mut() {
            Some(sink) => sink.write(key, &json),
            None => {
                tracing::debug!(key, "no sink configured, history not saved");
                Ok(())
            }
        }
    }

    /// Log the current tick's cpu usage.
    pub fn log_info(&self) {
        match self.current_tick_dump() {
            Some(dump) => tracing::info!(cpu = dump.cpu(), "current tick cpu usage"),
            None => tracing::info!("no current tick"),
        }
    }
}

/// Closes its span when dropped.
#[must_use = "dropping the guard immediately closes the span; bind it with `let _guard = ...`"]
pub struct SpanGuard<'a, C: Clock> {
    profiler: &'a Profiler<C>,
    key: SpanKey,
    /// Session the span was opened in, `None` if it was opened while idle.
    generation: Option<u64>,
}

impl<C: Clock> Drop for SpanGuard<'_, C> {
    fn drop(&mut self) {
        let Some(generation) = self.generation else {
            return;
        };
        let same_session = {
            let state = self.profiler.state.borrow();
            state.session.is_some() && state.generation == generation
        };
        if same_session {
            // Errors are logged by `end`; a guard has nowhere to return them.
            let _ = self.profiler.end(&self.key);
        }
    }
}
