//! One composite snapshot per tick.
//!
//! The sampler owns the sources, the clock and the history. A failing source
//! degrades its own resource to a zeroed record and leaves a [`Diagnostic`];
//! a panic escaping a source fails the whole tick without touching history.

use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::Serialize;

use crate::clock::MonotonicClock;
use crate::error::{MonitorError, Result};
use crate::history::History;
use crate::snapshot::{ResourceKind, Snapshot};
use crate::sources::{MetricSource, SourceSet};

/// A source that degraded during a tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// 1-based tick number.
    pub tick: usize,
    pub kind: ResourceKind,
    pub message: String,
}

pub struct Sampler {
    sources: SourceSet,
    clock: MonotonicClock,
    history: History,
    diagnostics: Vec<Diagnostic>,
    ticks: usize,
}

impl Sampler {
    pub fn new(sources: SourceSet) -> Self {
        Self {
            sources,
            clock: MonotonicClock::new(),
            history: History::new(),
            diagnostics: Vec::new(),
            ticks: 0,
        }
    }

    /// Sampler over the real host.
    pub fn system() -> Self {
        Self::new(SourceSet::system())
    }

    /// Take one snapshot and append it to the history.
    pub fn tick(&mut self) -> Result<&Snapshot> {
        self.ticks += 1;
        let tick = self.ticks;
        let timestamp = self.clock.now();
        let sources = &mut self.sources;

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let mut notes = Vec::new();
            let mut snapshot = Snapshot::empty(timestamp);
            snapshot.cpu = sample_or_default(sources.cpu.as_mut(), tick, &mut notes);
            snapshot.memory = sample_or_default(sources.memory.as_mut(), tick, &mut notes);
            snapshot.disk = sample_or_default(sources.disk.as_mut(), tick, &mut notes);
            snapshot.network = sample_or_default(sources.network.as_mut(), tick, &mut notes);
            snapshot.gpu = sample_or_default(sources.gpu.as_mut(), tick, &mut notes);
            snapshot.degraded = notes.iter().map(|d| d.kind).collect();
            (snapshot, notes)
        }));

        match outcome {
            Ok((snapshot, notes)) => {
                log::debug!(
                    "tick {tick} at {} ({} degraded)",
                    snapshot.timestamp,
                    notes.len()
                );
                self.diagnostics.extend(notes);
                Ok(self.history.append(snapshot))
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                log::warn!("tick {tick} failed: {reason}");
                Err(MonitorError::TickFailed { tick, reason })
            }
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn into_history(self) -> History {
        self.history
    }

    /// Everything that degraded so far, in tick order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Number of ticks attempted, failed ones included.
    pub fn ticks_attempted(&self) -> usize {
        self.ticks
    }
}

fn sample_or_default<R: Default>(
    source: &mut dyn MetricSource<Record = R>,
    tick: usize,
    notes: &mut Vec<Diagnostic>,
) -> R {
    match source.sample() {
        Ok(record) => record,
        Err(e) => {
            let kind = source.kind();
            log::warn!("{kind} source degraded on tick {tick}: {e}");
            notes.push(Diagnostic {
                tick,
                kind,
                message: e.to_string(),
            });
            R::default()
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "source panicked".to_string()
    }
}
