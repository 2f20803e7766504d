//! Fixed-interval run loop.
//!
//! Takes `floor(duration / interval)` snapshots, waiting `interval` between
//! them in short slices so a cancel request is honoured within ~10ms.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::{MonitorError, Result};
use crate::history::History;
use crate::sampler::{Diagnostic, Sampler};
use crate::snapshot::Snapshot;

const WAIT_SLICE: Duration = Duration::from_millis(10);

/// Run parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub duration: Duration,
    pub interval: Duration,
    /// Where charts, reports and `history.json` are written.
    pub output_dir: PathBuf,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(300),
            interval: Duration::from_secs(5),
            output_dir: PathBuf::from("output"),
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.duration.is_zero() {
            return Err(MonitorError::InvalidConfig(
                "duration must be greater than zero".into(),
            ));
        }
        if self.interval.is_zero() {
            return Err(MonitorError::InvalidConfig(
                "interval must be greater than zero".into(),
            ));
        }
        if self.interval > self.duration {
            return Err(MonitorError::InvalidConfig(format!(
                "interval ({}ms) must not exceed duration ({}ms)",
                self.interval.as_millis(),
                self.duration.as_millis()
            )));
        }
        Ok(())
    }

    /// `floor(duration / interval)`; 0 when the interval is zero.
    pub fn planned_ticks(&self) -> usize {
        let interval = self.interval.as_nanos();
        if interval == 0 {
            return 0;
        }
        (self.duration.as_nanos() / interval) as usize
    }
}

/// Shared stop flag, set from a signal handler and polled by the run loop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Completed,
    Cancelled,
    /// A tick failed after at least one snapshot had been taken.
    TickFailed { tick: usize, reason: String },
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::TickFailed { tick, reason } => write!(f, "tick {tick} failed: {reason}"),
        }
    }
}

/// Progress passed to the per-tick callback.
#[derive(Debug, Clone, Copy)]
pub struct TickProgress<'a> {
    /// 1-based.
    pub tick: usize,
    pub planned: usize,
    pub elapsed: Duration,
    pub snapshot: &'a Snapshot,
}

/// Everything a finished run hands to rendering and reporting.
#[derive(Debug)]
pub struct RunOutcome {
    pub history: History,
    pub stop: StopReason,
    pub diagnostics: Vec<Diagnostic>,
    pub elapsed: Duration,
}

/// Drive `sampler` for the configured number of ticks.
///
/// A tick failure ends the run early but keeps whatever was collected. Any run
/// that ends with an empty history, including one whose first tick failed, is
/// an [`MonitorError::EmptyHistory`] error.
pub fn run(
    mut sampler: Sampler,
    config: &MonitorConfig,
    cancel: &CancelToken,
    mut on_tick: impl FnMut(TickProgress<'_>),
) -> Result<RunOutcome> {
    config.validate()?;
    let planned = config.planned_ticks();
    let start = Instant::now();
    let mut stop = StopReason::Completed;

    log::info!(
        "monitoring for {}s at {}ms intervals ({planned} ticks)",
        config.duration.as_secs_f64(),
        config.interval.as_millis()
    );

    for tick in 1..=planned {
        if cancel.is_cancelled() {
            stop = StopReason::Cancelled;
            break;
        }

        match sampler.tick() {
            Ok(snapshot) => on_tick(TickProgress {
                tick,
                planned,
                elapsed: start.elapsed(),
                snapshot,
            }),
            Err(MonitorError::TickFailed { tick, reason }) => {
                if sampler.history().is_empty() {
                    log::error!("tick {tick} failed before any snapshot was taken: {reason}");
                    return Err(MonitorError::EmptyHistory);
                }
                stop = StopReason::TickFailed { tick, reason };
                break;
            }
            Err(e) => return Err(e),
        }

        if tick < planned {
            wait_interval(config.interval, cancel);
        }
    }

    let diagnostics = sampler.take_diagnostics();
    let history = sampler.into_history();
    if history.is_empty() {
        return Err(MonitorError::EmptyHistory);
    }

    log::info!("run {stop} with {} snapshots", history.len());
    Ok(RunOutcome {
        history,
        stop,
        diagnostics,
        elapsed: start.elapsed(),
    })
}

fn wait_interval(interval: Duration, cancel: &CancelToken) {
    let deadline = Instant::now() + interval;
    while !cancel.is_cancelled() {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        std::thread::sleep(WAIT_SLICE.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(duration_ms: u64, interval_ms: u64) -> MonitorConfig {
        MonitorConfig {
            duration: Duration::from_millis(duration_ms),
            interval: Duration::from_millis(interval_ms),
            output_dir: PathBuf::from("unused"),
        }
    }

    #[test]
    fn ten_seconds_at_five_is_two_ticks() {
        assert_eq!(config(10_000, 5_000).planned_ticks(), 2);
    }

    #[test]
    fn planned_ticks_floors() {
        assert_eq!(config(11_999, 4_000).planned_ticks(), 2);
        assert_eq!(config(5_000, 5_000).planned_ticks(), 1);
    }

    #[test]
    fn default_is_five_minutes_every_five_seconds() {
        let c = MonitorConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.planned_ticks(), 60);
    }

    #[test]
    fn rejects_zero_duration() {
        let err = config(0, 5_000).validate().unwrap_err();
        assert!(matches!(err, MonitorError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_zero_interval() {
        let c = config(5_000, 0);
        assert!(matches!(
            c.validate().unwrap_err(),
            MonitorError::InvalidConfig(_)
        ));
        assert_eq!(c.planned_ticks(), 0);
    }

    #[test]
    fn rejects_interval_longer_than_duration() {
        assert!(config(1_000, 2_000).validate().is_err());
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let handle = token.clone();
        assert!(!token.is_cancelled());
        handle.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn wait_returns_early_when_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        let start = Instant::now();
        wait_interval(Duration::from_secs(5), &token);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn stop_reason_display() {
        assert_eq!(StopReason::Completed.to_string(), "completed");
        let failed = StopReason::TickFailed {
            tick: 2,
            reason: "boom".into(),
        };
        assert_eq!(failed.to_string(), "tick 2 failed: boom");
    }
}
