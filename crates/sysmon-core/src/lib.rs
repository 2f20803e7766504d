//! # sysmon-core
//!
//! **Fixed-interval host resource sampling.**
//!
//! `sysmon-core` polls CPU, memory, disk, network and GPU state at a fixed
//! interval for a fixed duration, keeps every sample in an ordered history,
//! and turns that history into chart series and a summary report.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use sysmon_core::{CancelToken, MonitorConfig, Sampler, monitor};
//!
//! let config = MonitorConfig {
//!     duration: Duration::from_secs(10),
//!     interval: Duration::from_secs(5),
//!     ..MonitorConfig::default()
//! };
//! let outcome = monitor::run(Sampler::system(), &config, &CancelToken::new(), |p| {
//!     println!("tick {}/{}: cpu {:.1}%", p.tick, p.planned, p.snapshot.cpu.percent);
//! })
//! .unwrap();
//! assert_eq!(outcome.history.len(), 2);
//! ```
//!
//! ## Architecture
//!
//! Sources → Sampler (one [`Snapshot`] per tick) → [`History`] → charts + report
//!
//! Every source implements [`MetricSource`]. A source error degrades only its
//! own resource for that tick; the snapshot still lands in the history with a
//! zeroed record and a [`Diagnostic`]. Network throughput is derived from
//! cumulative counters by [`RateState`], owned by the network source.

pub mod clock;
pub mod error;
pub mod history;
pub mod monitor;
pub mod rate;
pub mod render;
pub mod report;
pub mod sampler;
pub mod snapshot;
pub mod sources;

pub use clock::{MonotonicClock, Timestamp};
pub use error::{MonitorError, Result, SourceError};
pub use history::History;
pub use monitor::{CancelToken, MonitorConfig, RunOutcome, StopReason, TickProgress};
pub use rate::{ByteCounters, RateState, Throughput};
pub use render::{ChartArtifact, Series, render_all, sparkline};
pub use report::{Report, RunMetadata, SummaryStats, format_bytes, write_report};
pub use sampler::{Diagnostic, Sampler};
pub use snapshot::{
    CpuRecord, DiskRecord, GpuDevice, MemoryRecord, NetworkRecord, ResourceKind, Snapshot,
};
pub use sources::{MetricSource, SourceSet};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
