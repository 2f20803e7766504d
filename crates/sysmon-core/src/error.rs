//! Error types for sampling and run orchestration.
//!
//! Two layers, matching where failures are handled:
//! - [`SourceError`] never leaves a metric source's boundary as a failure of
//!   the tick; the sampler turns it into a zeroed record plus a diagnostic.
//! - [`MonitorError`] is what callers of the sampler and run loop see.

use thiserror::Error;

/// Failure inside a single metric source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The OS facility this source depends on is not present.
    #[error("{0} is not available on this host")]
    Unavailable(&'static str),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// An OS-exposed value could not be parsed.
    #[error("could not parse {what}: {raw:?}")]
    Parse { what: &'static str, raw: String },

    /// An external query tool ran but did not succeed.
    #[error("`{command}` failed: {reason}")]
    Command {
        command: &'static str,
        reason: String,
    },
}

/// Failure of the sampler, run loop or artifact writers.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A tick failed past the source boundary; no snapshot was produced.
    #[error("sampling tick {tick} failed: {reason}")]
    TickFailed { tick: usize, reason: String },

    #[error("no data was collected")]
    EmptyHistory,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = MonitorError> = std::result::Result<T, E>;
