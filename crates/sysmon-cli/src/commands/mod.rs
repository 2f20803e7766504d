pub mod run;
pub mod snapshot;

use std::time::Duration;

use serde::Serialize;

/// Exit status for invalid arguments or configuration.
pub const EXIT_USAGE: i32 = 2;
/// Exit status when a run produced nothing to report.
pub const EXIT_FAILURE: i32 = 1;

/// Parse a duration string like "5m", "30s", "1h", "100ms". Bare numbers are
/// seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    let (numeric, multiplier) = if let Some(rest) = s.strip_suffix("ms") {
        (rest, 1u64)
    } else if let Some(rest) = s.strip_suffix('s') {
        (rest, 1000)
    } else if let Some(rest) = s.strip_suffix('m') {
        (rest, 60_000)
    } else if let Some(rest) = s.strip_suffix('h') {
        (rest, 3_600_000)
    } else {
        (s, 1000)
    };

    let value: u64 = numeric
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration: {s:?}"))?;
    value
        .checked_mul(multiplier)
        .map(Duration::from_millis)
        .ok_or_else(|| format!("duration too large: {s:?}"))
}

/// Pretty-print `value` as JSON to `path`, or to stdout when no path is given.
pub fn write_json<T: Serialize>(value: &T, path: Option<&str>) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
    match path {
        Some(path) => {
            std::fs::write(path, json)?;
            println!("Written to {path}");
        }
        None => println!("{json}"),
    }
    Ok(())
}
