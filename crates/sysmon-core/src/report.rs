//! Run summary documents.
//!
//! A report is derived from the history, the run parameters and the rendered
//! charts, then written as Markdown plus a matching JSON document. The raw
//! history is saved alongside as `history.json`.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::clock::Timestamp;
use crate::error::{MonitorError, Result};
use crate::history::History;
use crate::monitor::{MonitorConfig, StopReason};
use crate::render::{ChartArtifact, SPARKLINE_WIDTH};
use crate::sampler::Diagnostic;
use crate::snapshot::{GpuDevice, ResourceKind, Snapshot};

pub const HISTORY_FILE: &str = "history.json";

/// Average, minimum and maximum of one percentage series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryStats {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

impl SummaryStats {
    /// `None` for an empty series.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        (count > 0).then(|| Self {
            avg: sum / count as f64,
            min,
            max,
        })
    }
}

impl std::fmt::Display for SummaryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Avg {:.1}% / Min {:.1}% / Max {:.1}%",
            self.avg, self.min, self.max
        )
    }
}

/// Parameters of the run being reported on.
#[derive(Debug, Clone)]
pub struct RunMetadata {
    pub run_id: String,
    pub duration: Duration,
    pub interval: Duration,
    pub output_dir: PathBuf,
    pub stop: StopReason,
    pub diagnostics: Vec<Diagnostic>,
    pub generated_at: Timestamp,
}

impl RunMetadata {
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            duration: config.duration,
            interval: config.interval,
            output_dir: config.output_dir.clone(),
            stop: StopReason::Completed,
            diagnostics: Vec::new(),
            generated_at: Timestamp::now(),
        }
    }

    pub fn with_outcome(mut self, stop: StopReason, diagnostics: Vec<Diagnostic>) -> Self {
        self.stop = stop;
        self.diagnostics = diagnostics;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskSummary {
    pub percent: f64,
    pub used: u64,
    pub total: u64,
    pub used_human: String,
    pub total_human: String,
    pub stats: SummaryStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkSummary {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub sent_human: String,
    pub recv_human: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSummary {
    pub kind: ResourceKind,
    pub title: String,
    pub csv_file: Option<String>,
    pub series: Vec<String>,
    pub placeholders: Vec<String>,
}

/// Everything a report shows, serialized as the `.json` document.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub run_id: String,
    pub generated_at: String,
    pub monitoring_duration_secs: f64,
    pub interval_secs: f64,
    pub data_points: usize,
    pub period_start: String,
    pub period_end: String,
    pub stop: String,
    pub cpu: SummaryStats,
    pub memory: SummaryStats,
    pub disk: DiskSummary,
    pub network: NetworkSummary,
    pub gpu: Vec<GpuDevice>,
    pub charts: Vec<ChartSummary>,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip)]
    chart_text: Vec<String>,
    #[serde(skip)]
    generated_compact: String,
}

impl Report {
    /// Derive the report contents. Fails only on an empty history.
    pub fn build(
        history: &[Snapshot],
        meta: &RunMetadata,
        charts: &BTreeMap<ResourceKind, ChartArtifact>,
    ) -> Result<Self> {
        let (Some(first), Some(last)) = (history.first(), history.last()) else {
            return Err(MonitorError::EmptyHistory);
        };

        let stats = |f: fn(&Snapshot) -> f64| {
            SummaryStats::from_values(history.iter().map(f)).ok_or(MonitorError::EmptyHistory)
        };

        Ok(Self {
            run_id: meta.run_id.clone(),
            generated_at: meta.generated_at.to_iso8601(),
            monitoring_duration_secs: meta.duration.as_secs_f64(),
            interval_secs: meta.interval.as_secs_f64(),
            data_points: history.len(),
            period_start: first.timestamp.to_clock_time(),
            period_end: last.timestamp.to_clock_time(),
            stop: meta.stop.to_string(),
            cpu: stats(|s| s.cpu.percent)?,
            memory: stats(|s| s.memory.percent)?,
            disk: DiskSummary {
                percent: last.disk.percent,
                used: last.disk.used,
                total: last.disk.total,
                used_human: format_bytes(last.disk.used),
                total_human: format_bytes(last.disk.total),
                stats: stats(|s| s.disk.percent)?,
            },
            network: NetworkSummary {
                bytes_sent: last.network.bytes_sent,
                bytes_recv: last.network.bytes_recv,
                sent_human: format_bytes(last.network.bytes_sent),
                recv_human: format_bytes(last.network.bytes_recv),
            },
            gpu: last.gpu.clone().unwrap_or_default(),
            charts: charts
                .values()
                .map(|c| ChartSummary {
                    kind: c.kind,
                    title: c.title.clone(),
                    csv_file: c
                        .csv_path
                        .as_ref()
                        .and_then(|p| p.file_name())
                        .map(|n| n.to_string_lossy().into_owned()),
                    series: c.series.iter().map(|s| s.label.clone()).collect(),
                    placeholders: c.placeholders.clone(),
                })
                .collect(),
            diagnostics: meta.diagnostics.clone(),
            chart_text: charts
                .values()
                .map(|c| c.to_text(SPARKLINE_WIDTH))
                .collect(),
            generated_compact: meta.generated_at.to_compact(),
        })
    }

    /// `system_monitor_report_<YYYYMMDD_HHMMSS>` without extension.
    pub fn file_stem(&self) -> String {
        format!("system_monitor_report_{}", self.generated_compact)
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        md.push_str("# System Resource Monitoring Report\n\n");
        let _ = writeln!(md, "- Run ID: {}", self.run_id);
        let _ = writeln!(md, "- Report generated: {}", self.generated_at);
        let _ = writeln!(
            md,
            "- Monitoring duration: {}",
            format_duration(Duration::from_secs_f64(self.monitoring_duration_secs))
        );
        let _ = writeln!(
            md,
            "- Sampling interval: {}",
            format_duration(Duration::from_secs_f64(self.interval_secs))
        );
        let _ = writeln!(md, "- Total data points: {}", self.data_points);
        let _ = writeln!(
            md,
            "- Monitoring period: {} - {} (UTC)",
            self.period_start, self.period_end
        );
        let _ = writeln!(md, "- Run status: {}\n", self.stop);

        md.push_str("## Executive Summary\n\n");
        md.push_str("| Resource | Statistics |\n");
        md.push_str("|----------|------------|\n");
        let _ = writeln!(md, "| CPU Usage | {} |", self.cpu);
        let _ = writeln!(md, "| Memory Usage | {} |", self.memory);
        let _ = writeln!(
            md,
            "| Disk Usage | {:.1}% ({} / {}) |",
            self.disk.percent, self.disk.used_human, self.disk.total_human
        );
        let _ = writeln!(md, "| Network Sent | {} |", self.network.sent_human);
        let _ = writeln!(md, "| Network Received | {} |", self.network.recv_human);
        for gpu in &self.gpu {
            let temp = gpu
                .temperature_c
                .map(|t| format!("{t:.0}°C"))
                .unwrap_or_else(|| "n/a".to_string());
            let _ = writeln!(
                md,
                "| GPU {} ({}) | Load {:.1}% / Memory {:.1}% / Temp {temp} |",
                gpu.id, gpu.name, gpu.load_percent, gpu.memory_percent
            );
        }
        md.push('\n');

        md.push_str("## Charts\n\n");
        for (summary, text) in self.charts.iter().zip(&self.chart_text) {
            let _ = writeln!(md, "### {}\n", summary.title);
            if let Some(csv) = &summary.csv_file {
                let _ = writeln!(md, "Series data: `{csv}`\n");
            }
            md.push_str("```text\n");
            md.push_str(text);
            md.push_str("```\n\n");
        }

        md.push_str("## Detailed Statistics\n\n");
        md.push_str("| Metric | Average | Minimum | Maximum |\n");
        md.push_str("|--------|---------|---------|---------|\n");
        for (label, stats) in [
            ("CPU Usage (%)", &self.cpu),
            ("Memory Usage (%)", &self.memory),
            ("Disk Usage (%)", &self.disk.stats),
        ] {
            let _ = writeln!(
                md,
                "| {label} | {:.2} | {:.2} | {:.2} |",
                stats.avg, stats.min, stats.max
            );
        }
        md.push('\n');

        if !self.diagnostics.is_empty() {
            md.push_str("## Degraded Readings\n\n");
            md.push_str("| Tick | Resource | Message |\n");
            md.push_str("|------|----------|---------|\n");
            for d in &self.diagnostics {
                let _ = writeln!(md, "| {} | {} | {} |", d.tick, d.kind, d.message);
            }
            md.push('\n');
        }

        md
    }
}

/// Write the Markdown report, its JSON twin and `history.json` into the
/// metadata's output directory. Returns the Markdown path.
pub fn write_report(
    history: &History,
    meta: &RunMetadata,
    charts: &BTreeMap<ResourceKind, ChartArtifact>,
) -> Result<PathBuf> {
    let report = Report::build(history.all(), meta, charts)?;
    let dir = meta.output_dir.as_path();
    std::fs::create_dir_all(dir)?;

    write_history(history, dir)?;

    let md_path = dir.join(format!("{}.md", report.file_stem()));
    std::fs::write(&md_path, report.to_markdown())?;
    let json_path = dir.join(format!("{}.json", report.file_stem()));
    std::fs::write(&json_path, serde_json::to_string_pretty(&report)?)?;

    log::info!("report written to {}", md_path.display());
    Ok(md_path)
}

pub fn write_history(history: &History, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(HISTORY_FILE);
    std::fs::write(&path, history.to_json()?)?;
    Ok(path)
}

/// Human-readable binary size, e.g. `1.50 GiB`.
pub fn format_bytes(value: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];
    let mut v = value as f64;
    let mut idx = 0usize;
    while v >= 1024.0 && idx < UNITS.len() - 1 {
        v /= 1024.0;
        idx += 1;
    }
    format!("{v:.2} {}", UNITS[idx])
}

/// `1h 5m 0s`, `5m 0s`, `30s`, `250ms`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs == 0 {
        return format!("{}ms", d.as_millis());
    }
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h {m}m {s}s")
    } else if m > 0 {
        format!("{m}m {s}s")
    } else {
        format!("{s}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::build_charts;

    fn snap(t: u64, cpu: f64, mem: f64, disk: f64) -> Snapshot {
        let mut s = Snapshot::empty(Timestamp(t));
        s.cpu.percent = cpu;
        s.memory.percent = mem;
        s.disk.percent = disk;
        s.disk.total = 1024 * 1024 * 1024;
        s.disk.used = 512 * 1024 * 1024;
        s.network.bytes_sent = 2048;
        s.network.bytes_recv = 1536;
        s
    }

    fn meta(dir: &Path) -> RunMetadata {
        RunMetadata {
            run_id: "test-run".into(),
            duration: Duration::from_secs(600),
            interval: Duration::from_secs(5),
            output_dir: dir.to_path_buf(),
            stop: StopReason::Completed,
            diagnostics: Vec::new(),
            generated_at: Timestamp(1_771_119_000_000),
        }
    }

    #[test]
    fn summary_stats() {
        let s = SummaryStats::from_values([10.0, 20.0, 60.0]).unwrap();
        assert!((s.avg - 30.0).abs() < 1e-9);
        assert_eq!(s.min, 10.0);
        assert_eq!(s.max, 60.0);
        assert!(SummaryStats::from_values(std::iter::empty()).is_none());
    }

    #[test]
    fn build_uses_last_entry_for_totals() {
        let history = [snap(1_000, 10.0, 40.0, 50.0), snap(6_000, 30.0, 60.0, 50.0)];
        let charts = build_charts(&history).unwrap();
        let report = Report::build(&history, &meta(Path::new("unused")), &charts).unwrap();
        assert_eq!(report.data_points, 2);
        assert!((report.cpu.avg - 20.0).abs() < 1e-9);
        assert_eq!(report.memory.max, 60.0);
        assert_eq!(report.disk.used_human, "512.00 MiB");
        assert_eq!(report.network.sent_human, "2.00 KiB");
        assert_eq!(report.period_start, "00:00:01");
        assert_eq!(report.period_end, "00:00:06");
        assert!(report.gpu.is_empty());
    }

    #[test]
    fn empty_history_cannot_be_reported() {
        let charts = BTreeMap::new();
        let err = Report::build(&[], &meta(Path::new("unused")), &charts).unwrap_err();
        assert!(matches!(err, MonitorError::EmptyHistory));
    }

    #[test]
    fn markdown_sections() {
        let history = [snap(1_000, 10.0, 40.0, 10.0), snap(6_000, 10.0, 40.0, 90.0)];
        let charts = build_charts(&history).unwrap();
        let mut m = meta(Path::new("unused"));
        m.diagnostics.push(Diagnostic {
            tick: 1,
            kind: ResourceKind::Disk,
            message: "i/o error: denied".into(),
        });
        let md = Report::build(&history, &m, &charts).unwrap().to_markdown();
        assert!(md.starts_with("# System Resource Monitoring Report"));
        assert!(md.contains("| CPU Usage | Avg 10.0% / Min 10.0% / Max 10.0% |"));
        assert!(md.contains("## Detailed Statistics"));
        assert!(md.contains("| CPU Usage (%) | 10.00 | 10.00 | 10.00 |"));
        assert!(md.contains("| Memory Usage (%) | 40.00 | 40.00 | 40.00 |"));
        assert!(md.contains("| Disk Usage (%) | 50.00 | 10.00 | 90.00 |"));
        assert!(md.contains("- Monitoring duration: 10m 0s"));
        assert!(md.contains("GPU Not Available or No Data"));
        assert!(md.contains("## Degraded Readings"));
        assert!(md.contains("| 1 | disk | i/o error: denied |"));
    }

    #[test]
    fn writes_all_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let mut history = History::new();
        history.append(snap(1_000, 10.0, 40.0, 50.0));
        let charts = crate::render::render_all(history.all(), tmp.path()).unwrap();

        let path = write_report(&history, &meta(tmp.path()), &charts).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "system_monitor_report_20260215_013000.md"
        );
        let json_path = path.with_extension("json");
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
        assert_eq!(json["data_points"], 1);
        assert_eq!(json["run_id"], "test-run");
        assert_eq!(json["charts"].as_array().unwrap().len(), 5);
        assert!(tmp.path().join(HISTORY_FILE).exists());
    }

    #[test]
    fn byte_formatting() {
        assert_eq!(format_bytes(0), "0.00 B");
        assert_eq!(format_bytes(1536), "1.50 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5.00 GiB");
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(300)), "5m 0s");
        assert_eq!(format_duration(Duration::from_secs(3900)), "1h 5m 0s");
    }
}
