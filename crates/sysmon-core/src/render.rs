//! Per-resource chart artifacts.
//!
//! Every chart is written as `<kind>_series.csv` (one row per snapshot) and
//! can be drawn as a block-character sparkline for text reports. Missing
//! optional data never fails a chart; it yields a labelled placeholder.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::clock::Timestamp;
use crate::error::{MonitorError, Result};
use crate::snapshot::{ResourceKind, Snapshot};

pub const CPU_TEMPERATURE_PLACEHOLDER: &str = "CPU Temperature Data Not Available";
pub const GPU_PLACEHOLDER: &str = "GPU Not Available or No Data";

const SPARK_BLOCKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Default sparkline width in text reports.
pub const SPARKLINE_WIDTH: usize = 60;

/// One plotted line. `values` is aligned with the chart's timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub values: Vec<Option<f64>>,
}

impl Series {
    fn new(label: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            label: label.into(),
            values,
        }
    }

    fn complete(label: impl Into<String>, values: impl Iterator<Item = f64>) -> Self {
        Self::new(label, values.map(Some).collect())
    }

    pub fn present(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().flatten().copied()
    }

    pub fn last(&self) -> Option<f64> {
        self.values.iter().rev().find_map(|v| *v)
    }
}

/// A rendered chart for one resource kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartArtifact {
    pub kind: ResourceKind,
    pub title: String,
    pub timestamps: Vec<Timestamp>,
    pub series: Vec<Series>,
    /// Messages shown in place of data that is missing.
    pub placeholders: Vec<String>,
    /// Set once the CSV has been written.
    pub csv_path: Option<PathBuf>,
}

impl ChartArtifact {
    fn new(kind: ResourceKind, title: &str, history: &[Snapshot]) -> Self {
        Self {
            kind,
            title: title.to_string(),
            timestamps: history.iter().map(|s| s.timestamp).collect(),
            series: Vec::new(),
            placeholders: Vec::new(),
            csv_path: None,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}_series.csv", self.kind)
    }

    /// `timestamp_unix_ms` plus one column per series; gaps are empty cells.
    pub fn to_csv(&self) -> String {
        let mut out = String::from("timestamp_unix_ms");
        for series in &self.series {
            out.push(',');
            out.push_str(&csv_field(&series.label));
        }
        out.push('\n');

        for (row, ts) in self.timestamps.iter().enumerate() {
            out.push_str(&ts.as_millis().to_string());
            for series in &self.series {
                out.push(',');
                if let Some(Some(v)) = series.values.get(row) {
                    let _ = write!(out, "{v:.3}");
                }
            }
            out.push('\n');
        }
        out
    }

    /// Title, one sparkline per series, then any placeholders.
    pub fn to_text(&self, width: usize) -> String {
        let mut out = format!("{}\n", self.title);
        let label_width = self.series.iter().map(|s| s.label.chars().count()).max();
        for series in &self.series {
            if series.present().next().is_none() {
                continue;
            }
            let (min, max) = series
                .present()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(v), hi.max(v))
                });
            let _ = writeln!(
                out,
                "  {:<w$}  {}  min {min:.1} max {max:.1} last {:.1}",
                series.label,
                sparkline(&downsample(&series.values, width)),
                series.last().unwrap_or_default(),
                w = label_width.unwrap_or(0),
            );
        }
        for placeholder in &self.placeholders {
            let _ = writeln!(out, "  [{placeholder}]");
        }
        out
    }

    fn write_csv(&mut self, out_dir: &Path) -> Result<()> {
        let path = out_dir.join(self.file_name());
        std::fs::write(&path, self.to_csv())?;
        self.csv_path = Some(path);
        Ok(())
    }
}

/// Build every chart from `history` and write its CSV into `out_dir`.
pub fn render_all(
    history: &[Snapshot],
    out_dir: &Path,
) -> Result<BTreeMap<ResourceKind, ChartArtifact>> {
    let mut charts = build_charts(history)?;
    std::fs::create_dir_all(out_dir)?;
    for chart in charts.values_mut() {
        chart.write_csv(out_dir)?;
        log::debug!("wrote {}", out_dir.join(chart.file_name()).display());
    }
    Ok(charts)
}

/// Charts without touching the filesystem.
pub fn build_charts(history: &[Snapshot]) -> Result<BTreeMap<ResourceKind, ChartArtifact>> {
    if history.is_empty() {
        return Err(MonitorError::EmptyHistory);
    }
    let charts = [
        cpu_chart(history),
        memory_chart(history),
        disk_chart(history),
        network_chart(history),
        gpu_chart(history),
    ];
    Ok(charts.into_iter().map(|c| (c.kind, c)).collect())
}

fn cpu_chart(history: &[Snapshot]) -> ChartArtifact {
    let mut chart = ChartArtifact::new(ResourceKind::Cpu, "CPU Usage and Temperature", history);
    chart.series.push(Series::complete(
        "CPU Usage (%)",
        history.iter().map(|s| s.cpu.percent),
    ));
    let temps: Vec<Option<f64>> = history.iter().map(|s| s.cpu.temperature_c).collect();
    if temps.iter().any(Option::is_none) {
        chart.placeholders.push(CPU_TEMPERATURE_PLACEHOLDER.to_string());
    }
    chart.series.push(Series::new("CPU Temperature (°C)", temps));
    chart
}

fn memory_chart(history: &[Snapshot]) -> ChartArtifact {
    let mut chart = ChartArtifact::new(ResourceKind::Memory, "Memory and Swap Usage", history);
    chart.series.push(Series::complete(
        "Memory Usage (%)",
        history.iter().map(|s| s.memory.percent),
    ));
    chart.series.push(Series::complete(
        "Swap Usage (%)",
        history.iter().map(|s| s.memory.swap_percent),
    ));
    chart
}

fn disk_chart(history: &[Snapshot]) -> ChartArtifact {
    let mut chart = ChartArtifact::new(ResourceKind::Disk, "Disk Usage", history);
    chart.series.push(Series::complete(
        "Disk Usage (%)",
        history.iter().map(|s| s.disk.percent),
    ));
    chart
}

fn network_chart(history: &[Snapshot]) -> ChartArtifact {
    let mut chart = ChartArtifact::new(ResourceKind::Network, "Network Traffic", history);
    chart.series.push(Series::complete(
        "Upload (Mbps)",
        history.iter().map(|s| s.network.upload_mbps),
    ));
    chart.series.push(Series::complete(
        "Download (Mbps)",
        history.iter().map(|s| s.network.download_mbps),
    ));
    chart
}

/// One load and one temperature series per device id seen anywhere in the
/// history; ticks where a device did not report are gaps.
fn gpu_chart(history: &[Snapshot]) -> ChartArtifact {
    let mut chart = ChartArtifact::new(ResourceKind::Gpu, "GPU Load and Temperature", history);

    let mut devices: BTreeMap<u32, String> = BTreeMap::new();
    for device in history.iter().filter_map(|s| s.gpu.as_ref()).flatten() {
        devices.entry(device.id).or_insert_with(|| device.name.clone());
    }
    if devices.is_empty() {
        chart.placeholders.push(GPU_PLACEHOLDER.to_string());
        return chart;
    }

    for (id, name) in devices {
        let reading = |s: &Snapshot| s.gpu.as_ref()?.iter().find(|d| d.id == id).cloned();
        let label = format!("GPU {id} ({name})");
        chart.series.push(Series::new(
            format!("{label} Load (%)"),
            history.iter().map(|s| reading(s).map(|d| d.load_percent)).collect(),
        ));
        chart.series.push(Series::new(
            format!("{label} Temperature (°C)"),
            history
                .iter()
                .map(|s| reading(s).and_then(|d| d.temperature_c))
                .collect(),
        ));
    }
    chart
}

/// Render values as block characters scaled between their min and max.
/// Gaps render as spaces; a flat series renders at the lowest level.
pub fn sparkline(values: &[Option<f64>]) -> String {
    let present = values.iter().flatten().copied().filter(|v| v.is_finite());
    let (lo, hi) = present.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let span = hi - lo;
    let top = (SPARK_BLOCKS.len() - 1) as f64;

    values
        .iter()
        .map(|v| match v {
            Some(v) if v.is_finite() => {
                let level = if span > 0.0 {
                    ((v - lo) / span * top).round() as usize
                } else {
                    0
                };
                SPARK_BLOCKS[level.min(SPARK_BLOCKS.len() - 1)]
            }
            _ => ' ',
        })
        .collect()
}

/// Average consecutive values into at most `width` buckets.
fn downsample(values: &[Option<f64>], width: usize) -> Vec<Option<f64>> {
    if width == 0 || values.len() <= width {
        return values.to_vec();
    }
    (0..width)
        .map(|bucket| {
            let start = bucket * values.len() / width;
            let end = ((bucket + 1) * values.len() / width).max(start + 1);
            let present: Vec<f64> = values[start..end].iter().flatten().copied().collect();
            (!present.is_empty()).then(|| present.iter().sum::<f64>() / present.len() as f64)
        })
        .collect()
}

fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}
