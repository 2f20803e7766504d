use std::path::PathBuf;
use std::time::Duration;

use sysmon_core::monitor::{self, MonitorConfig, TickProgress};
use sysmon_core::report::{HISTORY_FILE, format_duration};
use sysmon_core::{
    CancelToken, RunMetadata, Sampler, Snapshot, StopReason, SummaryStats, render_all,
    write_report,
};

use super::{EXIT_FAILURE, EXIT_USAGE};

pub fn run(duration: Duration, interval: Duration, output: &str) {
    let config = MonitorConfig {
        duration,
        interval,
        output_dir: PathBuf::from(output),
    };
    if let Err(e) = config.validate() {
        eprintln!("Error: {e}");
        std::process::exit(EXIT_USAGE);
    }

    // Set up Ctrl+C handler
    let cancel = CancelToken::new();
    let handle = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handle.cancel()) {
        log::warn!("could not install Ctrl+C handler: {e}");
    }

    println!("Monitoring system resources");
    println!("  Duration:  {}", format_duration(config.duration));
    println!("  Interval:  {}", format_duration(config.interval));
    println!("  Samples:   {}", config.planned_ticks());
    println!("  Output:    {}", config.output_dir.display());
    println!("  Press Ctrl+C to stop early.");
    println!();

    let outcome = match monitor::run(Sampler::system(), &config, &cancel, print_progress) {
        Ok(outcome) => outcome,
        Err(e) => {
            println!();
            eprintln!("Error: {e}");
            std::process::exit(EXIT_FAILURE);
        }
    };
    println!();
    println!();

    match &outcome.stop {
        StopReason::Completed => {}
        StopReason::Cancelled => println!("Stopped early; reporting collected data."),
        StopReason::TickFailed { .. } => {
            eprintln!("Sampling stopped: {}", outcome.stop);
            println!("Reporting the data collected before the failure.");
        }
    }
    if !outcome.diagnostics.is_empty() {
        println!(
            "{} degraded reading(s); see the report for details.",
            outcome.diagnostics.len()
        );
    }

    let charts = match render_all(outcome.history.all(), &config.output_dir) {
        Ok(charts) => charts,
        Err(e) => {
            eprintln!("Error rendering charts: {e}");
            std::process::exit(EXIT_FAILURE);
        }
    };

    let elapsed = outcome.elapsed;
    let history = outcome.history;
    let meta = RunMetadata::from_config(&config).with_outcome(outcome.stop, outcome.diagnostics);
    let report_path = match write_report(&history, &meta, &charts) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error writing report: {e}");
            std::process::exit(EXIT_FAILURE);
        }
    };

    println!("{}", "=".repeat(60));
    for line in summary_lines(history.all(), elapsed) {
        println!("  {line}");
    }
    println!("{}", "-".repeat(60));
    println!("Report saved to {}", report_path.display());
    println!("  {:<22}— summary (Markdown)", file_name(&report_path));
    println!(
        "  {:<22}— summary (JSON)",
        file_name(&report_path.with_extension("json"))
    );
    println!("  {HISTORY_FILE:<22}— every snapshot");
    for chart in charts.values() {
        println!("  {:<22}— {}", chart.file_name(), chart.title);
    }
}

/// Closing summary: data points, averages and total monitoring time.
fn summary_lines(history: &[Snapshot], elapsed: Duration) -> Vec<String> {
    let mut lines = vec![format!("Data points: {}", history.len())];
    let columns: [(&str, fn(&Snapshot) -> f64); 3] = [
        ("CPU:", |s| s.cpu.percent),
        ("Memory:", |s| s.memory.percent),
        ("Disk:", |s| s.disk.percent),
    ];
    for (label, value) in columns {
        if let Some(stats) = SummaryStats::from_values(history.iter().map(value)) {
            lines.push(format!("{label:<13}{stats}"));
        }
    }
    lines.push(format!("{:<13}{}", "Elapsed:", format_duration(elapsed)));
    lines
}

fn print_progress(p: TickProgress<'_>) {
    let s = p.snapshot;
    let temp = s
        .cpu
        .temperature_c
        .map(|t| format!(" {t:.0}°C"))
        .unwrap_or_default();
    print!(
        "\r  [{:>4}/{:<4}] {}  CPU {:>5.1}%{temp}  MEM {:>5.1}%  DISK {:>5.1}%  ↑{:.2} ↓{:.2} Mbps",
        p.tick,
        p.planned,
        s.timestamp.to_clock_time(),
        s.cpu.percent,
        s.memory.percent,
        s.disk.percent,
        s.network.upload_mbps,
        s.network.download_mbps,
    );
    let _ = std::io::Write::flush(&mut std::io::stdout());
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
