//! CLI for sysmon — watch your host for a while, then read the report.

mod commands;

use clap::{Parser, Subcommand};
use std::time::Duration;

use commands::parse_duration;

#[derive(Parser)]
#[command(name = "sysmon")]
#[command(about = "sysmon — sample CPU, memory, disk, network and GPU usage over time")]
#[command(version = sysmon_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample every resource at a fixed interval, then write charts and a report.
    /// Ctrl+C stops early and still writes everything collected so far.
    Run {
        /// Total monitoring time (e.g. "5m", "30s", "1h")
        #[arg(long, default_value = "5m", value_parser = parse_duration)]
        duration: Duration,

        /// Time between samples (e.g. "5s", "500ms")
        #[arg(long, default_value = "5s", value_parser = parse_duration)]
        interval: Duration,

        /// Directory for chart series, report and history.json
        #[arg(long, default_value = "output")]
        output: String,
    },

    /// Take one snapshot (or a short series) and print it as JSON
    Snapshot {
        /// Number of snapshots to take
        #[arg(long, default_value = "1")]
        count: usize,

        /// Time between snapshots when --count > 1
        #[arg(long, default_value = "1s", value_parser = parse_duration)]
        interval: Duration,

        /// Write JSON to this file instead of stdout
        #[arg(long)]
        output: Option<String>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            duration,
            interval,
            output,
        } => commands::run::run(duration, interval, &output),
        Commands::Snapshot {
            count,
            interval,
            output,
        } => commands::snapshot::run(count, interval, output.as_deref()),
    }
}
