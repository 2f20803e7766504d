//! Basic sampling example.
//!
//! Takes three snapshots one second apart and prints what each one saw,
//! then a sparkline of CPU usage.
//!
//! Run: `cargo run --example basic`

use std::time::Duration;

use sysmon_core::{CancelToken, MonitorConfig, Sampler, monitor, sparkline};

fn main() {
    let config = MonitorConfig {
        duration: Duration::from_secs(3),
        interval: Duration::from_secs(1),
        ..MonitorConfig::default()
    };

    let outcome = match monitor::run(Sampler::system(), &config, &CancelToken::new(), |p| {
        let s = p.snapshot;
        println!(
            "[{}/{}] cpu {:.1}% ({} cores), mem {:.1}%, disk {:.1}%, net ↑{:.3} ↓{:.3} Mbps",
            p.tick,
            p.planned,
            s.cpu.percent,
            s.cpu.core_count,
            s.memory.percent,
            s.disk.percent,
            s.network.upload_mbps,
            s.network.download_mbps,
        );
        match &s.gpu {
            Some(devices) => {
                for d in devices {
                    println!("      GPU {} ({}): {:.1}% load", d.id, d.name, d.load_percent);
                }
            }
            None => println!("      no GPU data"),
        }
    }) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("monitoring failed: {e}");
            return;
        }
    };

    let cpu: Vec<Option<f64>> = outcome
        .history
        .iter()
        .map(|s| Some(s.cpu.percent))
        .collect();
    println!("\nCPU: {}", sparkline(&cpu));
    for d in &outcome.diagnostics {
        println!("degraded: {} on tick {}: {}", d.kind, d.tick, d.message);
    }
}
