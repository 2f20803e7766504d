use std::time::Duration;

use sysmon_core::Sampler;

use super::{EXIT_FAILURE, EXIT_USAGE, write_json};

pub fn run(count: usize, interval: Duration, output: Option<&str>) {
    if count == 0 {
        eprintln!("Error: --count must be at least 1");
        std::process::exit(EXIT_USAGE);
    }

    let mut sampler = Sampler::system();
    for i in 0..count {
        if let Err(e) = sampler.tick() {
            eprintln!("Error: {e}");
            if sampler.history().is_empty() {
                std::process::exit(EXIT_FAILURE);
            }
            break;
        }
        if i + 1 < count {
            std::thread::sleep(interval);
        }
    }

    for d in sampler.diagnostics() {
        eprintln!("warning: {} degraded on tick {}: {}", d.kind, d.tick, d.message);
    }

    let history = sampler.into_history();
    let result = match history.all() {
        [single] => write_json(single, output),
        many => write_json(&many, output),
    };
    if let Err(e) = result {
        eprintln!("Failed to write snapshot: {e}");
        std::process::exit(EXIT_FAILURE);
    }
}
