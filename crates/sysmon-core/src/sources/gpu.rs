//! NVIDIA GPU load, memory and temperature via `nvidia-smi`.
//!
//! Three outcomes are distinguished: the tool is missing, the tool runs but
//! finds no device, or at least one device reports. The first two mean "no
//! GPU" and yield `Ok(None)`.

use std::io::ErrorKind;
use std::time::Duration;

use super::helpers::{CommandOutput, run_command};
use super::{GpuReading, MetricSource};
use crate::error::SourceError;
use crate::snapshot::{GpuDevice, ResourceKind};

const NVIDIA_SMI: &str = "nvidia-smi";
const QUERY_ARGS: [&str; 2] = [
    "--query-gpu=index,name,utilization.gpu,memory.used,memory.total,temperature.gpu",
    "--format=csv,noheader,nounits",
];
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

pub struct GpuSource {
    timeout: Duration,
}

impl GpuSource {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for GpuSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSource for GpuSource {
    type Record = GpuReading;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Gpu
    }

    fn sample(&mut self) -> Result<GpuReading, SourceError> {
        let output = match run_command(NVIDIA_SMI, &QUERY_ARGS, self.timeout) {
            Ok(out) => out,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SourceError::Command {
                    command: NVIDIA_SMI,
                    reason: e.to_string(),
                });
            }
        };
        interpret_output(&output)
    }
}

fn interpret_output(output: &CommandOutput) -> Result<GpuReading, SourceError> {
    if !output.success {
        if reports_no_devices(&output.stdout) || reports_no_devices(&output.stderr) {
            return Ok(None);
        }
        let reason = if output.stderr.is_empty() {
            output.stdout.clone()
        } else {
            output.stderr.clone()
        };
        return Err(SourceError::Command {
            command: NVIDIA_SMI,
            reason,
        });
    }

    let devices = parse_nvidia_smi(&output.stdout)?;
    Ok((!devices.is_empty()).then_some(devices))
}

fn reports_no_devices(text: &str) -> bool {
    text.contains("No devices were found")
}

/// Parse `nvidia-smi --format=csv,noheader,nounits` rows of
/// `index, name, utilization %, memory used MiB, memory total MiB, temperature °C`.
///
/// Fields the driver reports as `[N/A]` become 0, or `None` for temperature.
pub fn parse_nvidia_smi(stdout: &str) -> Result<Vec<GpuDevice>, SourceError> {
    let mut devices = Vec::new();
    for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if reports_no_devices(line) {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < 6 {
            return Err(SourceError::Parse {
                what: "nvidia-smi row",
                raw: line.to_string(),
            });
        }
        let id = fields[0].parse::<u32>().map_err(|_| SourceError::Parse {
            what: "nvidia-smi gpu index",
            raw: line.to_string(),
        })?;
        let utilization = optional_number(fields[2]).unwrap_or(0.0);
        let memory_used = optional_number(fields[3]).unwrap_or(0.0);
        let memory_total = optional_number(fields[4]).unwrap_or(0.0);
        let temperature = optional_number(fields[5]);

        devices.push(GpuDevice::from_reading(
            id,
            fields[1],
            utilization / 100.0,
            memory_used,
            memory_total,
            temperature,
        ));
    }
    Ok(devices)
}

fn optional_number(field: &str) -> Option<f64> {
    field.parse::<f64>().ok().filter(|v| v.is_finite())
}
