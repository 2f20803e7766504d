//! Point-in-time resource records.
//!
//! Every optional field is an explicit `Option`: an absent temperature or GPU
//! is `None`, never a sentinel number.

use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;

/// Resource families sampled on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Cpu,
    Memory,
    Disk,
    Network,
    Gpu,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Cpu,
        ResourceKind::Memory,
        ResourceKind::Disk,
        ResourceKind::Network,
        ResourceKind::Gpu,
    ];
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Memory => write!(f, "memory"),
            Self::Disk => write!(f, "disk"),
            Self::Network => write!(f, "network"),
            Self::Gpu => write!(f, "gpu"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuRecord {
    /// Utilization across all cores, 0-100.
    pub percent: f64,
    /// Logical core count.
    pub core_count: usize,
    pub freq_current_mhz: Option<f64>,
    pub freq_max_mhz: Option<f64>,
    pub temperature_c: Option<f64>,
}

/// Memory and swap, in bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub percent: f64,
    pub swap_total: u64,
    pub swap_used: u64,
    pub swap_percent: f64,
}

/// Root filesystem usage plus cumulative block-device IO, in bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskRecord {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f64,
    pub read_bytes: u64,
    pub write_bytes: u64,
}

/// Cumulative interface counters plus throughput derived since the last tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub upload_mbps: f64,
    pub download_mbps: f64,
}

/// One GPU device. Memory figures are in MiB as reported by the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuDevice {
    pub id: u32,
    pub name: String,
    /// 0-100.
    pub load_percent: f64,
    pub memory_used: f64,
    pub memory_total: f64,
    pub memory_percent: f64,
    pub temperature_c: Option<f64>,
}

impl GpuDevice {
    /// Build a device record from a driver reading whose utilization is a
    /// 0-1 fraction.
    pub fn from_reading(
        id: u32,
        name: impl Into<String>,
        load_fraction: f64,
        memory_used: f64,
        memory_total: f64,
        temperature_c: Option<f64>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            load_percent: load_fraction * 100.0,
            memory_used,
            memory_total,
            memory_percent: memory_percent(memory_used, memory_total),
            temperature_c,
        }
    }
}

/// `used / total * 100`, or 0 when `total` is not positive.
pub fn memory_percent(used: f64, total: f64) -> f64 {
    if total > 0.0 { used / total * 100.0 } else { 0.0 }
}

/// `part / whole * 100` over byte counters, 0 when `whole` is 0.
pub fn percent_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// One composite measurement across all resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: Timestamp,
    pub cpu: CpuRecord,
    pub memory: MemoryRecord,
    pub disk: DiskRecord,
    pub network: NetworkRecord,
    /// `None` when no GPU query succeeded or no device was found.
    pub gpu: Option<Vec<GpuDevice>>,
    /// Resources whose source failed this tick and hold zeroed values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<ResourceKind>,
}

impl Snapshot {
    /// A snapshot with every resource at its zeroed default.
    pub fn empty(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            cpu: CpuRecord::default(),
            memory: MemoryRecord::default(),
            disk: DiskRecord::default(),
            network: NetworkRecord::default(),
            gpu: None,
            degraded: Vec::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }

    pub fn is_degraded_for(&self, kind: ResourceKind) -> bool {
        self.degraded.contains(&kind)
    }
}
