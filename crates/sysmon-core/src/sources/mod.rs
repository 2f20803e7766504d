//! Per-resource metric sources.
//!
//! Each source answers one question about the host (CPU, memory, disk,
//! network, GPU) and returns a best-effort record. Facilities that simply do
//! not exist on this host (no temperature sensor, no GPU tooling) show up as
//! `None` fields. Anything else that goes wrong is returned as a
//! [`SourceError`], which the sampler turns into a zeroed record.

pub mod helpers;

pub mod cpu;
pub mod disk;
pub mod gpu;
pub mod memory;
pub mod network;

use crate::error::SourceError;
use crate::snapshot::{CpuRecord, DiskRecord, GpuDevice, MemoryRecord, NetworkRecord, ResourceKind};

/// A resource-specific query against OS state.
pub trait MetricSource {
    /// What this source produces. `Default` is the zeroed record used when
    /// the source fails.
    type Record: Default;

    /// Which resource family this source covers.
    fn kind(&self) -> ResourceKind;

    /// Take one reading.
    fn sample(&mut self) -> Result<Self::Record, SourceError>;
}

pub type BoxedSource<R> = Box<dyn MetricSource<Record = R>>;

/// GPU readings: `None` when there is no GPU data at all.
pub type GpuReading = Option<Vec<GpuDevice>>;

/// One source per resource kind, queried in this order on every tick.
pub struct SourceSet {
    pub cpu: BoxedSource<CpuRecord>,
    pub memory: BoxedSource<MemoryRecord>,
    pub disk: BoxedSource<DiskRecord>,
    pub network: BoxedSource<NetworkRecord>,
    pub gpu: BoxedSource<GpuReading>,
}

impl SourceSet {
    /// Sources backed by the real host.
    pub fn system() -> Self {
        Self {
            cpu: Box::new(cpu::CpuSource::new()),
            memory: Box::new(memory::MemorySource::new()),
            disk: Box::new(disk::DiskSource::new()),
            network: Box::new(network::NetworkSource::new()),
            gpu: Box::new(gpu::GpuSource::new()),
        }
    }
}
