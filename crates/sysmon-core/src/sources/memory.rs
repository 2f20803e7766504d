//! Physical memory and swap usage.

use sysinfo::System;

use super::MetricSource;
use crate::error::SourceError;
use crate::snapshot::{MemoryRecord, ResourceKind, percent_of};

pub struct MemorySource {
    sys: System,
}

impl MemorySource {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSource for MemorySource {
    type Record = MemoryRecord;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Memory
    }

    fn sample(&mut self) -> Result<MemoryRecord, SourceError> {
        self.sys.refresh_memory();
        let total = self.sys.total_memory();
        if total == 0 {
            return Err(SourceError::Unavailable("memory statistics"));
        }
        Ok(memory_record(
            total,
            self.sys.available_memory(),
            self.sys.used_memory(),
            self.sys.total_swap(),
            self.sys.used_swap(),
        ))
    }
}

/// Percent is computed from what is not available, which also counts
/// reclaimable cache as free.
fn memory_record(
    total: u64,
    available: u64,
    used: u64,
    swap_total: u64,
    swap_used: u64,
) -> MemoryRecord {
    MemoryRecord {
        total,
        available,
        used,
        percent: percent_of(total.saturating_sub(available), total),
        swap_total,
        swap_used,
        swap_percent: percent_of(swap_used, swap_total),
    }
}
