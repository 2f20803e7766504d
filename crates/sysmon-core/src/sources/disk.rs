//! Root filesystem capacity and cumulative block-device IO.

use std::path::Path;

use sysinfo::Disks;

use super::MetricSource;
#[cfg(target_os = "linux")]
use super::helpers::is_likely_disk_device;
use crate::error::SourceError;
use crate::snapshot::{DiskRecord, ResourceKind, percent_of};

/// Bytes per sector in `/proc/diskstats`, independent of the device's real
/// sector size.
#[cfg(target_os = "linux")]
const DISKSTATS_SECTOR_BYTES: u64 = 512;

pub struct DiskSource {
    disks: Disks,
}

impl DiskSource {
    pub fn new() -> Self {
        Self {
            disks: Disks::new_with_refreshed_list(),
        }
    }
}

impl Default for DiskSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSource for DiskSource {
    type Record = DiskRecord;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Disk
    }

    fn sample(&mut self) -> Result<DiskRecord, SourceError> {
        self.disks.refresh(true);

        let root = self
            .disks
            .list()
            .iter()
            .find(|d| d.mount_point() == Path::new("/"))
            .or_else(|| self.disks.list().iter().max_by_key(|d| d.total_space()))
            .ok_or(SourceError::Unavailable("mounted filesystems"))?;

        let (read_bytes, write_bytes) = read_io_totals()?;
        Ok(disk_record(
            root.total_space(),
            root.available_space(),
            read_bytes,
            write_bytes,
        ))
    }
}

fn disk_record(total: u64, free: u64, read_bytes: u64, write_bytes: u64) -> DiskRecord {
    let used = total.saturating_sub(free);
    DiskRecord {
        total,
        used,
        free,
        percent: percent_of(used, total),
        read_bytes,
        write_bytes,
    }
}

#[cfg(target_os = "linux")]
fn read_io_totals() -> Result<(u64, u64), SourceError> {
    let raw = std::fs::read_to_string("/proc/diskstats")?;
    Ok(parse_diskstats(&raw))
}

#[cfg(not(target_os = "linux"))]
fn read_io_totals() -> Result<(u64, u64), SourceError> {
    Ok((0, 0))
}

/// Sum read and written bytes over whole-disk devices in `/proc/diskstats`.
///
/// Fields after the device name: reads completed, reads merged, sectors read,
/// time reading, writes completed, writes merged, sectors written, ...
#[cfg(target_os = "linux")]
pub fn parse_diskstats(raw: &str) -> (u64, u64) {
    let mut read_sectors = 0u64;
    let mut write_sectors = 0u64;

    for line in raw.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 14 {
            continue;
        }
        if !is_likely_disk_device(parts[2]) {
            continue;
        }
        let (Ok(read), Ok(written)) = (parts[5].parse::<u64>(), parts[9].parse::<u64>()) else {
            continue;
        };
        read_sectors = read_sectors.saturating_add(read);
        write_sectors = write_sectors.saturating_add(written);
    }

    (
        read_sectors.saturating_mul(DISKSTATS_SECTOR_BYTES),
        write_sectors.saturating_mul(DISKSTATS_SECTOR_BYTES),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_derives_used_and_percent() {
        let r = disk_record(1000, 250, 7, 9);
        assert_eq!(r.used, 750);
        assert!((r.percent - 75.0).abs() < 1e-9);
        assert_eq!((r.read_bytes, r.write_bytes), (7, 9));
    }

    #[test]
    fn zero_sized_filesystem() {
        let r = disk_record(0, 0, 0, 0);
        assert_eq!(r.percent, 0.0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn diskstats_sums_whole_disks_only() {
        let raw = "\
   8       0 sda 1000 10 2000 300 500 20 4000 600 0 700 900 0 0 0 0
   8       1 sda1 900 5 1800 250 400 10 3000 500 0 600 800 0 0 0 0
 259       0 nvme0n1 100 0 10 5 50 0 20 3 0 8 8 0 0 0 0
   7       0 loop0 99 0 9999 1 0 0 0 0 0 1 1 0 0 0 0
 garbage line
";
        let (read, written) = parse_diskstats(raw);
        assert_eq!(read, (2000 + 10) * 512);
        assert_eq!(written, (4000 + 20) * 512);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn diskstats_empty_input() {
        assert_eq!(parse_diskstats(""), (0, 0));
    }
}
