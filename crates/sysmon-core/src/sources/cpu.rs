//! CPU utilization, frequency and package temperature.
//!
//! Temperature sensors are read as named groups (one group per hwmon chip or
//! thermal zone). Which group wins is decided by [`select_cpu_temperature`].

use std::collections::BTreeMap;
#[cfg(target_os = "linux")]
use std::path::Path;
use std::time::Instant;

use sysinfo::{MINIMUM_CPU_UPDATE_INTERVAL, System};

use super::MetricSource;
#[cfg(target_os = "linux")]
use super::helpers::{read_first_f64, read_trimmed};
use crate::error::SourceError;
use crate::snapshot::{CpuRecord, ResourceKind};

/// Preferred sensor group names, highest priority first.
const PREFERRED_SENSORS: [&str; 2] = ["coretemp", "cpu_thermal"];

/// Temperature readings in °C keyed by sensor group name.
pub type SensorGroups = BTreeMap<String, Vec<f64>>;

/// Pick the CPU temperature out of all available sensor groups.
///
/// `coretemp` first, then `cpu_thermal`, then the first reading of the
/// alphabetically first group that has one. Groups with no readings are
/// skipped.
pub fn select_cpu_temperature(groups: &SensorGroups) -> Option<f64> {
    for name in PREFERRED_SENSORS {
        if let Some(first) = groups.get(name).and_then(|readings| readings.first()) {
            return Some(*first);
        }
    }
    groups.values().find_map(|readings| readings.first().copied())
}

pub struct CpuSource {
    sys: System,
    last_refresh: Instant,
}

impl CpuSource {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        sys.refresh_cpu_frequency();
        Self {
            sys,
            last_refresh: Instant::now(),
        }
    }

    fn refresh(&mut self) {
        // Usage is computed between two refreshes; too short a gap reads as 0.
        let since = self.last_refresh.elapsed();
        if since < MINIMUM_CPU_UPDATE_INTERVAL {
            std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL - since);
        }
        self.sys.refresh_cpu_usage();
        self.sys.refresh_cpu_frequency();
        self.last_refresh = Instant::now();
    }
}

impl Default for CpuSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSource for CpuSource {
    type Record = CpuRecord;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Cpu
    }

    fn sample(&mut self) -> Result<CpuRecord, SourceError> {
        self.refresh();
        let cpus = self.sys.cpus();
        if cpus.is_empty() {
            return Err(SourceError::Unavailable("cpu statistics"));
        }

        let freq_current = cpus.first().map(|c| c.frequency()).unwrap_or(0);

        Ok(CpuRecord {
            percent: f64::from(self.sys.global_cpu_usage()),
            core_count: cpus.len(),
            freq_current_mhz: (freq_current > 0).then_some(freq_current as f64),
            freq_max_mhz: max_frequency_mhz(),
            temperature_c: select_cpu_temperature(&read_sensor_groups()),
        })
    }
}

#[cfg(target_os = "linux")]
fn max_frequency_mhz() -> Option<f64> {
    read_first_f64(Path::new("/sys/devices/system/cpu/cpu0/cpufreq/cpuinfo_max_freq"))
        .filter(|khz| *khz > 0.0)
        .map(|khz| khz / 1000.0)
}

#[cfg(not(target_os = "linux"))]
fn max_frequency_mhz() -> Option<f64> {
    None
}

/// All temperature sensors on this host, grouped by chip or zone name.
#[cfg(target_os = "linux")]
pub fn read_sensor_groups() -> SensorGroups {
    let mut groups = SensorGroups::new();
    read_hwmon_groups(Path::new("/sys/class/hwmon"), &mut groups);
    read_thermal_zone_groups(Path::new("/sys/class/thermal"), &mut groups);
    groups
}

#[cfg(not(target_os = "linux"))]
pub fn read_sensor_groups() -> SensorGroups {
    let mut groups = SensorGroups::new();
    let components = sysinfo::Components::new_with_refreshed_list();
    for component in components.list() {
        let Some(temp) = component.temperature() else {
            continue;
        };
        if !temp.is_finite() {
            continue;
        }
        let group = component
            .label()
            .split_whitespace()
            .next()
            .unwrap_or("unknown")
            .to_string();
        groups.entry(group).or_default().push(f64::from(temp));
    }
    groups
}

/// hwmon chips: `<root>/hwmonN/name` plus `tempK_input` files in millidegrees.
/// Chips sharing a name (one `coretemp` per package) share a group.
#[cfg(target_os = "linux")]
fn read_hwmon_groups(root: &Path, groups: &mut SensorGroups) {
    let Ok(entries) = std::fs::read_dir(root) else {
        return;
    };
    let mut dirs: Vec<_> = entries.flatten().map(|e| e.path()).collect();
    dirs.sort();

    for dir in dirs {
        let Some(chip) = read_trimmed(&dir.join("name")) else {
            continue;
        };
        let Ok(files) = std::fs::read_dir(&dir) else {
            continue;
        };
        let mut inputs: Vec<(u32, f64)> = files
            .flatten()
            .filter_map(|file| {
                let fname = file.file_name().to_string_lossy().into_owned();
                let index = fname
                    .strip_prefix("temp")?
                    .strip_suffix("_input")?
                    .parse::<u32>()
                    .ok()?;
                let millis = read_first_f64(&file.path())?;
                Some((index, millis / 1000.0))
            })
            .collect();
        if inputs.is_empty() {
            continue;
        }
        inputs.sort_by_key(|(index, _)| *index);
        groups
            .entry(chip)
            .or_default()
            .extend(inputs.into_iter().map(|(_, c)| c));
    }
}

/// Thermal zones: `<root>/thermal_zoneN/type` + `temp`. Only adds zones whose
/// name no hwmon chip already reported.
#[cfg(target_os = "linux")]
fn read_thermal_zone_groups(root: &Path, groups: &mut SensorGroups) {
    let Ok(entries) = std::fs::read_dir(root) else {
        return;
    };
    let mut dirs: Vec<_> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("thermal_zone"))
        })
        .collect();
    dirs.sort();

    let mut zones = SensorGroups::new();
    for dir in dirs {
        let Some(zone) = read_trimmed(&dir.join("type")) else {
            continue;
        };
        if groups.contains_key(&zone) {
            continue;
        }
        if let Some(millis) = read_first_f64(&dir.join("temp")) {
            zones.entry(zone).or_default().push(millis / 1000.0);
        }
    }
    groups.extend(zones);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(entries: &[(&str, &[f64])]) -> SensorGroups {
        entries
            .iter()
            .map(|(name, readings)| (name.to_string(), readings.to_vec()))
            .collect()
    }

    #[test]
    fn coretemp_wins_over_other_groups() {
        let g = groups(&[("coretemp", &[71.0]), ("other", &[55.0])]);
        assert_eq!(select_cpu_temperature(&g), Some(71.0));
    }

    #[test]
    fn falls_back_to_first_available_group() {
        let g = groups(&[("other", &[55.0])]);
        assert_eq!(select_cpu_temperature(&g), Some(55.0));
    }

    #[test]
    fn no_groups_means_no_temperature() {
        assert_eq!(select_cpu_temperature(&SensorGroups::new()), None);
    }

    #[test]
    fn cpu_thermal_beats_alphabetical_fallback() {
        let g = groups(&[("acpitz", &[40.0]), ("cpu_thermal", &[48.5])]);
        assert_eq!(select_cpu_temperature(&g), Some(48.5));
    }

    #[test]
    fn coretemp_beats_cpu_thermal() {
        let g = groups(&[("cpu_thermal", &[48.5]), ("coretemp", &[66.0, 64.0])]);
        assert_eq!(select_cpu_temperature(&g), Some(66.0));
    }

    #[test]
    fn fallback_is_alphabetical_and_skips_empty_groups() {
        let g = groups(&[("zeta", &[30.0]), ("beta", &[]), ("gamma", &[35.0])]);
        assert_eq!(select_cpu_temperature(&g), Some(35.0));
    }

    #[test]
    fn empty_preferred_group_falls_through() {
        let g = groups(&[("coretemp", &[]), ("nvme", &[41.0])]);
        assert_eq!(select_cpu_temperature(&g), Some(41.0));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn hwmon_groups_from_sysfs_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let hw0 = tmp.path().join("hwmon0");
        let hw1 = tmp.path().join("hwmon1");
        std::fs::create_dir_all(&hw0).unwrap();
        std::fs::create_dir_all(&hw1).unwrap();
        std::fs::write(hw0.join("name"), "coretemp\n").unwrap();
        std::fs::write(hw0.join("temp10_input"), "50000\n").unwrap();
        std::fs::write(hw0.join("temp2_input"), "61000\n").unwrap();
        std::fs::write(hw0.join("temp2_label"), "Core 0\n").unwrap();
        std::fs::write(hw1.join("name"), "nvme\n").unwrap();
        std::fs::write(hw1.join("temp1_input"), "38850\n").unwrap();

        let mut g = SensorGroups::new();
        read_hwmon_groups(tmp.path(), &mut g);
        assert_eq!(g.get("coretemp"), Some(&vec![61.0, 50.0]));
        assert_eq!(g.get("nvme"), Some(&vec![38.85]));
        assert_eq!(select_cpu_temperature(&g), Some(61.0));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn thermal_zones_do_not_shadow_hwmon() {
        let tmp = tempfile::tempdir().unwrap();
        let z0 = tmp.path().join("thermal_zone0");
        let z1 = tmp.path().join("thermal_zone1");
        std::fs::create_dir_all(&z0).unwrap();
        std::fs::create_dir_all(&z1).unwrap();
        std::fs::write(z0.join("type"), "cpu_thermal\n").unwrap();
        std::fs::write(z0.join("temp"), "47000\n").unwrap();
        std::fs::write(z1.join("type"), "x86_pkg_temp\n").unwrap();
        std::fs::write(z1.join("temp"), "52000\n").unwrap();

        let mut g = groups(&[("x86_pkg_temp", &[70.0])]);
        read_thermal_zone_groups(tmp.path(), &mut g);
        assert_eq!(g.get("cpu_thermal"), Some(&vec![47.0]));
        assert_eq!(g.get("x86_pkg_temp"), Some(&vec![70.0]));
    }

    #[test]
    fn live_sample_is_sane() {
        let mut source = CpuSource::new();
        let record = source.sample().unwrap();
        assert!(record.core_count >= 1);
        assert!((0.0..=100.0).contains(&record.percent));
    }
}
