//! Shared low-level helpers for metric sources: sysfs/procfs reads and
//! bounded external command execution.

use std::io::Read;
#[cfg(target_os = "linux")]
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// sysfs / procfs
// ---------------------------------------------------------------------------

#[cfg(target_os = "linux")]
pub fn read_trimmed(path: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(path).ok()?;
    let v = raw.trim();
    if v.is_empty() {
        None
    } else {
        Some(v.to_string())
    }
}

#[cfg(target_os = "linux")]
pub fn read_first_f64(path: &Path) -> Option<f64> {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| s.split_whitespace().next().and_then(|v| v.parse().ok()))
}

/// Whole-disk block devices only; partitions and virtual devices would double
/// count IO already attributed to their parent.
pub fn is_likely_disk_device(name: &str) -> bool {
    if name.starts_with("loop")
        || name.starts_with("ram")
        || name.starts_with("dm-")
        || name.starts_with("md")
        || name.starts_with("zram")
        || name.starts_with("sr")
        || name.starts_with("fd")
        || name.starts_with("nbd")
    {
        return false;
    }
    if name.starts_with("nvme") {
        return !name.contains('p');
    }
    if name.starts_with("mmcblk") {
        return !name.contains('p');
    }
    !name.chars().last().is_some_and(|c| c.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// External commands
// ---------------------------------------------------------------------------

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Run `cmd` with `args`, killing it once `timeout` elapses.
///
/// A missing binary surfaces as [`std::io::ErrorKind::NotFound`], a timeout as
/// [`std::io::ErrorKind::TimedOut`].
pub fn run_command(cmd: &str, args: &[&str], timeout: Duration) -> std::io::Result<CommandOutput> {
    let mut child = std::process::Command::new(cmd)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let start = Instant::now();
    loop {
        match child.try_wait()? {
            Some(status) => {
                let mut stdout = Vec::new();
                if let Some(mut pipe) = child.stdout.take() {
                    pipe.read_to_end(&mut stdout)?;
                }
                let mut stderr = Vec::new();
                if let Some(mut pipe) = child.stderr.take() {
                    pipe.read_to_end(&mut stderr)?;
                }
                return Ok(CommandOutput {
                    success: status.success(),
                    stdout: String::from_utf8_lossy(&stdout).trim().to_string(),
                    stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
                });
            }
            None => {
                if start.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        format!("{cmd} did not finish within {}ms", timeout.as_millis()),
                    ));
                }
                std::thread::sleep(Duration::from_millis(5));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disk_device_filter() {
        assert!(is_likely_disk_device("sda"));
        assert!(is_likely_disk_device("nvme0n1"));
        assert!(is_likely_disk_device("mmcblk0"));
        assert!(is_likely_disk_device("vdb"));
        assert!(!is_likely_disk_device("sda1"));
        assert!(!is_likely_disk_device("nvme0n1p2"));
        assert!(!is_likely_disk_device("mmcblk0p1"));
        assert!(!is_likely_disk_device("loop3"));
        assert!(!is_likely_disk_device("dm-0"));
        assert!(!is_likely_disk_device("zram0"));
    }

    #[test]
    fn missing_command_is_not_found() {
        let err = run_command(
            "sysmon-definitely-not-a-real-binary",
            &[],
            Duration::from_millis(200),
        )
        .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn captures_stdout() {
        let out = run_command("echo", &["hello"], Duration::from_secs(5)).unwrap();
        assert!(out.success);
        assert_eq!(out.stdout, "hello");
    }

    #[cfg(unix)]
    #[test]
    fn slow_command_times_out() {
        let err = run_command("sleep", &["5"], Duration::from_millis(50)).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::TimedOut);
    }
}
