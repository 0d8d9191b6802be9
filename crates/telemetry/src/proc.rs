use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use shared::error::TelemetryError;
use tracing::debug;

use crate::TelemetryProvider;

const CPU_SAMPLE_WINDOW: Duration = Duration::from_millis(500);
const KIB: f64 = 1024.0;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Reads `/proc` and `statvfs` on Linux. Every query fails with
/// [`TelemetryError::Unsupported`] elsewhere.
#[derive(Debug, Clone)]
pub struct ProcTelemetry {
    proc_root: PathBuf,
    disk_path: PathBuf,
    sample_window: Duration,
}

impl Default for ProcTelemetry {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
            disk_path: PathBuf::from("/"),
            sample_window: CPU_SAMPLE_WINDOW,
        }
    }
}

impl ProcTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads from a different procfs root, mainly for tests.
    pub fn with_proc_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.proc_root = root.into();
        self
    }

    pub fn with_disk_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.disk_path = path.into();
        self
    }

    pub fn with_sample_window(mut self, window: Duration) -> Self {
        self.sample_window = window;
        self
    }

    async fn read_proc(&self, name: &str) -> Result<String, TelemetryError> {
        ensure_supported()?;
        let path = self.proc_root.join(name);
        debug!(path = %path.display(), "reading procfs");
        Ok(tokio::fs::read_to_string(path).await?)
    }
}

#[async_trait]
impl TelemetryProvider for ProcTelemetry {
    async fn cpu_percent(&self) -> Result<String, TelemetryError> {
        let before = parse_cpu_stat(&self.read_proc("stat").await?)?;
        tokio::time::sleep(self.sample_window).await;
        let after = parse_cpu_stat(&self.read_proc("stat").await?)?;
        Ok(cpu_usage(before, after))
    }

    async fn memory_usage(&self) -> Result<String, TelemetryError> {
        parse_meminfo(&self.read_proc("meminfo").await?)
    }

    async fn disk_usage(&self) -> Result<String, TelemetryError> {
        ensure_supported()?;
        let (total, free) = filesystem_space(&self.disk_path)?;
        Ok(format_disk(total, free))
    }

    async fn uptime(&self) -> Result<String, TelemetryError> {
        parse_uptime(&self.read_proc("uptime").await?)
    }
}

fn ensure_supported() -> Result<(), TelemetryError> {
    if cfg!(target_os = "linux") {
        Ok(())
    } else {
        Err(TelemetryError::Unsupported)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CpuTimes {
    idle: u64,
    total: u64,
}

/// Aggregate `cpu` line of `/proc/stat`; idle includes iowait.
fn parse_cpu_stat(raw: &str) -> Result<CpuTimes, TelemetryError> {
    let line = raw
        .lines()
        .next()
        .ok_or_else(|| TelemetryError::Malformed("empty stat".into()))?;
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 5 {
        return Err(TelemetryError::Malformed("invalid stat format".into()));
    }

    let mut values = Vec::with_capacity(fields.len() - 1);
    for field in &fields[1..] {
        let value = field
            .parse::<u64>()
            .map_err(|e| TelemetryError::Malformed(format!("invalid stat value '{field}': {e}")))?;
        values.push(value);
    }

    let total = values.iter().sum();
    let idle = values[3] + values.get(4).copied().unwrap_or(0);
    Ok(CpuTimes { idle, total })
}

fn cpu_usage(before: CpuTimes, after: CpuTimes) -> String {
    let idle_ticks = after.idle.saturating_sub(before.idle) as f64;
    let total_ticks = after.total.saturating_sub(before.total) as f64;
    if total_ticks == 0.0 {
        return "0%".into();
    }
    format!("{:.2}%", (1.0 - idle_ticks / total_ticks) * 100.0)
}

fn parse_meminfo(raw: &str) -> Result<String, TelemetryError> {
    let mut total = 0.0;
    let mut available = 0.0;
    for line in raw.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            total = parse_kib(rest);
        } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
            available = parse_kib(rest);
        }
    }
    if total == 0.0 {
        return Err(TelemetryError::Malformed("failed to read memory info".into()));
    }

    let used = total - available;
    Ok(format!(
        "{:.1}% ({:.0}MB/{:.0}MB)",
        used / total * 100.0,
        used / KIB,
        total / KIB
    ))
}

fn parse_kib(rest: &str) -> f64 {
    rest.split_whitespace()
        .next()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0.0)
}

fn parse_uptime(raw: &str) -> Result<String, TelemetryError> {
    let first = raw
        .split_whitespace()
        .next()
        .ok_or_else(|| TelemetryError::Malformed("invalid uptime format".into()))?;
    let seconds: f64 = first
        .parse()
        .map_err(|e| TelemetryError::Malformed(format!("invalid uptime '{first}': {e}")))?;
    Ok(format_uptime(seconds as i64))
}

/// `"3d 4h 5m"`, `"4h 5m"` or `"5m"`.
pub fn format_uptime(seconds: i64) -> String {
    let uptime = chrono::Duration::seconds(seconds.max(0));
    let days = uptime.num_days();
    let hours = uptime.num_hours() % 24;
    let minutes = uptime.num_minutes() % 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

fn format_disk(total: u64, free: u64) -> String {
    if total == 0 {
        return "0%".into();
    }
    let total = total as f64;
    let used = total - free as f64;
    format!(
        "{:.1}% ({:.1}GB/{:.1}GB)",
        used / total * 100.0,
        used / GIB,
        total / GIB
    )
}

#[cfg(target_os = "linux")]
fn filesystem_space(path: &Path) -> Result<(u64, u64), TelemetryError> {
    use std::{ffi::CString, io, mem::MaybeUninit, os::unix::ffi::OsStrExt};

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| TelemetryError::Malformed("disk path contains a nul byte".into()))?;
    let mut stat = MaybeUninit::<libc::statvfs>::uninit();
    // SAFETY: `c_path` is nul-terminated and `stat` is valid for writes of one statvfs.
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), stat.as_mut_ptr()) };
    if rc != 0 {
        return Err(io::Error::last_os_error().into());
    }
    // SAFETY: statvfs returned 0, so the struct is initialized.
    let stat = unsafe { stat.assume_init() };

    let block = stat.f_frsize as u64;
    Ok((stat.f_blocks as u64 * block, stat.f_bavail as u64 * block))
}

#[cfg(not(target_os = "linux"))]
fn filesystem_space(_path: &Path) -> Result<(u64, u64), TelemetryError> {
    Err(TelemetryError::Unsupported)
}

#[cfg(test)]
#[path = "tests/proc_tests.rs"]
mod tests;
