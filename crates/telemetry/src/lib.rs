//! Host telemetry queries rendered as short human-readable strings.

use async_trait::async_trait;
use shared::error::TelemetryError;

mod proc;

pub use proc::{format_uptime, ProcTelemetry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Cpu,
    Memory,
    Disk,
    Uptime,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::Cpu, Metric::Memory, Metric::Disk, Metric::Uptime];

    pub fn label(self) -> &'static str {
        match self {
            Metric::Cpu => "CPU",
            Metric::Memory => "Memory",
            Metric::Disk => "Disk",
            Metric::Uptime => "Uptime",
        }
    }
}

/// Side-effect-free host queries. `cpu_percent` blocks for a short sampling
/// window; the rest return immediately.
#[async_trait]
pub trait TelemetryProvider: Send + Sync {
    async fn cpu_percent(&self) -> Result<String, TelemetryError>;
    async fn memory_usage(&self) -> Result<String, TelemetryError>;
    async fn disk_usage(&self) -> Result<String, TelemetryError>;
    async fn uptime(&self) -> Result<String, TelemetryError>;

    async fn read(&self, metric: Metric) -> Result<String, TelemetryError> {
        match metric {
            Metric::Cpu => self.cpu_percent().await,
            Metric::Memory => self.memory_usage().await,
            Metric::Disk => self.disk_usage().await,
            Metric::Uptime => self.uptime().await,
        }
    }
}

/// `"<Label>: <value>"` on success, `"<Label> error: <cause>"` on failure.
pub fn metric_line(metric: Metric, reading: &Result<String, TelemetryError>) -> String {
    match reading {
        Ok(value) => format!("{}: {value}", metric.label()),
        Err(err) => format!("{} error: {err}", metric.label()),
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn metric_line_formats_value_and_error() {
        assert_eq!(
            metric_line(Metric::Memory, &Ok("10.0% (1MB/10MB)".into())),
            "Memory: 10.0% (1MB/10MB)"
        );
        let err = TelemetryError::from(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "permission denied",
        ));
        assert_eq!(
            metric_line(Metric::Cpu, &Err(err)),
            "CPU error: permission denied"
        );
    }
}
