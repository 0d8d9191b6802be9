use std::{io, time::Duration};

use thiserror::Error;

/// Startup configuration problems. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TELEGRAM_BOT_TOKEN is required")]
    MissingToken,
    #[error("invalid Telegram API url '{url}': {reason}")]
    InvalidApiUrl { url: String, reason: String },
    #[error("invalid menu style '{0}', expected 'inline' or 'reply'")]
    InvalidMenuStyle(String),
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
    #[error("failed to read config file '{path}': {reason}")]
    File { path: String, reason: String },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http request failed: {0}")]
    Http(String),
    #[error("bot api error{}: {description}", .code.map(|c| format!(" {c}")).unwrap_or_default())]
    Api {
        code: Option<i64>,
        description: String,
    },
    #[error("failed to decode bot api response: {0}")]
    Decode(String),
    #[error("transport shut down")]
    Shutdown,
}

impl TransportError {
    /// Errors after which polling cannot succeed without operator action.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Api {
                code: Some(401 | 404),
                ..
            } | Self::Shutdown
        )
    }
}

/// Telemetry read failure. Displays as the bare cause so callers can prefix
/// the metric name.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Malformed(String),
    #[error("monitoring is only supported on linux")]
    Unsupported,
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("execution not permitted: {program}")]
    NotPermitted { program: String },
    #[error("must run as root (effective uid {euid})")]
    PrivilegeRequired { euid: u32 },
    #[error("privileged operations are only supported on unix")]
    Unsupported,
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} exited with {}", .code.map(|c| format!("status {c}")).unwrap_or_else(|| "a signal".into()))]
    Exited { program: String, code: Option<i32> },
    #[error("{program} timed out after {}s", .timeout.as_secs())]
    TimedOut { program: String, timeout: Duration },
}
