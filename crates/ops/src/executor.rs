use std::{
    io,
    process::Stdio,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use shared::error::ExecutionError;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10 * 60);
/// How long to keep reading the pipe after the child is gone. Past this,
/// whatever still holds the write end is killed with the process group.
const DRAIN_GRACE: Duration = Duration::from_secs(2);
const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Merged stdout/stderr of one or more commands plus the first failure.
/// Output is kept even when `error` is set.
#[derive(Debug, Default)]
pub struct ExecutionResult {
    pub output: Vec<u8>,
    pub error: Option<ExecutionError>,
}

impl ExecutionResult {
    pub fn failed(output: Vec<u8>, error: ExecutionError) -> Self {
        Self {
            output,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// Runs allow-listed programs with a hard timeout.
#[derive(Debug, Clone)]
pub struct PrivilegedExecutor {
    allow_list: Vec<String>,
    timeout: Duration,
    euid_probe: fn() -> Option<u32>,
}

impl PrivilegedExecutor {
    pub fn new<I, S>(allow_list: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allow_list: allow_list.into_iter().map(Into::into).collect(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
            euid_probe: effective_uid,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replaces the effective-uid lookup. `None` means the platform has no
    /// notion of uids.
    pub fn with_euid_probe(mut self, probe: fn() -> Option<u32>) -> Self {
        self.euid_probe = probe;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_allowed(&self, program: &str) -> bool {
        self.allow_list.iter().any(|entry| entry == program)
    }

    pub fn ensure_privileged(&self) -> Result<(), ExecutionError> {
        match (self.euid_probe)() {
            Some(0) => Ok(()),
            Some(euid) => Err(ExecutionError::PrivilegeRequired { euid }),
            None => Err(ExecutionError::Unsupported),
        }
    }

    pub async fn run(&self, command: &CommandLine) -> ExecutionResult {
        if !self.is_allowed(&command.program) {
            warn!(program = %command.program, "refusing to run program outside allow-list");
            return ExecutionResult::failed(
                Vec::new(),
                ExecutionError::NotPermitted {
                    program: command.program.clone(),
                },
            );
        }

        info!(command = %command, timeout_secs = self.timeout.as_secs(), "running command");
        let started = Instant::now();
        let result = self.spawn_and_wait(command).await;
        match &result.error {
            None => info!(
                command = %command,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "command finished"
            ),
            Some(error) => warn!(command = %command, %error, "command failed"),
        }
        result
    }

    /// Runs `steps` in order and stops at the first failure. Every program is
    /// checked against the allow-list before the first step starts.
    pub async fn run_sequence(&self, steps: &[CommandLine]) -> ExecutionResult {
        if let Some(step) = steps.iter().find(|step| !self.is_allowed(&step.program)) {
            warn!(program = %step.program, "sequence contains a program outside allow-list");
            return ExecutionResult::failed(
                Vec::new(),
                ExecutionError::NotPermitted {
                    program: step.program.clone(),
                },
            );
        }

        let mut output = Vec::new();
        for step in steps {
            let result = self.run(step).await;
            output.extend_from_slice(&result.output);
            if let Some(error) = result.error {
                return ExecutionResult::failed(output, error);
            }
        }
        ExecutionResult {
            output,
            error: None,
        }
    }

    async fn spawn_and_wait(&self, command: &CommandLine) -> ExecutionResult {
        let program = command.program.clone();
        let spawn_error = |source: io::Error| {
            ExecutionResult::failed(
                Vec::new(),
                ExecutionError::Spawn {
                    program: program.clone(),
                    source,
                },
            )
        };

        // stdout and stderr share one pipe so the bytes keep their order.
        let (reader, writer) = match io::pipe() {
            Ok(pair) => pair,
            Err(source) => return spawn_error(source),
        };
        let stderr_writer = match writer.try_clone() {
            Ok(clone) => clone,
            Err(source) => return spawn_error(source),
        };

        let mut process = Command::new(&command.program);
        process
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(stderr_writer)
            .kill_on_drop(true);
        #[cfg(unix)]
        process.process_group(0);

        let spawned = process.spawn();
        // Drops the parent's copies of the write end so the reader sees EOF.
        drop(process);
        let mut child = match spawned {
            Ok(child) => child,
            Err(source) => return spawn_error(source),
        };

        let group = child.id();
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let mut collector = tokio::spawn(collect_output(reader, Arc::clone(&buffer)));

        let error = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) if status.success() => None,
            Ok(Ok(status)) => Some(ExecutionError::Exited {
                program: program.clone(),
                code: status.code(),
            }),
            Ok(Err(source)) => Some(ExecutionError::Wait {
                program: program.clone(),
                source,
            }),
            Err(_) => {
                terminate(&mut child, &program).await;
                Some(ExecutionError::TimedOut {
                    program: program.clone(),
                    timeout: self.timeout,
                })
            }
        };

        if tokio::time::timeout(DRAIN_GRACE, &mut collector).await.is_err() {
            warn!(%program, "output pipe still open after exit, returning partial output");
            collector.abort();
            if let Some(pgid) = group {
                kill_group(pgid, &program);
            }
        }
        let output = std::mem::take(&mut *buffer.lock().unwrap_or_else(PoisonError::into_inner));

        ExecutionResult { output, error }
    }
}

/// Appends everything read from `reader` to `buffer` until EOF. Safe to
/// abort at any await point; bytes read so far stay in `buffer`.
#[cfg(unix)]
async fn collect_output(reader: io::PipeReader, buffer: Arc<Mutex<Vec<u8>>>) {
    use std::os::fd::OwnedFd;
    use tokio::{io::AsyncReadExt, net::unix::pipe};

    let mut receiver = match pipe::Receiver::from_owned_fd(OwnedFd::from(reader)) {
        Ok(receiver) => receiver,
        Err(err) => {
            warn!(error = %err, "cannot watch command output");
            return;
        }
    };
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        match receiver.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => buffer
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(&chunk[..n]),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                warn!(error = %err, "failed reading command output");
                break;
            }
        }
    }
}

#[cfg(not(unix))]
async fn collect_output(mut reader: io::PipeReader, buffer: Arc<Mutex<Vec<u8>>>) {
    use std::io::Read;

    let drained = tokio::task::spawn_blocking(move || {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => buffer
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    warn!(error = %err, "failed reading command output");
                    break;
                }
            }
        }
    });
    let _ = drained.await;
}

/// SIGKILLs every process left in the group created at spawn.
fn kill_group(pgid: u32, program: &str) {
    #[cfg(unix)]
    {
        // SAFETY: kill has no memory-safety preconditions; a negative pid
        // addresses a process group.
        let rc = unsafe { libc::kill(-(pgid as libc::pid_t), libc::SIGKILL) };
        if rc != 0 {
            debug!(%program, pgid, error = %io::Error::last_os_error(), "process group kill failed");
        }
    }
    #[cfg(not(unix))]
    debug!(%program, pgid, "process groups are not supported here");
}

/// Kills the child's whole process group and reaps the child.
async fn terminate(child: &mut Child, program: &str) {
    if let Some(pid) = child.id() {
        kill_group(pid, program);
    }
    if let Err(error) = child.kill().await {
        debug!(%program, %error, "child already exited");
    }
    warn!(%program, "command terminated after timeout");
}

fn effective_uid() -> Option<u32> {
    #[cfg(unix)]
    {
        // SAFETY: geteuid cannot fail and touches no memory.
        Some(unsafe { libc::geteuid() })
    }
    #[cfg(not(unix))]
    {
        None
    }
}

#[cfg(test)]
#[path = "tests/executor_tests.rs"]
mod tests;
