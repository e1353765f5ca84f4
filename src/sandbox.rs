// src/sandbox.rs
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::config::SandboxConfig;

pub const TIMEOUT_MESSAGE: &str = "Execution timed out.";

/// How a sandboxed run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// The interpreter exited on its own with this code.
    Exited(i32),
    /// The interpreter was terminated by a signal.
    Signaled,
    /// The wall-clock budget ran out and the process was killed.
    TimedOut,
    /// The interpreter could not be started at all.
    LaunchFailed,
}

/// Result of one sandboxed run.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl ExecutionResult {
    pub fn succeeded(&self) -> bool {
        self.status == ExecutionStatus::Exited(0)
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self.status {
            ExecutionStatus::Exited(code) => Some(code),
            _ => None,
        }
    }

    /// Stdout when the program printed anything, stderr otherwise.
    pub fn output(&self) -> &str {
        let stdout = self.stdout.trim_end();
        if stdout.is_empty() { self.stderr.trim_end() } else { stdout }
    }

    /// The text that best describes a failure: stderr first, then whatever `output` shows.
    pub fn failure_text(&self) -> &str {
        let stderr = self.stderr.trim_end();
        if stderr.is_empty() { self.output() } else { stderr }
    }

    fn synthetic(status: ExecutionStatus, message: String, elapsed: Duration) -> Self {
        Self { status, stdout: String::new(), stderr: message, elapsed }
    }
}

/// Something that can run a code snippet to completion.
#[async_trait]
pub trait CodeRunner: Send + Sync {
    async fn run(&self, code: &str) -> ExecutionResult;
}

/// Runs code with an external interpreter as a short-lived child process.
///
/// The child gets a cleared environment (only `PATH` survives), no stdin and
/// piped output. It is spawned with `kill_on_drop`, so it dies both when the
/// timeout fires and when the caller's future is dropped, e.g. after a client
/// disconnect. A semaphore caps how many children exist at once.
///
/// This is process isolation plus a timeout, nothing more: the code can still
/// touch the filesystem and the network with the server's privileges.
pub struct ProcessSandbox {
    config: SandboxConfig,
    permits: Arc<Semaphore>,
}

impl ProcessSandbox {
    pub fn new(config: SandboxConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent));
        Self { config, permits }
    }

    pub fn available_slots(&self) -> usize {
        self.permits.available_permits()
    }

    /// Waits for a slot, then runs the child to completion. Dropping this future
    /// drops the child, which kills it.
    async fn execute(&self, run_id: &str, code: &str, start: Instant) -> ExecutionResult {
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                return ExecutionResult::synthetic(
                    ExecutionStatus::LaunchFailed,
                    "Error: sandbox is shutting down".to_string(),
                    start.elapsed(),
                );
            }
        };

        log::debug!(
            "[run {}] starting {} ({} bytes of code, queued {}ms)",
            run_id,
            self.config.interpreter,
            code.len(),
            start.elapsed().as_millis()
        );

        let path_env = std::env::var("PATH").unwrap_or_else(|_| "/usr/bin:/usr/local/bin:/bin".to_string());

        let child = Command::new(&self.config.interpreter)
            .arg(&self.config.exec_flag)
            .arg(code)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env_clear()
            .env("PATH", &path_env)
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                log::error!("[run {}] failed to launch {}: {}", run_id, self.config.interpreter, e);
                return ExecutionResult::synthetic(ExecutionStatus::LaunchFailed, format!("Error: {}", e), start.elapsed());
            }
        };

        match child.wait_with_output().await {
            Ok(output) => {
                let status = match output.status.code() {
                    Some(code) => ExecutionStatus::Exited(code),
                    None => ExecutionStatus::Signaled,
                };
                ExecutionResult {
                    status,
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    elapsed: start.elapsed(),
                }
            }
            Err(e) => ExecutionResult::synthetic(ExecutionStatus::LaunchFailed, format!("Error: {}", e), start.elapsed()),
        }
    }
}

#[async_trait]
impl CodeRunner for ProcessSandbox {
    async fn run(&self, code: &str) -> ExecutionResult {
        let run_id = Uuid::new_v4().simple().to_string()[..8].to_string();
        let start = Instant::now();

        // Time spent waiting for a slot counts against the same budget as the run.
        let result = match tokio::time::timeout(self.config.timeout, self.execute(&run_id, code, start)).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!("[run {}] gave up after {:?}", run_id, self.config.timeout);
                ExecutionResult::synthetic(ExecutionStatus::TimedOut, TIMEOUT_MESSAGE.to_string(), start.elapsed())
            }
        };

        log::info!(
            "[run {}] finished with {:?} in {}ms",
            run_id,
            result.status,
            result.elapsed.as_millis()
        );

        result
    }
}
