//! Spawns the real MCP server, wires its stdio to the host's, and owns
//! the process lifecycle (`spec.md` §4.4). Does not auto-restart on
//! crash — see `SPEC_FULL.md` §4.4: the host is expected to respawn its
//! own child, the supervisor here performs exactly one spawn-wait-exit.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::process::Command;

use crate::capture::CaptureQueue;
use crate::error::ProxyError;
use crate::pipe::{forward, mirror_stderr};
use crate::store::MessageStore;
use crate::writer::CaptureWriter;
use mcp_audit_model::Direction;

const SPAWN_RETRY_ATTEMPTS: u32 = 5;
const SPAWN_RETRY_INITIAL_BACKOFF_MS: u64 = 2;
const SPAWN_RETRY_MAX_BACKOFF_MS: u64 = 50;
const CHILD_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub command: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub host: String,
    pub server: String,
    pub store_path: PathBuf,
    pub capture_soft_cap: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct SupervisorOutcome {
    pub exit_code: i32,
    pub captures_dropped: u64,
}

/// Where `run` records the spawned child's pid while it supervises it,
/// so `mcp-audit proxy-status` can report which servers currently have a
/// live supervised child without needing a separate daemon registry.
/// Sibling of the message store, one file per server.
pub fn pid_file_path(store_path: &Path, server: &str) -> PathBuf {
    store_path.with_file_name(format!("mcp_audit_{server}.pid"))
}

/// Spawns `command`, retrying on a transiently busy executable (the same
/// "text file busy" condition the corpus's own process spawner guards
/// against when a binary was just written by another process).
fn spawn_with_retry(mut command: Command, command_label: &str) -> Result<tokio::process::Child, ProxyError> {
    let mut backoff = Duration::from_millis(SPAWN_RETRY_INITIAL_BACKOFF_MS);
    for attempt in 0..SPAWN_RETRY_ATTEMPTS {
        match command.spawn() {
            Ok(child) => return Ok(child),
            Err(source) => {
                let is_busy = matches!(source.kind(), std::io::ErrorKind::ExecutableFileBusy)
                    || source.raw_os_error() == Some(26);
                if is_busy && attempt + 1 < SPAWN_RETRY_ATTEMPTS {
                    std::thread::sleep(backoff);
                    backoff = std::cmp::min(backoff * 2, Duration::from_millis(SPAWN_RETRY_MAX_BACKOFF_MS));
                    continue;
                }
                return Err(ProxyError::Spawn {
                    command: command_label.to_string(),
                    source,
                });
            }
        }
    }
    unreachable!("spawn loop always returns")
}

/// Waits for a termination request: `SIGTERM` or `SIGINT` on Unix,
/// Ctrl-C everywhere else.
async fn wait_for_terminate_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("install SIGINT handler");
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Runs one proxied server end to end: spawn, wire pipes, capture,
/// watch for exit or signal, shut down. Returns the child's exit code
/// (or 0 on a clean signal-driven shutdown) plus the total number of
/// records dropped from capture (queue overflow + store-append
/// failures combined, per `spec.md` §8 scenario S6).
pub async fn run(config: SupervisorConfig) -> Result<SupervisorOutcome, ProxyError> {
    run_with_host_io(config, tokio::io::stdin(), tokio::io::stdout()).await
}

/// The guts of [`run`], parameterized over the host side of the pipe
/// instead of hardcoding the process's real stdin/stdout. `run` is the
/// only production caller (always passing the real process stdio);
/// integration tests call this directly with an in-memory reader/writer
/// so a capture-path scenario like `spec.md` §8 S6 can be driven without
/// needing control of the test binary's own stdio streams.
pub async fn run_with_host_io<R, W>(
    config: SupervisorConfig,
    host_stdin: R,
    host_stdout: W,
) -> Result<SupervisorOutcome, ProxyError>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
    W: tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let mut command = Command::new(&config.command);
    command
        .args(&config.args)
        .envs(config.env.iter().cloned())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = spawn_with_retry(command, &config.command)?;

    let pid_path = pid_file_path(&config.store_path, &config.server);
    if let Some(pid) = child.id() {
        let _ = std::fs::write(&pid_path, pid.to_string());
    }

    let child_stdin = child
        .stdin
        .take()
        .ok_or(ProxyError::ChildStdioUnavailable("stdin"))?;
    let child_stdout = child
        .stdout
        .take()
        .ok_or(ProxyError::ChildStdioUnavailable("stdout"))?;
    let child_stderr = child
        .stderr
        .take()
        .ok_or(ProxyError::ChildStdioUnavailable("stderr"))?;

    let capture = CaptureQueue::new(config.capture_soft_cap);
    let store = MessageStore::new(&config.store_path);
    let writer = CaptureWriter::new(capture.clone(), store, &config.host, &config.server);
    let capture_errors = writer.capture_errors_handle();

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let writer_task = tokio::spawn(writer.run(shutdown_rx));

    let stdin_forward = tokio::spawn(forward(
        host_stdin,
        child_stdin,
        Direction::HostToServer,
        capture.clone(),
    ));
    let stdout_forward = tokio::spawn(forward(
        child_stdout,
        host_stdout,
        Direction::ServerToHost,
        capture.clone(),
    ));
    let stderr_mirror = tokio::spawn(mirror_stderr(child_stderr, capture.clone()));

    let exit_code = tokio::select! {
        status = child.wait() => {
            status.map_err(ProxyError::Wait)?.code().unwrap_or(1)
        }
        _ = wait_for_terminate_signal() => {
            #[cfg(unix)]
            send_sigterm(&child);
            let graceful = tokio::time::timeout(CHILD_SHUTDOWN_GRACE, child.wait()).await;
            match graceful {
                Ok(status) => status.map_err(ProxyError::Wait)?.code().unwrap_or(0),
                Err(_) => {
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    0
                }
            }
        }
    };

    let _ = shutdown_tx.send(true);
    let _ = stdin_forward.await;
    let _ = stdout_forward.await;
    let _ = stderr_mirror.await;
    let _ = writer_task.await;
    let _ = std::fs::remove_file(&pid_path);

    Ok(SupervisorOutcome {
        exit_code,
        captures_dropped: capture.captures_dropped() + capture_errors.load(Ordering::Relaxed),
    })
}

/// Forwards `SIGTERM` to the child so it gets a chance at graceful
/// shutdown before the grace period elapses and we hard-kill it.
#[cfg(unix)]
fn send_sigterm(child: &tokio::process::Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
    }
}
