//! Single-child supervision: spawn, watch, and tear down exactly once
//!
//! A [`Supervisor`] owns one child process for its whole lifetime. The child
//! runs in its own process group with its stdout/stderr attached to the
//! supervisor's streams; the supervisor retains the write end of the child's
//! stdin channel.
//!
//! ## Lifecycle
//!
//! ```text
//! Spawned → Running → ShutdownRequested → Exited(code)
//! ```
//!
//! A naturally exiting child skips `ShutdownRequested`. Transitions are
//! driven only by the exit watcher and [`Supervisor::teardown`]; the current
//! state is observable through a watch channel.
//!
//! ## Teardown
//!
//! [`Supervisor::teardown`] may be invoked concurrently from any number of
//! sources: the OS termination-signal task, end-of-input on the supervisor's
//! stdin, or a caller reacting to the child's natural exit. The
//! guarded slot holding the child is taken under a mutex, so the teardown
//! body runs at most once per child lifetime; every later trigger observes a
//! cleared slot and returns immediately.
//!
//! Teardown never returns before the exit watcher has published the child's
//! final status, so the supervisor's own exit code is accurate the moment
//! the call completes.

use crate::process::unix::{self, ChildProcess, EXIT_CODE_UNKNOWN};
use crate::{Config, Result, SupervisorError};
use nix::unistd::Pid;
use std::os::fd::OwnedFd;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{watch, Mutex};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Fixed buffer size for the optional stdin relay
const RELAY_BUF_SIZE: usize = 4096;

/// Lifecycle states of the supervised child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Child created, watcher not yet running
    Spawned,
    /// Child running and watched
    Running,
    /// Teardown has begun
    ShutdownRequested,
    /// Child reached a terminal state; the code is what the supervisor
    /// itself reports
    Exited(i32),
}

/// The value held by the teardown guard: just enough of the child to ask it
/// to stop. The waitable handle itself lives in the exit watcher.
#[derive(Debug)]
struct ChildGuard {
    /// Signalling target (the child's process group)
    pid: Pid,
    /// Retained stdin write end, `None` once relinquished to the relay
    stdin: Option<OwnedFd>,
}

/// Supervisor for exactly one child process
///
/// Create with [`Supervisor::start`], which spawns the child and its exit
/// watcher. All methods take `&self`; the supervisor is designed to be
/// shared across tasks behind the returned [`Arc`].
#[derive(Debug)]
pub struct Supervisor {
    config: Config,
    child_pid: u32,
    /// Teardown guard: at most one teardown execution is ever in flight
    guard: Mutex<Option<ChildGuard>>,
    state_tx: watch::Sender<ProcessState>,
    /// Exit watcher's broadcast; `None` until the final code is known
    exit_rx: watch::Receiver<Option<i32>>,
}

impl Supervisor {
    /// Spawn the configured child and start its exit watcher.
    ///
    /// Must be called from within a tokio runtime. Fails with a fatal
    /// `Setup` error if the stdin source (when configured), the pipe
    /// channel, or the process itself cannot be created; no child is left
    /// running on failure.
    pub fn start(config: Config) -> Result<Arc<Self>> {
        // Open the optional stdin source first so a bad path fails before
        // any child runs.
        let input = match config.stdin_file() {
            Some(path) => Some(
                std::fs::File::open(path).map_err(|e| SupervisorError::setup("open", &e))?,
            ),
            None => None,
        };

        let mut child = unix::spawn(&config)?;
        let child_pid = child.pid();
        let group = child.group();
        let mut stdin = child.take_stdin();

        if let Some(file) = input {
            if let Some(fd) = stdin.take() {
                spawn_stdin_relay(file, fd, child_pid);
            }
        }

        let (state_tx, _) = watch::channel(ProcessState::Spawned);
        let (exit_tx, exit_rx) = watch::channel(None);

        let supervisor = Arc::new(Supervisor {
            config,
            child_pid,
            guard: Mutex::new(Some(ChildGuard { pid: group, stdin })),
            state_tx,
            exit_rx,
        });
        spawn_exit_watcher(Arc::clone(&supervisor), child, exit_tx);

        info!("Supervising child {}", child_pid);
        Ok(supervisor)
    }

    /// The supervised child's process ID
    pub fn pid(&self) -> u32 {
        self.child_pid
    }

    /// Current lifecycle state
    pub fn current_state(&self) -> ProcessState {
        *self.state_tx.borrow()
    }

    /// Subscribe to lifecycle state changes
    pub fn subscribe_to_state(&self) -> watch::Receiver<ProcessState> {
        self.state_tx.subscribe()
    }

    /// Tear the child down: graceful-close request, SIGTERM to its process
    /// group, a wait bounded by the configured grace period, then SIGKILL.
    ///
    /// Idempotent and safe to invoke concurrently from any number of tasks;
    /// only the first caller with a live child executes the sequence, and a
    /// later call after the child has exited is a prompt no-op. Failures of
    /// the graceful steps are logged and never abort the escalation.
    ///
    /// Does not return until the exit watcher has observed the child's
    /// terminal state.
    pub async fn teardown(&self) {
        let mut slot = self.guard.lock().await;
        let Some(mut child) = slot.take() else {
            debug!("Teardown requested, but child {} is already torn down", self.child_pid);
            return;
        };
        self.state_tx.send_replace(ProcessState::ShutdownRequested);
        info!("Tearing down child {}", self.child_pid);

        // Cooperative close request first: end-of-input on the child's stdin.
        match child.stdin.take() {
            Some(end) => {
                drop(end);
                debug!("Closed stdin write end of child {}", self.child_pid);
            }
            None => debug!("Stdin write end of child {} already relinquished", self.child_pid),
        }

        if let Err(e) = unix::signal_term_group(child.pid) {
            warn!("Graceful termination request failed: {}", e);
        }

        let mut exit_rx = self.exit_rx.clone();
        match timeout(self.config.grace_period(), wait_for_exit(&mut exit_rx)).await {
            Ok(code) => {
                debug!("Child {} exited within the grace period with code {}", self.child_pid, code);
            }
            Err(_) => {
                warn!(
                    "Child {} did not exit within {:?}, killing its process group",
                    self.child_pid,
                    self.config.grace_period()
                );
                if let Err(e) = unix::signal_kill_group(child.pid) {
                    error!("Failed to kill process group of child {}: {}", self.child_pid, e);
                }
            }
        }

        // Hold the guard until the watcher has the final status in flight,
        // so the supervisor can never exit with a stale code.
        let code = wait_for_exit(&mut exit_rx).await;
        info!("Teardown of child {} complete, exit code {}", self.child_pid, code);
    }

    /// Wait for the child to reach its terminal state and return the exit
    /// code the supervisor itself reports.
    pub async fn wait_exit_code(&self) -> i32 {
        let mut exit_rx = self.exit_rx.clone();
        wait_for_exit(&mut exit_rx).await
    }

    /// Foreground gate on the supervisor's own standard input.
    ///
    /// Blocks until end-of-input or a completed line, then triggers
    /// [`Supervisor::teardown`] and stops reading. This is the interactive
    /// "press Enter to stop" / "close stdin to stop" path; run it
    /// concurrently with [`Supervisor::wait_exit_code`] so a naturally
    /// exiting child still terminates the caller while stdin stays open.
    pub async fn run_input_gate(&self) {
        let mut stdin = BufReader::new(tokio::io::stdin());
        let mut line = String::new();
        match stdin.read_line(&mut line).await {
            Ok(0) => debug!("End of input on stdin"),
            Ok(_) => debug!("Stop requested via stdin"),
            Err(e) => warn!("Failed to read stdin, treating as end of input: {}", e),
        }
        self.teardown().await;
    }
}

/// Exit watcher: the single source of truth for the supervisor's own exit
/// code, whether the child exited on its own or was torn down.
fn spawn_exit_watcher(
    supervisor: Arc<Supervisor>,
    mut child: ChildProcess,
    exit_tx: watch::Sender<Option<i32>>,
) {
    tokio::spawn(async move {
        supervisor.state_tx.send_replace(ProcessState::Running);

        let code = match child.wait().await {
            Ok(status) => unix::exit_code_of(&status),
            Err(e) => {
                error!("Failed to read exit status of child {}: {}", supervisor.child_pid, e);
                EXIT_CODE_UNKNOWN
            }
        };
        info!("Child {} exited with code {}", supervisor.child_pid, code);

        // Publish before clearing the guard: a teardown in flight holds the
        // guard while it waits for this value.
        let _ = exit_tx.send(Some(code));
        supervisor.guard.lock().await.take();
        supervisor.state_tx.send_replace(ProcessState::Exited(code));
    });
}

/// Wait until the exit watcher has published the child's final code.
async fn wait_for_exit(exit_rx: &mut watch::Receiver<Option<i32>>) -> i32 {
    loop {
        if let Some(code) = *exit_rx.borrow_and_update() {
            return code;
        }
        if exit_rx.changed().await.is_err() {
            // Watcher gone without publishing; nothing better to report.
            return EXIT_CODE_UNKNOWN;
        }
    }
}

/// Stream a file into the child's stdin through a fixed-size buffer, then
/// close the write end so the child observes end-of-input.
fn spawn_stdin_relay(file: std::fs::File, stdin: OwnedFd, child_pid: u32) {
    tokio::spawn(async move {
        let source = tokio::fs::File::from_std(file);
        let mut reader = tokio::io::BufReader::with_capacity(RELAY_BUF_SIZE, source);
        let mut writer = tokio::fs::File::from_std(std::fs::File::from(stdin));

        match tokio::io::copy_buf(&mut reader, &mut writer).await {
            Ok(bytes) => debug!("Relayed {} bytes into stdin of child {}", bytes, child_pid),
            // The child closing its end early just means it wants no more input.
            Err(e) => debug!("Stdin relay for child {} ended: {}", child_pid, e),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sh(script: &str) -> Config {
        Config::new(
            Duration::from_secs(5),
            "sh",
            vec!["-c".to_string(), script.to_string()],
        )
        .expect("valid config")
    }

    #[tokio::test]
    async fn test_start_reports_pid_and_initial_state() {
        let supervisor = Supervisor::start(sh("sleep 5")).expect("Failed to start");
        assert!(supervisor.pid() > 0);
        assert!(matches!(
            supervisor.current_state(),
            ProcessState::Spawned | ProcessState::Running
        ));
        supervisor.teardown().await;
    }

    #[tokio::test]
    async fn test_natural_exit_publishes_code() {
        let supervisor = Supervisor::start(sh("exit 0")).expect("Failed to start");
        assert_eq!(supervisor.wait_exit_code().await, 0);
    }

    #[tokio::test]
    async fn test_teardown_is_idempotent_after_exit() {
        let supervisor = Supervisor::start(sh("exit 0")).expect("Failed to start");
        assert_eq!(supervisor.wait_exit_code().await, 0);

        // Both calls must be prompt no-ops
        supervisor.teardown().await;
        supervisor.teardown().await;
        assert_eq!(supervisor.wait_exit_code().await, 0);
    }
}
