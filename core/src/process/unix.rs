//! Unix child-process launching with process-group isolation
//!
//! The child is spawned into its own session and process group via
//! `setsid()`, so termination signals can be delivered to the entire child
//! tree without touching the supervisor's own group. SIGTERM is the graceful
//! request, SIGKILL the forced one; both are delivered with `killpg` and
//! treat an already-gone group as success.
//!
//! Stdio wiring: the child's stdin is the inheritable read end of a pipe
//! prepared by [`crate::pipe`], whose write end the supervisor retains;
//! stdout and stderr attach directly to the supervisor's own streams, so no
//! relay loop exists.

// Process management requires libc::setsid() in pre_exec
#![allow(unsafe_code)]

use crate::pipe;
use crate::{Config, Result, SupervisorError};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::os::fd::{AsFd, OwnedFd};
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};
use tracing::{debug, error, warn};

/// Exit code reported when the child's real status cannot be read.
pub const EXIT_CODE_UNKNOWN: i32 = 1;

/// Exit code observed after a forced SIGKILL of the child's process group,
/// per the `128 + signal` convention of [`exit_code_of`].
pub const FORCED_EXIT_CODE: i32 = 128 + libc::SIGKILL;

/// A child process running in its own process group
///
/// Holds the waitable handle plus the supervisor-retained write end of the
/// child's stdin channel. The write end doubles as the graceful-close hook:
/// dropping it delivers end-of-input to the child.
#[derive(Debug)]
pub struct ChildProcess {
    /// Process (and process group) ID of the spawned child
    pid: Pid,
    /// Underlying handle for waiting and status checking
    child: Child,
    /// Retained write end of the child's stdin pipe
    stdin: Option<OwnedFd>,
}

impl ChildProcess {
    /// Get the process ID
    pub fn pid(&self) -> u32 {
        self.pid.as_raw() as u32
    }

    /// Get the process group ID (same as the PID for session leaders)
    pub fn pgid(&self) -> u32 {
        self.pid.as_raw() as u32
    }

    /// The child's group as a signalling target
    pub fn group(&self) -> Pid {
        self.pid
    }

    /// Take the retained write end of the child's stdin channel
    pub fn take_stdin(&mut self) -> Option<OwnedFd> {
        self.stdin.take()
    }

    /// Wait for the process to exit and return its exit status (async)
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        self.child.wait().await.map_err(|e| {
            SupervisorError::Wait(format!("Failed to wait for process {}: {}", self.pid, e))
        })
    }

    /// Try to wait for the process to exit without blocking
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        self.child.try_wait().map_err(|e| {
            SupervisorError::Wait(format!("Failed to try_wait for process {}: {}", self.pid, e))
        })
    }
}

/// Spawn the configured child in its own process group.
///
/// Creates the stdin channel, marks the supervisor-retained end
/// non-inheritable, and launches the program with its stdout/stderr attached
/// straight to the supervisor's own streams. Environment and working
/// directory are inherited unchanged.
///
/// Fails with a fatal `Setup` error carrying the failing operation name and
/// the OS error code/message.
pub fn spawn(config: &Config) -> Result<ChildProcess> {
    debug!("Spawning child: {}", config.command_line());

    let stdin_pipe = pipe::create_pipe()?;
    pipe::mark_non_inheritable(stdin_pipe.write.as_fd())?;

    let mut command = Command::new(config.program());
    command.args(config.args());
    command.stdin(Stdio::from(stdin_pipe.read));
    command.stdout(Stdio::inherit());
    command.stderr(Stdio::inherit());

    // Use pre_exec to call setsid() in the child process
    // Safety: setsid() is async-signal-safe and appropriate for use in pre_exec
    #[deny(unsafe_op_in_unsafe_fn)]
    unsafe {
        command.pre_exec(|| {
            // Create a new session and process group
            let result = libc::setsid();
            if result == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let child = command.spawn().map_err(|e| {
        error!("Failed to spawn '{}': {}", config.program(), e);
        SupervisorError::setup("spawn", &e)
    })?;

    let raw_pid = child.id().ok_or_else(|| SupervisorError::Setup {
        operation: "spawn",
        code: -1,
        message: "spawned child did not have a PID".to_string(),
    })?;
    let pid = Pid::from_raw(raw_pid as i32);
    debug!("Spawned process {} in new process group", pid);

    Ok(ChildProcess {
        pid,
        child,
        stdin: Some(stdin_pipe.write),
    })
}

/// Deliver a signal to the child's process group.
///
/// `ESRCH` and `EPERM` are treated as success: both mean the group is
/// already gone (or being reclaimed), which is the outcome the caller
/// wanted.
fn signal_group(pid: Pid, signal: Signal) -> Result<()> {
    match killpg(pid, signal) {
        Ok(()) => {
            debug!("Sent {} to process group {}", signal, pid);
            Ok(())
        }
        Err(nix::errno::Errno::ESRCH) => {
            debug!("Process group {} already exited", pid);
            Ok(())
        }
        Err(nix::errno::Errno::EPERM) => {
            debug!(
                "Permission denied signalling process group {} (likely already exited)",
                pid
            );
            Ok(())
        }
        Err(e) => {
            error!("Failed to send {} to process group {}: {}", signal, pid, e);
            Err(SupervisorError::Signal(format!(
                "Failed to send {} to process group {}: {}",
                signal, pid, e
            )))
        }
    }
}

/// Send SIGTERM to the process group for graceful termination
pub fn signal_term_group(pid: Pid) -> Result<()> {
    signal_group(pid, Signal::SIGTERM)
}

/// Send SIGKILL to the process group for forceful termination
pub fn signal_kill_group(pid: Pid) -> Result<()> {
    signal_group(pid, Signal::SIGKILL)
}

/// Map a child's exit status to the code the supervisor itself reports.
///
/// A normal exit propagates the child's code verbatim. Signal deaths use the
/// shell convention of `128 + signal`, so a forced SIGKILL surfaces as
/// [`FORCED_EXIT_CODE`]. A status with neither code nor signal falls back to
/// [`EXIT_CODE_UNKNOWN`].
pub fn exit_code_of(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(signal) => 128 + signal,
        None => {
            warn!("Exit status {:?} has neither code nor signal", status);
            EXIT_CODE_UNKNOWN
        }
    }
}
