//! Core error types and utilities

use thiserror::Error;

/// Supervisor error types
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// Pipe creation, inheritance-flag adjustment, or process creation
    /// failed. Fatal: reported to stderr before any child runs.
    #[error("{operation} failed with error {code}: {message}")]
    Setup {
        /// The operation that failed (e.g. `pipe`, `spawn`)
        operation: &'static str,
        /// OS error code, or -1 when none is available
        code: i32,
        /// System error message
        message: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Initialization error: {0}")]
    Initialization(String),

    /// Signal delivery to the child's process group failed during teardown.
    /// Non-fatal: the forced-kill path is the fallback.
    #[error("Signal error: {0}")]
    Signal(String),

    #[error("Wait error: {0}")]
    Wait(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SupervisorError {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            SupervisorError::Setup { .. } => "SUP001",
            SupervisorError::Validation(_) => "SUP002",
            SupervisorError::Initialization(_) => "SUP003",
            SupervisorError::Signal(_) => "SUP004",
            SupervisorError::Wait(_) => "SUP005",
            SupervisorError::Io(_) => "SUP006",
        }
    }

    /// Build a `Setup` error from a failed I/O operation
    pub fn setup(operation: &'static str, err: &std::io::Error) -> Self {
        SupervisorError::Setup {
            operation,
            code: err.raw_os_error().unwrap_or(-1),
            message: err.to_string(),
        }
    }

    /// Build a `Setup` error from a failed system call
    pub fn setup_errno(operation: &'static str, errno: nix::errno::Errno) -> Self {
        SupervisorError::Setup {
            operation,
            code: errno as i32,
            message: errno.desc().to_string(),
        }
    }
}

/// Supervisor-specific result type
pub type Result<T> = std::result::Result<T, SupervisorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let setup = SupervisorError::Setup {
            operation: "pipe",
            code: 24,
            message: "Too many open files".to_string(),
        };
        assert_eq!(setup.code(), "SUP001");
        assert_eq!(SupervisorError::Validation("test".to_string()).code(), "SUP002");
        assert_eq!(SupervisorError::Initialization("test".to_string()).code(), "SUP003");
        assert_eq!(SupervisorError::Signal("test".to_string()).code(), "SUP004");
        assert_eq!(SupervisorError::Wait("test".to_string()).code(), "SUP005");
    }

    #[test]
    fn test_setup_display_matches_diagnostic_format() {
        let error = SupervisorError::Setup {
            operation: "spawn",
            code: 2,
            message: "No such file or directory".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "spawn failed with error 2: No such file or directory"
        );
    }

    #[test]
    fn test_setup_errno_carries_os_code() {
        let error = SupervisorError::setup_errno("fcntl(F_SETFD)", nix::errno::Errno::EBADF);
        match error {
            SupervisorError::Setup { operation, code, .. } => {
                assert_eq!(operation, "fcntl(F_SETFD)");
                assert_eq!(code, nix::errno::Errno::EBADF as i32);
            }
            e => panic!("Expected Setup error, got: {}", e),
        }
    }
}
