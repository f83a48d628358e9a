//! Core functionality for the alcor supervisor
//!
//! alcor launches one configured command with its stdio attached through
//! pipes, keeps it in its own process group, and guarantees a bounded,
//! idempotent shutdown sequence whenever the supervisor is asked to stop:
//! graceful-close request, SIGTERM, a wait bounded by the configured grace
//! period, then SIGKILL. The child's exit status becomes the supervisor's
//! own.

pub mod config;
pub mod error;
pub mod os_signals;
#[cfg(unix)]
pub mod pipe;
#[cfg(unix)]
pub mod process;
#[cfg(unix)]
pub mod supervisor;

pub use config::Config;
pub use error::{Result, SupervisorError};
#[cfg(unix)]
pub use supervisor::{ProcessState, Supervisor};

/// Core utilities and helper functions
pub mod utils {
    use tracing::debug;

    /// Initialize tracing for the application.
    ///
    /// Diagnostics go to stderr: the supervisor's stdout belongs to the
    /// child. `RUST_LOG` overrides the given default level.
    pub fn init_tracing(level: &str) -> crate::Result<()> {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| crate::SupervisorError::Initialization(e.to_string()))?;

        debug!("Tracing initialized with level: {}", level);
        Ok(())
    }
}
