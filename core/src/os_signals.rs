//! OS termination-signal subscription
//!
//! [`wait_for_shutdown_signal`] completes when the process receives a
//! termination notification, whichever the platform exposes.
//!
//! ## Unix
//! - **SIGINT** (Ctrl-C in terminal)
//! - **SIGTERM** (default kill signal, used by systemd/Kubernetes)
//! - **SIGQUIT** (hard-stop "quit" signal)
//! - **SIGHUP** (terminal hangup, the analogue of console close/logoff)
//!
//! ## Other platforms
//! Only [`tokio::signal::ctrl_c`] is awaited.
//!
//! The caller's handler runs in a bounded window before the OS finishes
//! termination on its own, so whatever follows the await must itself be
//! time-bounded.

/// Waits for a termination signal.
///
/// Each call creates independent signal listeners.
///
/// Returns `Ok(())` when any signal is received, or `Err` if signal
/// registration fails.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
        _ = sighup.recv()  => {},
    }
    Ok(())
}

/// Waits for a termination signal.
///
/// Returns `Ok(())` when any signal is received, or `Err` if signal
/// registration fails.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
