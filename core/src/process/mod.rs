//! Process launching and signalling for the alcor supervisor
//!
//! Platform-specific implementations of child-process creation with stdio
//! redirection, process-group isolation, and graceful/forceful termination.
//!
//! ## Platform Support
//!
//! - **Unix**: full support, using `setsid()` process groups so the whole
//!   child tree can be signalled independently of the supervisor's own group

#[cfg(unix)]
pub mod unix;

#[cfg(unix)]
pub use unix::*;
