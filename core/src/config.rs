//! Supervisor configuration
//!
//! A [`Config`] describes one child to supervise: the command line to start
//! it with, how long to wait for it after asking it to terminate, and an
//! optional file to stream into its stdin. The value is immutable after
//! construction and owned by the supervisor for its whole lifetime.

use crate::{Result, SupervisorError};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Immutable configuration for a single supervisor instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Time to wait for the child after it is asked to terminate
    grace_period: Duration,
    /// Program to execute
    program: String,
    /// Arguments passed to the program, verbatim
    args: Vec<String>,
    /// Optional file streamed into the child's stdin
    stdin_file: Option<PathBuf>,
}

impl Config {
    /// Create a validated configuration.
    ///
    /// The program name must be non-empty; arguments are passed through to
    /// the child unmodified.
    pub fn new(
        grace_period: Duration,
        program: impl Into<String>,
        args: Vec<String>,
    ) -> Result<Self> {
        let program = program.into();
        if program.trim().is_empty() {
            return Err(SupervisorError::Validation(
                "command: program cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            grace_period,
            program,
            args,
            stdin_file: None,
        })
    }

    /// Stream the given file into the child's stdin after spawn.
    pub fn with_stdin_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin_file = Some(path.into());
        self
    }

    /// How long teardown waits for the child before escalating to a kill
    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Program to execute
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the program
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Optional stdin source file
    pub fn stdin_file(&self) -> Option<&Path> {
        self.stdin_file.as_deref()
    }

    /// Space-joined rendering of the command line, for logs and diagnostics.
    /// The child is always spawned from the argument vector, never from this
    /// string.
    pub fn command_line(&self) -> String {
        let mut rendered = self.program.clone();
        for arg in &self.args {
            rendered.push(' ');
            rendered.push_str(arg);
        }
        rendered
    }
}
