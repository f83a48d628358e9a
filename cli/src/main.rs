//! alcor binary
//!
//! Runs one command under supervision: the child's stdout/stderr attach to
//! the caller's streams, termination signals and end-of-input both trigger
//! the bounded teardown sequence, and the child's exit code becomes alcor's
//! own.

#![allow(unused_crate_dependencies)]

use alcor_core::{os_signals, utils, Config, Supervisor};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "alcor")]
#[command(about = "Supervise a child command with bounded, signal-safe shutdown")]
#[command(version)]
struct Cli {
    /// Seconds to wait for the child after asking it to terminate
    grace_period: u64,

    /// Command to run, followed by its arguments (passed through verbatim)
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,

    /// Stream the given file into the child's stdin, then close it
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> alcor_core::Result<Config> {
        let mut command = self.command.into_iter();
        // clap guarantees at least one element
        let program = command.next().unwrap_or_default();
        let args: Vec<String> = command.collect();

        let mut config = Config::new(Duration::from_secs(self.grace_period), program, args)?;
        if let Some(path) = self.input {
            config = config.with_stdin_file(path);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Quiet by default; the console belongs to the child. RUST_LOG overrides.
    if let Err(e) = utils::init_tracing("warn") {
        eprintln!("{}", e);
    }

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    match run(config).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

async fn run(config: Config) -> alcor_core::Result<i32> {
    info!("Starting child: {}", config.command_line());
    let supervisor = Supervisor::start(config)?;

    // Termination signals trigger the same teardown as end-of-input
    let on_signal = Arc::clone(&supervisor);
    tokio::spawn(async move {
        match os_signals::wait_for_shutdown_signal().await {
            Ok(()) => {
                info!("Termination signal received");
                on_signal.teardown().await;
            }
            Err(e) => error!("Failed to subscribe to termination signals: {}", e),
        }
    });

    // Foreground: the stdin gate, raced against the child's own exit so a
    // finished child ends the supervisor even while stdin stays open
    tokio::select! {
        _ = supervisor.run_input_gate() => {}
        _ = supervisor.wait_exit_code() => {}
    }

    Ok(supervisor.wait_exit_code().await)
}
