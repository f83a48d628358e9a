//! Integration tests for Unix process management
//!
//! These tests verify that process launching correctly:
//! - Creates children in their own process groups (via setsid)
//! - Terminates entire process groups with signals
//! - Keeps the supervisor-retained stdin end out of the child

#![cfg(unix)]
#![allow(unsafe_code)] // Required for libc calls in tests

use alcor_core::process::unix::{
    exit_code_of, signal_kill_group, signal_term_group, spawn, FORCED_EXIT_CODE,
};
use alcor_core::Config;
use std::time::Duration;

fn config_for(program: &str, args: &[&str]) -> Config {
    Config::new(
        Duration::from_secs(5),
        program,
        args.iter().map(|s| s.to_string()).collect(),
    )
    .expect("valid config")
}

/// Spawned children must live in their own process group
#[tokio::test]
async fn test_process_group_isolation() {
    let child = spawn(&config_for("sleep", &["5"])).expect("Failed to spawn sleep");

    let parent_pgid = unsafe { libc::getpgrp() };

    // Child PGID should be the same as its PID (since it's the group leader)
    assert_eq!(child.pid(), child.pgid());
    // ...and different from the supervisor's own group
    assert_ne!(child.pgid() as i32, parent_pgid);

    let _ = signal_kill_group(child.group());
}

#[tokio::test]
async fn test_sigterm_terminates_the_group() {
    let mut child = spawn(&config_for("sleep", &["10"])).expect("Failed to spawn sleep");

    // Give the child a moment to reach its own group before signalling
    tokio::time::sleep(Duration::from_millis(200)).await;

    signal_term_group(child.group()).expect("Failed to send SIGTERM");
    let status = child.wait().await.expect("Failed to wait for process");
    assert_eq!(exit_code_of(&status), 128 + libc::SIGTERM);
}

#[tokio::test]
async fn test_sigkill_maps_to_the_forced_exit_code() {
    let mut child = spawn(&config_for("sleep", &["10"])).expect("Failed to spawn sleep");

    tokio::time::sleep(Duration::from_millis(200)).await;

    signal_kill_group(child.group()).expect("Failed to send SIGKILL");
    let status = child.wait().await.expect("Failed to wait for process");
    assert_eq!(exit_code_of(&status), FORCED_EXIT_CODE);
}

/// Signals to the whole group must reach grandchildren too
#[tokio::test]
async fn test_process_group_tree_termination() {
    let mut child = spawn(&config_for("sh", &["-c", "sleep 30 & sleep 30 & wait"]))
        .expect("Failed to spawn shell");
    let pgid = child.pgid() as i32;

    tokio::time::sleep(Duration::from_millis(300)).await;

    signal_kill_group(child.group()).expect("Failed to send SIGKILL");
    let status = child.wait().await.expect("Failed to wait for shell");
    assert_eq!(exit_code_of(&status), FORCED_EXIT_CODE);

    // Once the leader is reaped the whole group should be gone
    tokio::time::sleep(Duration::from_millis(200)).await;
    let alive = unsafe { libc::kill(-pgid, 0) };
    assert_eq!(alive, -1, "process group {} should no longer exist", pgid);
}

/// The supervisor-retained stdin end must not leak into the child: once the
/// supervisor drops it, the child is the only holder of the channel and
/// observes end-of-input.
#[tokio::test]
async fn test_dropping_retained_stdin_delivers_eof() {
    let mut child =
        spawn(&config_for("sh", &["-c", "cat >/dev/null"])).expect("Failed to spawn cat");

    let stdin = child.take_stdin().expect("stdin write end retained");
    drop(stdin);

    // cat exits 0 on EOF; if the read end had leaked a duplicate write end
    // into the child, this would hang until the timeout below
    let status = tokio::time::timeout(Duration::from_secs(5), child.wait())
        .await
        .expect("child did not observe EOF")
        .expect("Failed to wait for cat");
    assert!(status.success());
}
