//! Pipe setup for child stdio redirection
//!
//! Pipes are created with both ends inheritable so the child can receive its
//! end across `exec`. The supervisor-retained end must then be marked
//! close-on-exec with [`mark_non_inheritable`] before the spawn: after setup
//! the child must never hold the supervisor's end of a channel, and the
//! supervisor never holds the child's (its copy is closed once the spawn has
//! consumed it).

// Raw fcntl calls on descriptors we own
#![allow(unsafe_code)]

use crate::{Result, SupervisorError};
use nix::errno::Errno;
use std::os::fd::{AsRawFd, BorrowedFd, OwnedFd};
use tracing::debug;

/// Both ends of a freshly created byte channel
#[derive(Debug)]
pub struct PipePair {
    /// End the reader receives (the child, for a stdin channel)
    pub read: OwnedFd,
    /// End the writer retains
    pub write: OwnedFd,
}

/// Create a pipe whose ends are both inheritable by a spawned child.
pub fn create_pipe() -> Result<PipePair> {
    let (read, write) =
        nix::unistd::pipe().map_err(|e| SupervisorError::setup_errno("pipe", e))?;
    debug!(
        "Created pipe: read fd {}, write fd {}",
        read.as_raw_fd(),
        write.as_raw_fd()
    );
    Ok(PipePair { read, write })
}

/// Clear the inheritance flag on a descriptor (set `FD_CLOEXEC`).
///
/// Applied to the supervisor-retained end of each channel before spawning.
pub fn mark_non_inheritable(fd: BorrowedFd<'_>) -> Result<()> {
    // Safety: the descriptor is owned by the caller and open for the
    // duration of the call.
    let result = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFD, libc::FD_CLOEXEC) };
    if result == -1 {
        return Err(SupervisorError::setup_errno("fcntl(F_SETFD)", Errno::last()));
    }
    debug!("Marked fd {} non-inheritable", fd.as_raw_fd());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::os::fd::AsFd;

    fn descriptor_flags(fd: BorrowedFd<'_>) -> libc::c_int {
        unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_GETFD) }
    }

    #[test]
    fn test_pipe_ends_start_inheritable() {
        let pair = create_pipe().expect("Failed to create pipe");
        assert_eq!(descriptor_flags(pair.read.as_fd()) & libc::FD_CLOEXEC, 0);
        assert_eq!(descriptor_flags(pair.write.as_fd()) & libc::FD_CLOEXEC, 0);
    }

    #[test]
    fn test_mark_non_inheritable_sets_cloexec() {
        let pair = create_pipe().expect("Failed to create pipe");
        mark_non_inheritable(pair.write.as_fd()).expect("Failed to set FD_CLOEXEC");

        assert_ne!(descriptor_flags(pair.write.as_fd()) & libc::FD_CLOEXEC, 0);
        // The child-bound end stays inheritable
        assert_eq!(descriptor_flags(pair.read.as_fd()) & libc::FD_CLOEXEC, 0);
    }

    #[test]
    fn test_pipe_carries_bytes() {
        let pair = create_pipe().expect("Failed to create pipe");
        let mut writer = std::fs::File::from(pair.write);
        let mut reader = std::fs::File::from(pair.read);

        writer.write_all(b"ping").unwrap();
        drop(writer);

        let mut received = String::new();
        reader.read_to_string(&mut received).unwrap();
        assert_eq!(received, "ping");
    }
}
