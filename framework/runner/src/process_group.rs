//! Process-group helpers so a scenario's whole process tree can be stopped.
//!
//! Scenario commands run under `sh -c` and often background their load generators with `&`.
//! Each scenario's shell is started as the leader of a new process group, and termination
//! signals are sent to the group rather than to the shell alone. Otherwise a backgrounded
//! `stress-ng` would outlive its scenario and skew the next one.

use std::io;
use std::path::Path;
use std::process::Stdio;

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command};

/// Default shell used to interpret scenario commands.
pub const SHELL: &str = "/bin/sh";

/// Start `command` under `shell -c` as the leader of a new process group.
///
/// Stdout and stderr are piped, stdin is closed.
pub fn spawn_shell(shell: &Path, command: &str) -> io::Result<Child> {
    Command::new(shell)
        .arg("-c")
        .arg(command)
        .process_group(0)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
}

/// Send `signal` to every process in the group.
///
/// A group that no longer exists is not an error.
pub fn signal_group(process_group: u32, signal: Signal) -> io::Result<()> {
    match killpg(as_pid(process_group), signal) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(errno) => Err(io::Error::from(errno)),
    }
}

/// Whether any process in the group still exists.
///
/// Zombies count as existing until they are reaped.
pub fn group_exists(process_group: u32) -> bool {
    match killpg(as_pid(process_group), None) {
        Ok(()) => true,
        Err(Errno::ESRCH) => false,
        // EPERM means the group exists but belongs to someone else
        Err(_) => true,
    }
}

fn as_pid(process_group: u32) -> Pid {
    Pid::from_raw(process_group as i32)
}
