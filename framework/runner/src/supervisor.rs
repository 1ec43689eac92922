use std::future::Future;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use indicatif::ProgressBar;
use nix::sys::signal::Signal;
use stress_tunnel_core::prelude::{DelegatedShutdownListener, LatencyExtractor, LatencySample};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout};
use tokio::time::Instant;

use crate::process_group;

/// Default time to wait between reads of the probe output.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default time a process group is given to exit after `SIGTERM` before it is killed.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// How often the process group is checked while waiting for it to exit.
const GROUP_EXIT_POLL: Duration = Duration::from_millis(50);

/// How long to wait for the shell to be reaped after `SIGKILL`.
const KILL_REAP_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Scenario command is empty")]
    EmptyCommand,
    #[error("Failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Launched process has no {0}")]
    MissingHandle(&'static str),
    #[error("IO error while supervising process: {0}")]
    Io(#[from] std::io::Error),
}

/// The lifecycle of one supervised process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Reading output and waiting for the deadline or for the process to exit.
    Running,
    DeadlineReached,
    /// The shell exited by itself.
    Exited,
    /// A shutdown signal was received.
    Interrupted,
    /// `SIGTERM` has been sent to the process group, `SIGKILL` follows after the grace period.
    Terminating,
    Terminated,
}

/// Why a supervised process stopped being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    DeadlineReached,
    ProcessExited,
    Interrupted,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StopReason::DeadlineReached => "deadline reached",
            StopReason::ProcessExited => "process exited",
            StopReason::Interrupted => "interrupted",
        };
        f.write_str(s)
    }
}

/// The result of supervising one command.
#[derive(Debug)]
pub struct SupervisedRun {
    /// Samples in the order they were read, non-decreasing in `elapsed_seconds`.
    pub samples: Vec<LatencySample>,
    pub stop_reason: StopReason,
    /// Exit status of the shell, if it was reaped.
    pub exit_status: Option<ExitStatus>,
    /// Total time from launch until the process group was terminated.
    pub elapsed: Duration,
    /// The process group that was started, equal to the shell's PID.
    pub process_group: u32,
    /// Whether the process group had to be killed with `SIGKILL`.
    pub killed: bool,
}

enum LineRead {
    Line(String),
    Closed,
    TimedOut,
}

/// Runs a shell command under a deadline and collects the latency samples it prints.
///
/// One command is supervised at a time, on the calling task. The output is read one line per
/// poll, with each read bounded so that neither a silent process nor a stuck one can hold the
/// supervisor past its deadline.
pub struct Supervisor {
    extractor: LatencyExtractor,
    shell: PathBuf,
    grace_period: Duration,
    shutdown_listener: Option<DelegatedShutdownListener>,
    progress: Option<ProgressBar>,
}

impl Supervisor {
    pub fn new(extractor: LatencyExtractor) -> Self {
        Self {
            extractor,
            shell: PathBuf::from(process_group::SHELL),
            grace_period: DEFAULT_GRACE_PERIOD,
            shutdown_listener: None,
            progress: None,
        }
    }

    /// Interpret commands with `shell -c` instead of `/bin/sh -c`.
    pub fn with_shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Stop supervising early, and terminate the process group, when a shutdown is signalled.
    pub fn with_shutdown_listener(mut self, listener: DelegatedShutdownListener) -> Self {
        self.shutdown_listener = Some(listener);
        self
    }

    /// Show progress towards the deadline while supervising the next command.
    ///
    /// The bar is cleared when that command has been terminated.
    pub fn set_progress(&mut self, progress: Option<ProgressBar>) {
        self.progress = progress;
    }

    /// Run `command` until `deadline` has elapsed or it exits, whichever comes first.
    ///
    /// Whatever the reason for stopping, the command's process group is sent `SIGTERM` and then
    /// `SIGKILL` if it is still around after the grace period.
    pub async fn run(
        &mut self,
        command: &str,
        deadline: Duration,
        poll_interval: Duration,
    ) -> Result<SupervisedRun, SupervisorError> {
        if command.trim().is_empty() {
            return Err(SupervisorError::EmptyCommand);
        }

        let start = Instant::now();
        let mut child =
            process_group::spawn_shell(&self.shell, command).map_err(|source| SupervisorError::Launch {
                command: command.to_string(),
                source,
            })?;
        let process_group = child.id().ok_or(SupervisorError::MissingHandle("pid"))?;
        log::debug!("Started `{command}` as process group {process_group}");

        let Some(stdout) = child.stdout.take() else {
            self.terminate(&mut child, process_group, None).await;
            return Err(SupervisorError::MissingHandle("stdout pipe"));
        };
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(drain_stderr(stderr, process_group));
        }
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        let mut stdout_open = true;

        let mut samples = Vec::new();
        let mut exit_status = None;
        let mut state = SupervisorState::Running;

        while state == SupervisorState::Running {
            let Some(left) = remaining(start, deadline) else {
                transition(&mut state, SupervisorState::DeadlineReached, process_group);
                break;
            };

            if stdout_open {
                let read = self
                    .interruptible(read_line(
                        &mut reader,
                        &mut buf,
                        left.min(poll_interval),
                    ))
                    .await;
                match read {
                    Some(LineRead::Line(line)) => self.accept(&line, start, &mut samples),
                    Some(LineRead::Closed) => {
                        log::debug!("Process group {process_group} closed stdout");
                        stdout_open = false;
                    }
                    Some(LineRead::TimedOut) => {}
                    None => {
                        transition(&mut state, SupervisorState::Interrupted, process_group);
                        break;
                    }
                }
            }

            match child.try_wait() {
                Ok(Some(status)) => {
                    log::debug!("Process group {process_group} leader exited with {status}");
                    exit_status = Some(status);
                    transition(&mut state, SupervisorState::Exited, process_group);
                    break;
                }
                Ok(None) => {}
                Err(e) => {
                    log::error!("Cannot check process group {process_group} leader: {e}");
                    transition(&mut state, SupervisorState::Exited, process_group);
                    break;
                }
            }

            let Some(left) = remaining(start, deadline) else {
                transition(&mut state, SupervisorState::DeadlineReached, process_group);
                break;
            };
            if self
                .interruptible(tokio::time::sleep(poll_interval.min(left)))
                .await
                .is_none()
            {
                transition(&mut state, SupervisorState::Interrupted, process_group);
            }

            self.update_progress(start, samples.len());
        }

        let stop_reason = match state {
            SupervisorState::DeadlineReached => StopReason::DeadlineReached,
            SupervisorState::Exited => {
                if stdout_open {
                    let drain_window =
                        poll_interval.min(remaining(start, deadline).unwrap_or_default());
                    self.drain_stdout(&mut reader, &mut buf, start, drain_window, &mut samples)
                        .await;
                }
                StopReason::ProcessExited
            }
            SupervisorState::Interrupted => StopReason::Interrupted,
            other => unreachable!("supervisor loop ended in state {other:?}"),
        };
        log::info!(
            "Stopping process group {process_group} ({stop_reason}) after {:.1}s with {} samples",
            start.elapsed().as_secs_f64(),
            samples.len()
        );

        transition(&mut state, SupervisorState::Terminating, process_group);
        let (exit_status, killed) = self.terminate(&mut child, process_group, exit_status).await;
        transition(&mut state, SupervisorState::Terminated, process_group);

        if let Some(progress) = self.progress.take() {
            progress.finish_and_clear();
        }

        Ok(SupervisedRun {
            samples,
            stop_reason,
            exit_status,
            elapsed: start.elapsed(),
            process_group,
            killed,
        })
    }

    fn accept(&self, line: &str, start: Instant, samples: &mut Vec<LatencySample>) {
        let elapsed = start.elapsed().as_secs_f64();
        if let Some(sample) = self.extractor.extract(line, elapsed) {
            samples.push(sample);
        }
    }

    /// Pick up output that was already written when the process exited.
    ///
    /// Bounded by `window` so that a backgrounded process still holding stdout open can't keep
    /// the supervisor waiting.
    async fn drain_stdout(
        &self,
        reader: &mut BufReader<ChildStdout>,
        buf: &mut Vec<u8>,
        start: Instant,
        window: Duration,
        samples: &mut Vec<LatencySample>,
    ) {
        let drain_until = Instant::now() + window;
        loop {
            let left = drain_until.saturating_duration_since(Instant::now());
            if left.is_zero() {
                break;
            }

            match read_line(reader, buf, left).await {
                LineRead::Line(line) => self.accept(&line, start, samples),
                LineRead::Closed | LineRead::TimedOut => break,
            }
        }
    }

    /// Terminate the process group, returning the leader's exit status and whether `SIGKILL`
    /// was needed.
    async fn terminate(
        &self,
        child: &mut Child,
        process_group: u32,
        mut exit_status: Option<ExitStatus>,
    ) -> (Option<ExitStatus>, bool) {
        if let Err(e) = process_group::signal_group(process_group, Signal::SIGTERM) {
            log::error!("Failed to send SIGTERM to process group {process_group}: {e}");
        }

        let grace_deadline = Instant::now() + self.grace_period;
        loop {
            if exit_status.is_none() {
                exit_status = child.try_wait().unwrap_or_else(|e| {
                    log::warn!("Cannot check process group {process_group} leader: {e}");
                    None
                });
            }
            if exit_status.is_some() && !process_group::group_exists(process_group) {
                return (exit_status, false);
            }
            if Instant::now() >= grace_deadline {
                break;
            }
            tokio::time::sleep(GROUP_EXIT_POLL).await;
        }

        log::warn!(
            "Process group {process_group} did not exit within {:?} of SIGTERM, sending SIGKILL",
            self.grace_period
        );
        if let Err(e) = process_group::signal_group(process_group, Signal::SIGKILL) {
            log::error!("Failed to send SIGKILL to process group {process_group}: {e}");
        }

        if exit_status.is_none() {
            exit_status = match tokio::time::timeout(KILL_REAP_TIMEOUT, child.wait()).await {
                Ok(Ok(status)) => Some(status),
                Ok(Err(e)) => {
                    log::error!("Failed to reap process group leader {process_group}: {e}");
                    None
                }
                Err(_) => {
                    log::error!("Process group leader {process_group} survived SIGKILL");
                    None
                }
            };
        }

        (exit_status, true)
    }

    fn update_progress(&self, start: Instant, sample_count: usize) {
        if let Some(progress) = &self.progress {
            progress.set_position(start.elapsed().as_secs());
            progress.set_message(format!("{sample_count} samples"));
        }
    }

    /// Run `fut` unless a shutdown is signalled first, in which case `None` is returned.
    async fn interruptible<F: Future>(&mut self, fut: F) -> Option<F::Output> {
        match self.shutdown_listener.as_mut() {
            Some(listener) => {
                tokio::select! {
                    out = fut => Some(out),
                    _ = listener.wait_for_shutdown() => None,
                }
            }
            None => Some(fut.await),
        }
    }
}

fn transition(state: &mut SupervisorState, next: SupervisorState, process_group: u32) {
    log::trace!("Process group {process_group}: {state:?} -> {next:?}");
    *state = next;
}

fn remaining(start: Instant, deadline: Duration) -> Option<Duration> {
    deadline
        .checked_sub(start.elapsed())
        .filter(|remaining| !remaining.is_zero())
}

/// Read one line, waiting at most `timeout`.
///
/// A partial line stays in `buf` when the read times out and is completed by the next call.
async fn read_line<R>(reader: &mut BufReader<R>, buf: &mut Vec<u8>, timeout: Duration) -> LineRead
where
    R: AsyncRead + Unpin,
{
    match tokio::time::timeout(timeout, reader.read_until(b'\n', buf)).await {
        Err(_) => LineRead::TimedOut,
        Ok(Ok(0)) if buf.is_empty() => LineRead::Closed,
        Ok(Ok(_)) => {
            let line = String::from_utf8_lossy(buf).into_owned();
            buf.clear();
            LineRead::Line(line)
        }
        Ok(Err(e)) => {
            log::warn!("Failed to read process output: {e}");
            buf.clear();
            LineRead::Closed
        }
    }
}

async fn drain_stderr(stderr: ChildStderr, process_group: u32) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => log::debug!("[{process_group} stderr] {line}"),
            Ok(None) => break,
            Err(e) => {
                log::debug!("Stopped reading stderr of process group {process_group}: {e}");
                break;
            }
        }
    }
}
