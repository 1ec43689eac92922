use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Local};
use stress_tunnel_core::prelude::{LatencyExtractor, ShutdownHandle};
use stress_tunnel_summary_model::{
    append_run_summary, RunSummary, ScenarioOutcome, ScenarioStatus, RUN_SUMMARY_FILE,
};
use thiserror::Error;
use tokio::runtime::Runtime;

use crate::definition::{Catalogue, ScenarioDefinition};
use crate::init::init;
use crate::monitor::start_monitor;
use crate::privilege::check_privileges;
use crate::process_group::SHELL;
use crate::progress::scenario_progress;
use crate::report::{ReportConfig, Reporter};
use crate::shutdown::{settle, start_shutdown_listener};
use crate::supervisor::{
    StopReason, SupervisedRun, Supervisor, DEFAULT_GRACE_PERIOD, DEFAULT_POLL_INTERVAL,
};

/// Prefix of every run directory, followed by the local start time.
pub const RUN_DIR_PREFIX: &str = "stress_test_results_";

#[derive(Error, Debug)]
pub enum RunError {
    #[error("Stress scenarios need root to use realtime priorities, running with effective UID {0}")]
    Unprivileged(u32),
    #[error("Output directory {0} already exists")]
    OutputDirExists(PathBuf),
    #[error("Failed to create output directory {path}: {source}")]
    CreateOutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Settings for a run that don't belong to any one scenario.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// The run directory is created inside this directory.
    pub output_dir: PathBuf,
    pub poll_interval: Duration,
    pub grace_period: Duration,
    /// Shell that interprets scenario commands.
    pub shell: PathBuf,
    /// Refuse to start unless running as root.
    pub require_privileges: bool,
    pub show_progress: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            poll_interval: DEFAULT_POLL_INTERVAL,
            grace_period: DEFAULT_GRACE_PERIOD,
            shell: PathBuf::from(SHELL),
            require_privileges: true,
            show_progress: true,
        }
    }
}

/// Entry point for a scenario binary.
///
/// Initialises logging, parses the command line and runs `default_catalogue`, or the catalogue
/// file given on the command line, with the selected options applied.
pub fn run_cli(default_catalogue: Catalogue) -> anyhow::Result<RunSummary> {
    let cli = init();
    let catalogue = cli.resolve_catalogue(default_catalogue)?;
    let config = cli.run_config();
    let mut reporter = ReportConfig::default()
        .enable_log()
        .enable_summary()
        .init();

    run(&catalogue, &config, &mut reporter)
}

/// Run every scenario in the catalogue, one after the other, stopping early on Ctrl-C.
pub fn run(
    catalogue: &Catalogue,
    config: &RunConfig,
    reporter: &mut Reporter,
) -> anyhow::Result<RunSummary> {
    let runtime = new_runtime()?;
    let shutdown_handle = start_shutdown_listener(&runtime);

    execute(catalogue, config, reporter, &runtime, shutdown_handle)
}

/// Like [run], but stopped through `shutdown_handle` instead of Ctrl-C.
pub fn run_with_shutdown(
    catalogue: &Catalogue,
    config: &RunConfig,
    reporter: &mut Reporter,
    shutdown_handle: ShutdownHandle,
) -> anyhow::Result<RunSummary> {
    let runtime = new_runtime()?;

    execute(catalogue, config, reporter, &runtime, shutdown_handle)
}

fn new_runtime() -> anyhow::Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")
}

fn execute(
    catalogue: &Catalogue,
    config: &RunConfig,
    reporter: &mut Reporter,
    runtime: &Runtime,
    shutdown_handle: ShutdownHandle,
) -> anyhow::Result<RunSummary> {
    if config.require_privileges {
        check_privileges()?;
    }

    let started = Local::now();
    let run_dir = create_run_dir(&config.output_dir, started)?;
    let run_id = run_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    log::info!(
        "Running {} scenarios, writing results to {}",
        catalogue.len(),
        run_dir.display()
    );

    let mut summary = RunSummary::new(
        run_id,
        started.timestamp(),
        run_dir.clone(),
        env!("CARGO_PKG_VERSION").to_string(),
    );

    // Separate from the run's handle, stopping the monitor must not interrupt a scenario
    let monitor_handle = ShutdownHandle::new();
    start_monitor(monitor_handle.new_listener());

    let mut run_listener = shutdown_handle.new_listener();
    let mut supervisor = Supervisor::new(LatencyExtractor::new())
        .with_shell(config.shell.clone())
        .with_grace_period(config.grace_period)
        .with_shutdown_listener(shutdown_handle.new_listener());

    let mut interrupted = false;
    for (index, scenario) in catalogue.iter().enumerate() {
        settle(runtime);
        if interrupted || run_listener.should_shutdown() {
            interrupted = true;
            let outcome = ScenarioOutcome::skipped(
                scenario.name.clone(),
                scenario.command.clone(),
                scenario.deadline_seconds,
                "Run interrupted before the scenario started".to_string(),
            );
            reporter.add_outcome(&outcome);
            summary.add_outcome(outcome);
            continue;
        }

        log::info!(
            "Running scenario {}/{}: {} for up to {}s",
            index + 1,
            catalogue.len(),
            scenario.name,
            scenario.deadline_seconds
        );
        log::debug!("Command: {}", scenario.command);

        supervisor.set_progress(scenario_progress(
            &scenario.name,
            scenario.deadline(),
            config.show_progress,
        ));
        let supervised = runtime.block_on(supervisor.run(
            &scenario.command,
            scenario.deadline(),
            config.poll_interval,
        ));

        let outcome = match supervised {
            Ok(supervised) => {
                if supervised.stop_reason == StopReason::Interrupted {
                    interrupted = true;
                }
                record_samples(scenario, supervised, &run_dir)
            }
            Err(e) => {
                log::error!("Scenario '{}' could not be run: {e}", scenario.name);
                failed(scenario, e.to_string())
            }
        };
        reporter.add_outcome(&outcome);
        summary.add_outcome(outcome);
    }

    monitor_handle.shutdown();

    append_run_summary(&summary, &run_dir.join(RUN_SUMMARY_FILE))
        .context("Failed to write the run summary")?;
    reporter.finalize();

    log::info!(
        "Run finished: {} completed, {} interrupted, {} failed, {} skipped",
        summary.count(ScenarioStatus::Completed),
        summary.count(ScenarioStatus::Interrupted),
        summary.count(ScenarioStatus::Failed),
        summary.count(ScenarioStatus::Skipped),
    );

    Ok(summary)
}

/// Create `<base>/stress_test_results_<YYYYmmdd_HHMMSS>`.
///
/// The run directory itself must not exist yet, so two runs never write into the same one.
pub(crate) fn create_run_dir(base: &Path, started: DateTime<Local>) -> Result<PathBuf, RunError> {
    std::fs::create_dir_all(base).map_err(|source| RunError::CreateOutputDir {
        path: base.to_path_buf(),
        source,
    })?;

    let run_dir = base.join(format!(
        "{RUN_DIR_PREFIX}{}",
        started.format("%Y%m%d_%H%M%S")
    ));
    match std::fs::create_dir(&run_dir) {
        Ok(()) => Ok(run_dir),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(RunError::OutputDirExists(run_dir))
        }
        Err(source) => Err(RunError::CreateOutputDir {
            path: run_dir,
            source,
        }),
    }
}

fn record_samples(
    scenario: &ScenarioDefinition,
    supervised: SupervisedRun,
    run_dir: &Path,
) -> ScenarioOutcome {
    if supervised.samples.is_empty() {
        log::warn!("Scenario '{}' produced no latency samples", scenario.name);
    }
    if supervised.killed {
        log::warn!(
            "Scenario '{}' had to be killed after ignoring SIGTERM",
            scenario.name
        );
    }

    let path = run_dir.join(scenario.series_file_name());
    let status = match supervised.stop_reason {
        StopReason::Interrupted => ScenarioStatus::Interrupted,
        StopReason::DeadlineReached | StopReason::ProcessExited => ScenarioStatus::Completed,
    };
    let mut outcome = ScenarioOutcome {
        name: scenario.name.clone(),
        command: scenario.command.clone(),
        deadline_seconds: scenario.deadline_seconds,
        status,
        sample_count: supervised.samples.len(),
        elapsed_seconds: supervised.elapsed.as_secs_f64(),
        stop_reason: Some(supervised.stop_reason.to_string()),
        exit_code: supervised.exit_status.and_then(|s| s.code()),
        series_file: None,
        error: None,
    };

    // A command that can't run, such as a missing binary or a shell syntax error, exits
    // non-zero before the probe prints anything
    if let Some(exit_status) = failed_exit(&supervised) {
        let error = format!("Command exited with {exit_status} before reporting any samples");
        log::error!("Scenario '{}' failed: {error}", scenario.name);
        outcome.status = ScenarioStatus::Failed;
        outcome.error = Some(error);
        return outcome;
    }

    match stress_tunnel_series::write(&supervised.samples, &path) {
        Ok(()) => {
            log::info!(
                "Saved {} samples to {}",
                supervised.samples.len(),
                path.display()
            );
            outcome.series_file = Some(path);
        }
        Err(e) => {
            log::error!("Failed to save results for '{}': {e}", scenario.name);
            outcome.status = ScenarioStatus::Failed;
            outcome.error = Some(e.to_string());
        }
    }

    outcome
}

/// The exit status of a command that exited by itself, unsuccessfully and without samples.
fn failed_exit(supervised: &SupervisedRun) -> Option<ExitStatus> {
    match (supervised.stop_reason, supervised.exit_status) {
        (StopReason::ProcessExited, Some(status))
            if !status.success() && supervised.samples.is_empty() =>
        {
            Some(status)
        }
        _ => None,
    }
}

fn failed(scenario: &ScenarioDefinition, error: String) -> ScenarioOutcome {
    ScenarioOutcome {
        name: scenario.name.clone(),
        command: scenario.command.clone(),
        deadline_seconds: scenario.deadline_seconds,
        status: ScenarioStatus::Failed,
        sample_count: 0,
        elapsed_seconds: 0.0,
        stop_reason: None,
        exit_code: None,
        series_file: None,
        error: Some(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn started() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 10, 17, 20, 39, 59).unwrap()
    }

    #[test]
    fn run_dir_is_named_after_start_time() {
        let base = tempfile::tempdir().unwrap();

        let run_dir = create_run_dir(base.path(), started()).unwrap();
        assert_eq!(
            base.path().join("stress_test_results_20241017_203959"),
            run_dir
        );
        assert!(run_dir.is_dir());
    }

    #[test]
    fn existing_run_dir_is_an_error() {
        let base = tempfile::tempdir().unwrap();
        create_run_dir(base.path(), started()).unwrap();

        let err = create_run_dir(base.path(), started()).unwrap_err();
        assert!(matches!(err, RunError::OutputDirExists(_)), "{err}");
    }

    fn supervised(stop_reason: StopReason, code: i32, samples: usize) -> SupervisedRun {
        use std::os::unix::process::ExitStatusExt;

        SupervisedRun {
            samples: vec![stress_tunnel_core::prelude::LatencySample::new(0.5, 1, 2, 3); samples],
            stop_reason,
            exit_status: Some(ExitStatus::from_raw(code << 8)),
            elapsed: Duration::from_millis(20),
            process_group: 1,
            killed: false,
        }
    }

    #[test]
    fn unsuccessful_exit_without_samples_is_a_failure() {
        let exit = failed_exit(&supervised(StopReason::ProcessExited, 127, 0));
        assert_eq!(Some(127), exit.and_then(|s| s.code()));
    }

    #[test]
    fn exits_that_are_not_failures() {
        // Succeeded
        assert!(failed_exit(&supervised(StopReason::ProcessExited, 0, 0)).is_none());
        // Reported samples before exiting
        assert!(failed_exit(&supervised(StopReason::ProcessExited, 1, 3)).is_none());
        // Ended by the harness
        assert!(failed_exit(&supervised(StopReason::DeadlineReached, 143, 0)).is_none());
        assert!(failed_exit(&supervised(StopReason::Interrupted, 143, 0)).is_none());
    }

    #[test]
    fn missing_base_dir_is_created() {
        let base = tempfile::tempdir().unwrap();
        let nested = base.path().join("nested").join("results");

        let run_dir = create_run_dir(&nested, started()).unwrap();
        assert!(run_dir.starts_with(&nested));
        assert!(run_dir.is_dir());
    }
}
