use serde::{Deserialize, Serialize};
use std::io::{BufRead, Read, Write};
use std::path::{Path, PathBuf};

/// File name of the run summary inside a run directory.
pub const RUN_SUMMARY_FILE: &str = "run_summary.jsonl";

/// Summary of a run of the scenario catalogue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// The unique run id
    ///
    /// This is also the name of the run directory.
    pub run_id: String,
    /// The time the run started
    ///
    /// This is a Unix timestamp in seconds.
    pub started_at: i64,
    /// The directory that the series files were written to
    pub output_dir: PathBuf,
    /// One entry per scenario in the catalogue, in the order they were run
    pub scenarios: Vec<ScenarioOutcome>,
    /// The version of Stress Tunnel that was used for this run
    pub stress_tunnel_version: String,
}

impl RunSummary {
    /// Create a new run summary with no scenario outcomes
    pub fn new(
        run_id: String,
        started_at: i64,
        output_dir: PathBuf,
        stress_tunnel_version: String,
    ) -> Self {
        Self {
            run_id,
            started_at,
            output_dir,
            scenarios: Vec::new(),
            stress_tunnel_version,
        }
    }

    /// Record the outcome of a scenario
    pub fn add_outcome(&mut self, outcome: ScenarioOutcome) {
        self.scenarios.push(outcome);
    }

    /// The number of scenarios with the given status
    pub fn count(&self, status: ScenarioStatus) -> usize {
        self.scenarios.iter().filter(|s| s.status == status).count()
    }

    /// True if every scenario completed and produced a series file
    pub fn all_completed(&self) -> bool {
        self.scenarios
            .iter()
            .all(|s| s.status == ScenarioStatus::Completed)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    /// The scenario ran until its deadline or until the process exited
    Completed,
    /// The scenario ran but was cut short by a shutdown signal
    Interrupted,
    /// The scenario process could not be started or its results could not be written
    Failed,
    /// The scenario was never started
    Skipped,
}

impl std::fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ScenarioStatus::Completed => "completed",
            ScenarioStatus::Interrupted => "interrupted",
            ScenarioStatus::Failed => "failed",
            ScenarioStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// What happened to a single scenario
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioOutcome {
    /// The scenario name as it appears in the catalogue
    pub name: String,
    /// The shell command that was run
    pub command: String,
    /// The configured deadline, in seconds
    pub deadline_seconds: u64,
    pub status: ScenarioStatus,
    /// Number of latency samples collected
    pub sample_count: usize,
    /// Wall clock time spent supervising the scenario, in seconds
    pub elapsed_seconds: f64,
    /// Why supervision stopped, for example `deadline reached` or `process exited`
    pub stop_reason: Option<String>,
    /// Exit code of the scenario's shell, `None` if it was ended by a signal or never started
    #[serde(default)]
    pub exit_code: Option<i32>,
    /// The series file written for this scenario
    pub series_file: Option<PathBuf>,
    /// The error, if the scenario failed
    pub error: Option<String>,
}

impl ScenarioOutcome {
    /// An outcome for a scenario that was not started
    pub fn skipped(name: String, command: String, deadline_seconds: u64, reason: String) -> Self {
        Self {
            name,
            command,
            deadline_seconds,
            status: ScenarioStatus::Skipped,
            sample_count: 0,
            elapsed_seconds: 0.0,
            stop_reason: None,
            exit_code: None,
            series_file: None,
            error: Some(reason),
        }
    }
}

/// Append the run summary to a file
///
/// The summary will be serialized to JSON and output as a single line followed by a newline. The
/// recommended file extension is `.jsonl`.
pub fn append_run_summary(run_summary: &RunSummary, path: &Path) -> anyhow::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;
    store_run_summary(run_summary, &mut file)?;
    file.write_all("\n".as_bytes())?;
    Ok(())
}

/// Serialize the run summary to a writer
pub fn store_run_summary<W: Write>(run_summary: &RunSummary, writer: &mut W) -> anyhow::Result<()> {
    serde_json::to_writer(writer, run_summary)?;
    Ok(())
}

/// Load a run summary from a reader
pub fn load_run_summary<R: Read>(reader: R) -> anyhow::Result<RunSummary> {
    let reader = std::io::BufReader::new(reader);
    let run_summary: RunSummary = serde_json::from_reader(reader)?;
    Ok(run_summary)
}

/// Load run summaries from a file
///
/// The file should contain one JSON object per line. This is the format produced by
/// [append_run_summary]. Blank lines are ignored.
pub fn load_summary_runs(path: &Path) -> anyhow::Result<Vec<RunSummary>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut runs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let run: RunSummary = serde_json::from_str(&line)?;
        runs.push(run);
    }
    Ok(runs)
}
