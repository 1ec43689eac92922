//! Runs latency probe scenarios under a deadline and saves the samples they report.
//!
//! A scenario is a shell command line, typically a load generator started in the background
//! followed by `cyclictest`. Scenarios from a [prelude::Catalogue] run one at a time, each in its
//! own process group so that everything a scenario started can be stopped when its deadline is
//! reached.

mod cli;
mod definition;
mod init;
mod monitor;
mod privilege;
mod process_group;
mod progress;
mod report;
mod run;
mod shutdown;
mod supervisor;
mod types;

pub mod prelude {
    pub use crate::cli::RunnerCli;
    pub use crate::definition::{
        Catalogue, CatalogueError, ScenarioDefinition, DURATION_PLACEHOLDER,
        GPU_BURN_DIR_PLACEHOLDER,
    };
    pub use crate::init::init;
    pub use crate::process_group::SHELL;
    pub use crate::report::{
        LogReportCollector, ReportCollector, ReportConfig, Reporter, SummaryReportCollector,
    };
    pub use crate::run::{run, run_cli, run_with_shutdown, RunConfig, RunError, RUN_DIR_PREFIX};
    pub use crate::supervisor::{
        StopReason, SupervisedRun, Supervisor, SupervisorError, SupervisorState,
        DEFAULT_GRACE_PERIOD, DEFAULT_POLL_INTERVAL,
    };
    pub use crate::types::StressTunnelResult;
    pub use stress_tunnel_core::prelude::{
        LatencyExtractor, LatencySample, ShutdownHandle, ShutdownSignalError,
    };
    pub use stress_tunnel_summary_model::{RunSummary, ScenarioOutcome, ScenarioStatus};
}
