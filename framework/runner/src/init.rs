use crate::cli::RunnerCli;
use clap::Parser;

/// Initialise the CLI and logging for the stress tunnel runner.
pub fn init() -> RunnerCli {
    env_logger::init();

    RunnerCli::parse()
}
