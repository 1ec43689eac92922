use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::definition::{Catalogue, CatalogueError};
use crate::run::RunConfig;

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
pub struct RunnerCli {
    /// Directory to create the run directory in.
    ///
    /// Each run writes to a new `stress_test_results_<timestamp>` directory inside it.
    #[clap(long, env = "STRESS_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Load scenarios from a TOML file instead of using the built-in catalogue.
    ///
    /// The file contains one `[[scenario]]` table per scenario, each with a `name`, `command` and
    /// `deadline_seconds`.
    #[clap(long)]
    pub catalogue: Option<PathBuf>,

    /// Only run the named scenario. Can be given multiple times, for example
    /// `--scenario baseline_test --scenario "CPU Stress Test"`.
    ///
    /// Scenarios still run in catalogue order.
    #[clap(long, short)]
    pub scenario: Vec<String>,

    /// The number of seconds to run each scenario for, replacing the catalogue's deadlines.
    #[clap(long)]
    pub duration: Option<u64>,

    /// Seconds to wait between reads of the probe output.
    #[clap(long, default_value = "1.0", value_parser = parse_poll_interval)]
    pub poll_interval: Duration,

    /// Seconds a scenario's processes are given to exit after `SIGTERM` before they are killed.
    #[clap(long, default_value = "5.0", value_parser = parse_seconds)]
    pub grace_period: Duration,

    /// Directory containing the `gpu_burn` binary, substituted for `{gpu_burn_dir}` in commands.
    #[clap(long, env = "GPU_BURN_DIR", default_value = "/home/jetson/jetson-gpu-burn")]
    pub gpu_burn_dir: PathBuf,

    /// Do not show a progress bar on the CLI.
    ///
    /// This is recommended for CI/CD environments where the progress bar isn't being looked at by anyone and is just adding noise to the logs.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,
}

impl RunnerCli {
    /// Apply the catalogue related options to `default_catalogue`, or to the catalogue file if
    /// one was given.
    pub fn resolve_catalogue(&self, default_catalogue: Catalogue) -> Result<Catalogue, CatalogueError> {
        let mut catalogue = match &self.catalogue {
            Some(path) => Catalogue::from_file(path)?,
            None => default_catalogue,
        };

        catalogue = catalogue.select(&self.scenario)?;
        if let Some(duration) = self.duration {
            catalogue = catalogue.with_deadline(duration)?;
        }

        catalogue.with_placeholders(&self.gpu_burn_dir)
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            output_dir: self.output_dir.clone(),
            poll_interval: self.poll_interval,
            grace_period: self.grace_period,
            show_progress: !self.no_progress,
            ..Default::default()
        }
    }
}

fn parse_seconds(s: &str) -> anyhow::Result<Duration> {
    let seconds = s.parse::<f64>()?;
    if !seconds.is_finite() || seconds < 0.0 {
        anyhow::bail!("Expected a non-negative number of seconds, got {s}");
    }

    Ok(Duration::from_secs_f64(seconds))
}

fn parse_poll_interval(s: &str) -> anyhow::Result<Duration> {
    let interval = parse_seconds(s)?;
    if interval.is_zero() {
        anyhow::bail!("The poll interval must be greater than zero");
    }

    Ok(interval)
}
