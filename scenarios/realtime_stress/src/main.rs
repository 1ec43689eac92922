use stress_tunnel_runner::prelude::*;

/// Every scenario runs for half an hour unless `--duration` says otherwise.
const DEFAULT_DEADLINE_S: u64 = 1800;

/// `cyclictest` measuring with a realtime thread on every core, pinned and with memory locked.
const CYCLICTEST_ALL_CORES: &str = "cyclictest -l1800000 -p99 -t -a -m";

fn default_catalogue() -> Result<Catalogue, CatalogueError> {
    Catalogue::new(vec![
        ScenarioDefinition::new(
            "Baseline Test",
            "cyclictest -l1800000 -p99 -m",
            DEFAULT_DEADLINE_S,
        ),
        ScenarioDefinition::new(
            "CPU Stress Test",
            format!(
                "stress-ng --cpu $(nproc) --cpu-method all --timeout {DURATION_PLACEHOLDER} & {CYCLICTEST_ALL_CORES}"
            ),
            DEFAULT_DEADLINE_S,
        ),
        ScenarioDefinition::new(
            "I/O Stress Test",
            format!(
                "stress-ng --io $(nproc) --timeout {DURATION_PLACEHOLDER} & {CYCLICTEST_ALL_CORES}"
            ),
            DEFAULT_DEADLINE_S,
        ),
        ScenarioDefinition::new(
            "GPU Stress Test",
            format!(
                "cd {GPU_BURN_DIR_PLACEHOLDER} && ./gpu_burn {DURATION_PLACEHOLDER} & {CYCLICTEST_ALL_CORES}"
            ),
            DEFAULT_DEADLINE_S,
        ),
        ScenarioDefinition::new(
            "Full Stress Test",
            format!(
                "stress-ng --cpu $(nproc) --cpu-method all --io $(nproc) --timeout {DURATION_PLACEHOLDER} & (cd {GPU_BURN_DIR_PLACEHOLDER} && ./gpu_burn {DURATION_PLACEHOLDER}) & {CYCLICTEST_ALL_CORES}"
            ),
            DEFAULT_DEADLINE_S,
        ),
    ])
}

fn main() -> StressTunnelResult<()> {
    let summary = run_cli(default_catalogue()?)?;

    println!("Results are in the directory: {}", summary.output_dir.display());
    if summary.count(ScenarioStatus::Interrupted) > 0 {
        return Err(ShutdownSignalError::default().into());
    }

    Ok(())
}
