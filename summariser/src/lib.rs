//! Summary statistics and charts for the series files of a stress test run.

use std::path::{Path, PathBuf};

use anyhow::Context;
use stress_tunnel_series::read_all;
use stress_tunnel_summary_model::{load_summary_runs, RunSummary, RUN_SUMMARY_FILE};

use crate::chart::{boxplot_chart, combined_chart, test_chart, violin_chart, ChartRenderer};
use crate::model::AnalysisOutput;

pub mod analyze;
pub mod chart;
pub mod model;
pub mod table;

/// File name of the summary table inside the analysis directory.
pub const SUMMARY_FILE: &str = "latency_summary.csv";

/// Directory inside the analysis directory for the per-test charts.
pub const TESTS_DIR: &str = "tests";

#[derive(Debug, Clone)]
pub struct SummariseOptions {
    pub results_dir: PathBuf,
    /// Defaults to [default_output_dir].
    pub output_dir: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    /// Write SVG images as well as the HTML charts.
    pub images: bool,
}

/// `<results_dir>_analysis`, next to the results directory.
pub fn default_output_dir(results_dir: &Path) -> PathBuf {
    let mut name = results_dir
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "results".into());
    name.push("_analysis");
    results_dir.with_file_name(name)
}

/// Load every series in the results directory, write the summary table and render all charts.
pub fn summarise(options: &SummariseOptions) -> anyhow::Result<AnalysisOutput> {
    let collection = read_all(&options.results_dir)?;
    if collection.is_empty() {
        anyhow::bail!(
            "No readable series files in {}",
            options.results_dir.display()
        );
    }
    log::info!(
        "Loaded {} series from {}",
        collection.len(),
        options.results_dir.display()
    );

    let output_dir = options
        .output_dir
        .clone()
        .unwrap_or_else(|| default_output_dir(&options.results_dir));
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let (rows, empty) = analyze::summary_rows(&collection)?;
    let summary_file = output_dir.join(SUMMARY_FILE);
    analyze::write_summary(&rows, &summary_file)?;

    let mut renderer = ChartRenderer::new(options.width, options.height);
    if !options.images {
        renderer = renderer.without_images();
    }

    let mut artifacts = Vec::new();
    let tests_dir = output_dir.join(TESTS_DIR);
    for series in collection.iter() {
        let chart = test_chart(series)?;
        artifacts.extend(renderer.render(
            &chart,
            &format!("{} Results", series.name),
            &tests_dir,
            &format!("{}_plot", series.stem),
        )?);
    }

    artifacts.extend(renderer.render_with_height(
        &combined_chart(&collection)?,
        "Combined Stress Test Results",
        &output_dir,
        "combined_plot",
        chart::combined_chart_height(collection.len()),
    )?);
    artifacts.extend(renderer.render(
        &boxplot_chart(&collection)?,
        "Distribution of Latencies Across All Tests",
        &output_dir,
        "latency_distribution_boxplot",
    )?);
    artifacts.extend(renderer.render(
        &violin_chart(&collection)?,
        "Latency Distribution by Test",
        &output_dir,
        "latency_distribution_violin",
    )?);

    Ok(AnalysisOutput {
        output_dir,
        summary_file,
        rows,
        empty,
        skipped: collection.skipped,
        artifacts,
        runs: load_runs(&options.results_dir),
    })
}

/// The run summaries written by the runner, if there are any.
fn load_runs(results_dir: &Path) -> Vec<RunSummary> {
    let path = results_dir.join(RUN_SUMMARY_FILE);
    if !path.is_file() {
        return Vec::new();
    }

    match load_summary_runs(&path) {
        Ok(runs) => runs,
        Err(e) => {
            log::warn!("Ignoring unreadable run summary {}: {e:?}", path.display());
            Vec::new()
        }
    }
}
