use std::path::PathBuf;

use stress_tunnel_series::SkippedFile;
use stress_tunnel_summary_model::RunSummary;

/// Column headers of the summary file, in order.
pub const SUMMARY_COLUMNS: [&str; 7] = [
    "Test",
    "Min Latency",
    "Avg Latency",
    "Max Latency",
    "Std Dev",
    "99th Percentile",
    "Latency Range",
];

/// Summary statistics for one test, all in microseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub test: String,
    /// Smallest `min` of any sample.
    pub min_latency: u64,
    /// Mean of the `avg` column.
    pub avg_latency: f64,
    /// Largest `max` of any sample.
    pub max_latency: u64,
    /// Mean of the per-sample standard deviation of `{min, avg, max}`.
    pub std_dev: f64,
    /// 99th percentile of the `max` column.
    pub p99: f64,
    /// Mean of the per-sample `max - min`.
    pub latency_range: f64,
}

/// Everything produced by one analysis of a results directory.
#[derive(Debug)]
pub struct AnalysisOutput {
    pub output_dir: PathBuf,
    pub summary_file: PathBuf,
    pub rows: Vec<SummaryRow>,
    /// Tests whose series file had no samples.
    pub empty: Vec<String>,
    pub skipped: Vec<SkippedFile>,
    /// Chart files, in the order they were written.
    pub artifacts: Vec<PathBuf>,
    /// Run summaries found next to the series files.
    pub runs: Vec<RunSummary>,
}
