use stress_tunnel_summary_model::ScenarioStatus;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::model::{AnalysisOutput, SummaryRow};

#[derive(Tabled)]
struct LatencyRow {
    test: String,
    min_us: u64,
    #[tabled(display = "float2")]
    avg_us: f64,
    max_us: u64,
    #[tabled(display = "float2")]
    std_dev: f64,
    #[tabled(display = "float2")]
    p99_us: f64,
    #[tabled(display = "float2")]
    range_us: f64,
}

impl From<&SummaryRow> for LatencyRow {
    fn from(row: &SummaryRow) -> Self {
        Self {
            test: row.test.clone(),
            min_us: row.min_latency,
            avg_us: row.avg_latency,
            max_us: row.max_latency,
            std_dev: row.std_dev,
            p99_us: row.p99,
            range_us: row.latency_range,
        }
    }
}

#[derive(Tabled)]
struct SkippedRow {
    file: String,
    reason: String,
}

fn float2(n: &f64) -> String {
    format!("{n:.2}")
}

/// The summary statistics as a table for the terminal.
pub fn latency_table(rows: &[SummaryRow]) -> Table {
    let mut table = Table::new(rows.iter().map(LatencyRow::from));
    table.with(Style::modern());
    table
}

/// Print what was loaded, what was skipped and where the results were written.
pub fn print_report(output: &AnalysisOutput) {
    for run in &output.runs {
        println!(
            "Run {}: {} of {} scenarios completed",
            run.run_id,
            run.count(ScenarioStatus::Completed),
            run.scenarios.len()
        );
    }

    println!("\nLatency summary");
    println!("{}", latency_table(&output.rows));

    if !output.empty.is_empty() {
        println!("\nNo samples for: {}", output.empty.join(", "));
    }

    if !output.skipped.is_empty() {
        let rows = output.skipped.iter().map(|s| SkippedRow {
            file: s.path.display().to_string(),
            reason: s.reason.clone(),
        });
        let mut table = Table::new(rows);
        table.with(Style::modern());
        println!("\nSkipped files");
        println!("{table}");
    }

    println!("\nSummary written to {}", output.summary_file.display());
    println!("{} charts written to {}", output.artifacts.len(), output.output_dir.display());
}
