mod outcome_table;

use stress_tunnel_summary_model::ScenarioOutcome;
use tabled::settings::Style;
use tabled::Table;

use crate::report::outcome_table::OutcomeRow;

pub trait ReportCollector {
    /// Record the outcome of a scenario as soon as it is known.
    fn add_outcome(&mut self, outcome: &ScenarioOutcome);

    /// Called once, after the last scenario.
    fn finalize(&self);
}

/// Fans scenario outcomes out to the configured collectors.
pub struct Reporter {
    collectors: Vec<Box<dyn ReportCollector + Send>>,
}

impl Reporter {
    pub fn new(collectors: Vec<Box<dyn ReportCollector + Send>>) -> Self {
        Self { collectors }
    }

    pub fn add_outcome(&mut self, outcome: &ScenarioOutcome) {
        for collector in &mut self.collectors {
            collector.add_outcome(outcome);
        }
    }

    pub fn finalize(&self) {
        for collector in &self.collectors {
            collector.finalize();
        }
    }
}

#[derive(Default)]
pub struct ReportConfig {
    enable_log: bool,
    enable_summary: bool,
}

impl ReportConfig {
    /// Log each outcome as soon as its scenario finishes.
    pub fn enable_log(mut self) -> Self {
        self.enable_log = true;
        self
    }

    /// Print a table of all outcomes at the end of the run.
    pub fn enable_summary(mut self) -> Self {
        self.enable_summary = true;
        self
    }

    pub fn init(self) -> Reporter {
        let mut collectors: Vec<Box<dyn ReportCollector + Send>> = Vec::new();
        if self.enable_log {
            collectors.push(Box::new(LogReportCollector));
        }
        if self.enable_summary {
            collectors.push(Box::new(SummaryReportCollector::new()));
        }

        Reporter::new(collectors)
    }
}

pub struct LogReportCollector;

impl ReportCollector for LogReportCollector {
    fn add_outcome(&mut self, outcome: &ScenarioOutcome) {
        match &outcome.error {
            Some(error) => log::warn!("Scenario '{}' {}: {error}", outcome.name, outcome.status),
            None => log::info!(
                "Scenario '{}' {} with {} samples in {:.1}s",
                outcome.name,
                outcome.status,
                outcome.sample_count,
                outcome.elapsed_seconds
            ),
        }
    }

    fn finalize(&self) {
        // Nothing buffered
    }
}

/// Keeps every outcome and prints them as a table when the run is finalized.
pub struct SummaryReportCollector {
    outcomes: Vec<ScenarioOutcome>,
}

impl Default for SummaryReportCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryReportCollector {
    pub fn new() -> Self {
        Self {
            outcomes: Vec::new(),
        }
    }

    pub(crate) fn summary_table(&self) -> Table {
        let rows = self
            .outcomes
            .iter()
            .map(OutcomeRow::from)
            .collect::<Vec<_>>();

        let mut table = Table::new(rows);
        table.with(Style::modern());
        table
    }
}

impl ReportCollector for SummaryReportCollector {
    fn add_outcome(&mut self, outcome: &ScenarioOutcome) {
        self.outcomes.push(outcome.clone());
    }

    fn finalize(&self) {
        println!("\nSummary of scenarios");
        println!("{}", self.summary_table());
    }
}
