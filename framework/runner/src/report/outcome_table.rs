use stress_tunnel_summary_model::ScenarioOutcome;
use tabled::Tabled;

#[derive(Tabled)]
pub struct OutcomeRow {
    pub scenario: String,
    pub status: String,
    pub samples: usize,
    #[tabled(display = "float2")]
    pub elapsed_s: f64,
    #[tabled(display = "optional")]
    pub stopped: Option<String>,
    #[tabled(display = "optional")]
    pub error: Option<String>,
    #[tabled(display = "optional")]
    pub series_file: Option<String>,
}

impl From<&ScenarioOutcome> for OutcomeRow {
    fn from(outcome: &ScenarioOutcome) -> Self {
        Self {
            scenario: outcome.name.clone(),
            status: outcome.status.to_string(),
            samples: outcome.sample_count,
            elapsed_s: outcome.elapsed_seconds,
            stopped: outcome.stop_reason.clone(),
            error: outcome.error.clone(),
            series_file: outcome
                .series_file
                .as_ref()
                .map(|path| path.display().to_string()),
        }
    }
}

fn float2(n: &f64) -> String {
    format!("{n:.2}")
}

fn optional(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}
