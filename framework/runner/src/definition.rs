use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use stress_tunnel_series::{safe_name, series_file_name};
use thiserror::Error;

/// Placeholder replaced with the scenario's deadline, in seconds.
pub const DURATION_PLACEHOLDER: &str = "{duration}";

/// Placeholder replaced with the directory containing the `gpu_burn` binary.
pub const GPU_BURN_DIR_PLACEHOLDER: &str = "{gpu_burn_dir}";

#[derive(Error, Debug)]
pub enum CatalogueError {
    #[error("The scenario catalogue is empty")]
    Empty,
    #[error("Scenario {0} in the catalogue has no usable name")]
    EmptyName(usize),
    #[error("Scenario '{0}' has an empty command")]
    EmptyCommand(String),
    #[error("Scenario '{0}' has a deadline of zero seconds")]
    ZeroDeadline(String),
    #[error("Scenarios '{first}' and '{second}' would both write to {file}")]
    DuplicateName {
        first: String,
        second: String,
        file: String,
    },
    #[error("No scenario named '{0}' in the catalogue")]
    UnknownScenario(String),
    #[error("Failed to read catalogue file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid catalogue file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// One entry in the scenario catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioDefinition {
    /// The name shown in reports. Also determines the series file name.
    pub name: String,
    /// A shell command line, run with `sh -c`.
    pub command: String,
    /// How long the scenario is allowed to run before its process group is terminated.
    pub deadline_seconds: u64,
}

impl ScenarioDefinition {
    pub fn new(name: impl Into<String>, command: impl Into<String>, deadline_seconds: u64) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            deadline_seconds,
        }
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_seconds)
    }

    /// File name the scenario's samples are written to, see [series_file_name].
    pub fn series_file_name(&self) -> String {
        series_file_name(&self.name)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogueFile {
    #[serde(rename = "scenario", default)]
    scenarios: Vec<ScenarioDefinition>,
}

/// An ordered, validated list of scenarios.
///
/// Scenarios run in catalogue order. Every scenario has a non-empty name and command, a
/// positive deadline and a series file name that no other scenario in the catalogue shares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalogue {
    scenarios: Vec<ScenarioDefinition>,
}

impl Catalogue {
    pub fn new(scenarios: Vec<ScenarioDefinition>) -> Result<Self, CatalogueError> {
        validate(&scenarios)?;
        Ok(Self { scenarios })
    }

    /// Parse a catalogue from TOML, with one `[[scenario]]` table per scenario.
    ///
    /// ```toml
    /// [[scenario]]
    /// name = "Baseline Test"
    /// command = "cyclictest -l1800000 -p99 -m"
    /// deadline_seconds = 1800
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self, CatalogueError> {
        let file: CatalogueFile = toml::from_str(content)?;
        Self::new(file.scenarios)
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogueError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogueError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn scenarios(&self) -> &[ScenarioDefinition] {
        &self.scenarios
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScenarioDefinition> {
        self.scenarios.iter()
    }

    /// Keep only the named scenarios, in catalogue order.
    ///
    /// Names are matched after normalising them the same way as series file names, so
    /// `baseline_test` selects "Baseline Test". No names selects everything.
    pub fn select(self, names: &[String]) -> Result<Self, CatalogueError> {
        if names.is_empty() {
            return Ok(self);
        }

        let wanted = names.iter().map(|n| safe_name(n)).collect::<Vec<_>>();
        for (name, safe) in names.iter().zip(&wanted) {
            if !self.scenarios.iter().any(|s| &safe_name(&s.name) == safe) {
                return Err(CatalogueError::UnknownScenario(name.clone()));
            }
        }

        Self::new(
            self.scenarios
                .into_iter()
                .filter(|s| wanted.contains(&safe_name(&s.name)))
                .collect(),
        )
    }

    /// Replace every scenario's deadline.
    pub fn with_deadline(self, deadline_seconds: u64) -> Result<Self, CatalogueError> {
        Self::new(
            self.scenarios
                .into_iter()
                .map(|s| ScenarioDefinition {
                    deadline_seconds,
                    ..s
                })
                .collect(),
        )
    }

    /// Substitute [DURATION_PLACEHOLDER] and [GPU_BURN_DIR_PLACEHOLDER] in every command.
    ///
    /// The duration is each scenario's own deadline, so this should be applied after
    /// [Catalogue::with_deadline].
    pub fn with_placeholders(self, gpu_burn_dir: &Path) -> Result<Self, CatalogueError> {
        let gpu_burn_dir = gpu_burn_dir.display().to_string();
        Self::new(
            self.scenarios
                .into_iter()
                .map(|s| ScenarioDefinition {
                    command: s
                        .command
                        .replace(DURATION_PLACEHOLDER, &s.deadline_seconds.to_string())
                        .replace(GPU_BURN_DIR_PLACEHOLDER, &gpu_burn_dir),
                    ..s
                })
                .collect(),
        )
    }
}

fn validate(scenarios: &[ScenarioDefinition]) -> Result<(), CatalogueError> {
    if scenarios.is_empty() {
        return Err(CatalogueError::Empty);
    }

    let mut files: HashMap<String, &str> = HashMap::new();
    for (index, scenario) in scenarios.iter().enumerate() {
        if safe_name(&scenario.name).is_empty() {
            return Err(CatalogueError::EmptyName(index));
        }
        if scenario.command.trim().is_empty() {
            return Err(CatalogueError::EmptyCommand(scenario.name.clone()));
        }
        if scenario.deadline_seconds == 0 {
            return Err(CatalogueError::ZeroDeadline(scenario.name.clone()));
        }

        let file = scenario.series_file_name();
        if let Some(first) = files.get(&file) {
            return Err(CatalogueError::DuplicateName {
                first: first.to_string(),
                second: scenario.name.clone(),
                file,
            });
        }
        files.insert(file, &scenario.name);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn catalogue() -> Catalogue {
        Catalogue::new(vec![
            ScenarioDefinition::new("Baseline Test", "cyclictest -l1800000 -p99 -m", 1800),
            ScenarioDefinition::new(
                "GPU Stress Test",
                "cd {gpu_burn_dir} && ./gpu_burn {duration} & cyclictest -p99 -t -a -m",
                1800,
            ),
        ])
        .unwrap()
    }

    #[test]
    fn parse_toml_catalogue() {
        let catalogue = Catalogue::from_toml_str(
            r#"
[[scenario]]
name = "Baseline Test"
command = "cyclictest -l1800000 -p99 -m"
deadline_seconds = 1800

[[scenario]]
name = "Quick Check"
command = "echo hi"
deadline_seconds = 5
"#,
        )
        .unwrap();

        assert_eq!(
            vec![
                ScenarioDefinition::new("Baseline Test", "cyclictest -l1800000 -p99 -m", 1800),
                ScenarioDefinition::new("Quick Check", "echo hi", 5),
            ],
            catalogue.scenarios()
        );
    }

    #[test]
    fn toml_with_unknown_field_is_rejected() {
        let err = Catalogue::from_toml_str(
            r#"
[[scenario]]
name = "Baseline Test"
command = "cyclictest"
deadline = 1800
"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogueError::Parse(_)), "{err}");
    }

    #[test]
    fn empty_toml_is_empty_catalogue() {
        let err = Catalogue::from_toml_str("").unwrap_err();
        assert!(matches!(err, CatalogueError::Empty));
    }

    #[test]
    fn reject_invalid_scenarios() {
        let err = Catalogue::new(vec![ScenarioDefinition::new(" ", "true", 1)]).unwrap_err();
        assert!(matches!(err, CatalogueError::EmptyName(0)));

        let err = Catalogue::new(vec![
            ScenarioDefinition::new("A", "true", 1),
            ScenarioDefinition::new("..", "true", 1),
        ])
        .unwrap_err();
        assert!(matches!(err, CatalogueError::EmptyName(1)));

        let err = Catalogue::new(vec![ScenarioDefinition::new("A", "", 1)]).unwrap_err();
        assert!(matches!(err, CatalogueError::EmptyCommand(_)));

        let err = Catalogue::new(vec![ScenarioDefinition::new("A", "true", 0)]).unwrap_err();
        assert!(matches!(err, CatalogueError::ZeroDeadline(_)));
    }

    #[test]
    fn reject_names_that_share_a_series_file() {
        let err = Catalogue::new(vec![
            ScenarioDefinition::new("CPU Stress", "true", 1),
            ScenarioDefinition::new("cpu stress", "true", 1),
        ])
        .unwrap_err();

        match err {
            CatalogueError::DuplicateName { first, second, file } => {
                assert_eq!("CPU Stress", first);
                assert_eq!("cpu stress", second);
                assert_eq!("cpu_stress_results.csv", file);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn select_keeps_catalogue_order() {
        let selected = catalogue()
            .select(&["gpu_stress_test".to_string(), "Baseline Test".to_string()])
            .unwrap();

        let names = selected.iter().map(|s| s.name.as_str()).collect::<Vec<_>>();
        assert_eq!(vec!["Baseline Test", "GPU Stress Test"], names);
    }

    #[test]
    fn select_unknown_scenario() {
        let err = catalogue().select(&["IO Stress".to_string()]).unwrap_err();
        assert!(matches!(err, CatalogueError::UnknownScenario(name) if name == "IO Stress"));
    }

    #[test]
    fn select_nothing_keeps_everything() {
        assert_eq!(catalogue(), catalogue().select(&[]).unwrap());
    }

    #[test]
    fn override_deadline_then_substitute() {
        let catalogue = catalogue()
            .with_deadline(60)
            .unwrap()
            .with_placeholders(Path::new("/opt/gpu-burn"))
            .unwrap();

        assert!(catalogue.iter().all(|s| s.deadline_seconds == 60));
        assert_eq!(
            "cd /opt/gpu-burn && ./gpu_burn 60 & cyclictest -p99 -t -a -m",
            catalogue.scenarios()[1].command
        );
    }

    #[test]
    fn zero_deadline_override_is_rejected() {
        assert!(matches!(
            catalogue().with_deadline(0),
            Err(CatalogueError::ZeroDeadline(_))
        ));
    }
}
