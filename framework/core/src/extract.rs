use regex::Regex;
use thiserror::Error;

use crate::sample::LatencySample;

/// Pattern for a `cyclictest` thread status line, for example
///
/// ```text
/// T: 0 ( 1234) P:99 I:1000 C:  10000 Min:      3 Act:    5 Avg:    4 Max:      21
/// ```
///
/// The `min`, `avg` and `max` groups are required by [LatencyExtractor]. The other counters on
/// the line are matched for structure only.
pub const CYCLICTEST_PATTERN: &str = r"T:\s*\d+\s*\(\s*\d+\)\s*P:\s*\d+\s*I:\s*\d+\s*C:\s*\d+\s*Min:\s*(?P<min>\d+)\s*Act:\s*\d+\s*Avg:\s*(?P<avg>\d+)\s*Max:\s*(?P<max>\d+)";

const REQUIRED_GROUPS: [&str; 3] = ["min", "avg", "max"];

#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("Invalid latency pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("Latency pattern is missing the named capture group `{0}`")]
    MissingGroup(&'static str),
}

/// Turns probe output lines into [LatencySample]s.
///
/// The pattern is compiled and checked once, when the extractor is built. Most probe output is
/// not a data line, so a line that doesn't match is reported as `None` rather than as an error.
#[derive(Debug, Clone)]
pub struct LatencyExtractor {
    pattern: Regex,
}

impl Default for LatencyExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LatencyExtractor {
    /// Extractor for `cyclictest` output, see [CYCLICTEST_PATTERN].
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(CYCLICTEST_PATTERN).expect("built-in latency pattern is valid"),
        }
    }

    /// Build an extractor from a custom pattern.
    ///
    /// The pattern must declare the named groups `min`, `avg` and `max`.
    pub fn with_pattern(pattern: &str) -> Result<Self, ExtractorError> {
        let pattern = Regex::new(pattern)?;
        let names = pattern.capture_names().flatten().collect::<Vec<_>>();
        for group in REQUIRED_GROUPS {
            if !names.contains(&group) {
                return Err(ExtractorError::MissingGroup(group));
            }
        }

        Ok(Self { pattern })
    }

    /// Try to read a sample from a single line of output.
    ///
    /// `elapsed_seconds` is supplied by the caller and copied into the sample as-is.
    pub fn extract(&self, line: &str, elapsed_seconds: f64) -> Option<LatencySample> {
        let captures = self.pattern.captures(line)?;
        let field = |name: &str| captures.name(name)?.as_str().parse::<u64>().ok();

        Some(LatencySample::new(
            elapsed_seconds,
            field("min")?,
            field("avg")?,
            field("max")?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DATA_LINE: &str =
        "T: 0 ( 4021) P:99 I:1000 C: 123456 Min:      3 Act:    5 Avg:    4 Max:      21";

    #[test]
    fn extract_cyclictest_line() {
        let extractor = LatencyExtractor::new();
        let sample = extractor.extract(DATA_LINE, 1.25).unwrap();

        assert_eq!(LatencySample::new(1.25, 3, 4, 21), sample);
    }

    #[test]
    fn extract_compact_line() {
        let extractor = LatencyExtractor::new();
        let sample = extractor
            .extract("T:3 (99) P:99 I:1500 C:1 Min:10 Act:12 Avg:11 Max:1002", 0.0)
            .unwrap();

        assert_eq!(LatencySample::new(0.0, 10, 11, 1002), sample);
    }

    #[test]
    fn extract_line_with_surrounding_text() {
        let extractor = LatencyExtractor::new();
        let line = format!("\x1b[2K{DATA_LINE}   \r");

        assert_eq!(
            Some(LatencySample::new(2.0, 3, 4, 21)),
            extractor.extract(&line, 2.0)
        );
    }

    #[test]
    fn fields_round_trip_through_formatting() {
        let extractor = LatencyExtractor::new();
        for (min, avg, max) in [(0, 0, 0), (1, 2, 3), (17, 250, 99999), (u64::MAX, 5, 6)] {
            let line =
                format!("T: 1 ( 77) P:99 I:1000 C: 5 Min: {min} Act: 9 Avg: {avg} Max: {max}");
            let sample = extractor.extract(&line, 0.5).unwrap();
            assert_eq!((min, avg, max), (sample.min, sample.avg, sample.max));
        }
    }

    #[test]
    fn no_sample_for_non_data_lines() {
        let extractor = LatencyExtractor::new();
        let lines = [
            "",
            "# /dev/cpu_dma_latency set to 0us",
            "policy: fifo: loadavg: 0.52 0.40 0.37 1/512 4021",
            // partial line
            "T: 0 ( 4021) P:99 I:1000 C: 123456 Min:      3 Act:    5",
            // swapped field order
            "T: 0 ( 4021) P:99 I:1000 C: 123456 Max:     21 Act:    5 Avg:    4 Min:      3",
            // negative values are not latencies
            "T: 0 ( 4021) P:99 I:1000 C: 123456 Min:     -3 Act:    5 Avg:    4 Max:      21",
        ];

        for line in lines {
            assert_eq!(None, extractor.extract(line, 1.0), "line: {line:?}");
        }
    }

    #[test]
    fn no_sample_when_value_overflows() {
        let extractor = LatencyExtractor::new();
        let line =
            "T: 0 ( 1) P:99 I:1000 C: 1 Min: 99999999999999999999999 Act: 5 Avg: 4 Max: 21";

        assert_eq!(None, extractor.extract(line, 1.0));
    }

    #[test]
    fn extraction_is_idempotent() {
        let extractor = LatencyExtractor::new();
        let first = extractor.extract(DATA_LINE, 3.0);
        let second = extractor.extract(DATA_LINE, 3.0);

        assert_eq!(first, second);
    }

    #[test]
    fn custom_pattern_requires_all_groups() {
        let result = LatencyExtractor::with_pattern(r"min=(?P<min>\d+) avg=(?P<avg>\d+)");
        assert!(matches!(result, Err(ExtractorError::MissingGroup("max"))));

        let result = LatencyExtractor::with_pattern(r"(?P<min>\d+");
        assert!(matches!(result, Err(ExtractorError::InvalidPattern(_))));
    }

    #[test]
    fn custom_pattern_extracts_samples() {
        let extractor =
            LatencyExtractor::with_pattern(r"min=(?P<min>\d+) avg=(?P<avg>\d+) max=(?P<max>\d+)")
                .unwrap();

        assert_eq!(
            Some(LatencySample::new(4.0, 1, 2, 3)),
            extractor.extract("probe min=1 avg=2 max=3", 4.0)
        );
    }
}
