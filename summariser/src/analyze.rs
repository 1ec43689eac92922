use std::fs::File;
use std::path::Path;

use anyhow::Context;
use polars::prelude::*;
use stress_tunnel_series::{LoadedSeries, SeriesCollection, AVG, LATENCY_RANGE, MAX, MIN, STD_DEV};

use crate::model::{SummaryRow, SUMMARY_COLUMNS};

const P99: &str = "p99";

/// Summarise one series, or `None` if it has no samples.
///
/// The percentile is interpolated linearly between the two nearest samples, `h = q * (n - 1)`.
pub fn summary_row(series: &LoadedSeries) -> anyhow::Result<Option<SummaryRow>> {
    if series.frame.height() == 0 {
        return Ok(None);
    }

    let stats = series
        .frame
        .clone()
        .lazy()
        .select([
            col(MIN).min().alias(MIN),
            col(AVG).cast(DataType::Float64).mean().alias(AVG),
            col(MAX).max().alias(MAX),
            col(STD_DEV).mean().alias(STD_DEV),
            col(MAX)
                .cast(DataType::Float64)
                .quantile(lit(0.99), QuantileMethod::Linear)
                .alias(P99),
            col(LATENCY_RANGE)
                .cast(DataType::Float64)
                .mean()
                .alias(LATENCY_RANGE),
        ])
        .collect()
        .with_context(|| format!("Failed to summarise {}", series.name))?;

    Ok(Some(SummaryRow {
        test: series.name.clone(),
        min_latency: first_u64(&stats, MIN)?,
        avg_latency: first_f64(&stats, AVG)?,
        max_latency: first_u64(&stats, MAX)?,
        std_dev: first_f64(&stats, STD_DEV)?,
        p99: first_f64(&stats, P99)?,
        latency_range: first_f64(&stats, LATENCY_RANGE)?,
    }))
}

/// Summarise every series in the collection, in collection order.
///
/// Returns the rows and the names of the tests that had no samples.
pub fn summary_rows(collection: &SeriesCollection) -> anyhow::Result<(Vec<SummaryRow>, Vec<String>)> {
    let mut rows = Vec::with_capacity(collection.len());
    let mut empty = Vec::new();
    for series in collection.iter() {
        match summary_row(series)? {
            Some(row) => rows.push(row),
            None => {
                log::warn!("No samples for '{}', leaving it out of the summary", series.name);
                empty.push(series.name.clone());
            }
        }
    }

    Ok((rows, empty))
}

/// `[min, q1, median, q3, max]` of a column, using the same interpolation as [summary_row].
pub fn five_number_summary(frame: &DataFrame, column: &str) -> anyhow::Result<Option<[f64; 5]>> {
    if frame.height() == 0 {
        return Ok(None);
    }

    let value = || col(column).cast(DataType::Float64);
    let stats = frame
        .clone()
        .lazy()
        .select([
            value().min().alias("min"),
            value().quantile(lit(0.25), QuantileMethod::Linear).alias("q1"),
            value().quantile(lit(0.5), QuantileMethod::Linear).alias("median"),
            value().quantile(lit(0.75), QuantileMethod::Linear).alias("q3"),
            value().max().alias("max"),
        ])
        .collect()?;

    Ok(Some([
        first_f64(&stats, "min")?,
        first_f64(&stats, "q1")?,
        first_f64(&stats, "median")?,
        first_f64(&stats, "q3")?,
        first_f64(&stats, "max")?,
    ]))
}

/// Write the summary table as CSV with [SUMMARY_COLUMNS] as the header.
pub fn write_summary(rows: &[SummaryRow], path: &Path) -> anyhow::Result<()> {
    let [test, min, avg, max, std_dev, p99, range] = SUMMARY_COLUMNS;
    let mut frame = df!(
        test => rows.iter().map(|r| r.test.clone()).collect::<Vec<_>>(),
        min => rows.iter().map(|r| r.min_latency).collect::<Vec<_>>(),
        avg => rows.iter().map(|r| r.avg_latency).collect::<Vec<_>>(),
        max => rows.iter().map(|r| r.max_latency).collect::<Vec<_>>(),
        std_dev => rows.iter().map(|r| r.std_dev).collect::<Vec<_>>(),
        p99 => rows.iter().map(|r| r.p99).collect::<Vec<_>>(),
        range => rows.iter().map(|r| r.latency_range).collect::<Vec<_>>(),
    )?;

    let mut file = File::create(path)
        .with_context(|| format!("Failed to create summary file {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut frame)?;

    Ok(())
}

fn first_u64(frame: &DataFrame, column: &str) -> anyhow::Result<u64> {
    frame
        .column(column)?
        .u64()?
        .get(0)
        .with_context(|| format!("No value for {column}"))
}

fn first_f64(frame: &DataFrame, column: &str) -> anyhow::Result<f64> {
    frame
        .column(column)?
        .f64()?
        .get(0)
        .with_context(|| format!("No value for {column}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use stress_tunnel_core::prelude::LatencySample;
    use stress_tunnel_series::{frame_from_samples, with_derived_metrics};

    fn loaded(name: &str, samples: &[LatencySample]) -> LoadedSeries {
        LoadedSeries {
            name: name.to_string(),
            stem: name.to_lowercase().replace(' ', "_"),
            path: PathBuf::from(format!("{name}.csv")),
            frame: with_derived_metrics(frame_from_samples(samples).unwrap()).unwrap(),
        }
    }

    fn assert_close(expected: f64, actual: f64) {
        assert!((expected - actual).abs() < 1e-9, "expected {expected}, got {actual}");
    }

    #[test]
    fn summary_of_two_samples() {
        let samples = [
            LatencySample::new(0.0, 10, 20, 30),
            LatencySample::new(60.0, 12, 18, 28),
        ];

        let row = summary_row(&loaded("Baseline Test", &samples)).unwrap().unwrap();

        assert_eq!("Baseline Test", row.test);
        assert_eq!(10, row.min_latency);
        assert_eq!(30, row.max_latency);
        assert_close(19.0, row.avg_latency);
        assert_close(29.98, row.p99);
        assert_close(18.0, row.latency_range);
        assert_close((samples[0].std_dev() + samples[1].std_dev()) / 2.0, row.std_dev);
    }

    #[test]
    fn single_sample_percentile_is_the_sample() {
        let row = summary_row(&loaded("One", &[LatencySample::new(1.0, 3, 4, 9)]))
            .unwrap()
            .unwrap();

        assert_close(9.0, row.p99);
        assert_close(4.0, row.avg_latency);
    }

    #[test]
    fn empty_series_has_no_row() {
        assert!(summary_row(&loaded("Empty", &[])).unwrap().is_none());
    }

    #[test]
    fn five_numbers_use_linear_quantiles() {
        let samples = (1..=5)
            .map(|i| LatencySample::new(i as f64, i, i * 10, i * 100))
            .collect::<Vec<_>>();
        let series = loaded("Quartiles", &samples);

        let max = five_number_summary(&series.frame, MAX).unwrap().unwrap();
        assert_eq!([100.0, 200.0, 300.0, 400.0, 500.0], max);

        let two = loaded("Two", &samples[..2]);
        let min = five_number_summary(&two.frame, MIN).unwrap().unwrap();
        assert_eq!([1.0, 1.25, 1.5, 1.75, 2.0], min);
    }

    #[test]
    fn summary_file_has_expected_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latency_summary.csv");
        let rows = vec![SummaryRow {
            test: "Baseline Test".to_string(),
            min_latency: 10,
            avg_latency: 19.0,
            max_latency: 30,
            std_dev: 7.5,
            p99: 29.98,
            latency_range: 18.0,
        }];

        write_summary(&rows, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            Some("Test,Min Latency,Avg Latency,Max Latency,Std Dev,99th Percentile,Latency Range"),
            lines.next()
        );
        let fields = lines.next().unwrap().split(',').collect::<Vec<_>>();
        assert_eq!(["Baseline Test", "10"], fields[..2]);
        assert_eq!("30", fields[3]);
        let floats = [fields[2], fields[4], fields[5], fields[6]]
            .iter()
            .map(|f| f.parse::<f64>().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(vec![19.0, 7.5, 29.98, 18.0], floats);
        assert_eq!(None, lines.next());
    }
}
