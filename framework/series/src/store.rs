use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use stress_tunnel_core::prelude::LatencySample;
use walkdir::WalkDir;

use crate::naming::display_name;
use crate::{SeriesError, AVG, LATENCY_RANGE, MAX, MIN, STD_DEV, TIME};

/// A series file that was loaded from a results directory.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    /// Display name, derived from the file name.
    pub name: String,
    /// The file name without [crate::RESULTS_SUFFIX], unique within a directory.
    pub stem: String,
    pub path: PathBuf,
    /// The stored columns plus [LATENCY_RANGE] and [STD_DEV].
    pub frame: DataFrame,
}

/// A series file that looked like a series but could not be loaded.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Every series found in a results directory, keyed and ordered by display name.
#[derive(Debug, Default)]
pub struct SeriesCollection {
    pub series: BTreeMap<String, LoadedSeries>,
    pub skipped: Vec<SkippedFile>,
}

impl SeriesCollection {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoadedSeries> {
        self.series.values()
    }
}

/// Build a frame with the stored schema from samples, in the order given.
pub fn frame_from_samples(samples: &[LatencySample]) -> PolarsResult<DataFrame> {
    df!(
        TIME => samples.iter().map(|s| s.elapsed_seconds).collect::<Vec<_>>(),
        MIN => samples.iter().map(|s| s.min).collect::<Vec<_>>(),
        AVG => samples.iter().map(|s| s.avg).collect::<Vec<_>>(),
        MAX => samples.iter().map(|s| s.max).collect::<Vec<_>>(),
    )
}

/// Write samples to `path` in arrival order, replacing any existing file.
///
/// Parent directories are created if needed.
pub fn write(samples: &[LatencySample], path: &Path) -> Result<(), SeriesError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut frame = frame_from_samples(samples)?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut frame)?;

    Ok(())
}

/// Read a series file into a frame with the stored schema.
///
/// Columns are cast to `time: f64` and `min`, `avg`, `max: u64`. Extra columns are dropped.
pub fn read_frame(path: &Path) -> Result<DataFrame, SeriesError> {
    let raw = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let columns = vec![
        typed_column(&raw, TIME, &DataType::Float64)?,
        typed_column(&raw, MIN, &DataType::UInt64)?,
        typed_column(&raw, AVG, &DataType::UInt64)?,
        typed_column(&raw, MAX, &DataType::UInt64)?,
    ];

    Ok(DataFrame::new(columns)?)
}

fn typed_column(
    frame: &DataFrame,
    name: &'static str,
    dtype: &DataType,
) -> Result<Column, SeriesError> {
    let column = frame
        .column(name)?
        .strict_cast(dtype)
        .map_err(|_| SeriesError::InvalidValues { column: name })?;
    if column.null_count() > 0 {
        return Err(SeriesError::InvalidValues { column: name });
    }

    Ok(column)
}

/// Convert a frame with the stored schema back into samples, preserving row order.
pub fn samples_from_frame(frame: &DataFrame) -> Result<Vec<LatencySample>, SeriesError> {
    let time = frame.column(TIME)?.f64()?;
    let min = frame.column(MIN)?.u64()?;
    let avg = frame.column(AVG)?.u64()?;
    let max = frame.column(MAX)?.u64()?;

    let mut samples = Vec::with_capacity(frame.height());
    for (((time, min), avg), max) in time
        .into_iter()
        .zip(min.into_iter())
        .zip(avg.into_iter())
        .zip(max.into_iter())
    {
        samples.push(LatencySample::new(
            time.ok_or(SeriesError::InvalidValues { column: TIME })?,
            min.ok_or(SeriesError::InvalidValues { column: MIN })?,
            avg.ok_or(SeriesError::InvalidValues { column: AVG })?,
            max.ok_or(SeriesError::InvalidValues { column: MAX })?,
        ));
    }

    Ok(samples)
}

/// Read the samples stored in a series file.
pub fn read(path: &Path) -> Result<Vec<LatencySample>, SeriesError> {
    samples_from_frame(&read_frame(path)?)
}

/// Add the per-sample derived columns [LATENCY_RANGE] and [STD_DEV].
///
/// These match [LatencySample::latency_range] and [LatencySample::std_dev]. A latency above
/// `i64::MAX` gives a null range.
pub fn with_derived_metrics(frame: DataFrame) -> PolarsResult<DataFrame> {
    let channel = |name: &str| col(name).cast(DataType::Float64);
    let mean = (channel(MIN) + channel(AVG) + channel(MAX)) / lit(3.0);
    let squared_deviation = |name: &str| {
        let deviation = channel(name) - mean.clone();
        deviation.clone() * deviation
    };

    frame
        .lazy()
        .with_columns([
            (col(MAX).cast(DataType::Int64) - col(MIN).cast(DataType::Int64))
                .alias(LATENCY_RANGE),
            ((squared_deviation(MIN) + squared_deviation(AVG) + squared_deviation(MAX))
                / lit(3.0))
            .sqrt()
            .alias(STD_DEV),
        ])
        .collect()
}

/// Load every series file in `directory`.
///
/// Only files directly inside the directory whose names end in [crate::RESULTS_SUFFIX] are
/// considered. A series file that can't be read is recorded in
/// [SeriesCollection::skipped] and the rest of the directory is still loaded.
pub fn read_all(directory: &Path) -> Result<SeriesCollection, SeriesError> {
    if !directory.is_dir() {
        return Err(SeriesError::MissingDirectory(directory.to_path_buf()));
    }

    let mut collection = SeriesCollection::default();
    for entry in WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Failed to read directory entry in {}: {e}", directory.display());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().to_string();
        let Some(name) = display_name(&file_name) else {
            log::trace!("Ignoring non-series file {file_name}");
            continue;
        };
        let path = entry.path().to_path_buf();

        if collection.series.contains_key(&name) {
            log::warn!("Skipping {}, the name '{name}' is already loaded", path.display());
            collection.skipped.push(SkippedFile {
                path,
                reason: format!("Duplicate test name '{name}'"),
            });
            continue;
        }

        let frame = match read_frame(&path).and_then(|f| Ok(with_derived_metrics(f)?)) {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("Skipping series file {}: {e}", path.display());
                collection.skipped.push(SkippedFile {
                    path,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        log::debug!("Loaded {} samples for '{name}'", frame.height());
        let stem = file_name
            .strip_suffix(crate::RESULTS_SUFFIX)
            .unwrap_or(&file_name)
            .to_string();
        collection.series.insert(
            name.clone(),
            LoadedSeries {
                name,
                stem,
                path,
                frame,
            },
        );
    }

    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_metrics_match_sample_methods() -> anyhow::Result<()> {
        let samples = vec![
            LatencySample::new(0.0, 10, 20, 30),
            LatencySample::new(60.0, 12, 18, 28),
            LatencySample::new(61.0, 5, 5, 5),
        ];
        let frame = with_derived_metrics(frame_from_samples(&samples)?)?;

        let range = frame.column(LATENCY_RANGE)?.i64()?;
        let std_dev = frame.column(STD_DEV)?.f64()?;
        for (i, sample) in samples.iter().enumerate() {
            assert_eq!(Some(sample.latency_range()), range.get(i));
            let got = std_dev.get(i).unwrap();
            assert!((got - sample.std_dev()).abs() < 1e-9, "row {i}: {got}");
        }

        Ok(())
    }

    #[test]
    fn frame_keeps_sample_order() -> anyhow::Result<()> {
        let samples = vec![
            LatencySample::new(2.0, 1, 2, 3),
            LatencySample::new(1.0, 4, 5, 6),
        ];
        let frame = frame_from_samples(&samples)?;

        assert_eq!(samples, samples_from_frame(&frame)?);
        Ok(())
    }
}
