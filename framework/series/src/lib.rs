//! Flat-file storage for latency time series.
//!
//! Each scenario run is stored as one CSV file with the columns `time,min,avg,max`. The file
//! name is derived from the scenario name, see [series_file_name].

mod error;
mod naming;
mod store;

pub use error::SeriesError;
pub use naming::{display_name, safe_name, series_file_name, RESULTS_SUFFIX};
pub use store::{
    frame_from_samples, read, read_all, read_frame, samples_from_frame, with_derived_metrics,
    write, LoadedSeries, SeriesCollection, SkippedFile,
};

/// Seconds since the scenario started.
pub const TIME: &str = "time";
pub const MIN: &str = "min";
pub const AVG: &str = "avg";
pub const MAX: &str = "max";
/// Derived per sample, `max - min`.
pub const LATENCY_RANGE: &str = "latency_range";
/// Derived per sample, population standard deviation of `min`, `avg` and `max`.
pub const STD_DEV: &str = "std_dev";
