use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeriesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("Column `{column}` has missing or invalid values")]
    InvalidValues { column: &'static str },
    #[error("Series directory does not exist: {}", .0.display())]
    MissingDirectory(PathBuf),
}
