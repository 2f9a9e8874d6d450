//! Typed failures raised while loading the dataset

use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

/// Reasons the dataset could not be loaded. Any of these ends the session.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("data directory not found: {0}")]
    MissingDirectory(PathBuf),

    #[error("dataset file not found: {0}")]
    MissingFile(PathBuf),

    #[error("failed to read {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },
}
