//! error.rs — crate-wide error type.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FitError>;

#[derive(Debug, Error)]
pub enum FitError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed experiment list {path}: {reason}")]
    List { path: PathBuf, reason: String },

    #[error("malformed measurement data {path}: {reason}")]
    Data { path: PathBuf, reason: String },

    #[error("malformed measurement file {path}: {source}")]
    Measurement {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid user input payload: {0}")]
    UserInput(String),

    #[error("invalid couplings: {0}")]
    Couplings(String),

    #[error("solver failure: {0}")]
    Solver(String),

    #[error("covariance matrix is singular")]
    SingularCovariance,

    #[error("malformed overlay file {path}: {reason}")]
    Overlay { path: PathBuf, reason: String },

    #[error("plot rendering failed: {0}")]
    Plot(String),
}

impl FitError {
    /// Attach a path to a raw I/O error.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        FitError::Io {
            path: path.into(),
            source,
        }
    }
}
