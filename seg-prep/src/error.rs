//! Error types of the preparation toolkit.

use std::{
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("dataset '{name}' does not exist in '{}'", .datapath.display())]
    DatasetNotFound { name: String, datapath: PathBuf },

    #[error("directory '{}' does not exist", .0.display())]
    MissingDirectory(PathBuf),

    #[error(
        "image and label are not of the same size: input {}x{}, label {}x{}",
        .input.0, .input.1, .label.0, .label.1
    )]
    DimensionMismatch { input: (u32, u32), label: (u32, u32) },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("dataset is incomplete, '{}' does not exist", .path.display())]
    DatasetIncomplete { path: PathBuf },

    #[error("{0} is not implemented yet")]
    NotImplemented(&'static str),

    #[error("column '{column}' is missing in '{}'", .path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("session directory '{}' already exists", .path.display())]
    SessionExists { path: PathBuf },

    #[error("interrupted")]
    Interrupted,

    #[error("i/o error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("image error on '{}': {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("csv error on '{}': {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to parse config file '{}': {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: json5::Error,
    },
}

impl Error {
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}

/// Attaches the path an I/O-like failure happened on.
pub(crate) trait PathContext<T> {
    fn at_path(self, path: &Path) -> Result<T>;
}

impl<T> PathContext<T> for Result<T, io::Error> {
    fn at_path(self, path: &Path) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.to_owned(),
            source,
        })
    }
}

impl<T> PathContext<T> for Result<T, image::ImageError> {
    fn at_path(self, path: &Path) -> Result<T> {
        self.map_err(|source| Error::Image {
            path: path.to_owned(),
            source,
        })
    }
}

impl<T> PathContext<T> for Result<T, csv::Error> {
    fn at_path(self, path: &Path) -> Result<T> {
        self.map_err(|source| Error::Csv {
            path: path.to_owned(),
            source,
        })
    }
}
