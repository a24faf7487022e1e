use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while loading the dataset, the boundary file or the
/// configuration. Aggregation itself never fails.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Dataset '{}' could not be read: {source}", path.display())]
    DatasetUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Dataset is missing required column '{0}'")]
    MissingColumn(String),

    #[error("Unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("Archive '{}' contains no delimited text entry", .0.display())]
    EmptyArchive(PathBuf),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("ZIP operation failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Parquet operation failed: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow operation failed: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Boundary file '{}' not found", .0.display())]
    BoundaryFileMissing(PathBuf),

    #[error("Boundary file is not valid GeoJSON: {0}")]
    Boundary(#[from] geojson::Error),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration '{}' is invalid: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::DatasetUnreadable {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
