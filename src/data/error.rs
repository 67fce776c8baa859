use std::path::PathBuf;

use thiserror::Error;

use super::model::Value;

/// Failure to turn a file into a [`Table`](super::model::Table).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed Parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("malformed Arrow data: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("row {row}: {reason}")]
    Malformed { row: usize, reason: String },
    #[error("duplicate column '{0}' in header")]
    DuplicateColumn(String),
    #[error("{0} contains no rows")]
    Empty(PathBuf),
    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),
}

/// A filter referencing something the table does not have.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FilterError {
    #[error("unknown column '{0}' in filter")]
    UnknownColumn(String),
    #[error("value '{value}' never occurs in column '{column}'")]
    UnknownValue { column: String, value: Value },
}

/// An aggregation asked of columns that cannot support it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AggregationError {
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
    #[error("column '{0}' is not continuous")]
    NotContinuous(String),
    #[error("histogram needs at least one bin")]
    InvalidBins,
}

/// Any recoverable failure while answering a view request.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
}
