use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("malformed input on line {line}: {reason}")]
    MalformedInput { line: u64, reason: String },
    #[error("need {k} distinct values to seed the clusters, found {distinct}")]
    InsufficientDistinctValues { k: usize, distinct: usize },
    #[error("no convergence after {max_iter} iterations")]
    MaxIterationsExceeded { max_iter: usize },
    #[error("column {column} is out of range for records with {width} fields")]
    ColumnOutOfRange { column: usize, width: usize },
    #[error("dataset has no records")]
    EmptyDataset,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("cannot write {}: {}", .path.display(), .source)]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClusterError>;
