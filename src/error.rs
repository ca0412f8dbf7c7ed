use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("no usable snapshot files in {}", .0.display())]
    NoSnapshots(PathBuf),
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Why a single row was left out of the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowIssue {
    #[error("missing course")]
    MissingCourse,
    #[error("unknown stage `{0}`")]
    UnknownStage(String),
    #[error("unreadable row: {0}")]
    Malformed(String),
}
