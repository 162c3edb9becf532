use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchoolError {
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("no fee-defaulter model is available: there are no students to train on")]
    ModelUnavailable,

    #[error("storage at {} is corrupt: {detail}", path.display())]
    StorageCorruption { path: PathBuf, detail: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SchoolError>;

impl SchoolError {
    pub fn corrupt(path: impl Into<PathBuf>, detail: impl ToString) -> Self {
        Self::StorageCorruption {
            path: path.into(),
            detail: detail.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
