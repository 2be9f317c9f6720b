use crate::storage::{LockMode, WriteStage};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid record for {date}: {reason}")]
    InvalidRecord { date: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Corrupt data file '{}': {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Timed out after {waited_ms} ms waiting for {mode} lock on '{}'", .path.display())]
    LockTimeout {
        path: PathBuf,
        mode: LockMode,
        waited_ms: u64,
    },

    #[error("Write failed while {stage}: {reason} (primary restored from backup: {restored})")]
    WriteFailed {
        stage: WriteStage,
        reason: String,
        restored: bool,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Coarse classification of [`StoreError`] for callers that only need to
/// decide how to present a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Corrupt,
    IoFailure,
    LockTimeout,
    InvalidInput,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::InvalidRecord { .. } | StoreError::InvalidConfig(_) => {
                ErrorKind::InvalidInput
            }
            StoreError::Corrupt { .. } => ErrorKind::Corrupt,
            StoreError::LockTimeout { .. } => ErrorKind::LockTimeout,
            StoreError::IoError(_)
            | StoreError::WriteFailed { .. }
            | StoreError::Serialization(_) => ErrorKind::IoFailure,
        }
    }

    pub(crate) fn io(context: &str, path: &std::path::Path, err: std::io::Error) -> Self {
        StoreError::IoError(format!("{} '{}': {}", context, path.display(), err))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
