use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::services::install::conflict::ConflictRecord;

/// Closed set of failure kinds surfaced to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedFormat,
    ArchiveAuthFailure,
    PasswordCancelled,
    NotFound,
    Io,
    InvalidSelection,
    ConflictDetected,
    Extraction,
    InsufficientSpace,
    InvalidPath,
    InvalidGamePath,
    Config,
    Busy,
    Internal,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Unsupported archive format: {0}")]
    UnsupportedFormat(String),
    #[error("Wrong password {attempts} time(s) for archive: {}", archive.display())]
    ArchiveAuthFailure { archive: PathBuf, attempts: u32 },
    #[error("Password prompt abandoned for archive: {}", .0.display())]
    PasswordCancelled(PathBuf),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),
    #[error("{} destination file(s) already owned by other packages", .0.len())]
    ConflictDetected(Vec<ConflictRecord>),
    #[error("Extraction failed: {0}")]
    Extraction(String),
    #[error("Insufficient disk space. Requires {required} bytes, but only {available} bytes available.")]
    InsufficientSpace { required: u64, available: u64 },
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Invalid game directory: {0}")]
    InvalidGamePath(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Operation in progress. Please wait.")]
    Busy,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            EngineError::ArchiveAuthFailure { .. } => ErrorKind::ArchiveAuthFailure,
            EngineError::PasswordCancelled(_) => ErrorKind::PasswordCancelled,
            EngineError::NotFound(_) => ErrorKind::NotFound,
            EngineError::Io(_) => ErrorKind::Io,
            EngineError::InvalidSelection(_) => ErrorKind::InvalidSelection,
            EngineError::ConflictDetected(_) => ErrorKind::ConflictDetected,
            EngineError::Extraction(_) => ErrorKind::Extraction,
            EngineError::InsufficientSpace { .. } => ErrorKind::InsufficientSpace,
            EngineError::InvalidPath(_) => ErrorKind::InvalidPath,
            EngineError::InvalidGamePath(_) => ErrorKind::InvalidGamePath,
            EngineError::Config(_) => ErrorKind::Config,
            EngineError::Busy => ErrorKind::Busy,
            EngineError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Wrap an I/O failure with the path it happened on.
    pub fn io_at(path: &std::path::Path, error: std::io::Error) -> Self {
        EngineError::Io(format!("{}: {error}", path.display()))
    }
}

impl From<std::io::Error> for EngineError {
    fn from(error: std::io::Error) -> Self {
        EngineError::Io(error.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(error: serde_json::Error) -> Self {
        EngineError::Config(error.to_string())
    }
}

impl Serialize for EngineError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
#[path = "tests/errors_tests.rs"]
mod tests;
