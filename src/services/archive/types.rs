use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::errors::EngineError;

/// Supported archive format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveFormat {
    Zip,
    SevenZ,
    Rar,
}

impl ArchiveFormat {
    /// Detect format from file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "zip" => Some(Self::Zip),
            "7z" => Some(Self::SevenZ),
            "rar" => Some(Self::Rar),
            _ => None,
        }
    }
}

/// Why a single extraction attempt failed.
#[derive(Debug)]
pub enum ExtractFailure {
    /// The archive is encrypted and the supplied password (or none) did not open it.
    NeedsPassword,
    Other(EngineError),
}

impl From<EngineError> for ExtractFailure {
    fn from(error: EngineError) -> Self {
        ExtractFailure::Other(error)
    }
}
