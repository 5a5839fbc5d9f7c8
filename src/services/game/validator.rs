use std::path::{Path, PathBuf};

use crate::types::errors::{EngineError, EngineResult};

/// Game configuration file holding the mod-enable flag.
pub const CONFIG_FILE: &str = "config.blk";

/// Validates a folder as a game installation root.
///
/// Checks for:
/// 1. the path exists and is a directory
/// 2. `config.blk` sits directly inside it
pub fn validate_game_path(path: &Path) -> EngineResult<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(EngineError::InvalidGamePath("path is empty".into()));
    }
    if !path.exists() {
        return Err(EngineError::InvalidGamePath(format!(
            "path does not exist: {}",
            path.display()
        )));
    }
    if !path.is_dir() {
        return Err(EngineError::InvalidGamePath(format!(
            "not a directory: {}",
            path.display()
        )));
    }
    let config = path.join(CONFIG_FILE);
    if !config.is_file() {
        return Err(EngineError::InvalidGamePath(format!(
            "missing {CONFIG_FILE} in {}",
            path.display()
        )));
    }
    Ok(config)
}

/// Quick boolean form used while probing candidate directories.
pub fn is_game_dir(path: &Path) -> bool {
    validate_game_path(path).is_ok()
}
