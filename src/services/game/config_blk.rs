//! Patching of the `enable_mod` flag in the game's `config.blk`.
//!
//! Enabling backs the file up to `config.blk.backup`, writes, then re-reads
//! to verify; a failed write or verification restores the backup.

use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use crate::services::fs_utils::file_utils;
use crate::types::errors::{EngineError, EngineResult};

const FLAG_ENABLED: &str = "enable_mod:b=yes";
const FLAG_DISABLED: &str = "enable_mod:b=no";
const BACKUP_SUFFIX: &str = ".backup";

static RE_SOUND_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(sound\s*\{)").expect("Invalid regex"));

/// What a patch call did to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagChange {
    Unchanged,
    Replaced,
    Inserted,
}

pub fn is_mod_enabled(config_path: &Path) -> EngineResult<bool> {
    let content = read_config(config_path)?;
    Ok(content.contains(FLAG_ENABLED))
}

/// Turn the mod flag on.
pub fn enable_mods(config_path: &Path) -> EngineResult<FlagChange> {
    let content = read_config(config_path)?;

    if content.contains(FLAG_ENABLED) {
        log::info!("Mod flag already enabled in {}", config_path.display());
        return Ok(FlagChange::Unchanged);
    }

    let (new_content, change) = if content.contains(FLAG_DISABLED) {
        (
            content.replace(FLAG_DISABLED, FLAG_ENABLED),
            FlagChange::Replaced,
        )
    } else if RE_SOUND_BLOCK.is_match(&content) {
        let inserted = RE_SOUND_BLOCK.replacen(&content, 1, format!("${{1}}\n  {FLAG_ENABLED}"));
        (inserted.into_owned(), FlagChange::Inserted)
    } else {
        return Err(EngineError::Config(format!(
            "No sound{{}} block in {}; cannot enable mods",
            config_path.display()
        )));
    };

    let backup = backup_path(config_path);
    if let Err(e) = fs::copy(config_path, &backup) {
        log::warn!("Failed to back up {} (continuing): {e}", config_path.display());
    }

    if let Err(e) = file_utils::write_atomic(config_path, new_content.as_bytes()) {
        rollback(&backup, config_path);
        return Err(EngineError::Config(format!(
            "Failed to write {}: {e}",
            config_path.display()
        )));
    }

    match fs::read_to_string(config_path) {
        Ok(verify) if verify.contains(FLAG_ENABLED) => {
            log::info!("Mod flag enabled in {}", config_path.display());
            Ok(change)
        }
        _ => {
            rollback(&backup, config_path);
            Err(EngineError::Config(format!(
                "Verification failed after writing {}; is it read-only or locked by the game?",
                config_path.display()
            )))
        }
    }
}

/// Turn the mod flag off. Idempotent: no write when nothing is enabled.
pub fn disable_mods(config_path: &Path) -> EngineResult<FlagChange> {
    let content = read_config(config_path)?;
    if !content.contains(FLAG_ENABLED) {
        return Ok(FlagChange::Unchanged);
    }

    let new_content = content.replace(FLAG_ENABLED, FLAG_DISABLED);
    file_utils::write_atomic(config_path, new_content.as_bytes()).map_err(|e| {
        EngineError::Config(format!("Failed to write {}: {e}", config_path.display()))
    })?;
    log::info!("Mod flag disabled in {}", config_path.display());
    Ok(FlagChange::Replaced)
}

fn read_config(config_path: &Path) -> EngineResult<String> {
    let bytes = fs::read(config_path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            EngineError::NotFound(format!("{}", config_path.display()))
        }
        _ => EngineError::io_at(config_path, e),
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn backup_path(config_path: &Path) -> std::path::PathBuf {
    let mut name = config_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(BACKUP_SUFFIX);
    config_path.with_file_name(name)
}

fn rollback(backup: &Path, config_path: &Path) {
    if !backup.exists() {
        return;
    }
    match fs::copy(backup, config_path) {
        Ok(_) => log::warn!("Rolled back {} from backup", config_path.display()),
        Err(e) => log::error!("Rollback of {} failed: {e}", config_path.display()),
    }
}

#[cfg(test)]
#[path = "tests/config_blk_tests.rs"]
mod tests;
