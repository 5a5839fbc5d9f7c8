//! Copies module files into the game mod directory and resets it.
//!
//! Install: plan, optional conflict guard, copy (continuing past per-file
//! failures), enable the mod flag, record installed state. Installed state
//! and the flag change only after every file copied.
//!
//! Restore: remove every entry under the mod directory, disable the flag,
//! clear installed state. Idempotent.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::conflict::ConflictResolver;
use super::plan;
use crate::services::config::ConfigService;
use crate::services::fs_utils::{file_utils, path_utils};
use crate::services::game::{config_blk, validator};
use crate::services::library::LibraryCatalog;
use crate::types::errors::{EngineError, EngineResult};

/// How `install` treats conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// The caller already reviewed conflicts; overwrite.
    #[default]
    Confirmed,
    /// Re-check and fail with `ConflictDetected` if anything would be overwritten.
    AbortOnConflict,
}

/// Advisory progress for one step of an install or restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallProgress {
    pub current: String,
    pub done: usize,
    pub total: usize,
    pub percent: u8,
}

impl InstallProgress {
    fn new(current: String, done: usize, total: usize) -> Self {
        let percent = if total == 0 {
            100
        } else {
            ((done * 100) / total).min(100) as u8
        };
        Self {
            current,
            done,
            total,
            percent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub package_id: String,
    pub modules: Vec<String>,
    pub files_copied: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub entries_removed: usize,
}

pub struct InstallExecutor<'a> {
    catalog: &'a LibraryCatalog,
    config: &'a ConfigService,
}

impl<'a> InstallExecutor<'a> {
    pub fn new(catalog: &'a LibraryCatalog, config: &'a ConfigService) -> Self {
        Self { catalog, config }
    }

    /// Game config file and mod directory; fails when no valid game is set.
    fn game_paths(&self) -> EngineResult<(PathBuf, PathBuf)> {
        let settings = self.config.get_settings();
        let root = settings
            .game_path
            .as_ref()
            .ok_or_else(|| EngineError::InvalidGamePath("game directory not set".into()))?;
        let config_path = validator::validate_game_path(root)?;
        let mod_dir = root.join(&settings.mod_subdir);
        Ok((config_path, mod_dir))
    }

    pub fn install(
        &self,
        package_id: &str,
        selected: &[String],
        policy: ConflictPolicy,
        on_progress: &mut dyn FnMut(InstallProgress),
    ) -> EngineResult<InstallReport> {
        let (config_path, mod_dir) = self.game_paths()?;
        let package = self.catalog.get(package_id)?;
        let package_dir = self.catalog.package_dir(package_id)?;
        let plan = plan::plan_install(&package, &package_dir, selected)?;
        if plan.files.is_empty() {
            return Err(EngineError::InvalidSelection(
                "selected modules contain no files".into(),
            ));
        }

        if policy == ConflictPolicy::AbortOnConflict {
            let settings = self.config.get_settings();
            let conflicts = ConflictResolver::new(self.catalog).conflicts_for_plan(&settings, &plan);
            if !conflicts.is_empty() {
                return Err(EngineError::ConflictDetected(conflicts));
            }
        }

        fs::create_dir_all(&mod_dir).map_err(|e| EngineError::io_at(&mod_dir, e))?;
        log::info!(
            "Installing '{}' ({} module(s), {} file(s)) into {}",
            package_id,
            plan.modules.len(),
            plan.files.len(),
            mod_dir.display()
        );

        let total = plan.files.len();
        let mut copied = 0usize;
        let mut failures: Vec<(String, std::io::Error)> = Vec::new();
        for (idx, file) in plan.files.iter().enumerate() {
            match copy_into(&file.source, &mod_dir, &file.destination) {
                Ok(()) => copied += 1,
                Err(e) => {
                    log::warn!("Failed to copy {}: {e}", file.destination);
                    failures.push((file.destination.clone(), e));
                }
            }
            on_progress(InstallProgress::new(file.destination.clone(), idx + 1, total));
        }

        if let Some((first, error)) = failures.first() {
            return Err(EngineError::Io(format!(
                "installation incomplete: {} of {total} file(s) failed to copy (first: {first}: {error})",
                failures.len()
            )));
        }

        config_blk::enable_mods(&config_path)?;
        self.config.record_install(package_id, plan.modules.clone())?;

        log::info!("Installed '{package_id}': {copied} file(s) copied");
        Ok(InstallReport {
            package_id: package_id.to_string(),
            modules: plan.modules,
            files_copied: copied,
        })
    }

    pub fn restore(&self, on_progress: &mut dyn FnMut(InstallProgress)) -> EngineResult<RestoreReport> {
        let (config_path, mod_dir) = self.game_paths()?;

        let mut removed = 0usize;
        if mod_dir.is_dir() {
            let entries: Vec<PathBuf> = fs::read_dir(&mod_dir)
                .map_err(|e| EngineError::io_at(&mod_dir, e))?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .collect();

            let total = entries.len();
            let mut failures: Vec<String> = Vec::new();
            for (idx, entry) in entries.iter().enumerate() {
                let name = entry
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                if !path_utils::is_strictly_inside(&mod_dir, entry) {
                    log::warn!("Refusing to delete {} outside the mod directory", entry.display());
                    failures.push(name.clone());
                } else {
                    match file_utils::remove_path(entry) {
                        Ok(()) => removed += 1,
                        Err(e) => {
                            log::warn!("Failed to remove {}: {e}", entry.display());
                            failures.push(name.clone());
                        }
                    }
                }
                on_progress(InstallProgress::new(name, idx + 1, total));
            }

            if !failures.is_empty() {
                return Err(EngineError::Io(format!(
                    "restore incomplete: could not remove {}",
                    failures.join(", ")
                )));
            }
        }

        config_blk::disable_mods(&config_path)?;
        self.config.clear_installed()?;
        log::info!("Restore complete: {removed} entr(ies) removed from {}", mod_dir.display());
        Ok(RestoreReport {
            entries_removed: removed,
        })
    }
}

fn copy_into(source: &Path, mod_dir: &Path, destination: &str) -> std::io::Result<()> {
    let target = path_utils::resolve_safe_path(mod_dir, destination)?;
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, &target)?;
    Ok(())
}

#[cfg(test)]
#[path = "tests/executor_tests.rs"]
mod tests;
