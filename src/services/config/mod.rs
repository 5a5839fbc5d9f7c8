pub mod models;

pub use models::*;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::services::fs_utils::file_utils;
use crate::services::game::validator;
use crate::types::errors::{EngineError, EngineResult};

/// Settings record persisted as JSON next to the library.
pub struct ConfigService {
    path: PathBuf,
    settings: Mutex<AppSettings>,
}

impl ConfigService {
    /// Load settings from `path`. A missing or unreadable file yields
    /// defaults rooted at the file's parent directory.
    pub fn new(path: PathBuf) -> Self {
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let settings = Self::load_from_file(&path, &base_dir);

        Self {
            path,
            settings: Mutex::new(settings),
        }
    }

    fn load_from_file(path: &Path, base_dir: &Path) -> AppSettings {
        let defaults = AppSettings::with_base_dir(base_dir);
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return defaults,
            Err(e) => {
                log::error!("Failed to read settings {}: {e}", path.display());
                return defaults;
            }
        };

        // Merge over defaults so fields added later keep sane values.
        let mut merged = match serde_json::to_value(&defaults) {
            Ok(v) => v,
            Err(_) => return defaults,
        };
        match serde_json::from_str::<serde_json::Value>(&content) {
            Ok(serde_json::Value::Object(stored)) => {
                if let serde_json::Value::Object(ref mut base) = merged {
                    for (k, v) in stored {
                        base.insert(k, v);
                    }
                }
            }
            Ok(_) | Err(_) => {
                log::error!(
                    "Settings file {} is malformed, using defaults",
                    path.display()
                );
                return defaults;
            }
        }

        match serde_json::from_value::<AppSettings>(merged) {
            Ok(mut settings) => {
                dedup_preserving_order(&mut settings.installed_ids);
                settings
            }
            Err(e) => {
                log::error!("Failed to parse settings {}: {e}", path.display());
                defaults
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, AppSettings> {
        self.settings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get_settings(&self) -> AppSettings {
        self.lock().clone()
    }

    pub fn save_settings(&self, new_settings: AppSettings) -> EngineResult<()> {
        let mut current = self.lock();
        self.persist(&mut current, new_settings)
    }

    /// Apply `f` to a copy of the settings and persist the result. The
    /// settings lock is held from read to write, so concurrent updates
    /// never lose each other's changes.
    pub fn update<F>(&self, f: F) -> EngineResult<AppSettings>
    where
        F: FnOnce(&mut AppSettings),
    {
        let mut current = self.lock();
        let mut next = current.clone();
        f(&mut next);
        self.persist(&mut current, next)?;
        Ok(current.clone())
    }

    /// Write `next` to disk, then make it the in-memory copy. The caller
    /// holds the settings lock.
    fn persist(&self, current: &mut AppSettings, mut next: AppSettings) -> EngineResult<()> {
        dedup_preserving_order(&mut next.installed_ids);

        let json = serde_json::to_string_pretty(&next)?;
        file_utils::write_atomic(&self.path, json.as_bytes())
            .map_err(|e| EngineError::Config(format!("Failed to write settings: {e}")))?;

        *current = next;
        Ok(())
    }

    pub fn set_game_path(&self, path: &Path) -> EngineResult<()> {
        validator::validate_game_path(path)?;
        let path = path.to_path_buf();
        self.update(|s| s.game_path = Some(path))?;
        Ok(())
    }

    pub fn installed_ids(&self) -> BTreeSet<String> {
        self.lock().installed_id_set()
    }

    pub fn record_install(&self, package_id: &str, modules: Vec<String>) -> EngineResult<()> {
        self.update(|s| s.record_install(package_id, modules))?;
        Ok(())
    }

    pub fn clear_installed(&self) -> EngineResult<()> {
        self.update(AppSettings::clear_installed)?;
        Ok(())
    }

    pub fn rename_installed(&self, old_id: &str, new_id: &str) -> EngineResult<()> {
        let mut current = self.lock();
        let mut next = current.clone();
        if next.rename_installed(old_id, new_id) {
            self.persist(&mut current, next)?;
        }
        Ok(())
    }

    /// Create the library and staging directories if missing.
    pub fn ensure_dirs(&self) -> EngineResult<()> {
        let settings = self.get_settings();
        for dir in [&settings.library_dir, &settings.staging_dir] {
            fs::create_dir_all(dir).map_err(|e| EngineError::io_at(dir, e))?;
        }
        Ok(())
    }
}

// ── Helpers ──────────────────────────────────────────

fn dedup_preserving_order(ids: &mut Vec<String>) {
    let mut seen = BTreeSet::new();
    ids.retain(|id| seen.insert(id.clone()));
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
