use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

pub const DEFAULT_MOD_SUBDIR: &str = "sound/mod";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    /// Game installation root (the directory holding `config.blk`).
    pub game_path: Option<PathBuf>,
    /// Permanent library store: one directory per package.
    pub library_dir: PathBuf,
    /// Scratch area for archive extraction.
    pub staging_dir: PathBuf,
    /// Installed package ids, oldest install first. No duplicates.
    pub installed_ids: Vec<String>,
    /// Module selection recorded for each installed package.
    pub installed_modules: BTreeMap<String, Vec<String>>,
    pub max_password_attempts: u32,
    pub password_prompt_timeout_secs: u64,
    /// Mod directory relative to the game root.
    pub mod_subdir: String,
    pub min_free_space_mb: u64,
}

impl AppSettings {
    /// Defaults with the library and staging areas placed under `base_dir`.
    pub fn with_base_dir(base_dir: &Path) -> Self {
        Self {
            game_path: None,
            library_dir: base_dir.join("library"),
            staging_dir: base_dir.join("staging"),
            installed_ids: Vec::new(),
            installed_modules: BTreeMap::new(),
            max_password_attempts: 3,
            password_prompt_timeout_secs: 300,
            mod_subdir: DEFAULT_MOD_SUBDIR.into(),
            min_free_space_mb: 50,
        }
    }

    pub fn installed_id_set(&self) -> BTreeSet<String> {
        self.installed_ids.iter().cloned().collect()
    }

    /// Mod directory for the configured game, if any.
    pub fn mod_dir(&self) -> Option<PathBuf> {
        self.game_path
            .as_ref()
            .map(|root| root.join(&self.mod_subdir))
    }

    /// Record a successful install. A reinstall moves the package to the
    /// end of the install order and replaces its module selection.
    pub fn record_install(&mut self, package_id: &str, modules: Vec<String>) {
        self.installed_ids.retain(|id| id != package_id);
        self.installed_ids.push(package_id.to_string());
        self.installed_modules.insert(package_id.to_string(), modules);
    }

    pub fn clear_installed(&mut self) {
        self.installed_ids.clear();
        self.installed_modules.clear();
    }

    /// Re-key installed state after a package directory rename.
    pub fn rename_installed(&mut self, old_id: &str, new_id: &str) -> bool {
        let mut changed = false;
        for id in self.installed_ids.iter_mut() {
            if id == old_id {
                *id = new_id.to_string();
                changed = true;
            }
        }
        if let Some(modules) = self.installed_modules.remove(old_id) {
            self.installed_modules.insert(new_id.to_string(), modules);
            changed = true;
        }
        changed
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self::with_base_dir(Path::new("."))
    }
}
