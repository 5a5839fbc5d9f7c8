//! Pre-install conflict check.
//!
//! Ownership of destination files is re-derived on demand from the
//! installed packages' current contents and recorded module selections;
//! no file-level manifest is persisted. The most recent install of a
//! destination owns it. A destination that exists on disk but no known
//! package claims is reported with an unknown owner.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::plan::{self, InstallPlan};
use crate::services::config::AppSettings;
use crate::services::fs_utils::path_utils;
use crate::services::library::LibraryCatalog;
use crate::types::errors::EngineResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRecord {
    /// Forward-slash path relative to the mod directory.
    pub destination_file: String,
    /// `None` when the current owner cannot be attributed.
    pub owning_package_id: Option<String>,
}

pub struct ConflictResolver<'a> {
    catalog: &'a LibraryCatalog,
}

impl<'a> ConflictResolver<'a> {
    pub fn new(catalog: &'a LibraryCatalog) -> Self {
        Self { catalog }
    }

    /// Conflicts for installing `selected` modules of `package_id`.
    /// Read-only: never touches the filesystem beyond reading it.
    pub fn check(
        &self,
        settings: &AppSettings,
        package_id: &str,
        selected: &[String],
    ) -> EngineResult<Vec<ConflictRecord>> {
        let package = self.catalog.get(package_id)?;
        let package_dir = self.catalog.package_dir(package_id)?;
        let plan = plan::plan_install(&package, &package_dir, selected)?;
        Ok(self.conflicts_for_plan(settings, &plan))
    }

    pub fn conflicts_for_plan(&self, settings: &AppSettings, plan: &InstallPlan) -> Vec<ConflictRecord> {
        let owners = self.ownership(settings);
        let mod_dir = settings.mod_dir();

        let mut records: BTreeMap<String, ConflictRecord> = BTreeMap::new();
        for file in &plan.files {
            let key = path_utils::destination_key(&file.destination);
            let owner = match owners.get(&key) {
                Some(owner) if owner == &plan.package_id => continue,
                Some(owner) => Some(owner.clone()),
                None => {
                    let on_disk = mod_dir
                        .as_ref()
                        .is_some_and(|dir| dir.join(&file.destination).exists());
                    if !on_disk {
                        continue;
                    }
                    None
                }
            };
            records.insert(
                key,
                ConflictRecord {
                    destination_file: file.destination.clone(),
                    owning_package_id: owner,
                },
            );
        }

        if !records.is_empty() {
            log::info!(
                "{} conflict(s) installing '{}'",
                records.len(),
                plan.package_id
            );
        }
        records.into_values().collect()
    }

    /// destination key -> id of the package that installed it last.
    fn ownership(&self, settings: &AppSettings) -> HashMap<String, String> {
        let mut owners = HashMap::new();
        for id in &settings.installed_ids {
            let resolved = self
                .catalog
                .get(id)
                .and_then(|package| Ok((self.catalog.package_dir(id)?, package)));
            let (dir, package) = match resolved {
                Ok(found) => found,
                Err(e) => {
                    log::warn!("Cannot attribute files of installed package '{id}': {e}");
                    continue;
                }
            };
            let recorded = settings
                .installed_modules
                .get(id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for file in plan::installed_files(&package, &dir, recorded) {
                owners.insert(
                    path_utils::destination_key(&file.destination),
                    id.clone(),
                );
            }
        }
        owners
    }
}

#[cfg(test)]
#[path = "tests/conflict_tests.rs"]
mod tests;
