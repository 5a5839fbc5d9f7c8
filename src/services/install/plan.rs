//! Maps a module selection onto destination files inside the mod directory.
//!
//! Files are placed relative to their module folder: `Radio/y.bank` lands at
//! `<mod_dir>/y.bank`, `Radio/extra/z.bank` at `<mod_dir>/extra/z.bank`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::services::fs_utils::path_utils;
use crate::services::library::cover;
use crate::services::library::info_json::INFO_FILE;
use crate::services::library::{Package, ROOT_LABEL};
use crate::types::errors::{EngineError, EngineResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    pub source: PathBuf,
    /// Forward-slash path relative to the mod directory.
    pub destination: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    pub package_id: String,
    /// Resolved module paths, in package order.
    pub modules: Vec<String>,
    /// Sorted by destination; one entry per destination.
    pub files: Vec<PlannedFile>,
}

/// Validate `selected` against the package's modules and list the files to copy.
pub fn plan_install(
    package: &Package,
    package_dir: &Path,
    selected: &[String],
) -> EngineResult<InstallPlan> {
    if package.folders.is_empty() {
        return Err(EngineError::InvalidSelection(format!(
            "package '{}' has no installable modules",
            package.id
        )));
    }
    if selected.is_empty() {
        return Err(EngineError::InvalidSelection("no modules selected".into()));
    }

    let mut wanted = Vec::new();
    for raw in selected {
        let module = resolve_module(package, raw).ok_or_else(|| {
            EngineError::InvalidSelection(format!(
                "'{raw}' is not a module of package '{}'",
                package.id
            ))
        })?;
        if !wanted.contains(&module) {
            wanted.push(module);
        }
    }
    let modules: Vec<String> = package
        .folders
        .iter()
        .map(|f| f.relative_path.clone())
        .filter(|p| wanted.contains(p))
        .collect();

    Ok(InstallPlan {
        package_id: package.id.clone(),
        files: module_files(package_dir, &modules),
        modules,
    })
}

/// Lenient variant for attributing files of an already-installed package:
/// modules that no longer exist are ignored and an empty record means
/// "every module".
pub fn installed_files(package: &Package, package_dir: &Path, recorded: &[String]) -> Vec<PlannedFile> {
    let modules: Vec<String> = if recorded.is_empty() {
        package.folders.iter().map(|f| f.relative_path.clone()).collect()
    } else {
        recorded
            .iter()
            .filter_map(|m| resolve_module(package, m))
            .collect()
    };
    module_files(package_dir, &modules)
}

/// Normalize a caller-supplied module path to a package folder path.
fn resolve_module(package: &Package, raw: &str) -> Option<String> {
    let normalized = raw.replace('\\', "/");
    let normalized = normalized.trim_matches('/');
    if let Some(module) = package.module(normalized) {
        return Some(module.relative_path.clone());
    }
    if normalized == ROOT_LABEL || normalized == "." {
        return package.module("").map(|m| m.relative_path.clone());
    }
    None
}

fn module_files(package_dir: &Path, modules: &[String]) -> Vec<PlannedFile> {
    let mut by_destination: BTreeMap<String, PlannedFile> = BTreeMap::new();
    for module in modules {
        let module_dir = if module.is_empty() {
            package_dir.to_path_buf()
        } else {
            package_dir.join(module)
        };
        let walker = WalkDir::new(&module_dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file());

        for entry in walker {
            let Ok(relative) = entry.path().strip_prefix(&module_dir) else {
                continue;
            };
            let destination = path_utils::to_slash_string(relative);
            if module.is_empty() && is_sidecar(&destination) {
                continue;
            }
            // Later modules win a shared destination, as they would on disk.
            by_destination.insert(
                path_utils::destination_key(&destination),
                PlannedFile {
                    source: entry.path().to_path_buf(),
                    destination,
                },
            );
        }
    }
    by_destination.into_values().collect()
}

/// Library-only files at the package root.
fn is_sidecar(destination: &str) -> bool {
    !destination.contains('/')
        && (destination.eq_ignore_ascii_case(INFO_FILE) || cover::is_cover_file(destination))
}

#[cfg(test)]
#[path = "tests/plan_tests.rs"]
mod tests;
