//! On-disk collection of imported packages.
//!
//! The package map is an immutable snapshot behind an `RwLock`; rescans and
//! per-entry mutations build the next map under `write_lock` and swap it in,
//! so readers see the previous or the next snapshot, never a partial one.
//! `generation` counts library changes. `invalidate` bumps it alone, which
//! marks the snapshot stale so the next `list` rescans. Per-entry mutations
//! bump it together with the snapshot they patch, so observers see a new
//! generation without forcing a rescan.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use super::classifier;
use super::cover;
use super::info_json::{self, PackageInfo, PackageInfoUpdate};
use super::types::Package;
use crate::services::fs_utils::{file_utils, path_utils};
use crate::types::errors::{EngineError, EngineResult};

#[derive(Default)]
struct Snapshot {
    packages: Arc<BTreeMap<String, Package>>,
    /// Generation the snapshot was built at; `None` until the first scan.
    built_at: Option<u64>,
}

pub struct LibraryCatalog {
    library_dir: PathBuf,
    snapshot: RwLock<Snapshot>,
    generation: AtomicU64,
    write_lock: Mutex<()>,
}

impl LibraryCatalog {
    pub fn new(library_dir: PathBuf) -> Self {
        Self {
            library_dir,
            snapshot: RwLock::new(Snapshot::default()),
            generation: AtomicU64::new(0),
            write_lock: Mutex::new(()),
        }
    }

    pub fn library_dir(&self) -> &Path {
        &self.library_dir
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Mark the whole cache stale; the next `list` rescans the store.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Packages ordered by id. Rescans when forced or stale.
    pub fn list(&self, force_refresh: bool) -> EngineResult<Vec<Package>> {
        let packages = self.snapshot_map(force_refresh)?;
        Ok(packages.values().cloned().collect())
    }

    pub fn get(&self, id: &str) -> EngineResult<Package> {
        validate_id(id)?;
        self.snapshot_map(false)?
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("package '{id}'")))
    }

    /// Directory of an existing package.
    pub fn package_dir(&self, id: &str) -> EngineResult<PathBuf> {
        validate_id(id)?;
        let dir = self.library_dir.join(id);
        if !dir.is_dir() {
            return Err(EngineError::NotFound(format!("package '{id}'")));
        }
        Ok(dir)
    }

    /// Re-read one package from disk and update its cache entry.
    pub fn refresh_entry(&self, id: &str) -> EngineResult<Package> {
        let _guard = self.lock_writes();
        let package = load_package(&self.library_dir, id)?;
        self.replace_entries(|map| {
            map.insert(id.to_string(), package.clone());
        });
        Ok(package)
    }

    /// Remove a package directory recursively.
    pub fn delete(&self, id: &str) -> EngineResult<bool> {
        let _guard = self.lock_writes();
        let dir = self.package_dir(id)?;
        file_utils::remove_path(&dir).map_err(|e| EngineError::io_at(&dir, e))?;
        self.replace_entries(|map| {
            map.remove(id);
        });
        log::info!("Deleted package '{id}'");
        Ok(true)
    }

    /// Rename a package directory and store `new_name` as its title.
    /// Returns the package under its new id.
    pub fn rename(&self, id: &str, new_name: &str) -> EngineResult<Package> {
        let _guard = self.lock_writes();
        let old_dir = self.package_dir(id)?;

        let new_name = new_name.trim();
        let new_id = sanitize_id(new_name);
        if new_id.is_empty() {
            return Err(EngineError::InvalidPath(format!(
                "'{new_name}' is not a usable package name"
            )));
        }
        let new_dir = self.library_dir.join(&new_id);
        if new_id != id {
            if new_dir.exists() {
                return Err(EngineError::InvalidPath(format!(
                    "a package named '{new_id}' already exists"
                )));
            }
            fs::rename(&old_dir, &new_dir).map_err(|e| EngineError::io_at(&old_dir, e))?;
        }

        let update = PackageInfoUpdate {
            title: Some(new_name.to_string()),
            ..Default::default()
        };
        if let Err(e) = info_json::update_info_json(&new_dir, &update, new_name) {
            log::warn!("Renamed '{id}' but failed to store its title: {e}");
        }

        let package = load_package(&self.library_dir, &new_id)?;
        self.replace_entries(|map| {
            map.remove(id);
            map.insert(new_id.clone(), package.clone());
        });
        log::info!("Renamed package '{id}' to '{new_id}'");
        Ok(package)
    }

    pub fn update_info(&self, id: &str, update: &PackageInfoUpdate) -> EngineResult<Package> {
        let _guard = self.lock_writes();
        let dir = self.package_dir(id)?;
        info_json::update_info_json(&dir, update, id)?;
        let package = load_package(&self.library_dir, id)?;
        self.replace_entries(|map| {
            map.insert(id.to_string(), package.clone());
        });
        Ok(package)
    }

    pub fn set_cover(&self, id: &str, image_data: &[u8]) -> EngineResult<Package> {
        let _guard = self.lock_writes();
        let dir = self.package_dir(id)?;
        cover::save_cover(&dir, image_data)?;
        let package = load_package(&self.library_dir, id)?;
        self.replace_entries(|map| {
            map.insert(id.to_string(), package.clone());
        });
        Ok(package)
    }

    // ── Snapshot plumbing ────────────────────────────────

    fn lock_writes(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn current(&self) -> (Arc<BTreeMap<String, Package>>, Option<u64>) {
        let snap = self
            .snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        (snap.packages.clone(), snap.built_at)
    }

    fn snapshot_map(&self, force_refresh: bool) -> EngineResult<Arc<BTreeMap<String, Package>>> {
        let (packages, built_at) = self.current();
        if !force_refresh && built_at == Some(self.generation()) {
            return Ok(packages);
        }

        let _guard = self.lock_writes();
        // Another caller may have finished a rescan while we waited.
        let (packages, built_at) = self.current();
        let generation = self.generation();
        if !force_refresh && built_at == Some(generation) {
            return Ok(packages);
        }

        let scanned = Arc::new(scan_library(&self.library_dir)?);
        let mut snap = self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        snap.packages = scanned.clone();
        snap.built_at = Some(generation);
        log::info!("Library rescanned: {} package(s)", scanned.len());
        Ok(scanned)
    }

    /// Copy-on-write update of the cached map and a generation bump.
    /// Caller holds `write_lock`. A snapshot that was current stays current
    /// at the new generation; a stale or never-built one stays stale.
    fn replace_entries<F>(&self, f: F)
    where
        F: FnOnce(&mut BTreeMap<String, Package>),
    {
        let mut snap = self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut next = (*snap.packages).clone();
        f(&mut next);
        snap.packages = Arc::new(next);

        let previous = self.generation.fetch_add(1, Ordering::SeqCst);
        if snap.built_at == Some(previous) {
            snap.built_at = Some(previous + 1);
        }
    }
}

// ── Helpers ──────────────────────────────────────────

/// Turn a user-facing name into a library directory name.
pub fn sanitize_id(name: &str) -> String {
    sanitize_filename::sanitize(name.trim())
        .trim()
        .trim_start_matches('.')
        .trim()
        .to_string()
}

fn validate_id(id: &str) -> EngineResult<()> {
    if !path_utils::is_single_component(id) {
        return Err(EngineError::InvalidPath(format!("invalid package id '{id}'")));
    }
    Ok(())
}

fn scan_library(library_dir: &Path) -> EngineResult<BTreeMap<String, Package>> {
    let mut packages = BTreeMap::new();
    let entries = match fs::read_dir(library_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(packages),
        Err(e) => return Err(EngineError::io_at(library_dir, e)),
    };

    for entry in entries.filter_map(|e| e.ok()) {
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        let id = entry.file_name().to_string_lossy().to_string();
        if id.starts_with('.') {
            continue;
        }
        match load_package(library_dir, &id) {
            Ok(package) => {
                packages.insert(id, package);
            }
            Err(e) => log::warn!("Skipping package '{id}': {e}"),
        }
    }
    Ok(packages)
}

/// Build a [`Package`] from its directory: sidecar metadata with defaults,
/// classification, size and cover.
pub fn load_package(library_dir: &Path, id: &str) -> EngineResult<Package> {
    validate_id(id)?;
    let dir = library_dir.join(id);
    let meta = fs::metadata(&dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => EngineError::NotFound(format!("package '{id}'")),
        _ => EngineError::io_at(&dir, e),
    })?;
    if !meta.is_dir() {
        return Err(EngineError::NotFound(format!("package '{id}'")));
    }

    let info = match info_json::read_info_json(&dir) {
        Ok(Some(info)) => info,
        Ok(None) => PackageInfo::with_title(id),
        Err(e) => {
            log::warn!("{e}; using defaults for '{id}'");
            PackageInfo::with_title(id)
        }
    };

    let date = if info.date.is_empty() {
        meta.modified()
            .map(|t| {
                chrono::DateTime::<chrono::Local>::from(t)
                    .format("%Y-%m-%d")
                    .to_string()
            })
            .unwrap_or_default()
    } else {
        info.date
    };

    let classification = classifier::classify(&dir);
    Ok(Package {
        id: id.to_string(),
        title: if info.title.is_empty() { id.to_string() } else { info.title },
        author: if info.author.is_empty() { info_json::default_author() } else { info.author },
        version: if info.version.is_empty() { info_json::default_version() } else { info.version },
        note: info.note,
        language: info.language,
        date,
        links: info.links,
        size_bytes: file_utils::dir_size(&dir),
        cover_path: cover::find_cover(&dir),
        installable: !classification.folders.is_empty(),
        capabilities: classification.capabilities,
        folders: classification.folders,
    })
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
