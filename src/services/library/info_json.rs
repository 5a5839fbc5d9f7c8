//! `info.json` sidecar at a package root.
//!
//! - Reads and parses an existing sidecar (missing fields take defaults).
//! - Updates specific fields (merge, not overwrite), creating it if absent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::services::fs_utils::file_utils;
use crate::types::errors::{EngineError, EngineResult};

pub const INFO_FILE: &str = "info.json";

/// Package metadata stored in `info.json`. Empty strings mean "not set";
/// the catalog substitutes defaults when building a [`super::Package`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PackageInfo {
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_author")]
    pub author: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub language: Vec<String>,
    #[serde(default)]
    pub links: BTreeMap<String, String>,
}

pub fn default_author() -> String {
    "Unknown".to_string()
}
pub fn default_version() -> String {
    "1.0".to_string()
}

impl PackageInfo {
    pub fn with_title(title: &str) -> Self {
        Self {
            title: title.to_string(),
            author: default_author(),
            version: default_version(),
            ..Default::default()
        }
    }
}

/// Read and parse info.json from a package folder.
///
/// Returns `None` if the file doesn't exist.
/// Returns `Err` if the file exists but is malformed.
pub fn read_info_json(package_dir: &Path) -> EngineResult<Option<PackageInfo>> {
    let info_path = package_dir.join(INFO_FILE);
    let content = match fs::read_to_string(&info_path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(EngineError::io_at(&info_path, e)),
    };
    let info = serde_json::from_str(&content).map_err(|e| {
        EngineError::Config(format!("Malformed {}: {e}", info_path.display()))
    })?;
    Ok(Some(info))
}

/// Partial update struct: only fields that are `Some` are written.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PackageInfoUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub version: Option<String>,
    pub date: Option<String>,
    pub note: Option<String>,
    pub language: Option<Vec<String>>,
    /// Merged into the existing links; keys with empty values are removed.
    pub links: Option<BTreeMap<String, String>>,
}

/// Merge `update` into the package's info.json.
///
/// A missing or malformed sidecar is replaced by defaults titled
/// `fallback_title` before the update is applied.
pub fn update_info_json(
    package_dir: &Path,
    update: &PackageInfoUpdate,
    fallback_title: &str,
) -> EngineResult<PackageInfo> {
    let mut info = match read_info_json(package_dir) {
        Ok(Some(existing)) => existing,
        Ok(None) => PackageInfo::with_title(fallback_title),
        Err(EngineError::Config(msg)) => {
            log::warn!("{msg}; rewriting with defaults");
            PackageInfo::with_title(fallback_title)
        }
        Err(e) => return Err(e),
    };

    if let Some(ref title) = update.title {
        info.title = title.clone();
    }
    if let Some(ref author) = update.author {
        info.author = author.clone();
    }
    if let Some(ref version) = update.version {
        info.version = version.clone();
    }
    if let Some(ref date) = update.date {
        info.date = date.clone();
    }
    if let Some(ref note) = update.note {
        info.note = note.clone();
    }
    if let Some(ref language) = update.language {
        info.language = language.clone();
    }
    if let Some(ref links) = update.links {
        for (k, v) in links {
            if v.is_empty() {
                info.links.remove(k);
            } else {
                info.links.insert(k.clone(), v.clone());
            }
        }
    }

    let info_path = package_dir.join(INFO_FILE);
    let json = serde_json::to_string_pretty(&info)?;
    file_utils::write_atomic(&info_path, json.as_bytes())
        .map_err(|e| EngineError::io_at(&info_path, e))?;

    Ok(info)
}

#[cfg(test)]
#[path = "tests/info_json_tests.rs"]
mod tests;
