use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Display label of the module whose folder is the package root.
pub const ROOT_LABEL: &str = "root";

/// Kind of audio module a folder holds. `Folder` is the fallback when no
/// signature or keyword matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleType {
    Ground,
    Aircraft,
    Naval,
    Radio,
    Music,
    Status,
    Noise,
    PilotVoice,
    Folder,
}

/// Coarse package-level tag shown by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Tank,
    Air,
    Naval,
    Radio,
    Music,
    Status,
    Noise,
    Pilot,
}

impl ModuleType {
    pub fn capability(self) -> Option<Capability> {
        match self {
            ModuleType::Ground => Some(Capability::Tank),
            ModuleType::Aircraft => Some(Capability::Air),
            ModuleType::Naval => Some(Capability::Naval),
            ModuleType::Radio => Some(Capability::Radio),
            ModuleType::Music => Some(Capability::Music),
            ModuleType::Status => Some(Capability::Status),
            ModuleType::Noise => Some(Capability::Noise),
            ModuleType::PilotVoice => Some(Capability::Pilot),
            ModuleType::Folder => None,
        }
    }
}

/// One selectable installation unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderModule {
    /// Forward-slash path relative to the package root; `""` is the root.
    pub relative_path: String,
    pub label: String,
    pub module_type: ModuleType,
}

impl FolderModule {
    pub fn is_root(&self) -> bool {
        self.relative_path.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    /// Directory name in the library store.
    pub id: String,
    pub title: String,
    pub author: String,
    pub version: String,
    pub note: String,
    pub language: Vec<String>,
    /// `YYYY-MM-DD`.
    pub date: String,
    pub links: BTreeMap<String, String>,
    pub size_bytes: u64,
    pub cover_path: Option<PathBuf>,
    pub capabilities: BTreeSet<Capability>,
    pub folders: Vec<FolderModule>,
    /// `false` when no folder qualified as a module.
    pub installable: bool,
}

impl Package {
    pub fn module(&self, relative_path: &str) -> Option<&FolderModule> {
        self.folders.iter().find(|f| f.relative_path == relative_path)
    }
}
