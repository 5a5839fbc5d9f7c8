//! Infers which audio modules a package folder tree contains.
//!
//! A folder is a module when it directly holds at least one `.bank` file.
//! Its type comes from bank-file signatures first, then folder-name
//! keywords, then the `Folder` fallback.

use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use walkdir::WalkDir;

use super::types::{Capability, FolderModule, ModuleType, ROOT_LABEL};
use crate::services::fs_utils::path_utils;

const AUDIO_EXTENSION: &str = "bank";

static RE_GROUND_BANK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^_?crew_dialogs_ground.*\.assets\.bank$").expect("Invalid regex")
});
static RE_RADIO_BANK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^_?crew_dialogs_common.*\.assets\.bank$").expect("Invalid regex")
});
static RE_AIRCRAFT_BANK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^aircraft_gu(ns|i)\.assets\.bank$").expect("Invalid regex")
});

/// Folder-name keywords in priority order. ASCII keywords must start a
/// word; CJK keywords match anywhere.
const KEYWORDS: &[(ModuleType, &[&str])] = &[
    (ModuleType::Ground, &["ground", "tank", "陆战", "坦克"]),
    (ModuleType::Aircraft, &["aircraft", "air", "plane", "aviation", "空战", "飞机"]),
    (ModuleType::Naval, &["naval", "navy", "ship", "海战", "舰"]),
    (ModuleType::Radio, &["radio", "ambience", "ambient", "无线电"]),
    (ModuleType::Music, &["music", "bgm", "音乐"]),
    (ModuleType::Status, &["status", "announcer", "局势播报"]),
    (ModuleType::Noise, &["noise", "噪音"]),
    (ModuleType::PilotVoice, &["pilot", "飞行员"]),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub capabilities: BTreeSet<Capability>,
    /// Sorted by `relative_path`.
    pub folders: Vec<FolderModule>,
}

pub fn is_audio_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(AUDIO_EXTENSION))
}

/// Classify the package rooted at `package_root`.
pub fn classify(package_root: &Path) -> Classification {
    let mut folders = Vec::new();

    let walker = WalkDir::new(package_root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

    for entry in walker.filter_map(|e| e.ok()) {
        if !entry.file_type().is_dir() {
            continue;
        }
        let banks = direct_audio_files(entry.path());
        if banks.is_empty() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(package_root)
            .map(path_utils::to_slash_string)
            .unwrap_or_default();
        let label = if relative.is_empty() {
            ROOT_LABEL.to_string()
        } else {
            entry.file_name().to_string_lossy().to_string()
        };
        let module_type = signature_type(&banks)
            .or_else(|| keyword_type(&label))
            .unwrap_or(ModuleType::Folder);

        folders.push(FolderModule {
            relative_path: relative,
            label,
            module_type,
        });
    }

    folders.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    let capabilities = folders
        .iter()
        .filter_map(|f| f.module_type.capability())
        .collect();

    Classification {
        capabilities,
        folders,
    }
}

fn direct_audio_files(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        log::warn!("Cannot read {} while classifying", dir.display());
        return Vec::new();
    };
    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|name| is_audio_file(name))
        .collect()
}

/// Bank-file signatures, priority ground > radio > aircraft.
fn signature_type(banks: &[String]) -> Option<ModuleType> {
    let signatures: [(&Regex, ModuleType); 3] = [
        (&RE_GROUND_BANK, ModuleType::Ground),
        (&RE_RADIO_BANK, ModuleType::Radio),
        (&RE_AIRCRAFT_BANK, ModuleType::Aircraft),
    ];
    signatures
        .into_iter()
        .find(|(re, _)| banks.iter().any(|name| re.is_match(name)))
        .map(|(_, module_type)| module_type)
}

fn keyword_type(folder_name: &str) -> Option<ModuleType> {
    let lower = folder_name.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| matches_keyword(&lower, w)))
        .map(|(module_type, _)| *module_type)
}

fn matches_keyword(name: &str, keyword: &str) -> bool {
    if keyword.is_ascii() {
        name.split(|c: char| !c.is_ascii_alphanumeric())
            .any(|word| word.starts_with(keyword))
    } else {
        name.contains(keyword)
    }
}

#[cfg(test)]
#[path = "tests/classifier_tests.rs"]
mod tests;
