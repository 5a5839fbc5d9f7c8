//! Best-effort discovery of the game installation directory.
//!
//! Probes Steam libraries (native, Flatpak, Snap, Windows defaults) and a
//! few common install locations. Read-only; never touches the network.

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use super::validator::is_game_dir;

const GAME_FOLDER: &str = "War Thunder";

/// Steam roots relative to the home directory.
const STEAM_PATHS: &[&str] = &[
    ".local/share/Steam",
    ".steam/steam",
    ".steam/debian-installation",
    ".var/app/com.valvesoftware.Steam/.local/share/Steam",
    ".var/app/com.valvesoftware.Steam/data/Steam",
    "snap/steam/common/.local/share/Steam",
];

/// Absolute Steam roots checked on Windows.
const WINDOWS_STEAM_PATHS: &[&str] = &[
    r"C:\Program Files (x86)\Steam",
    r"C:\Program Files\Steam",
    r"D:\SteamLibrary",
    r"D:\Steam",
];

static RE_LIBRARY_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""path"\s+"([^"]+)""#).expect("Invalid regex"));

/// Extract every library `"path"` from a `libraryfolders.vdf` body.
pub fn parse_library_folders(content: &str) -> Vec<PathBuf> {
    RE_LIBRARY_PATH
        .captures_iter(content)
        .filter_map(|c| c.get(1))
        .map(|m| PathBuf::from(m.as_str().replace("\\\\", "\\")))
        .collect()
}

/// All directories that could hold a Steam `steamapps/common` tree.
fn steam_libraries(home: Option<&Path>) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = Vec::new();
    if let Some(home) = home {
        roots.extend(STEAM_PATHS.iter().map(|p| home.join(p)));
    }
    if cfg!(windows) {
        roots.extend(WINDOWS_STEAM_PATHS.iter().map(PathBuf::from));
    }

    let mut libraries = Vec::new();
    for root in roots.into_iter().filter(|r| r.exists()) {
        if !libraries.contains(&root) {
            libraries.push(root.clone());
        }
        for vdf in [
            root.join("steamapps").join("libraryfolders.vdf"),
            root.join("config").join("libraryfolders.vdf"),
        ] {
            let Ok(content) = fs::read_to_string(&vdf) else {
                continue;
            };
            for lib in parse_library_folders(&content) {
                if lib.exists() && !libraries.contains(&lib) {
                    libraries.push(lib);
                }
            }
        }
    }
    libraries
}

/// Candidate game directories in search order.
pub fn candidate_paths(home: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = steam_libraries(home)
        .into_iter()
        .map(|lib| lib.join("steamapps").join("common").join(GAME_FOLDER))
        .collect();

    if let Some(home) = home {
        candidates.push(home.join("Games").join(GAME_FOLDER));
        candidates.push(home.join(GAME_FOLDER));
    }
    if let Ok(local) = std::env::var("LOCALAPPDATA") {
        candidates.push(PathBuf::from(local).join("WarThunder"));
    }
    candidates
}

/// First candidate that validates as a game directory.
pub fn detect_game_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from);
    detect_game_path_from(home.as_deref())
}

pub fn detect_game_path_from(home: Option<&Path>) -> Option<PathBuf> {
    let found = candidate_paths(home).into_iter().find(|p| is_game_dir(p));
    match &found {
        Some(path) => log::info!("Detected game directory: {}", path.display()),
        None => log::warn!("No game directory detected"),
    }
    found
}

#[cfg(test)]
#[path = "tests/detect_tests.rs"]
mod tests;
