use std::fs;
use std::io::Write;
use std::path::Path;
use walkdir::WalkDir;

/// Tries to rename a file or directory using `std::fs::rename`.
/// If it fails (likely due to cross-device link errors), it falls back
/// to using `fs_extra` to copy and remove the original.
pub fn rename_cross_drive_fallback(from: &Path, to: &Path) -> std::io::Result<()> {
    match fs::rename(from, to) {
        Ok(_) => Ok(()),
        Err(e) => {
            log::warn!(
                "fs::rename failed (cross-device?): {}. Attempting fallback move...",
                e
            );

            if !from.exists() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Source path does not exist",
                ));
            }

            if to.exists() {
                return Err(e); // Propagate the original error (e.g., AlreadyExists)
            }

            if let Some(parent) = to.parent() {
                fs::create_dir_all(parent)?;
            }

            if from.is_dir() {
                // `copy_inside` makes fs_extra create `to` itself instead of `to/<name>`.
                let mut options = fs_extra::dir::CopyOptions::new();
                options.copy_inside = true;

                fs_extra::dir::move_dir(from, to, &options)
                    .map(|_| ())
                    .map_err(|err| std::io::Error::other(err.to_string()))
            } else {
                let mut options = fs_extra::file::CopyOptions::new();
                options.overwrite = false;

                fs_extra::file::move_file(from, to, &options)
                    .map(|_| ())
                    .map_err(|err| std::io::Error::other(err.to_string()))
            }
        }
    }
}

/// Remove a file, symlink or directory tree.
///
/// Read-only entries are made writable and retried once, so files the game
/// launcher marked read-only do not block a restore.
pub fn remove_path(path: &Path) -> std::io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.is_dir() {
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                clear_readonly_tree(path);
                fs::remove_dir_all(path)
            }
            Err(e) => Err(e),
        }
    } else {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                clear_readonly(path);
                fs::remove_file(path)
            }
            Err(e) => Err(e),
        }
    }
}

fn clear_readonly_tree(root: &Path) {
    for entry in WalkDir::new(root).follow_links(false).into_iter().flatten() {
        clear_readonly(entry.path());
    }
}

#[allow(clippy::permissions_set_readonly_false)]
fn clear_readonly(path: &Path) {
    if let Ok(meta) = fs::symlink_metadata(path) {
        let mut perms = meta.permissions();
        if perms.readonly() {
            perms.set_readonly(false);
            if let Err(e) = fs::set_permissions(path, perms) {
                log::warn!("Failed to clear read-only flag on {}: {e}", path.display());
            }
        }
    }
}

/// Write `contents` to `path` atomically: temp file in the same directory,
/// flushed, then persisted over the target.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Total size in bytes of all regular files below `path` (symlinks skipped).
pub fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Count regular files below `path`.
pub fn count_files(path: &Path) -> usize {
    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count()
}

/// Whether `path` is a directory with no entries. Unreadable counts as not empty.
pub fn is_dir_empty(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut d| d.next().is_none())
        .unwrap_or(false)
}
