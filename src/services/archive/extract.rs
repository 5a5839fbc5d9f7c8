use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::analyze::is_junk_entry;
use super::types::{ArchiveFormat, ExtractFailure};
use crate::services::fs_utils::{file_utils, path_utils};
use crate::types::errors::EngineError;

/// Extract any supported archive into `dest_path` (which must exist).
///
/// Junk entries and entries whose paths would escape `dest_path` are
/// skipped. Returns the number of files written.
pub fn extract_archive(
    archive_path: &Path,
    format: ArchiveFormat,
    dest_path: &Path,
    password: Option<&str>,
) -> Result<usize, ExtractFailure> {
    match format {
        ArchiveFormat::Zip => extract_zip_inner(archive_path, dest_path, password),
        ArchiveFormat::SevenZ => extract_7z_inner(archive_path, dest_path, password),
        ArchiveFormat::Rar => extract_rar_inner(archive_path, dest_path, password),
    }
}

fn is_password_error(msg: &str) -> bool {
    let lower = msg.to_lowercase();
    lower.contains("password") || lower.contains("decrypt") || lower.contains("encrypted")
}

/// Entry names are stored as raw bytes; archives built on Chinese Windows
/// use GBK without setting the UTF-8 flag. The zip crate's own decoding
/// (CP437 for legacy entries) is the last resort.
fn decode_entry_name(raw: &[u8], fallback: &str) -> String {
    if let Ok(utf8) = std::str::from_utf8(raw) {
        return utf8.to_string();
    }
    if let Some(gbk) = encoding_rs::GBK.decode_without_bom_handling_and_without_replacement(raw) {
        return gbk.into_owned();
    }
    fallback.to_string()
}

/// Relative output path for an entry, or `None` when it must be skipped.
fn safe_entry_path(dest_path: &Path, name: &str) -> Option<PathBuf> {
    let relative = PathBuf::from(name.replace('\\', "/"));
    if relative.as_os_str().is_empty() || !path_utils::is_path_safe(dest_path, &relative) {
        log::warn!("Skipping archive entry with unsafe path: {name}");
        return None;
    }
    Some(relative)
}

fn zip_entry_error(index: usize, error: zip::result::ZipError) -> ExtractFailure {
    let msg = error.to_string();
    if matches!(error, zip::result::ZipError::InvalidPassword) || is_password_error(&msg) {
        ExtractFailure::NeedsPassword
    } else {
        ExtractFailure::Other(EngineError::Extraction(format!(
            "Failed to read entry {index}: {msg}"
        )))
    }
}

fn extract_zip_inner(
    archive_path: &Path,
    dest_path: &Path,
    password: Option<&str>,
) -> Result<usize, ExtractFailure> {
    let file = fs::File::open(archive_path).map_err(|e| EngineError::io_at(archive_path, e))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| EngineError::Extraction(format!("Invalid or corrupt ZIP: {e}")))?;

    let mut count: usize = 0;
    for i in 0..archive.len() {
        let name = {
            let raw = archive.by_index_raw(i).map_err(|e| zip_entry_error(i, e))?;
            decode_entry_name(raw.name_raw(), raw.name())
        };
        if is_junk_entry(&name) {
            continue;
        }
        let Some(relative) = safe_entry_path(dest_path, &name) else {
            continue;
        };

        let entry = match password {
            Some(pw) => archive.by_index_decrypt(i, pw.as_bytes()),
            None => archive.by_index(i),
        };
        let mut entry = entry.map_err(|e| zip_entry_error(i, e))?;

        let output_path = dest_path.join(&relative);
        if entry.is_dir() {
            fs::create_dir_all(&output_path).map_err(|e| EngineError::io_at(&output_path, e))?;
            continue;
        }
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).map_err(|e| EngineError::io_at(parent, e))?;
        }
        let mut outfile =
            fs::File::create(&output_path).map_err(|e| EngineError::io_at(&output_path, e))?;
        if let Err(e) = io::copy(&mut entry, &mut outfile) {
            // ZipCrypto accepts roughly 1 in 256 wrong passwords at the header
            // check; the mismatch only shows up as a bad checksum here.
            let msg = e.to_string();
            if password.is_some() && (is_password_error(&msg) || msg.contains("checksum")) {
                return Err(ExtractFailure::NeedsPassword);
            }
            return Err(EngineError::io_at(&output_path, e).into());
        }
        count += 1;
    }
    Ok(count)
}

fn extract_7z_inner(
    archive_path: &Path,
    dest_path: &Path,
    password: Option<&str>,
) -> Result<usize, ExtractFailure> {
    let file = fs::File::open(archive_path).map_err(|e| EngineError::io_at(archive_path, e))?;
    let pw = sevenz_rust::Password::from(password.unwrap_or(""));

    let mut count: usize = 0;
    let result = sevenz_rust::decompress_with_extract_fn_and_password(
        file,
        dest_path,
        pw,
        |entry, reader, target| {
            let name = entry.name();
            if is_junk_entry(name) || safe_entry_path(dest_path, name).is_none() {
                return Ok(true);
            }
            if !entry.is_directory() {
                count += 1;
            }
            sevenz_rust::default_entry_extract_fn(entry, reader, target)
        },
    );

    result.map_err(|e| {
        let msg = e.to_string();
        if is_password_error(&msg) {
            ExtractFailure::NeedsPassword
        } else {
            ExtractFailure::Other(EngineError::Extraction(format!("Failed to extract 7z: {msg}")))
        }
    })?;

    Ok(count)
}

fn extract_rar_inner(
    archive_path: &Path,
    dest_path: &Path,
    password: Option<&str>,
) -> Result<usize, ExtractFailure> {
    let path_str = archive_path
        .to_str()
        .ok_or_else(|| EngineError::InvalidPath("RAR path contains invalid UTF-8".into()))?;
    let dest_str = dest_path
        .to_str()
        .ok_or_else(|| EngineError::InvalidPath("Dest path contains invalid UTF-8".into()))?;

    rar::Archive::extract_all(path_str, dest_str, password.unwrap_or("")).map_err(|e| {
        let msg = format!("{e:?}");
        if is_password_error(&msg) {
            ExtractFailure::NeedsPassword
        } else {
            ExtractFailure::Other(EngineError::Extraction(format!("Failed to extract RAR: {msg}")))
        }
    })?;

    // The rar crate extracts everything; drop junk afterwards.
    remove_junk(dest_path).map_err(|e| EngineError::io_at(dest_path, e))?;
    Ok(file_utils::count_files(dest_path))
}

/// Delete OS metadata entries (`__MACOSX`, `desktop.ini`, ...) below `root`.
/// Returns how many entries were removed.
pub fn remove_junk(root: &Path) -> io::Result<usize> {
    let mut junk: Vec<PathBuf> = Vec::new();
    let mut walker = walkdir::WalkDir::new(root).min_depth(1).follow_links(false).into_iter();
    while let Some(entry) = walker.next() {
        let Ok(entry) = entry else { continue };
        let is_junk = is_junk_entry(&entry.file_name().to_string_lossy());
        if is_junk {
            if entry.file_type().is_dir() {
                walker.skip_current_dir();
            }
            junk.push(entry.into_path());
        }
    }
    for path in &junk {
        file_utils::remove_path(path)?;
    }
    Ok(junk.len())
}

/// Smart flattening: if the extracted folder holds exactly one subfolder,
/// hoist its contents one level up and remove the wrapper.
///
/// The wrapper is parked under a unique name first so a child sharing the
/// wrapper's name (`Pack/Pack/...`) can still be hoisted. When a move fails
/// the hoisted children go back and the wrapper is restored before the
/// error is returned.
pub fn flatten_if_needed(dest_path: &Path) -> io::Result<bool> {
    let entries: Vec<_> = fs::read_dir(dest_path)?.filter_map(|e| e.ok()).collect();

    if entries.len() != 1 {
        return Ok(false);
    }
    let single_entry = &entries[0];
    if !single_entry.file_type()?.is_dir() {
        return Ok(false);
    }

    let wrapper_path = single_entry.path();
    let parked = dest_path.join(format!(".flatten-{}", uuid::Uuid::new_v4()));
    fs::rename(&wrapper_path, &parked)?;

    let mut moved: Vec<OsString> = Vec::new();
    let hoisted = hoist_children(&parked, dest_path, &mut moved)
        .and_then(|()| fs::remove_dir(&parked));
    if let Err(e) = hoisted {
        undo_flatten(&parked, dest_path, &wrapper_path, &moved);
        return Err(e);
    }

    log::debug!(
        "Flattened wrapper folder {}",
        single_entry.file_name().to_string_lossy()
    );
    Ok(true)
}

fn hoist_children(
    parked: &Path,
    dest_path: &Path,
    moved: &mut Vec<OsString>,
) -> io::Result<()> {
    for child in fs::read_dir(parked)? {
        let name = child?.file_name();
        fs::rename(parked.join(&name), dest_path.join(&name))?;
        moved.push(name);
    }
    Ok(())
}

fn undo_flatten(
    parked: &Path,
    dest_path: &Path,
    wrapper_path: &Path,
    moved: &[OsString],
) {
    for name in moved.iter().rev() {
        if let Err(e) = fs::rename(dest_path.join(name), parked.join(name)) {
            log::error!(
                "Failed to return {} to its wrapper: {e}",
                dest_path.join(name).display()
            );
        }
    }
    if let Err(e) = fs::rename(parked, wrapper_path) {
        log::error!(
            "Failed to restore wrapper folder {}: {e}",
            wrapper_path.display()
        );
    }
}
