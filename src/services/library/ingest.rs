//! Archive import into the library store.
//!
//! Steps per archive:
//! 1. Validate the format and check staging free space
//! 2. Extract into a scratch directory, prompting for a password when needed
//! 3. Drop junk entries and apply smart flattening
//! 4. Move the result into the library under a collision-free id
//!
//! The scratch directory is a `TempDir`, removed on every exit path.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::catalog::{sanitize_id, LibraryCatalog};
use super::types::Package;
use crate::services::archive::{
    self, ArchiveFormat, ExtractFailure, PasswordPromptContext, PasswordReply, PasswordSource,
};
use crate::services::fs_utils::{disk_space, file_utils};
use crate::types::errors::{EngineError, EngineResult, ErrorKind};

const FALLBACK_ID: &str = "package";

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub staging_dir: PathBuf,
    pub max_password_attempts: u32,
    /// Headroom required on the staging volume on top of the unpacked size.
    pub min_free_space_bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportFailure {
    pub archive: PathBuf,
    pub kind: ErrorKind,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub success: Vec<Package>,
    pub failures: Vec<ImportFailure>,
}

pub struct ArchiveIngestor {
    catalog: Arc<LibraryCatalog>,
    options: IngestOptions,
    passwords: Arc<dyn PasswordSource>,
}

impl ArchiveIngestor {
    pub fn new(
        catalog: Arc<LibraryCatalog>,
        options: IngestOptions,
        passwords: Arc<dyn PasswordSource>,
    ) -> Self {
        Self {
            catalog,
            options,
            passwords,
        }
    }

    /// Import one archive and return the registered package.
    pub fn import(&self, archive_path: &Path) -> EngineResult<Package> {
        let format = ArchiveFormat::from_path(archive_path).ok_or_else(|| {
            EngineError::UnsupportedFormat(archive_path.display().to_string())
        })?;
        if !archive_path.is_file() {
            return Err(EngineError::NotFound(archive_path.display().to_string()));
        }

        let staging = &self.options.staging_dir;
        fs::create_dir_all(staging).map_err(|e| EngineError::io_at(staging, e))?;
        let unpacked = archive::estimate_unpacked_size(archive_path, format)?;
        disk_space::ensure_space(
            staging,
            unpacked.saturating_add(self.options.min_free_space_bytes),
        )?;

        let scratch = tempfile::Builder::new()
            .prefix("import-")
            .tempdir_in(staging)
            .map_err(|e| EngineError::io_at(staging, e))?;
        let content_dir = scratch.path().join("content");

        log::info!("Importing {}", archive_path.display());
        let files = self.extract_with_prompts(archive_path, format, &content_dir)?;

        archive::remove_junk(&content_dir).map_err(|e| EngineError::io_at(&content_dir, e))?;
        if files == 0 || file_utils::count_files(&content_dir) == 0 {
            return Err(EngineError::Extraction(format!(
                "{} contains no files",
                archive_path.display()
            )));
        }
        archive::flatten_if_needed(&content_dir)
            .map_err(|e| EngineError::io_at(&content_dir, e))?;

        let id = self.unique_id(archive_path);
        let target = self.catalog.library_dir().join(&id);
        fs::create_dir_all(self.catalog.library_dir())
            .map_err(|e| EngineError::io_at(self.catalog.library_dir(), e))?;
        file_utils::rename_cross_drive_fallback(&content_dir, &target)
            .map_err(|e| EngineError::io_at(&target, e))?;

        let package = self.catalog.refresh_entry(&id)?;
        log::info!(
            "Imported {} as '{}' ({} module(s))",
            archive_path.display(),
            id,
            package.folders.len()
        );
        Ok(package)
    }

    /// Import archives one by one; a failure never aborts the batch.
    /// `on_each` sees every per-archive result before it is summarized.
    pub fn import_many(
        &self,
        archive_paths: &[PathBuf],
        on_each: &mut dyn FnMut(&Path, &EngineResult<Package>),
    ) -> ImportSummary {
        let mut summary = ImportSummary::default();
        for path in archive_paths {
            let result = self.import(path);
            on_each(path, &result);
            match result {
                Ok(package) => summary.success.push(package),
                Err(e) => {
                    log::error!("Import of {} failed: {e}", path.display());
                    summary.failures.push(ImportFailure {
                        archive: path.clone(),
                        kind: e.kind(),
                        error: e.to_string(),
                    });
                }
            }
        }
        summary
    }

    /// First try without a password; on each "needs password" ask the
    /// source. Wrong passwords count towards the attempt limit.
    fn extract_with_prompts(
        &self,
        archive_path: &Path,
        format: ArchiveFormat,
        content_dir: &Path,
    ) -> EngineResult<usize> {
        let max_attempts = self.options.max_password_attempts.max(1);
        let mut password: Option<String> = None;
        let mut failed_attempts: u32 = 0;

        loop {
            reset_dir(content_dir)?;
            match archive::extract_archive(archive_path, format, content_dir, password.as_deref())
            {
                Ok(count) => return Ok(count),
                Err(ExtractFailure::Other(e)) => return Err(e),
                Err(ExtractFailure::NeedsPassword) => {}
            }

            if password.is_some() {
                failed_attempts += 1;
                log::warn!(
                    "Wrong password for {} ({failed_attempts}/{max_attempts})",
                    archive_path.display()
                );
                if failed_attempts >= max_attempts {
                    return Err(EngineError::ArchiveAuthFailure {
                        archive: archive_path.to_path_buf(),
                        attempts: failed_attempts,
                    });
                }
            }

            let context = PasswordPromptContext {
                archive_path: archive_path.to_path_buf(),
                attempt: failed_attempts + 1,
                max_attempts,
                failed_attempts,
            };
            match self.passwords.request_password(&context) {
                PasswordReply::Password(value) => password = Some(value),
                PasswordReply::Cancelled => {
                    return Err(EngineError::PasswordCancelled(archive_path.to_path_buf()))
                }
            }
        }
    }

    /// Archive stem as a directory name, suffixed `" (N)"` on collision.
    fn unique_id(&self, archive_path: &Path) -> String {
        let stem = archive_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut base = sanitize_id(&stem);
        if base.is_empty() {
            base = FALLBACK_ID.to_string();
        }

        let library = self.catalog.library_dir();
        if !library.join(&base).exists() {
            return base;
        }
        let mut counter = 1;
        loop {
            let candidate = format!("{base} ({counter})");
            if !library.join(&candidate).exists() {
                return candidate;
            }
            counter += 1;
        }
    }
}

/// Empty `dir`, so a retried extraction never mixes with a failed one.
fn reset_dir(dir: &Path) -> EngineResult<()> {
    if dir.exists() {
        file_utils::remove_path(dir).map_err(|e| EngineError::io_at(dir, e))?;
    }
    fs::create_dir_all(dir).map_err(|e| EngineError::io_at(dir, e))
}

#[cfg(test)]
#[path = "tests/ingest_tests.rs"]
mod tests;
