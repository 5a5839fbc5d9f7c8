//! Async facade consumed by the presentation layer.
//!
//! Library mutations (import, delete, rename, metadata) serialize on the
//! library lock; install and restore serialize on the game lock. A second
//! request while one is in flight is rejected with `Busy`. Guards travel
//! with the blocking worker or spawned task, so a dropped caller future
//! never releases a lock early. Blocking filesystem work runs on
//! `spawn_blocking`; progress and completion are broadcast as
//! [`EngineEvent`]s.

pub mod events;
pub mod tasks;

pub use events::EngineEvent;
pub use tasks::{OperationMessage, TaskHandle, TaskOutcome};

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::services::archive::{PasswordPrompt, PasswordPromptContext, PasswordSource};
use crate::services::config::{AppSettings, ConfigService};
use crate::services::core::operation_lock::OperationLock;
use crate::services::game::{detect, validator};
use crate::services::install::{
    ConflictPolicy, ConflictRecord, ConflictResolver, InstallExecutor, InstallReport,
    RestoreReport,
};
use crate::services::library::info_json::PackageInfoUpdate;
use crate::services::library::{ArchiveIngestor, ImportSummary, IngestOptions, LibraryCatalog, Package};
use crate::types::errors::EngineResult;
use tasks::run_blocking;

const EVENT_CAPACITY: usize = 256;

struct EngineInner {
    config: ConfigService,
    catalog: Arc<LibraryCatalog>,
    prompt: Arc<PasswordPrompt>,
    library_lock: OperationLock,
    game_lock: OperationLock,
    event_tx: broadcast::Sender<EngineEvent>,
}

impl EngineInner {
    fn emit(&self, event: EngineEvent) {
        // No subscribers is fine; the event is dropped.
        self.event_tx.send(event).ok();
    }

    fn library_changed(&self) {
        self.emit(EngineEvent::LibraryChanged {
            generation: self.catalog.generation(),
        });
    }

    fn ingestor(&self) -> ArchiveIngestor {
        let settings = self.config.get_settings();
        let passwords: Arc<dyn PasswordSource> = self.prompt.clone();
        ArchiveIngestor::new(
            self.catalog.clone(),
            IngestOptions {
                staging_dir: settings.staging_dir,
                max_password_attempts: settings.max_password_attempts,
                min_free_space_bytes: settings.min_free_space_mb.saturating_mul(1024 * 1024),
            },
            passwords,
        )
    }
}

/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    /// Load settings from `settings_path` and prepare the library and
    /// staging directories.
    pub fn new(settings_path: PathBuf) -> EngineResult<Self> {
        let config = ConfigService::new(settings_path);
        config.ensure_dirs()?;
        let settings = config.get_settings();

        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let prompt_tx = event_tx.clone();
        let prompt = PasswordPrompt::new(
            Duration::from_secs(settings.password_prompt_timeout_secs),
            Box::new(move |context: &PasswordPromptContext| {
                prompt_tx
                    .send(EngineEvent::PasswordRequired(context.clone()))
                    .ok();
            }),
        );

        log::info!(
            "Engine ready (library: {}, settings: {})",
            settings.library_dir.display(),
            config.path().display()
        );
        Ok(Self {
            inner: Arc::new(EngineInner {
                catalog: Arc::new(LibraryCatalog::new(settings.library_dir)),
                config,
                prompt: Arc::new(prompt),
                library_lock: OperationLock::new("library store"),
                game_lock: OperationLock::new("game directory"),
                event_tx,
            }),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.inner.event_tx.subscribe()
    }

    pub fn settings(&self) -> AppSettings {
        self.inner.config.get_settings()
    }

    // ── Import ───────────────────────────────────────────

    /// Import one archive. The library lock is held by the worker, so an
    /// import the caller stops waiting for still blocks other library edits
    /// until it finishes.
    pub async fn import_archive(&self, archive: PathBuf) -> EngineResult<Package> {
        let guard = self.inner.library_lock.acquire().await?;
        self.inner.emit(EngineEvent::ImportStarted {
            archive: archive.clone(),
        });

        let inner = self.inner.clone();
        run_blocking(move || {
            let _guard = guard;
            let result = inner.ingestor().import(&archive);
            inner.emit(EngineEvent::ImportFinished {
                archive,
                package_id: result.as_ref().ok().map(|p| p.id.clone()),
                outcome: TaskOutcome::from_result(&result, |p| format!("Imported '{}'", p.id)),
            });
            if result.is_ok() {
                inner.library_changed();
            }
            result
        })
        .await
    }

    /// Import each archive in turn; failures are collected, never fatal.
    pub async fn import_many(&self, archives: Vec<PathBuf>) -> EngineResult<ImportSummary> {
        let guard = self.inner.library_lock.acquire().await?;

        let inner = self.inner.clone();
        run_blocking(move || {
            let _guard = guard;
            let ingestor = inner.ingestor();
            let summary = ingestor.import_many(&archives, &mut |archive, result| {
                inner.emit(EngineEvent::ImportFinished {
                    archive: archive.to_path_buf(),
                    package_id: result.as_ref().ok().map(|p| p.id.clone()),
                    outcome: TaskOutcome::from_result(result, |p| format!("Imported '{}'", p.id)),
                });
            });

            log::info!(
                "Batch import: {} imported, {} failed",
                summary.success.len(),
                summary.failures.len()
            );
            if !summary.success.is_empty() {
                inner.library_changed();
            }
            Ok(summary)
        })
        .await
    }

    /// Answer the pending password prompt. `false` when none is pending.
    pub fn submit_archive_password(&self, password: String) -> bool {
        self.inner.prompt.submit(password)
    }

    /// Abandon the pending password prompt. `false` when none is pending.
    pub fn cancel_archive_password(&self) -> bool {
        self.inner.prompt.cancel()
    }

    // ── Library ──────────────────────────────────────────

    pub async fn list_library(&self, force_refresh: bool) -> EngineResult<Vec<Package>> {
        let inner = self.inner.clone();
        run_blocking(move || inner.catalog.list(force_refresh)).await
    }

    pub async fn delete_package(&self, id: &str) -> EngineResult<bool> {
        let guard = self.inner.library_lock.acquire().await?;
        let inner = self.inner.clone();
        let id = id.to_string();
        run_blocking(move || {
            let _guard = guard;
            let deleted = inner.catalog.delete(&id)?;
            inner.library_changed();
            Ok(deleted)
        })
        .await
    }

    /// Rename a package; installed-state entries follow the new id.
    pub async fn rename_package(&self, id: &str, new_name: &str) -> OperationMessage {
        let guard = match self.inner.library_lock.acquire().await {
            Ok(guard) => guard,
            Err(e) => return OperationMessage::failed(&e),
        };
        let inner = self.inner.clone();
        let (old_id, new_name) = (id.to_string(), new_name.to_string());
        let result = run_blocking(move || {
            let _guard = guard;
            let package = inner.catalog.rename(&old_id, &new_name)?;
            inner.library_changed();
            if package.id != old_id {
                inner.config.rename_installed(&old_id, &package.id)?;
            }
            Ok(package)
        })
        .await;

        match result {
            Ok(package) => OperationMessage::ok(format!("Renamed to '{}'", package.id)),
            Err(e) => {
                log::warn!("Rename of '{id}' failed: {e}");
                OperationMessage::failed(&e)
            }
        }
    }

    pub async fn update_package_cover(&self, id: &str, image_data: Vec<u8>) -> OperationMessage {
        let guard = match self.inner.library_lock.acquire().await {
            Ok(guard) => guard,
            Err(e) => return OperationMessage::failed(&e),
        };
        let inner = self.inner.clone();
        let id = id.to_string();
        let result = run_blocking(move || {
            let _guard = guard;
            let package = inner.catalog.set_cover(&id, &image_data)?;
            inner.library_changed();
            Ok(package)
        })
        .await;
        match result {
            Ok(package) => OperationMessage::ok(format!("Cover updated for '{}'", package.id)),
            Err(e) => OperationMessage::failed(&e),
        }
    }

    pub async fn update_package_info(
        &self,
        id: &str,
        update: PackageInfoUpdate,
    ) -> EngineResult<Package> {
        let guard = self.inner.library_lock.acquire().await?;
        let inner = self.inner.clone();
        let id = id.to_string();
        run_blocking(move || {
            let _guard = guard;
            let package = inner.catalog.update_info(&id, &update)?;
            inner.library_changed();
            Ok(package)
        })
        .await
    }

    // ── Install ──────────────────────────────────────────

    /// Files the selection would overwrite that other packages (or unknown
    /// owners) already placed in the mod directory.
    pub async fn check_conflicts(
        &self,
        id: &str,
        selected: Vec<String>,
    ) -> EngineResult<Vec<ConflictRecord>> {
        let inner = self.inner.clone();
        let id = id.to_string();
        run_blocking(move || {
            let settings = inner.config.get_settings();
            ConflictResolver::new(&inner.catalog).check(&settings, &id, &selected)
        })
        .await
    }

    /// Start installing `selected` modules of `package_id`. Rejected with
    /// `Busy` while another install or restore runs.
    pub async fn install(
        &self,
        package_id: &str,
        selected: Vec<String>,
        policy: ConflictPolicy,
    ) -> EngineResult<TaskHandle<InstallReport>> {
        let guard = self.inner.game_lock.acquire().await?;
        let task_id = Uuid::new_v4();
        let inner = self.inner.clone();
        let package_id = package_id.to_string();

        let handle = tokio::spawn(async move {
            let _guard = guard;
            let worker = inner.clone();
            let id = package_id.clone();
            let result = run_blocking(move || {
                let executor = InstallExecutor::new(&worker.catalog, &worker.config);
                executor.install(&id, &selected, policy, &mut |progress| {
                    worker.emit(EngineEvent::InstallProgress {
                        task_id,
                        package_id: id.clone(),
                        progress,
                    });
                })
            })
            .await;

            if let Err(e) = &result {
                log::error!("Install of '{package_id}' failed: {e}");
            }
            inner.emit(EngineEvent::InstallFinished {
                task_id,
                package_id,
                outcome: TaskOutcome::from_result(&result, |r| {
                    format!("Installed '{}' ({} file(s))", r.package_id, r.files_copied)
                }),
            });
            result
        });
        Ok(TaskHandle::new(task_id, handle))
    }

    /// Start a full reset of the mod directory. Rejected with `Busy` while
    /// another install or restore runs.
    pub async fn restore(&self) -> EngineResult<TaskHandle<RestoreReport>> {
        let guard = self.inner.game_lock.acquire().await?;
        let task_id = Uuid::new_v4();
        let inner = self.inner.clone();

        let handle = tokio::spawn(async move {
            let _guard = guard;
            let worker = inner.clone();
            let result = run_blocking(move || {
                let executor = InstallExecutor::new(&worker.catalog, &worker.config);
                executor.restore(&mut |progress| {
                    worker.emit(EngineEvent::RestoreProgress { task_id, progress });
                })
            })
            .await;

            if let Err(e) = &result {
                log::error!("Restore failed: {e}");
            }
            inner.emit(EngineEvent::RestoreFinished {
                task_id,
                outcome: TaskOutcome::from_result(&result, |r| {
                    format!("Restored ({} entr(ies) removed)", r.entries_removed)
                }),
            });
            result
        });
        Ok(TaskHandle::new(task_id, handle))
    }

    pub fn get_installed_ids(&self) -> BTreeSet<String> {
        self.inner.config.installed_ids()
    }

    // ── Game directory ───────────────────────────────────

    pub fn validate_game_path(&self, path: &Path) -> EngineResult<()> {
        validator::validate_game_path(path).map(|_| ())
    }

    pub async fn set_game_path(&self, path: PathBuf) -> EngineResult<()> {
        let _guard = self.inner.game_lock.acquire().await?;
        self.inner.config.set_game_path(&path)?;
        log::info!("Game directory set to {}", path.display());
        Ok(())
    }

    /// Probe well-known locations; does not persist the result.
    pub async fn detect_game_path(&self) -> Option<PathBuf> {
        tokio::task::spawn_blocking(detect::detect_game_path)
            .await
            .ok()
            .flatten()
    }
}

#[cfg(test)]
#[path = "tests/engine_tests.rs"]
mod tests;
