use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

use super::tasks::TaskOutcome;
use crate::services::archive::PasswordPromptContext;
use crate::services::install::InstallProgress;

/// Notifications pushed to subscribers of [`super::Engine::subscribe`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    ImportStarted {
        archive: PathBuf,
    },
    /// An import is parked until `submit_archive_password` or
    /// `cancel_archive_password` is called.
    PasswordRequired(PasswordPromptContext),
    ImportFinished {
        archive: PathBuf,
        #[serde(skip_serializing_if = "Option::is_none")]
        package_id: Option<String>,
        outcome: TaskOutcome,
    },
    InstallProgress {
        task_id: Uuid,
        package_id: String,
        progress: InstallProgress,
    },
    InstallFinished {
        task_id: Uuid,
        package_id: String,
        outcome: TaskOutcome,
    },
    RestoreProgress {
        task_id: Uuid,
        progress: InstallProgress,
    },
    RestoreFinished {
        task_id: Uuid,
        outcome: TaskOutcome,
    },
    /// The library catalog changed; `generation` is the catalog's token.
    LibraryChanged {
        generation: u64,
    },
}
