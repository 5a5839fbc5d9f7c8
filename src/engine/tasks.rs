use serde::Serialize;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::types::errors::{EngineError, EngineResult, ErrorKind};

/// Serializable result carried by `*Finished` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    Succeeded { message: String },
    Failed { kind: ErrorKind, error: String },
}

impl TaskOutcome {
    pub fn from_result<T>(result: &EngineResult<T>, describe: impl FnOnce(&T) -> String) -> Self {
        match result {
            Ok(value) => TaskOutcome::Succeeded {
                message: describe(value),
            },
            Err(e) => TaskOutcome::Failed {
                kind: e.kind(),
                error: e.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Succeeded { .. })
    }
}

/// `{success, message}` reply for quick library edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationMessage {
    pub success: bool,
    pub message: String,
}

impl OperationMessage {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(error: &EngineError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
        }
    }
}

/// A background install or restore. Dropping the handle does not cancel
/// the task; its `*Finished` event is emitted either way.
pub struct TaskHandle<T> {
    id: Uuid,
    handle: JoinHandle<EngineResult<T>>,
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(id: Uuid, handle: JoinHandle<EngineResult<T>>) -> Self {
        Self { id, handle }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the task and return its result.
    pub async fn wait(self) -> EngineResult<T> {
        let id = self.id;
        self.handle
            .await
            .map_err(|e| EngineError::Internal(format!("task {id} failed: {e}")))?
    }
}

/// Run blocking filesystem work off the async executor.
pub(crate) async fn run_blocking<T, F>(work: F) -> EngineResult<T>
where
    F: FnOnce() -> EngineResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| EngineError::Internal(format!("worker failed: {e}")))?
}
