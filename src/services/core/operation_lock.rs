//! Operation locks for the two mutating resources: the library store and the
//! game mod directory.
//!
//! A second request while one is in flight is rejected with
//! [`EngineError::Busy`] instead of being interleaved.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::types::errors::{EngineError, EngineResult};

const ACQUIRE_TIMEOUT: Duration = Duration::from_millis(50);

/// Lock guarding one critical on-disk resource.
/// Acquired at the engine layer to keep services reusable.
pub struct OperationLock {
    name: &'static str,
    lock: Arc<Mutex<()>>,
}

impl OperationLock {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Try to acquire the lock with a short timeout.
    /// The returned guard is owned so it can move into a spawned task.
    pub async fn acquire(&self) -> EngineResult<OwnedMutexGuard<()>> {
        match tokio::time::timeout(ACQUIRE_TIMEOUT, self.lock.clone().lock_owned()).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                log::warn!("Rejected request: {} is busy", self.name);
                Err(EngineError::Busy)
            }
        }
    }

    pub fn is_locked(&self) -> bool {
        self.lock.try_lock().is_err()
    }
}

#[cfg(test)]
#[path = "tests/operation_lock_tests.rs"]
mod tests;
