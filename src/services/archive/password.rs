//! Interactive password prompts for encrypted archives.
//!
//! Extraction runs on a blocking worker; when an archive needs a password
//! the worker parks on a channel until the presentation layer answers via
//! [`PasswordPrompt::submit`] or [`PasswordPrompt::cancel`].

use serde::Serialize;
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Mutex;
use std::time::Duration;

/// State of one pending prompt. Dropped once extraction succeeds, is
/// abandoned, or runs out of attempts.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PasswordPromptContext {
    pub archive_path: PathBuf,
    /// 1-based attempt the requested password will be used for.
    pub attempt: u32,
    pub max_attempts: u32,
    /// Wrong passwords already tried for this archive.
    pub failed_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordReply {
    Password(String),
    Cancelled,
}

/// Where the ingestor gets passwords from.
pub trait PasswordSource: Send + Sync {
    /// Blocks until a password is supplied or the prompt is abandoned.
    fn request_password(&self, context: &PasswordPromptContext) -> PasswordReply;
}

type NotifyFn = Box<dyn Fn(&PasswordPromptContext) + Send + Sync>;

/// Channel-backed [`PasswordSource`]: at most one prompt is pending at a time.
pub struct PasswordPrompt {
    pending: Mutex<Option<Sender<PasswordReply>>>,
    timeout: Duration,
    notify: NotifyFn,
}

impl PasswordPrompt {
    /// `notify` is called once per prompt, after the prompt is ready to
    /// accept an answer.
    pub fn new(timeout: Duration, notify: NotifyFn) -> Self {
        Self {
            pending: Mutex::new(None),
            timeout,
            notify,
        }
    }

    /// Answer the pending prompt. Returns `false` when nothing is waiting.
    pub fn submit(&self, password: String) -> bool {
        self.reply(PasswordReply::Password(password))
    }

    /// Abandon the pending prompt. Returns `false` when nothing is waiting.
    pub fn cancel(&self) -> bool {
        self.reply(PasswordReply::Cancelled)
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }

    fn reply(&self, reply: PasswordReply) -> bool {
        let sender = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match sender {
            Some(tx) => tx.send(reply).is_ok(),
            None => {
                log::warn!("Password reply ignored: no prompt is pending");
                false
            }
        }
    }
}

impl PasswordSource for PasswordPrompt {
    fn request_password(&self, context: &PasswordPromptContext) -> PasswordReply {
        let (tx, rx) = mpsc::channel();
        *self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(tx);

        (self.notify)(context);

        let reply = match rx.recv_timeout(self.timeout) {
            Ok(reply) => reply,
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "Password prompt for {} timed out",
                    context.archive_path.display()
                );
                PasswordReply::Cancelled
            }
            Err(RecvTimeoutError::Disconnected) => PasswordReply::Cancelled,
        };

        // Clear a stale sender left behind by a timeout.
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        reply
    }
}
