//! Voice-pack library and install engine.
//!
//! [`engine::Engine`] is the entry point for a presentation layer: it imports
//! archives into a local library, classifies their modules, detects file
//! conflicts and installs into or restores the game's mod directory.

pub mod engine;
pub mod services;
pub mod types;
#[cfg(test)]
pub mod test_utils;

pub use engine::{Engine, EngineEvent, OperationMessage, TaskHandle, TaskOutcome};
pub use services::config::AppSettings;
pub use services::install::{ConflictPolicy, ConflictRecord, InstallReport, RestoreReport};
pub use services::library::info_json::PackageInfoUpdate;
pub use services::library::{Capability, FolderModule, ImportSummary, ModuleType, Package};
pub use types::errors::{EngineError, EngineResult, ErrorKind};
