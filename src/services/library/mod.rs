pub mod catalog;
pub mod classifier;
pub mod cover;
pub mod info_json;
pub mod ingest;
pub mod types;

pub use catalog::LibraryCatalog;
pub use ingest::{ArchiveIngestor, ImportFailure, ImportSummary, IngestOptions};
pub use types::{Capability, FolderModule, ModuleType, Package, ROOT_LABEL};
