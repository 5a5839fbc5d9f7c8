//! Archive extraction and smart flattening for imported voice packs.
//! Split into submodules: format/size analysis, extraction, password prompts.

mod analyze;
mod extract;
pub mod password;
mod types;

pub use analyze::{estimate_unpacked_size, is_junk_entry};
pub use extract::{extract_archive, flatten_if_needed, remove_junk};
pub use password::{PasswordPrompt, PasswordPromptContext, PasswordReply, PasswordSource};
pub use types::{ArchiveFormat, ExtractFailure};

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
