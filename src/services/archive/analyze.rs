use std::fs;
use std::path::Path;

use super::types::ArchiveFormat;
use crate::types::errors::{EngineError, EngineResult};

/// Multiplier applied to the archive size when the format cannot report
/// unpacked sizes without decrypting.
const PACKED_SIZE_FACTOR: u64 = 3;

const JUNK_DIRS: &[&str] = &["__MACOSX"];
const JUNK_FILES: &[&str] = &["desktop.ini", ".ds_store", "thumbs.db"];

/// Estimate how many bytes an archive occupies once extracted.
///
/// ZIP central directories list every entry's size even when the entries are
/// encrypted; 7z and RAR fall back to a multiple of the archive size.
pub fn estimate_unpacked_size(archive_path: &Path, format: ArchiveFormat) -> EngineResult<u64> {
    let packed = fs::metadata(archive_path)
        .map_err(|e| EngineError::io_at(archive_path, e))?
        .len();

    match format {
        ArchiveFormat::Zip => {
            let file = fs::File::open(archive_path)
                .map_err(|e| EngineError::io_at(archive_path, e))?;
            let mut archive = zip::ZipArchive::new(file)
                .map_err(|e| EngineError::Extraction(format!("Invalid or corrupt ZIP: {e}")))?;
            let mut total: u64 = 0;
            for i in 0..archive.len() {
                let entry = archive
                    .by_index_raw(i)
                    .map_err(|e| EngineError::Extraction(format!("Failed to read entry {i}: {e}")))?;
                total = total.saturating_add(entry.size());
            }
            Ok(total)
        }
        ArchiveFormat::SevenZ | ArchiveFormat::Rar => Ok(packed.saturating_mul(PACKED_SIZE_FACTOR)),
    }
}

/// OS metadata entries that never belong in a package.
pub fn is_junk_entry(name: &str) -> bool {
    let normalized = name.replace('\\', "/");
    normalized.split('/').filter(|s| !s.is_empty()).any(|part| {
        let lower = part.to_lowercase();
        JUNK_DIRS.iter().any(|d| part == *d) || JUNK_FILES.contains(&lower.as_str())
    })
}
