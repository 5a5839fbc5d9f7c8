use image::ImageFormat;
use std::path::{Path, PathBuf};

use crate::services::fs_utils::file_utils;
use crate::types::errors::{EngineError, EngineResult};

/// Cover file names looked up at the package root, in priority order.
pub const COVER_FILES: &[&str] = &["cover.png", "cover.jpg", "cover.jpeg", "cover.webp"];

pub fn find_cover(package_dir: &Path) -> Option<PathBuf> {
    COVER_FILES
        .iter()
        .map(|name| package_dir.join(name))
        .find(|p| p.is_file())
}

/// True for root-level sidecar names that belong to the library, not the game.
pub fn is_cover_file(name: &str) -> bool {
    COVER_FILES.iter().any(|c| c.eq_ignore_ascii_case(name))
}

/// Replace the package cover with `image_data` (PNG, JPEG or WebP).
///
/// The bytes are fully decoded first so corrupt uploads are rejected
/// before any existing cover is touched.
pub fn save_cover(package_dir: &Path, image_data: &[u8]) -> EngineResult<PathBuf> {
    if !package_dir.is_dir() {
        return Err(EngineError::NotFound(format!(
            "Invalid package folder: {}",
            package_dir.display()
        )));
    }

    let format = image::guess_format(image_data)
        .map_err(|e| EngineError::UnsupportedFormat(format!("cover image: {e}")))?;
    let ext = match format {
        ImageFormat::Png => "png",
        ImageFormat::Jpeg => "jpg",
        ImageFormat::WebP => "webp",
        other => {
            return Err(EngineError::UnsupportedFormat(format!(
                "cover image: {other:?}"
            )))
        }
    };
    image::load_from_memory_with_format(image_data, format)
        .map_err(|e| EngineError::UnsupportedFormat(format!("Invalid image data: {e}")))?;

    for name in COVER_FILES {
        let old = package_dir.join(name);
        if old.is_file() {
            file_utils::remove_path(&old).map_err(|e| EngineError::io_at(&old, e))?;
        }
    }

    let target = package_dir.join(format!("cover.{ext}"));
    file_utils::write_atomic(&target, image_data).map_err(|e| EngineError::io_at(&target, e))?;
    log::info!("Saved cover {}", target.display());
    Ok(target)
}

#[cfg(test)]
#[path = "tests/cover_tests.rs"]
mod tests;
