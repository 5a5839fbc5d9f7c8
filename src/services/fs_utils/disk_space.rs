//! Free-space check for the volume holding a directory.

use std::path::Path;

use crate::types::errors::{EngineError, EngineResult};

/// Available bytes on the disk whose mount point is the longest prefix of
/// `dir`. `None` when no mounted disk matches (e.g. unusual sandboxes).
pub fn available_space(dir: &Path) -> Option<u64> {
    let disks = sysinfo::Disks::new_with_refreshed_list();
    let search_path = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());

    let mut available = None;
    let mut matched_len = 0;
    for disk in disks.list() {
        let mount = disk.mount_point();
        if search_path.starts_with(mount) {
            let mount_len = mount.as_os_str().len();
            if mount_len >= matched_len {
                matched_len = mount_len;
                available = Some(disk.available_space());
            }
        }
    }
    available
}

/// Fail with `InsufficientSpace` when `dir`'s volume cannot hold `required` bytes.
/// Unknown volumes pass; the extraction itself will surface a real I/O error.
pub fn ensure_space(dir: &Path, required: u64) -> EngineResult<()> {
    match available_space(dir) {
        Some(available) if available < required => {
            Err(EngineError::InsufficientSpace { required, available })
        }
        _ => Ok(()),
    }
}
