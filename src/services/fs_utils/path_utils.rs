use std::path::{Component, Path, PathBuf};

/// Validates that the `target_path` strictly resolves _inside_ the `base_path`.
/// Rejects path traversal attempts using `..` or absolute paths aiming outside the allowed directory.
pub fn is_path_safe(base_path: &Path, target_path: &Path) -> bool {
    // If the target is absolute, it MUST start with the base_path
    if target_path.is_absolute() {
        return target_path.starts_with(base_path);
    }

    let mut depth = 0;
    for component in target_path.components() {
        match component {
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            Component::Normal(_) => {
                depth += 1;
            }
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }

    true
}

/// Resolve a caller-supplied relative path under `base_path`, rejecting escapes.
pub fn resolve_safe_path(base_path: &Path, user_path: &str) -> std::io::Result<PathBuf> {
    let target = Path::new(user_path);
    if !is_path_safe(base_path, target) {
        return Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "Path traversal blocked. Target attempts to escape directory bounds.",
        ));
    }

    Ok(base_path.join(target))
}

/// True when `name` is exactly one normal path component (no separators,
/// no `.`/`..`). Package ids must satisfy this before they touch the disk.
pub fn is_single_component(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// True when `child` sits strictly below `parent` (never `parent` itself).
/// Both paths are canonicalized when possible so symlinked parents compare equal.
pub fn is_strictly_inside(parent: &Path, child: &Path) -> bool {
    let parent = parent.canonicalize().unwrap_or_else(|_| parent.to_path_buf());
    let child = match child.parent() {
        // Canonicalize the parent only: `child` itself may be a dangling symlink.
        Some(dir) => dir
            .canonicalize()
            .map(|d| d.join(child.file_name().unwrap_or_default()))
            .unwrap_or_else(|_| child.to_path_buf()),
        None => return false,
    };
    child != parent && child.starts_with(&parent)
}

/// Render a relative path with forward slashes, the form used for module
/// paths, conflict records and persisted selections.
pub fn to_slash_string(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Key used to compare destination paths. Windows file systems are case
/// insensitive, so keys are lowercased there.
pub fn destination_key(relative: &str) -> String {
    if cfg!(windows) {
        relative.to_lowercase()
    } else {
        relative.to_string()
    }
}
