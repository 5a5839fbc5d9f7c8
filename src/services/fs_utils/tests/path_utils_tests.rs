use super::path_utils::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_relative_paths_inside_base() {
    let base = Path::new("/library");
    assert!(is_path_safe(base, Path::new("pack/Radio")));
    assert!(is_path_safe(base, Path::new("pack/../other")));
    assert!(!is_path_safe(base, Path::new("../escape")));
    assert!(!is_path_safe(base, Path::new("pack/../../escape")));
}

#[test]
fn test_absolute_paths_must_share_base() {
    let base = Path::new("/library");
    assert!(is_path_safe(base, Path::new("/library/pack")));
    assert!(!is_path_safe(base, Path::new("/etc/passwd")));
}

#[test]
fn test_resolve_safe_path_blocks_traversal() {
    let base = Path::new("/library");
    assert!(resolve_safe_path(base, "../../etc").is_err());
    assert_eq!(
        resolve_safe_path(base, "pack").unwrap(),
        Path::new("/library/pack")
    );
}

#[test]
fn test_single_component() {
    assert!(is_single_component("My Pack (1)"));
    assert!(!is_single_component(""));
    assert!(!is_single_component(".."));
    assert!(!is_single_component("."));
    assert!(!is_single_component("a/b"));
    assert!(!is_single_component("/abs"));
}

#[test]
fn test_strictly_inside() {
    let dir = TempDir::new().unwrap();
    let child = dir.path().join("x.bank");
    fs::write(&child, b"").unwrap();

    assert!(is_strictly_inside(dir.path(), &child));
    assert!(!is_strictly_inside(dir.path(), dir.path()));
    assert!(!is_strictly_inside(&dir.path().join("sub"), &child));
}

#[test]
fn test_to_slash_string() {
    let p = Path::new("Radio").join("sub").join("y.bank");
    assert_eq!(to_slash_string(&p), "Radio/sub/y.bank");
    assert_eq!(to_slash_string(Path::new("")), "");
}
