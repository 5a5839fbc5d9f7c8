use super::*;
use crate::services::library::types::{Capability, ModuleType};
use crate::test_utils::write_file;
use std::sync::Arc;
use tempfile::TempDir;

fn setup() -> (TempDir, LibraryCatalog) {
    let dir = TempDir::new().unwrap();
    let library = dir.path().join("library");
    fs::create_dir_all(&library).unwrap();
    let catalog = LibraryCatalog::new(library);
    (dir, catalog)
}

#[test]
fn test_list_builds_packages_with_defaults() {
    let (_dir, catalog) = setup();
    write_file(catalog.library_dir(), "PackA/Ground/x.bank", b"1234");
    write_file(catalog.library_dir(), "PackA/Radio/y.bank", b"12");

    let packages = catalog.list(false).unwrap();
    assert_eq!(packages.len(), 1);
    let pack = &packages[0];
    assert_eq!(pack.id, "PackA");
    assert_eq!(pack.title, "PackA");
    assert_eq!(pack.author, "Unknown");
    assert_eq!(pack.version, "1.0");
    assert_eq!(pack.date.len(), 10);
    assert_eq!(pack.size_bytes, 6);
    assert!(pack.installable);
    assert_eq!(pack.folders[0].module_type, ModuleType::Ground);
    assert!(pack.capabilities.contains(&Capability::Tank));
}

#[test]
fn test_info_json_and_cover_are_read() {
    let (_dir, catalog) = setup();
    write_file(catalog.library_dir(), "PackA/x.bank", b"");
    write_file(
        catalog.library_dir(),
        "PackA/info.json",
        br#"{"title":"Fancy","author":"Me","date":"2024-01-02","language":["zh"]}"#,
    );
    write_file(catalog.library_dir(), "PackA/cover.jpg", b"jpg");

    let pack = catalog.get("PackA").unwrap();
    assert_eq!(pack.title, "Fancy");
    assert_eq!(pack.author, "Me");
    assert_eq!(pack.date, "2024-01-02");
    assert_eq!(pack.language, vec!["zh"]);
    assert_eq!(
        pack.cover_path,
        Some(catalog.library_dir().join("PackA/cover.jpg"))
    );
}

#[test]
fn test_package_without_modules_is_listed_but_not_installable() {
    let (_dir, catalog) = setup();
    write_file(catalog.library_dir(), "Docs/readme.txt", b"hi");

    let pack = catalog.get("Docs").unwrap();
    assert!(!pack.installable);
    assert!(pack.folders.is_empty());
}

#[test]
fn test_cache_served_until_invalidated() {
    let (_dir, catalog) = setup();
    write_file(catalog.library_dir(), "PackA/x.bank", b"");
    assert_eq!(catalog.list(false).unwrap().len(), 1);

    write_file(catalog.library_dir(), "PackB/x.bank", b"");
    assert_eq!(catalog.list(false).unwrap().len(), 1);
    assert_eq!(catalog.list(true).unwrap().len(), 2);

    write_file(catalog.library_dir(), "PackC/x.bank", b"");
    catalog.invalidate();
    assert_eq!(catalog.list(false).unwrap().len(), 3);
}

#[test]
fn test_get_unknown_and_invalid_ids() {
    let (_dir, catalog) = setup();
    assert!(matches!(catalog.get("nope"), Err(EngineError::NotFound(_))));
    assert!(matches!(
        catalog.get("../escape"),
        Err(EngineError::InvalidPath(_))
    ));
}

#[test]
fn test_delete_removes_directory_and_entry() {
    let (_dir, catalog) = setup();
    write_file(catalog.library_dir(), "PackA/x.bank", b"");
    write_file(catalog.library_dir(), "PackB/x.bank", b"");
    catalog.list(false).unwrap();

    assert!(catalog.delete("PackA").unwrap());
    assert!(!catalog.library_dir().join("PackA").exists());
    let ids: Vec<_> = catalog.list(false).unwrap().into_iter().map(|p| p.id).collect();
    assert_eq!(ids, vec!["PackB"]);

    assert!(matches!(catalog.delete("PackA"), Err(EngineError::NotFound(_))));
}

#[test]
fn test_rename_moves_directory_and_sets_title() {
    let (_dir, catalog) = setup();
    write_file(catalog.library_dir(), "Old/Radio/y.bank", b"");
    catalog.list(false).unwrap();

    let renamed = catalog.rename("Old", "New: Name").unwrap();
    assert_eq!(renamed.title, "New: Name");
    assert!(catalog.library_dir().join(&renamed.id).is_dir());
    assert!(!catalog.library_dir().join("Old").exists());

    let ids: Vec<_> = catalog.list(false).unwrap().into_iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![renamed.id]);
}

#[test]
fn test_rename_collision_changes_nothing() {
    let (_dir, catalog) = setup();
    write_file(catalog.library_dir(), "A/x.bank", b"");
    write_file(catalog.library_dir(), "B/x.bank", b"");

    let result = catalog.rename("A", "B");
    assert!(matches!(result, Err(EngineError::InvalidPath(_))));
    assert!(catalog.library_dir().join("A").is_dir());
    assert_eq!(catalog.get("A").unwrap().title, "A");
}

#[test]
fn test_update_info_refreshes_single_entry() {
    let (_dir, catalog) = setup();
    write_file(catalog.library_dir(), "PackA/x.bank", b"");
    catalog.list(false).unwrap();
    let generation = catalog.generation();

    let update = PackageInfoUpdate {
        author: Some("Someone".into()),
        ..Default::default()
    };
    let pack = catalog.update_info("PackA", &update).unwrap();
    assert_eq!(pack.author, "Someone");
    assert_eq!(catalog.get("PackA").unwrap().author, "Someone");
    assert!(catalog.generation() > generation);
}

#[test]
fn test_entry_mutations_bump_generation_without_rescan() {
    let (_dir, catalog) = setup();
    write_file(catalog.library_dir(), "PackA/x.bank", b"");
    write_file(catalog.library_dir(), "PackB/x.bank", b"");
    catalog.list(false).unwrap();

    // Only a rescan would pick this folder up.
    write_file(catalog.library_dir(), "Other/x.bank", b"");
    let listed_ids = |catalog: &LibraryCatalog| -> Vec<String> {
        catalog.list(false).unwrap().into_iter().map(|p| p.id).collect()
    };

    let mut last = catalog.generation();
    let mut bumped = |catalog: &LibraryCatalog| {
        let now = catalog.generation();
        assert!(now > last, "generation {now} did not move past {last}");
        last = now;
    };

    catalog.refresh_entry("PackA").unwrap();
    bumped(&catalog);
    let update = PackageInfoUpdate {
        author: Some("Someone".into()),
        ..Default::default()
    };
    catalog.update_info("PackA", &update).unwrap();
    bumped(&catalog);
    catalog.rename("PackA", "Renamed").unwrap();
    bumped(&catalog);
    catalog.delete("PackB").unwrap();
    bumped(&catalog);

    assert_eq!(listed_ids(&catalog), vec!["Renamed"]);

    catalog.invalidate();
    assert_eq!(listed_ids(&catalog), vec!["Other", "Renamed"]);
}

#[test]
fn test_entry_mutation_before_first_scan_keeps_cache_stale() {
    let (_dir, catalog) = setup();
    write_file(catalog.library_dir(), "PackA/x.bank", b"");
    write_file(catalog.library_dir(), "PackB/x.bank", b"");

    catalog.refresh_entry("PackA").unwrap();
    assert_eq!(catalog.list(false).unwrap().len(), 2);
}

#[test]
fn test_concurrent_lists_never_see_partial_results() {
    let (_dir, catalog) = setup();
    for i in 0..20 {
        write_file(catalog.library_dir(), &format!("Pack{i:02}/x.bank"), b"");
    }
    let catalog = Arc::new(catalog);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let catalog = catalog.clone();
            std::thread::spawn(move || catalog.list(i % 2 == 0).unwrap().len())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 20);
    }
}

#[test]
fn test_sanitize_id() {
    assert_eq!(sanitize_id("  My Pack  "), "My Pack");
    assert_eq!(sanitize_id("a/b"), "ab");
    assert_eq!(sanitize_id(".hidden"), "hidden");
}

#[test]
fn test_default_date_comes_from_folder_mtime() {
    let (_dir, catalog) = setup();
    write_file(catalog.library_dir(), "Dated/x.bank", b"1");
    // 2023-06-15 12:00 UTC
    let noon = filetime::FileTime::from_unix_time(1_686_830_400, 0);
    filetime::set_file_mtime(catalog.library_dir().join("Dated"), noon).unwrap();

    let pack = catalog.get("Dated").unwrap();
    assert_eq!(pack.date, "2023-06-15");
}
