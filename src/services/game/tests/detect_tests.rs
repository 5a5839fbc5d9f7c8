use super::*;
use tempfile::TempDir;

#[test]
fn test_parse_library_folders() {
    let vdf = r#"
"libraryfolders"
{
    "0"
    {
        "path"      "/home/user/.local/share/Steam"
        "label"     ""
    }
    "1"
    {
        "path"      "/mnt/games/SteamLibrary"
    }
}
"#;
    let libs = parse_library_folders(vdf);
    assert_eq!(
        libs,
        vec![
            PathBuf::from("/home/user/.local/share/Steam"),
            PathBuf::from("/mnt/games/SteamLibrary"),
        ]
    );
}

#[test]
fn test_detects_game_in_secondary_library() {
    let home = TempDir::new().unwrap();
    let extra = TempDir::new().unwrap();

    let steam = home.path().join(".local/share/Steam");
    fs::create_dir_all(steam.join("steamapps")).unwrap();
    fs::write(
        steam.join("steamapps").join("libraryfolders.vdf"),
        format!("\"1\" {{ \"path\" \"{}\" }}", extra.path().display()),
    )
    .unwrap();

    let game = extra.path().join("steamapps/common/War Thunder");
    fs::create_dir_all(&game).unwrap();
    fs::write(game.join("config.blk"), "sound{}").unwrap();

    assert_eq!(detect_game_path_from(Some(home.path())), Some(game));
}

#[test]
fn test_no_game_found() {
    let home = TempDir::new().unwrap();
    assert_eq!(detect_game_path_from(Some(home.path())), None);
}
