#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;
use voxdeck_lib::Engine;

static INIT: Once = Once::new();

pub fn init_logger() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

pub struct TestContext {
    pub dir: TempDir,
    pub engine: Engine,
    pub game: PathBuf,
}

impl TestContext {
    /// Engine with settings under a temp dir and a valid game root attached.
    pub async fn new() -> Self {
        init_logger();
        let dir = TempDir::new().expect("temp dir");
        let engine = Engine::new(dir.path().join("settings.json")).expect("engine");

        let game = dir.path().join("game");
        fs::create_dir_all(&game).expect("game dir");
        fs::write(game.join("config.blk"), "sound{\n  enable_mod:b=no\n}\n").expect("config");
        engine.set_game_path(game.clone()).await.expect("game path");

        Self { dir, engine, game }
    }

    pub fn mod_dir(&self) -> PathBuf {
        self.game.join("sound/mod")
    }

    pub fn config_blk(&self) -> String {
        fs::read_to_string(self.game.join("config.blk")).expect("config.blk")
    }

    pub fn zip(&self, name: &str, files: &[(&str, &[u8])]) -> PathBuf {
        write_zip(self.dir.path(), name, None, files)
    }

    pub fn encrypted_zip(&self, name: &str, password: &str, files: &[(&str, &[u8])]) -> PathBuf {
        write_zip(self.dir.path(), name, Some(password), files)
    }
}

pub fn write_zip(
    dir: &Path,
    name: &str,
    password: Option<&str>,
    files: &[(&str, &[u8])],
) -> PathBuf {
    use zip::unstable::write::FileOptionsExt;

    let path = dir.join(name);
    let mut writer = zip::ZipWriter::new(fs::File::create(&path).expect("zip file"));
    let mut options =
        zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    if let Some(password) = password {
        options = options.with_deprecated_encryption(password.as_bytes());
    }
    for (entry, content) in files {
        writer.start_file(entry.to_string(), options).expect("zip entry");
        writer.write_all(content).expect("zip write");
    }
    writer.finish().expect("zip finish");
    path
}

pub fn dir_is_empty(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}
