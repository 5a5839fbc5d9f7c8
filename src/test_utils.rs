use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Once;

static INIT: Once = Once::new();

pub fn init_logger() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Create a minimal ZIP with stored (uncompressed) entries.
pub fn create_test_zip(dir: &Path, name: &str, files: &[(&str, &[u8])]) -> PathBuf {
    let zip_path = dir.join(name);
    let file = fs::File::create(&zip_path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options =
        zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    for (entry_name, content) in files {
        writer.start_file(entry_name.to_string(), options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap();
    zip_path
}

/// Create a ZipCrypto-protected ZIP.
pub fn create_encrypted_zip(
    dir: &Path,
    name: &str,
    password: &str,
    files: &[(&str, &[u8])],
) -> PathBuf {
    use zip::unstable::write::FileOptionsExt;
    let zip_path = dir.join(name);
    let file = fs::File::create(&zip_path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .with_deprecated_encryption(password.as_bytes());

    for (entry_name, content) in files {
        writer.start_file(entry_name.to_string(), options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap();
    zip_path
}

/// Create a 7z archive (LZMA2). With a password, contents and header are
/// AES-256 encrypted.
pub fn create_test_7z(
    dir: &Path,
    name: &str,
    password: Option<&str>,
    files: &[(&str, &[u8])],
) -> PathBuf {
    use sevenz_rust::{AesEncoderOptions, Password, SevenZArchiveEntry, SevenZMethod, SevenZWriter};

    let sources = dir.join(format!("{name}.src"));
    let archive_path = dir.join(name);
    let mut writer = SevenZWriter::create(&archive_path).unwrap();
    if let Some(pw) = password {
        writer.set_content_methods(vec![
            AesEncoderOptions::new(Password::from(pw)).into(),
            SevenZMethod::LZMA2.into(),
        ]);
    }

    for (entry_name, content) in files {
        let source = write_file(&sources, entry_name, content);
        writer
            .push_archive_entry(
                SevenZArchiveEntry::from_path(&source, entry_name.to_string()),
                Some(fs::File::open(&source).unwrap()),
            )
            .unwrap();
    }
    writer.finish().unwrap();
    fs::remove_dir_all(&sources).unwrap();
    archive_path
}

/// Stored RAR5 archive holding `crew_dialogs_common.assets.bank` with the
/// content `radio`.
pub fn rar_fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/radio_pack.rar")
}

/// Write `content` at `root/relative`, creating parent folders.
pub fn write_file(root: &Path, relative: &str, content: &[u8]) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Minimal game root: `config.blk` with a `sound{}` block and the flag off.
pub fn create_game_root(dir: &Path) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("config.blk"), "sound{\n  enable_mod:b=no\n}\n").unwrap();
    dir.to_path_buf()
}
