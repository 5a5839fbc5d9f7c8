mod common;

use common::{dir_is_empty, TestContext};
use std::fs;
use std::time::Duration;
use tokio::sync::broadcast::Receiver;
use voxdeck_lib::{Capability, ConflictPolicy, EngineError, EngineEvent, ModuleType};

async fn next_password_prompt(events: &mut Receiver<EngineEvent>) -> u32 {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(10), events.recv())
            .await
            .expect("timed out waiting for a password prompt")
            .expect("event channel closed");
        if let EngineEvent::PasswordRequired(context) = event {
            return context.attempt;
        }
    }
}

#[tokio::test]
async fn import_classifies_top_level_modules() {
    let ctx = TestContext::new().await;
    let zip = ctx.zip("pack.zip", &[("Ground/x.bank", b"g"), ("Radio/y.bank", b"r")]);

    let package = ctx.engine.import_archive(zip).await.unwrap();

    assert_eq!(package.id, "pack");
    let types: Vec<ModuleType> = package.folders.iter().map(|f| f.module_type).collect();
    assert_eq!(types, vec![ModuleType::Ground, ModuleType::Radio]);
    assert_eq!(
        package.capabilities.iter().copied().collect::<Vec<_>>(),
        vec![Capability::Tank, Capability::Radio]
    );
    assert!(dir_is_empty(&ctx.engine.settings().staging_dir));
}

#[tokio::test]
async fn import_hoists_single_wrapper_folder() {
    let ctx = TestContext::new().await;
    let zip = ctx.zip(
        "wrapped.zip",
        &[("Wrapper/Ground/x.bank", b"g"), ("Wrapper/Radio/y.bank", b"r")],
    );

    let package = ctx.engine.import_archive(zip).await.unwrap();
    let paths: Vec<&str> = package
        .folders
        .iter()
        .map(|f| f.relative_path.as_str())
        .collect();
    assert_eq!(paths, vec!["Ground", "Radio"]);
}

#[tokio::test]
async fn colliding_imports_get_distinct_ids() {
    let ctx = TestContext::new().await;
    let first = ctx.zip("pack.zip", &[("Radio/y.bank", b"1")]);
    let nested = ctx.dir.path().join("other");
    fs::create_dir_all(&nested).unwrap();
    let second = common::write_zip(&nested, "pack.zip", None, &[("Radio/y.bank", b"2")]);

    let a = ctx.engine.import_archive(first).await.unwrap();
    let b = ctx.engine.import_archive(second).await.unwrap();
    assert_eq!(a.id, "pack");
    assert_eq!(b.id, "pack (1)");

    let listed = ctx.engine.list_library(true).await.unwrap();
    assert_eq!(listed.len(), 2);

    assert!(ctx.engine.delete_package(&a.id).await.unwrap());
    let listed = ctx.engine.list_library(false).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, b.id);
}

#[tokio::test]
async fn install_selected_module_then_restore_everything() {
    let ctx = TestContext::new().await;
    let pack = ctx
        .engine
        .import_archive(ctx.zip("pack.zip", &[("Ground/x.bank", b"g"), ("Radio/y.bank", b"r")]))
        .await
        .unwrap();
    let other = ctx
        .engine
        .import_archive(ctx.zip("music.zip", &[("Music/m.bank", b"m")]))
        .await
        .unwrap();

    let mut events = ctx.engine.subscribe();
    let task = ctx
        .engine
        .install(&pack.id, vec!["Radio".into()], ConflictPolicy::Confirmed)
        .await
        .unwrap();
    let task_id = task.id();
    let report = task.wait().await.unwrap();
    assert_eq!(report.files_copied, 1);
    assert!(ctx.mod_dir().join("y.bank").exists());
    assert!(!ctx.mod_dir().join("x.bank").exists());
    assert!(ctx.config_blk().contains("enable_mod:b=yes"));
    assert!(ctx.engine.get_installed_ids().contains(&pack.id));

    let mut finished = false;
    while let Ok(event) = events.try_recv() {
        if let EngineEvent::InstallFinished { task_id: id, outcome, .. } = event {
            assert_eq!(id, task_id);
            assert!(outcome.is_success());
            finished = true;
        }
    }
    assert!(finished, "install should report completion");

    ctx.engine
        .install(&other.id, vec!["Music".into()], ConflictPolicy::Confirmed)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(ctx.engine.get_installed_ids().len(), 2);

    for _ in 0..2 {
        ctx.engine.restore().await.unwrap().wait().await.unwrap();
        assert!(dir_is_empty(&ctx.mod_dir()));
        assert!(ctx.config_blk().contains("enable_mod:b=no"));
        assert!(ctx.engine.get_installed_ids().is_empty());
    }
}

#[tokio::test]
async fn conflicts_attribute_ownership_to_installed_package() {
    let ctx = TestContext::new().await;
    let a = ctx
        .engine
        .import_archive(ctx.zip("a.zip", &[("Radio/y.bank", b"a")]))
        .await
        .unwrap();
    let b = ctx
        .engine
        .import_archive(ctx.zip("b.zip", &[("Radio/y.bank", b"b"), ("Radio/z.bank", b"b")]))
        .await
        .unwrap();

    ctx.engine
        .install(&a.id, vec!["Radio".into()], ConflictPolicy::Confirmed)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    let conflicts = ctx.engine.check_conflicts(&b.id, vec!["Radio".into()]).await.unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].destination_file, "y.bank");
    assert_eq!(conflicts[0].owning_package_id.as_deref(), Some(a.id.as_str()));

    let own = ctx.engine.check_conflicts(&a.id, vec!["Radio".into()]).await.unwrap();
    assert!(own.is_empty());

    let guarded = ctx
        .engine
        .install(&b.id, vec!["Radio".into()], ConflictPolicy::AbortOnConflict)
        .await
        .unwrap()
        .wait()
        .await;
    assert!(matches!(guarded, Err(EngineError::ConflictDetected(_))));
    assert_eq!(fs::read(ctx.mod_dir().join("y.bank")).unwrap(), b"a");
}

#[tokio::test]
async fn empty_selection_is_rejected() {
    let ctx = TestContext::new().await;
    let pack = ctx
        .engine
        .import_archive(ctx.zip("pack.zip", &[("Radio/y.bank", b"r")]))
        .await
        .unwrap();

    let result = ctx.engine.check_conflicts(&pack.id, vec![]).await;
    assert!(matches!(result, Err(EngineError::InvalidSelection(_))));
    let result = ctx
        .engine
        .install(&pack.id, vec![], ConflictPolicy::Confirmed)
        .await
        .unwrap()
        .wait()
        .await;
    assert!(matches!(result, Err(EngineError::InvalidSelection(_))));
}

#[tokio::test]
async fn encrypted_import_succeeds_on_third_attempt() {
    let ctx = TestContext::new().await;
    let zip = ctx.encrypted_zip("locked.zip", "secret", &[("Radio/y.bank", b"r")]);
    let mut events = ctx.engine.subscribe();

    let engine = ctx.engine.clone();
    let import = tokio::spawn(async move { engine.import_archive(zip).await });

    for expected in 1..=3 {
        let attempt = next_password_prompt(&mut events).await;
        assert_eq!(attempt, expected);
        let password = if attempt == 3 { "secret" } else { "wrong" };
        assert!(ctx.engine.submit_archive_password(password.into()));
    }

    let package = import.await.unwrap().unwrap();
    assert_eq!(package.id, "locked");
    assert_eq!(package.folders.len(), 1);
}

#[tokio::test]
async fn encrypted_import_fails_after_three_wrong_passwords() {
    let ctx = TestContext::new().await;
    let zip = ctx.encrypted_zip("locked.zip", "secret", &[("Radio/y.bank", b"r")]);
    let mut events = ctx.engine.subscribe();

    let engine = ctx.engine.clone();
    let import = tokio::spawn(async move { engine.import_archive(zip).await });

    for _ in 0..3 {
        next_password_prompt(&mut events).await;
        assert!(ctx.engine.submit_archive_password("wrong".into()));
    }

    let result = import.await.unwrap();
    assert!(matches!(
        result,
        Err(EngineError::ArchiveAuthFailure { attempts: 3, .. })
    ));
    assert!(ctx.engine.list_library(true).await.unwrap().is_empty());
    assert!(dir_is_empty(&ctx.engine.settings().staging_dir));
}

#[tokio::test]
async fn cancelled_password_prompt_aborts_import() {
    let ctx = TestContext::new().await;
    let zip = ctx.encrypted_zip("locked.zip", "secret", &[("Radio/y.bank", b"r")]);
    let mut events = ctx.engine.subscribe();

    let engine = ctx.engine.clone();
    let import = tokio::spawn(async move { engine.import_archive(zip).await });

    next_password_prompt(&mut events).await;
    assert!(ctx.engine.cancel_archive_password());

    let result = import.await.unwrap();
    assert!(matches!(result, Err(EngineError::PasswordCancelled(_))));
}

#[tokio::test]
async fn import_many_reports_per_archive_results() {
    let ctx = TestContext::new().await;
    let good = ctx.zip("good.zip", &[("Radio/y.bank", b"r")]);
    let unsupported = ctx.dir.path().join("notes.txt");
    fs::write(&unsupported, b"x").unwrap();

    let summary = ctx
        .engine
        .import_many(vec![good, unsupported.clone()])
        .await
        .unwrap();
    assert_eq!(summary.success.len(), 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].archive, unsupported);
}
