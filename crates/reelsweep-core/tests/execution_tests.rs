use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

use reelsweep_core::backup::BackupManager;
use reelsweep_core::config::SafetyConfig;
use reelsweep_core::rename::{apply_tv_rename, preview_tv_rename};
use reelsweep_core::{AppConfig, BackupStatus, Executor, OperationType, SafetyGate};

fn write_file(path: &Path, content: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn safety(root: &Path) -> SafetyConfig {
    SafetyConfig {
        protected_paths: vec![root.join("protected")],
        protected_roots: vec![PathBuf::from("/")],
        min_depth: 2,
        ..SafetyConfig::default()
    }
}

#[cfg(unix)]
#[test]
fn test_symlink_into_protected_fails_and_batch_continues() {
    let tmp = tempdir().unwrap();
    let kept = tmp.path().join("protected/keep.mkv");
    let link = tmp.path().join("lib/link.mkv");
    let gone = tmp.path().join("lib/gone.mkv");
    write_file(&kept, b"precious");
    write_file(&gone, b"dup");
    std::os::unix::fs::symlink(&kept, &link).unwrap();

    let mut executor = Executor::new(&safety(tmp.path()));
    let report = executor
        .execute_plan(&[link.clone(), gone.clone()], &[], None)
        .unwrap();

    assert_eq!(report.deleted, 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].path, link);
    assert!(kept.exists());
    assert!(fs::symlink_metadata(&link).is_ok());
    assert!(!gone.exists());
}

#[test]
fn test_recorded_move_can_be_reverted() {
    let tmp = tempdir().unwrap();
    let lib = tmp.path().join("lib");
    let source = lib.join("Heat.1995.1080p-GRP/Heat.1995.1080p-GRP.mkv");
    let target = lib.join("Heat (1995)/Heat (1995).mkv");
    write_file(&source, b"movie");

    let manager = BackupManager::new(tmp.path().join("backups"));
    let snapshot = manager.create("movies", &[lib.clone()]).unwrap();
    let mut executor = Executor::new(&safety(tmp.path()))
        .with_operation_log(tmp.path().join("operations.log"))
        .with_snapshot(manager.clone(), snapshot);
    executor
        .move_file(&source, &target, OperationType::Move)
        .unwrap();
    let mut snapshot = executor.finish().unwrap().unwrap();

    assert!(target.exists());
    assert!(!source.parent().unwrap().exists());
    assert_eq!(snapshot.status, BackupStatus::Completed);
    assert_eq!(snapshot.operations.len(), 1);

    let gate = SafetyGate::new(&safety(tmp.path())).with_libraries([lib.clone()]);
    let report = manager.revert(&mut snapshot, &gate).unwrap();
    assert_eq!(report.reverted, 1);
    assert_eq!(fs::read(&source).unwrap(), b"movie");
    assert!(!target.parent().unwrap().exists());
}

#[test]
fn test_revert_refuses_occupied_original() {
    let tmp = tempdir().unwrap();
    let lib = tmp.path().join("lib");
    let source = lib.join("a/one.mkv");
    let target = lib.join("b/one.mkv");
    write_file(&source, b"one");

    let manager = BackupManager::new(tmp.path().join("backups"));
    let snapshot = manager.create("movies", &[lib.clone()]).unwrap();
    let mut executor =
        Executor::new(&safety(tmp.path())).with_snapshot(manager.clone(), snapshot);
    executor
        .move_file(&source, &target, OperationType::Move)
        .unwrap();
    let mut snapshot = executor.finish().unwrap().unwrap();

    write_file(&source, b"newcomer");
    let gate = SafetyGate::new(&safety(tmp.path()));
    let report = manager.revert(&mut snapshot, &gate).unwrap();
    assert_eq!(report.reverted, 0);
    assert_eq!(report.failed, 1);
    assert_eq!(fs::read(&source).unwrap(), b"newcomer");
    assert!(target.exists());
}

#[cfg(unix)]
#[test]
fn test_revert_of_hardlinked_move_keeps_destination() {
    let tmp = tempdir().unwrap();
    let lib = tmp.path().join("lib");
    let source = lib.join("Heat.1995.1080p-GRP/heat.mkv");
    let target = lib.join("Heat (1995)/Heat (1995).mkv");
    write_file(&target, b"keeper");
    fs::create_dir_all(source.parent().unwrap()).unwrap();
    fs::hard_link(&target, &source).unwrap();

    let manager = BackupManager::new(tmp.path().join("backups"));
    let snapshot = manager.create("movies", &[lib.clone()]).unwrap();
    let mut executor =
        Executor::new(&safety(tmp.path())).with_snapshot(manager.clone(), snapshot);
    executor
        .move_file(&source, &target, OperationType::Move)
        .unwrap();
    let mut snapshot = executor.finish().unwrap().unwrap();

    assert!(!source.exists());
    assert!(target.exists());
    assert_eq!(snapshot.operations.len(), 1);
    assert_eq!(snapshot.operations[0].op_type, OperationType::Unlink);

    let gate = SafetyGate::new(&safety(tmp.path())).with_libraries([lib.clone()]);
    let report = manager.revert(&mut snapshot, &gate).unwrap();
    assert_eq!(report.reverted, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(fs::read(&source).unwrap(), b"keeper");
    assert_eq!(fs::read(&target).unwrap(), b"keeper");
}

fn rename_library(root: &Path) -> PathBuf {
    let tv = root.join("tv");
    let show = tv.join("Degrassi (2001)/Season 01");
    write_file(&show.join("Degrassi.S01E01.mkv"), b"one");
    write_file(&show.join("Degrassi.S01E02.720p.mkv"), b"two");
    write_file(&tv.join("Heartland (2007)/Season 01/Heartland S01E01.mkv"), b"other");
    tv
}

#[test]
fn test_tv_rename_preview() {
    let tmp = tempdir().unwrap();
    let tv = rename_library(tmp.path());
    write_file(&tv.join("Degrassi (1979)/notes.txt"), b"not a video");

    let preview = preview_tv_rename(
        &tv,
        "Degrassi",
        "Degrassi The Next Generation",
        &safety(tmp.path()),
    )
    .unwrap();

    assert_eq!(preview.matching_folders.len(), 2);
    assert_eq!(preview.total_episodes, 2);
    assert_eq!(preview.episode_counts, vec![0, 2]);
    assert_eq!(preview.empty_folder_warnings.len(), 1);
    assert!(preview.collision_warnings.is_empty());
    assert!(preview.can_proceed);
    assert!(preview.target_paths[1].ends_with("Degrassi The Next Generation (2001)"));
}

#[test]
fn test_tv_rename_missing_show_is_an_error() {
    let tmp = tempdir().unwrap();
    let tv = rename_library(tmp.path());
    let err = preview_tv_rename(&tv, "Neighbours", "Neighbors", &safety(tmp.path())).unwrap_err();
    assert!(err.to_string().contains("no folders matching 'Neighbours'"));
}

#[test]
fn test_tv_rename_apply_and_revert() {
    let tmp = tempdir().unwrap();
    let tv = rename_library(tmp.path());
    let config = AppConfig {
        data_dir: Some(tmp.path().join("data")),
        safety: safety(tmp.path()),
        ..AppConfig::default()
    };

    let outcome = apply_tv_rename(
        &tv,
        "Degrassi",
        "Degrassi The Next Generation",
        &config,
        false,
        None,
    )
    .unwrap();

    assert_eq!(outcome.results.len(), 3);
    assert_eq!(outcome.failures(), 0);
    let renamed = tv.join("Degrassi The Next Generation (2001)/Season 01");
    assert!(renamed.join("Degrassi The Next Generation S01E01.mkv").exists());
    assert!(renamed.join("Degrassi The Next Generation S01E02.720p.mkv").exists());
    assert!(!tv.join("Degrassi (2001)").exists());
    assert!(tv.join("Heartland (2007)/Season 01/Heartland S01E01.mkv").exists());

    let manager = BackupManager::new(config.backup_dir());
    let id = outcome.backup_id.expect("live rename records a backup");
    assert!(id.starts_with("rename_"));
    let mut snapshot = manager.load(&id).unwrap();
    assert_eq!(snapshot.operations.len(), 3);

    let gate = SafetyGate::new(&config.safety).with_libraries([tv.clone()]);
    let report = manager.revert(&mut snapshot, &gate).unwrap();
    assert_eq!(report.reverted, 3);
    assert!(tv.join("Degrassi (2001)/Season 01/Degrassi.S01E01.mkv").exists());
    assert!(tv.join("Degrassi (2001)/Season 01/Degrassi.S01E02.720p.mkv").exists());
    assert!(!tv.join("Degrassi The Next Generation (2001)").exists());
}

#[test]
fn test_tv_rename_dry_run_changes_nothing() {
    let tmp = tempdir().unwrap();
    let tv = rename_library(tmp.path());
    let config = AppConfig {
        data_dir: Some(tmp.path().join("data")),
        safety: safety(tmp.path()),
        ..AppConfig::default()
    };

    let outcome = apply_tv_rename(&tv, "Degrassi", "Degrassi TNG", &config, true, None).unwrap();
    assert_eq!(outcome.results.len(), 3);
    assert!(outcome.backup_id.is_none());
    assert!(tv.join("Degrassi (2001)/Season 01/Degrassi.S01E01.mkv").exists());
    assert!(!tv.join("Degrassi TNG (2001)").exists());
    assert!(!tmp.path().join("data").exists());
}
