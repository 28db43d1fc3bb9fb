mod common;

use common::*;
use filetime::FileTime;
use spull_sftp::sftp::*;
use std::path::Path;

fn options(local: &Path, delete: bool) -> SyncOptions {
    let mut opts = SyncOptions::new("/out", local);
    opts.delete = delete;
    opts
}

fn mtime(path: &Path) -> i64 {
    FileTime::from_last_modification_time(&std::fs::metadata(path).unwrap()).unix_seconds()
}

#[test]
fn plan_is_newest_first_and_regular_files_only() {
    let remote = populated_remote();
    let dir = tempfile::tempdir().unwrap();

    let report = run(&remote, options(dir.path(), false));

    assert!(report.succeeded(), "{:?}", report.error);
    assert_eq!(
        report.plan.names().collect::<Vec<_>>(),
        vec!["new.csv", "mid.csv", "old.csv"]
    );
    assert!(!dir.path().join("archive").exists());
    assert!(!dir.path().join("latest").exists());
}

#[test]
fn pull_without_delete_keeps_remote_and_preserves_mtime() {
    let remote = populated_remote();
    let dir = tempfile::tempdir().unwrap();

    let report = run(&remote, options(dir.path(), false));

    assert_eq!(report.exit_code(), 0);
    assert_eq!(
        report.states,
        vec![
            SyncState::Idle,
            SyncState::Connected,
            SyncState::Listed,
            SyncState::Transferred,
            SyncState::SkippedDelete,
            SyncState::Closed,
        ]
    );
    assert_eq!(std::fs::read(dir.path().join("new.csv")).unwrap(), b"newest file");
    assert_eq!(mtime(&dir.path().join("old.csv")), 1_600_000_000);
    assert_eq!(mtime(&dir.path().join("new.csv")), 1_700_000_000);

    let r = remote.lock().unwrap();
    assert!(r.has("/out/old.csv") && r.has("/out/new.csv") && r.has("/out/mid.csv"));
    assert!(r.removed.is_empty());
}

#[test]
fn pull_with_delete_removes_exactly_the_planned_files() {
    let remote = populated_remote();
    let dir = tempfile::tempdir().unwrap();

    let report = run(&remote, options(dir.path(), true));

    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.final_state(), SyncState::Closed);
    assert!(report.visited(SyncState::Cleaned));
    assert_eq!(report.deleted, vec!["new.csv", "mid.csv", "old.csv"]);

    let r = remote.lock().unwrap();
    assert!(!r.has("/out/new.csv"));
    assert!(r.has("/out/archive/deep.csv"));
    assert!(r.has("/out/latest"));
    for name in ["new.csv", "mid.csv", "old.csv"] {
        assert!(dir.path().join(name).is_file());
    }
}

#[test]
fn empty_remote_directory_is_success_without_transfer() {
    let remote = FakeRemote::new();
    remote.lock().unwrap().add_dir("/home/bob");
    remote.lock().unwrap().add_dir("/out");
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("never");

    let report = run(&remote, options(&local, true));

    assert_eq!(report.exit_code(), 0);
    assert!(report.visited(SyncState::EmptyExit));
    assert!(report.transfer.is_none());
    assert!(report.deleted.is_empty());
    assert!(!local.exists());
}

#[test]
fn connection_failure_touches_nothing() {
    let remote = populated_remote();
    remote.lock().unwrap().refuse_connections = true;
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("dest");

    let report = run(&remote, options(&local, true));

    assert_eq!(report.exit_code(), 1);
    let error = report.error.unwrap();
    assert_eq!(error.kind, SyncErrorKind::ConnectionError);
    assert!(error.message.contains("sftp.test:2222"));
    assert!(!local.exists());
    assert_eq!(remote.lock().unwrap().closes, 0);
}

#[test]
fn missing_source_is_list_error() {
    let remote = populated_remote();
    let dir = tempfile::tempdir().unwrap();
    let mut opts = options(dir.path(), true);
    opts.remote_dir = "/nope".into();

    let report = run(&remote, opts);

    assert_eq!(report.error.map(|e| e.kind), Some(SyncErrorKind::ListError));
    assert_eq!(remote.lock().unwrap().closes, 1);
}

#[test]
fn transfer_failure_prevents_any_deletion() {
    let remote = populated_remote();
    remote.lock().unwrap().fail_open.insert("mid.csv".into());
    let dir = tempfile::tempdir().unwrap();

    let report = run(&remote, options(dir.path(), true));

    assert_eq!(report.exit_code(), 1);
    let error = report.error.as_ref().unwrap();
    assert_eq!(error.kind, SyncErrorKind::TransferError);
    assert!(error.message.contains("'mid.csv'"));
    assert!(!report.visited(SyncState::Transferred));

    let r = remote.lock().unwrap();
    assert!(r.removed.is_empty());
    assert_eq!(r.closes, 1);
}

#[test]
fn best_effort_cleanup_attempts_every_file() {
    let remote = populated_remote();
    remote.lock().unwrap().fail_remove.insert("new.csv".into());
    let dir = tempfile::tempdir().unwrap();

    let report = run(&remote, options(dir.path(), true));

    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.error.as_ref().map(|e| e.kind), Some(SyncErrorKind::DeleteError));
    assert_eq!(report.deleted, vec!["mid.csv", "old.csv"]);
    assert_eq!(report.delete_failures.len(), 1);
    assert_eq!(report.delete_failures[0].file, "new.csv");
    assert_eq!(report.delete_failures[0].kind, RemoteErrorKind::PermissionDenied);
    assert!(remote.lock().unwrap().has("/out/new.csv"));
}

#[test]
fn fail_fast_cleanup_stops_at_first_failure() {
    let remote = populated_remote();
    remote.lock().unwrap().fail_remove.insert("mid.csv".into());
    let dir = tempfile::tempdir().unwrap();
    let mut opts = options(dir.path(), true);
    opts.delete_mode = DeleteMode::FailFast;

    let report = run(&remote, opts);

    assert_eq!(report.error.as_ref().map(|e| e.kind), Some(SyncErrorKind::DeleteError));
    assert_eq!(report.deleted, vec!["new.csv"]);
    assert!(remote.lock().unwrap().has("/out/old.csv"));
}

#[test]
fn rerun_overwrites_with_identical_content() {
    let remote = populated_remote();
    let dir = tempfile::tempdir().unwrap();

    assert!(run(&remote, options(dir.path(), false)).succeeded());
    std::fs::write(dir.path().join("mid.csv"), b"locally edited").unwrap();
    assert!(run(&remote, options(dir.path(), false)).succeeded());

    assert_eq!(std::fs::read(dir.path().join("mid.csv")).unwrap(), b"middle");
    assert_eq!(mtime(&dir.path().join("mid.csv")), 1_650_000_000);
}

#[test]
fn missing_destination_is_created() {
    let remote = populated_remote();
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("a").join("b");

    let report = run(&remote, options(&local, false));

    assert!(report.succeeded());
    assert!(local.join("new.csv").is_file());
}

#[test]
fn relative_source_resolves_against_login_directory() {
    let remote = populated_remote();
    {
        let mut r = remote.lock().unwrap();
        r.add_dir("/home/bob/inbox");
        r.add_file("/home/bob/inbox/x.txt", b"x", 10);
    }
    let dir = tempfile::tempdir().unwrap();
    let mut opts = options(dir.path(), true);
    opts.remote_dir = "inbox".into();

    let report = run(&remote, opts);

    assert!(report.succeeded(), "{:?}", report.error);
    assert!(dir.path().join("x.txt").is_file());
    assert!(!remote.lock().unwrap().has("/home/bob/inbox/x.txt"));
}

#[test]
fn session_is_closed_exactly_once_on_every_path() {
    let scenarios: Vec<Box<dyn Fn(&mut FakeRemote)>> = vec![
        Box::new(|_| {}),
        Box::new(|r| {
            r.fail_open.insert("old.csv".into());
        }),
        Box::new(|r| {
            r.fail_remove.insert("old.csv".into());
        }),
        Box::new(|r| {
            r.dirs.remove("/out");
        }),
    ];

    for setup in scenarios {
        let remote = populated_remote();
        setup(&mut *remote.lock().unwrap());
        let dir = tempfile::tempdir().unwrap();

        let report = run(&remote, options(dir.path(), true));

        assert_eq!(report.final_state(), SyncState::Closed);
        let r = remote.lock().unwrap();
        assert_eq!(r.connects, 1);
        assert_eq!(r.closes, 1);
    }
}

#[test]
fn report_serialises_with_camel_case_fields() {
    let remote = populated_remote();
    let dir = tempfile::tempdir().unwrap();

    let report = run(&remote, options(dir.path(), false));
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["remoteDir"], "/out");
    assert_eq!(json["plan"][0]["name"], "new.csv");
    assert_eq!(json["transfer"]["totalBytes"], 23);
    assert_eq!(json["states"].as_array().unwrap().last().unwrap(), "closed");
}
