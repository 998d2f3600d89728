mod common;

use common::{Part, app, multipart_body, stored_entries, upload_request};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tmp_relay::services::retention::{RetentionSweeper, SweepReport, sweep_directory};
use tower::ServiceExt;

const HOUR: Duration = Duration::from_secs(3600);

fn write_aged(dir: &Path, name: &str, age: Duration) {
    let path = dir.join(name);
    std::fs::write(&path, name.as_bytes()).unwrap();
    std::fs::File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(SystemTime::now() - age)
        .unwrap();
}

#[tokio::test]
async fn test_sweep_removes_only_expired_files() {
    let dir = tempfile::tempdir().unwrap();
    write_aged(dir.path(), "old.txt", Duration::from_secs(61 * 60));
    write_aged(dir.path(), "young.txt", Duration::from_secs(59 * 60));

    let report = sweep_directory(dir.path(), HOUR, SystemTime::now()).await;

    assert_eq!(
        report,
        SweepReport {
            scanned: 2,
            removed: 1,
            failed: 0
        }
    );
    assert_eq!(stored_entries(dir.path()), vec!["young.txt".to_string()]);
}

#[tokio::test]
async fn test_sweep_reclaims_stale_partial_uploads() {
    let dir = tempfile::tempdir().unwrap();
    write_aged(dir.path(), ".upload-abc123.part", Duration::from_secs(2 * 3600));

    let report = sweep_directory(dir.path(), HOUR, SystemTime::now()).await;

    assert_eq!(report.removed, 1);
    assert!(stored_entries(dir.path()).is_empty());
}

#[tokio::test]
async fn test_sweep_removes_uploaded_file_once_expired() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let body = multipart_body(&[Part::file("photo.png", b"not really a png")]);
    let response = app.oneshot(upload_request(body)).await.unwrap();
    assert!(response.status().is_success());
    assert_eq!(stored_entries(dir.path()).len(), 1);

    let report = sweep_directory(dir.path(), HOUR, SystemTime::now()).await;
    assert_eq!(report.removed, 0);

    let two_hours_later = SystemTime::now() + 2 * HOUR;
    let report = sweep_directory(dir.path(), HOUR, two_hours_later).await;
    assert_eq!(report.removed, 1);
    assert!(stored_entries(dir.path()).is_empty());
}

#[tokio::test]
async fn test_sweeper_runs_at_startup_and_stops_on_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    write_aged(dir.path(), "stale.bin", 2 * HOUR);
    write_aged(dir.path(), "fresh.bin", Duration::from_secs(60));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let sweeper = RetentionSweeper::new(dir.path(), HOUR, Duration::from_secs(600), shutdown_rx);
    let handle = tokio::spawn(sweeper.run());

    let swept = tokio::time::timeout(Duration::from_secs(5), async {
        while dir.path().join("stale.bin").exists() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(swept.is_ok(), "first cycle should run immediately");
    assert!(dir.path().join("fresh.bin").exists());

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("sweeper should stop after shutdown")
        .unwrap();
}

#[tokio::test]
async fn test_sweeper_survives_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("not-there");

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let sweeper = RetentionSweeper::new(&missing, HOUR, Duration::from_millis(20), shutdown_rx);
    let handle = tokio::spawn(sweeper.run());

    // Several failing cycles must not end the task
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!handle.is_finished());

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("sweeper should stop after shutdown")
        .unwrap();
}
