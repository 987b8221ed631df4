//! Server-sent progress event tests.

mod common;

use common::{wait_for_scan, TestHarness};
use reqwest::StatusCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tvshelf::scanner::{ProgressTracker, ScanOptions};
use tvshelf_common::{ScanId, ScanPhase, ScanType};

#[tokio::test]
async fn test_finished_scan_yields_history_event() {
    let (h, addr) = TestHarness::with_server().await;
    h.write("Firefly (2002)/Season 01/Firefly - S01E01.mkv", 10);

    let id = h.scanner().start_scan(ScanOptions::default()).unwrap();
    wait_for_scan(h.scanner(), id).await;

    let resp = reqwest::get(format!("http://{}/api/scans/{}/events", addr, id))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let body = resp.text().await.unwrap();
    assert!(body.contains("event: history"));
    assert!(body.contains("\"status\":\"COMPLETED\""));
}

#[tokio::test]
async fn test_running_scan_streams_until_terminal() {
    let (h, addr) = TestHarness::with_server().await;

    let id = ScanId::new();
    let tracker = Arc::new(ProgressTracker::new(id, ScanType::Full));
    let guard = h
        .scanner()
        .registry()
        .register(id, tracker.clone(), CancellationToken::new())
        .unwrap();

    let mut resp = reqwest::get(format!("http://{}/api/scans/{}/events", addr, id))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // The first chunk carries the current snapshot, so the server has
    // subscribed by the time it arrives.
    let first = resp.chunk().await.unwrap().unwrap();
    let first = String::from_utf8_lossy(&first).into_owned();
    assert!(first.contains("event: progress"));
    assert!(first.contains("\"phase\":\"discovering\""));

    tracker.set_phase(ScanPhase::Parsing, 5);
    tracker.update(|p| p.phase = ScanPhase::Complete);
    drop(guard);

    let rest = resp.text().await.unwrap();
    assert!(rest.contains("\"phase\":\"parsing\""));
    assert!(rest.contains("\"phase\":\"complete\""));
}

#[tokio::test]
async fn test_unknown_scan_events_404() {
    let (_h, addr) = TestHarness::with_server().await;
    let resp = reqwest::get(format!("http://{}/api/scans/{}/events", addr, ScanId::new()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
