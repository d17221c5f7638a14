//! Lifecycle tests across the HTTP surface: concurrent requests, startup
//! sweep, and re-upload.

mod common;

use std::time::Duration;

use common::{upload_form, TestHarness};
use hf_assets::testing::FakeEncoder;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_stream_requests_encode_once() {
    let (harness, addr) =
        TestHarness::with_encoder(FakeEncoder::new().with_delay(Duration::from_millis(100)))
            .serve()
            .await;
    harness.put_raw("busy", b"bytes");

    let url = format!("http://{addr}/api/stream/busy");
    let (a, b) = tokio::join!(reqwest::get(&url), reqwest::get(&url));
    let a: serde_json::Value = a.unwrap().json().await.unwrap();
    let b: serde_json::Value = b.unwrap().json().await.unwrap();

    assert_eq!(a["playlist"], "/hls/busy/index.m3u8");
    assert_eq!(a, b);
    assert_eq!(harness.encoder.transcode_calls(), 1);
    assert!(!harness.store.raw_root().join("busy.mkv").exists());
}

#[tokio::test]
async fn startup_sweep_makes_leftovers_streamable() {
    let harness = TestHarness::new();
    harness.put_raw("left1", b"a");
    harness.put_raw("left2", b"b");

    let summary = harness.ctx.services.sweep().run().await;
    assert_eq!(summary.converted, 2);

    let (_harness, addr) = harness.serve().await;
    let mut videos: Vec<String> = reqwest::get(format!("http://{addr}/api/videos"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    videos.sort();
    assert_eq!(videos, vec!["left1".to_string(), "left2".to_string()]);
}

#[tokio::test]
async fn reupload_replaces_ready_video() {
    let (harness, addr) = TestHarness::with_server().await;
    let client = reqwest::Client::new();

    for body in [&b"first"[..], &b"second"[..]] {
        let resp = client
            .post(format!("http://{addr}/api/upload"))
            .multipart(upload_form("clip.mkv", body))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
    }

    assert_eq!(harness.encoder.transcode_calls(), 2);
    let status: serde_json::Value = reqwest::get(format!("http://{addr}/api/videos/clip"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["state"], "ready");
    assert_eq!(status["playlist"], "/hls/clip/index.m3u8");
    assert!(status.get("raw_path").is_none());
    assert!(status.get("derived_dir").is_none());
}

#[tokio::test]
async fn unknown_video_status_is_unknown() {
    let (_harness, addr) = TestHarness::with_server().await;

    let status: serde_json::Value = reqwest::get(format!("http://{addr}/api/videos/nobody"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["state"], "unknown");
    assert!(status["playlist"].is_null());
}
