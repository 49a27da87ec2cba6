//! 进度追踪器集成测试

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use streamfleet_core::models::JobStatus;
use streamfleet_core::{KvStore, ProgressConfig};
use streamfleet_fleet::ProgressTracker;
use streamfleet_infrastructure::MemoryKvStore;

fn tracker() -> ProgressTracker {
    let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
    ProgressTracker::new(store, None)
}

#[tokio::test]
async fn test_set_and_get_progress() {
    let tracker = tracker();

    assert!(
        tracker
            .set_progress(1, "downloading", 50, "正在下载视频文件", Some(json!({"bytes": 1024})))
            .await
    );

    let record = tracker.get_progress(1).await.expect("记录应该存在");
    assert_eq!(record.stream_id, 1);
    assert_eq!(record.stage, "downloading");
    assert_eq!(record.progress_percentage, 50);
    assert_eq!(record.details, Some(json!({"bytes": 1024})));
    assert!(!record.is_completed());
}

#[tokio::test]
async fn test_set_progress_overwrites_previous() {
    let tracker = tracker();

    tracker.set_progress(1, "preparing", 5, "准备中", None).await;
    tracker.set_progress(1, "streaming", 100, "推流中", None).await;

    let record = tracker.get_progress(1).await.unwrap();
    assert_eq!(record.stage, "streaming");
    assert_eq!(record.progress_percentage, 100);
    assert!(record.is_completed());
}

#[tokio::test]
async fn test_percentage_clamped_on_write() {
    let tracker = tracker();

    tracker.set_progress(1, "downloading", 150, "越界", None).await;
    assert_eq!(tracker.get_progress(1).await.unwrap().progress_percentage, 100);

    tracker.set_progress(2, "preparing", -10, "越界", None).await;
    assert_eq!(tracker.get_progress(2).await.unwrap().progress_percentage, 0);
}

#[tokio::test]
async fn test_missing_progress_returns_none() {
    let tracker = tracker();
    assert!(tracker.get_progress(999).await.is_none());
}

#[tokio::test]
async fn test_progress_expires_after_ttl() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
    let tracker = ProgressTracker::new(store, Some(ProgressConfig { ttl_seconds: 1 }));

    tracker.set_progress(1, "downloading", 50, "下载中", None).await;
    assert!(tracker.get_progress(1).await.is_some());

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(tracker.get_progress(1).await.is_none());
}

#[tokio::test]
async fn test_clear_progress() {
    let tracker = tracker();

    tracker.set_progress(1, "downloading", 50, "下载中", None).await;
    assert!(tracker.clear_progress(1).await);
    assert!(tracker.get_progress(1).await.is_none());

    // 再次清除已不存在的记录
    assert!(!tracker.clear_progress(1).await);
}

#[tokio::test]
async fn test_create_stage_progress_uses_defaults() {
    let tracker = tracker();

    assert!(tracker.create_stage_progress(1, "downloading", None).await);
    let record = tracker.get_progress(1).await.unwrap();
    assert_eq!(record.progress_percentage, 50);
    assert_eq!(record.message, "正在下载视频文件");

    assert!(tracker.create_stage_progress(2, "streaming", Some("节点恢复，推流仍在进行")).await);
    let record = tracker.get_progress(2).await.unwrap();
    assert_eq!(record.progress_percentage, 100);
    assert_eq!(record.message, "节点恢复，推流仍在进行");
    assert!(record.is_completed());
}

#[tokio::test]
async fn test_create_stage_progress_rejects_unknown_stage() {
    let tracker = tracker();
    assert!(!tracker.create_stage_progress(1, "teleporting", None).await);
    assert!(tracker.get_progress(1).await.is_none());
}

#[tokio::test]
async fn test_default_progress_by_job_status() {
    let tracker = tracker();

    let starting = tracker.get_default_progress(JobStatus::Starting, 1);
    assert_eq!(starting.stage, "starting");
    assert_eq!(starting.progress_percentage, 10);

    let streaming = tracker.get_default_progress(JobStatus::Streaming, 1);
    assert_eq!(streaming.stage, "streaming");
    assert_eq!(streaming.progress_percentage, 100);

    let error = tracker.get_default_progress(JobStatus::Error, 1);
    assert_eq!(error.stage, "error");
    assert_eq!(error.progress_percentage, 0);

    let idle = tracker.get_default_progress(JobStatus::Stopped, 1);
    assert_eq!(idle.stage, "idle");
    assert_eq!(idle.progress_percentage, 0);
}
