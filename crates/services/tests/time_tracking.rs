mod common;

use std::sync::Arc;
use std::time::Duration;

use common::FakeApi;
use diy_core::model::TutorialId;
use services::TimeTrackingTask;

#[tokio::test(start_paused = true)]
async fn continuous_session_flushes_each_minute_then_remainder() {
    let api = Arc::new(FakeApi::default());
    let handle = TimeTrackingTask::spawn(api.clone(), TutorialId::new("t1"), 0);

    tokio::time::sleep(Duration::from_secs(125)).await;
    let report = handle.stop().await;

    assert_eq!(api.time_calls(), vec![60, 60, 5]);
    assert_eq!(report.flushes, vec![60, 60, 5]);
    assert_eq!(report.confirmed_secs, 125);
    assert_eq!(report.dropped_secs, 0);
    assert_eq!(report.display_secs, 125);
}

#[tokio::test(start_paused = true)]
async fn display_includes_previously_stored_time() {
    let api = Arc::new(FakeApi::default());
    let handle = TimeTrackingTask::spawn(api.clone(), TutorialId::new("t1"), 300);
    assert_eq!(handle.display(), 300);

    tokio::time::sleep(Duration::from_millis(10_500)).await;
    assert_eq!(handle.display(), 310);
    assert!(api.time_calls().is_empty());

    let report = handle.stop().await;
    assert_eq!(report.flushes, vec![10]);
    assert_eq!(report.confirmed_secs, 310);
}

#[tokio::test(start_paused = true)]
async fn failed_flush_keeps_display_and_is_not_resent() {
    let api = Arc::new(FakeApi::default());
    api.fail_time_call(0);
    let handle = TimeTrackingTask::spawn(api.clone(), TutorialId::new("t1"), 100);

    tokio::time::sleep(Duration::from_millis(61_500)).await;
    assert_eq!(api.time_calls(), vec![60]);
    assert_eq!(handle.display(), 161);

    tokio::time::sleep(Duration::from_secs(64)).await;
    let report = handle.stop().await;

    // The second minute is sent alone; the failed minute is never re-sent.
    assert_eq!(api.time_calls(), vec![60, 60, 5]);
    assert_eq!(report.confirmed_secs, 165);
    assert_eq!(report.dropped_secs, 60);
    assert_eq!(report.display_secs, 225);
}

#[tokio::test(start_paused = true)]
async fn stop_before_first_second_sends_nothing() {
    let api = Arc::new(FakeApi::default());
    let handle = TimeTrackingTask::spawn(api.clone(), TutorialId::new("t1"), 42);

    tokio::time::sleep(Duration::from_millis(400)).await;
    let report = handle.stop().await;

    assert!(api.time_calls().is_empty());
    assert_eq!(report.confirmed_secs, 42);
    assert_eq!(report.display_secs, 42);
}
