use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::*;

#[tokio::test(start_paused = true)]
async fn respawn_aborts_previous_task() {
    let hits = Arc::new(AtomicUsize::new(0));
    let mut task = ScheduledTask::idle();

    let first = Arc::clone(&hits);
    task.spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        first.fetch_add(1, Ordering::SeqCst);
    });

    let second = Arc::clone(&hits);
    task.spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        second.fetch_add(10, Ordering::SeqCst);
    });

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(hits.load(Ordering::SeqCst), 10);
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_pending_work() {
    let hits = Arc::new(AtomicUsize::new(0));
    let mut task = ScheduledTask::idle();

    let counter = Arc::clone(&hits);
    task.spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        counter.fetch_add(1, Ordering::SeqCst);
    });
    task.stop();

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert!(!task.is_running());
}

#[tokio::test(start_paused = true)]
async fn drop_aborts_running_task() {
    let hits = Arc::new(AtomicUsize::new(0));
    {
        let mut task = ScheduledTask::idle();
        let counter = Arc::clone(&hits);
        task.spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        });
    }

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn idle_slot_reports_not_running() {
    let task = ScheduledTask::idle();
    assert!(!task.is_running());
}
