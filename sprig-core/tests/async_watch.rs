//! Watchers that start asynchronous work.
//!
//! A watcher callback that kicks off a request must not let a slow, stale
//! response overwrite a newer one. These tests drive that through tokio.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sprig_core::reactive::{RawObject, Runtime, Value, WatchOptions};
use tokio::task::JoinHandle;

#[tokio::test]
async fn stale_responses_are_discarded() {
    let rt = Runtime::new();
    let state = rt
        .reactive(&RawObject::record([("query", Value::from(""))]))
        .into_record()
        .unwrap();

    let applied: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let tasks: Arc<Mutex<Vec<JoinHandle<()>>>> = Arc::new(Mutex::new(Vec::new()));
    let cleanups = Arc::new(AtomicUsize::new(0));

    let reader = state.clone();
    let sink = Arc::clone(&applied);
    let spawned = Arc::clone(&tasks);
    let cleaned = Arc::clone(&cleanups);
    let handle = rt.watch(
        move || reader.get("query").as_str().map(str::to_owned),
        move |query, _, on_invalidate| {
            let Some(query) = query.clone() else {
                return;
            };
            let token = on_invalidate.token();
            let cleaned = Arc::clone(&cleaned);
            on_invalidate.register(move || {
                cleaned.fetch_add(1, Ordering::SeqCst);
            });

            let sink = Arc::clone(&sink);
            let delay = if query == "slow" { 60 } else { 5 };
            spawned.lock().push(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                if !token.is_expired() {
                    sink.lock().push(query);
                }
            }));
        },
        WatchOptions::default(),
    );

    state.set("query", "slow").unwrap();
    state.set("query", "fast").unwrap();

    let pending: Vec<JoinHandle<()>> = tasks.lock().drain(..).collect();
    for task in pending {
        task.await.unwrap();
    }

    assert_eq!(*applied.lock(), vec!["fast".to_owned()]);
    assert_eq!(cleanups.load(Ordering::SeqCst), 1);

    // Stopping runs the outstanding cleanup.
    handle.stop();
    assert_eq!(cleanups.load(Ordering::SeqCst), 2);
}

/// Post-flush watchers coalesce a burst of writes into one request.
#[tokio::test]
async fn post_flush_coalesces_requests() {
    let rt = Runtime::new();
    let state = rt
        .reactive(&RawObject::record([("page", Value::from(0))]))
        .into_record()
        .unwrap();

    let requests = Arc::new(AtomicUsize::new(0));
    let last = Arc::new(Mutex::new(None));

    let reader = state.clone();
    let issued = Arc::clone(&requests);
    let sink = Arc::clone(&last);
    let _handle = rt.watch(
        move || reader.get("page").as_f64(),
        move |page, _, _| {
            issued.fetch_add(1, Ordering::SeqCst);
            *sink.lock() = *page;
        },
        WatchOptions::post(),
    );

    for page in 1..=5 {
        state.set("page", page).unwrap();
    }
    assert_eq!(requests.load(Ordering::SeqCst), 0);

    tokio::task::yield_now().await;
    rt.flush_jobs();

    assert_eq!(requests.load(Ordering::SeqCst), 1);
    assert_eq!(*last.lock(), Some(5.0));
}
