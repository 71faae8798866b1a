use super::{call, Scripted};
use http::Method;
use opchain_retry::{CountRetryPolicy, FixedBackoff, RetryLayer, RetryPolicyBuilder};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::{Layer, Service, ServiceExt};

#[tokio::test]
async fn retry_events_carry_attempt_and_delay() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    let policy = RetryPolicyBuilder::new()
        .backoff(FixedBackoff::new(Duration::from_millis(1), 2))
        .build();
    let backend = Scripted::statuses(&[500]);
    let mut service = RetryLayer::builder()
        .policy(policy)
        .on_retry(move |attempt, delay| s.lock().unwrap().push((attempt, delay)))
        .build()
        .layer(backend);

    service.ready().await.unwrap().call(call(Method::GET)).await.unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![(1, Duration::from_millis(1)), (2, Duration::from_millis(1))]
    );
}

#[tokio::test]
async fn completed_and_exhausted_are_distinguished() {
    let completed = Arc::new(AtomicUsize::new(0));
    let exhausted = Arc::new(AtomicUsize::new(0));
    let (c, e) = (Arc::clone(&completed), Arc::clone(&exhausted));
    let layer = RetryLayer::builder()
        .policy(CountRetryPolicy::new(2))
        .on_completed(move |attempts| {
            c.store(attempts, Ordering::SeqCst);
        })
        .on_exhausted(move |attempts| {
            e.store(attempts, Ordering::SeqCst);
        })
        .build();

    let mut recovering = layer.layer(Scripted::statuses(&[500, 200]));
    recovering.ready().await.unwrap().call(call(Method::GET)).await.unwrap();
    assert_eq!(completed.load(Ordering::SeqCst), 2);
    assert_eq!(exhausted.load(Ordering::SeqCst), 0);

    let mut failing = layer.layer(Scripted::statuses(&[500]));
    failing.ready().await.unwrap().call(call(Method::GET)).await.unwrap();
    assert_eq!(exhausted.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn non_idempotent_event_for_post() {
    let methods = Arc::new(Mutex::new(Vec::new()));
    let m = Arc::clone(&methods);
    let mut service = RetryLayer::builder()
        .policy(CountRetryPolicy::new(2))
        .on_non_idempotent(move |method| m.lock().unwrap().push(method.clone()))
        .build()
        .layer(Scripted::statuses(&[500]));

    service.ready().await.unwrap().call(call(Method::POST)).await.unwrap();

    assert_eq!(*methods.lock().unwrap(), vec![Method::POST]);
}
