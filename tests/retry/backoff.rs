use super::{call, Scripted};
use http::Method;
use opchain_retry::{ExponentialBackoff, ExponentialRetryPolicy, RetryLayer};
use std::time::Duration;
use tower::{Layer, Service, ServiceExt};

fn assert_near(actual: Duration, expected: Duration, tolerance: Duration) {
    let diff = if actual > expected { actual - expected } else { expected - actual };
    assert!(
        diff <= tolerance,
        "expected {expected:?} ± {tolerance:?}, got {actual:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn exponential_delays_double_from_100ms() {
    let backend = Scripted::statuses(&[500, 500, 200]);
    let mut service = RetryLayer::builder()
        .policy(ExponentialRetryPolicy::default())
        .build()
        .layer(backend.clone());

    let response = service.ready().await.unwrap().call(call(Method::GET)).await.unwrap();
    assert_eq!(response.status(), 200);

    let gaps = backend.gaps();
    assert_eq!(gaps.len(), 2);
    assert_near(gaps[0], Duration::from_millis(100), Duration::from_millis(20));
    assert_near(gaps[1], Duration::from_millis(200), Duration::from_millis(20));
}

#[tokio::test(start_paused = true)]
async fn full_exponential_schedule() {
    let backend = Scripted::statuses(&[503]);
    let mut service = RetryLayer::builder()
        .policy(ExponentialRetryPolicy::default())
        .build()
        .layer(backend.clone());

    service.ready().await.unwrap().call(call(Method::GET)).await.unwrap();

    let expected = [100, 200, 400, 800];
    let gaps = backend.gaps();
    assert_eq!(gaps.len(), expected.len());
    for (gap, millis) in gaps.into_iter().zip(expected) {
        // ±5% jitter
        assert_near(gap, Duration::from_millis(millis), Duration::from_millis(millis / 20 + 1));
    }
}

#[tokio::test(start_paused = true)]
async fn capped_backoff_without_jitter() {
    let backend = Scripted::statuses(&[500]);
    let policy = ExponentialRetryPolicy::with_backoff(
        ExponentialBackoff::new(Duration::from_millis(50), 4)
            .multiplier(3.0)
            .max_interval(Duration::from_millis(500)),
    );
    let mut service = RetryLayer::builder().policy(policy).build().layer(backend.clone());

    service.ready().await.unwrap().call(call(Method::GET)).await.unwrap();

    let expected = [50, 150, 450, 500];
    let gaps = backend.gaps();
    assert_eq!(gaps.len(), expected.len());
    for (gap, millis) in gaps.into_iter().zip(expected) {
        assert_near(gap, Duration::from_millis(millis), Duration::from_millis(2));
    }
}
