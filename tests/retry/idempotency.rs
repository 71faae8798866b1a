use super::{call, Scripted, Step};
use http::Method;
use opchain_retry::{CountRetryPolicy, FixedBackoff, RetryLayer, RetryPolicyBuilder};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::{Layer, Service, ServiceExt};

#[tokio::test]
async fn post_and_patch_are_sent_once() {
    for method in [Method::POST, Method::PATCH] {
        let backend = Scripted::statuses(&[500]);
        let mut service = RetryLayer::builder()
            .policy(CountRetryPolicy::new(4))
            .build()
            .layer(backend.clone());

        let response = service.ready().await.unwrap().call(call(method.clone())).await.unwrap();

        assert_eq!(response.status(), 500);
        assert_eq!(backend.attempts(), 1, "{method}");
    }
}

#[tokio::test]
async fn permissive_policy_cannot_replay_post() {
    let backend = Scripted::new(vec![Step::ConnectionReset]);
    let consulted = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&consulted);
    let policy = RetryPolicyBuilder::new()
        .backoff(FixedBackoff::new(Duration::ZERO, 3))
        .retry_if(move |_, _, _| {
            c.fetch_add(1, Ordering::SeqCst);
            true
        })
        .build();
    let mut service = RetryLayer::builder().policy(policy).build().layer(backend.clone());

    let result = service.ready().await.unwrap().call(call(Method::POST)).await;

    assert!(result.is_err());
    assert_eq!(backend.attempts(), 1);
    assert_eq!(consulted.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn other_methods_are_retried() {
    for method in [Method::GET, Method::PUT, Method::DELETE, Method::HEAD, Method::OPTIONS] {
        let backend = Scripted::statuses(&[500, 200]);
        let mut service = RetryLayer::builder()
            .policy(CountRetryPolicy::new(1))
            .build()
            .layer(backend.clone());

        let response = service.ready().await.unwrap().call(call(method.clone())).await.unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(backend.attempts(), 2, "{method}");
    }
}
