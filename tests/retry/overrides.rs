use super::{call, call_with, Scripted};
use http::Method;
use opchain_core::CallContext;
use opchain_retry::{CountRetryPolicy, NoRetryPolicy, RetryLayer};
use tower::{Layer, Service, ServiceExt};

#[tokio::test]
async fn per_call_policy_wins_over_configured() {
    let backend = Scripted::statuses(&[500]);
    let mut service = RetryLayer::builder()
        .policy(CountRetryPolicy::new(3))
        .build()
        .layer(backend.clone());

    let context = CallContext::new().with_retry_policy(NoRetryPolicy);
    service.ready().await.unwrap().call(call_with(Method::GET, context)).await.unwrap();

    assert_eq!(backend.attempts(), 1);
}

#[tokio::test]
async fn per_call_policy_can_add_retries() {
    let backend = Scripted::statuses(&[500, 500, 200]);
    let mut service = RetryLayer::builder()
        .policy(NoRetryPolicy)
        .build()
        .layer(backend.clone());

    let context = CallContext::new().with_retry_policy(CountRetryPolicy::new(2));
    let response = service
        .ready()
        .await
        .unwrap()
        .call(call_with(Method::GET, context))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(backend.attempts(), 3);
}

#[tokio::test]
async fn swapped_policy_applies_to_later_calls() {
    let backend = Scripted::statuses(&[500]);
    let layer = RetryLayer::builder().policy(NoRetryPolicy).build();
    let handle = layer.policy_handle().clone();
    let mut service = layer.layer(backend.clone());

    service.ready().await.unwrap().call(call(Method::GET)).await.unwrap();
    assert_eq!(backend.attempts(), 1);

    handle.set(CountRetryPolicy::new(2));
    service.ready().await.unwrap().call(call(Method::GET)).await.unwrap();
    assert_eq!(backend.attempts(), 4);
}
