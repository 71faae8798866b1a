//! Property tests for the retry decorator.
//!
//! Invariants tested:
//! - Attempts never exceed one plus the schedule length
//! - POST and PATCH are attempted exactly once
//! - Only 5xx responses are retried by the catalog policies
//! - Exponential delays stay within their jitter band

use bytes::Bytes;
use http::{Method, StatusCode};
use opchain_core::{Call, CallContext, HttpResponse, RetryPolicy, TransportError};
use opchain_retry::{CountRetryPolicy, ExponentialRetryPolicy, RetryLayer};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tower::{Layer, Service, ServiceExt};

fn method_strategy() -> impl Strategy<Value = Method> {
    prop_oneof![
        Just(Method::GET),
        Just(Method::HEAD),
        Just(Method::PUT),
        Just(Method::DELETE),
        Just(Method::OPTIONS),
        Just(Method::POST),
        Just(Method::PATCH),
    ]
}

/// Runs one call against a backend answering `status` and returns the
/// number of attempts.
fn attempts(method: Method, status: u16, policy: CountRetryPolicy) -> usize {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let backend = tower::service_fn(move |_call: Call| {
            c.fetch_add(1, Ordering::SeqCst);
            async move {
                Ok::<HttpResponse, TransportError>(
                    http::Response::builder()
                        .status(StatusCode::from_u16(status).unwrap())
                        .body(Bytes::new())
                        .unwrap(),
                )
            }
        });
        let mut service = RetryLayer::builder().policy(policy).build().layer(backend);

        let request = http::Request::builder()
            .method(method)
            .uri("http://library.internal/v1/books")
            .body(Bytes::new())
            .unwrap();
        let call = Call::new(CallContext::new().with_operation("getBooks"), request);
        service.ready().await.unwrap().call(call).await.unwrap();

        count.load(Ordering::SeqCst)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: attempts are bounded by the policy and the method
    #[test]
    fn attempts_follow_method_and_status(
        method in method_strategy(),
        status in 200u16..600,
        retries in 0usize..5,
    ) {
        let made = attempts(method.clone(), status, CountRetryPolicy::new(retries));

        let expected = if method == Method::POST || method == Method::PATCH {
            1
        } else if status >= 500 {
            retries + 1
        } else {
            1
        };
        prop_assert_eq!(made, expected);
    }

    /// Property: every exponential delay is within ±5% of its nominal value
    #[test]
    fn exponential_delays_stay_in_band(_seed in any::<u64>()) {
        let schedule = ExponentialRetryPolicy::default().backoffs();

        prop_assert_eq!(schedule.len(), 4);
        for (retry, delay) in schedule.into_iter().enumerate() {
            let nominal = Duration::from_millis(100 << retry).as_secs_f64();
            let actual = delay.as_secs_f64();
            prop_assert!(actual >= nominal * 0.95 - 1e-9 && actual <= nominal * 1.05 + 1e-9);
        }
    }
}
