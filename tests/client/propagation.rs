use super::{isolated, library};
use library_client::models::GetBookByIdInput;
use opchain::{AttemptOutcome, AttemptRecord, CallContext, CountRetryPolicy, SpanContext};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn every_attempt_carries_a_child_of_the_parent_span() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/books/8"))
        .and(header_exists("traceparent"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;
    let client = library(isolated(server.uri()).retry_policy(CountRetryPolicy::new(2)));

    let parent = SpanContext::from_parts(0x4bf92f3577b34da6a3ce929d0e0e4736, 0x00f067aa0ba902b7, true).unwrap();
    let ctx = CallContext::new().with_parent_span(parent);
    let input = GetBookByIdInput {
        book_id: 8,
        ..Default::default()
    };
    client.get_book_by_id(ctx, &input).await.unwrap_err();

    let requests = server.received_requests().await.unwrap();
    let spans: Vec<SpanContext> = requests
        .iter()
        .map(|r| SpanContext::from_traceparent(r.headers["traceparent"].to_str().unwrap()).unwrap())
        .collect();
    assert_eq!(spans.len(), 3);
    for span in &spans {
        assert_eq!(span.trace_id(), parent.trace_id());
        assert_ne!(span.span_id(), parent.span_id());
    }
    assert_ne!(spans[0].span_id(), spans[1].span_id());
}

#[tokio::test]
async fn calls_without_parent_start_separate_traces() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "ok"})))
        .mount(&server)
        .await;
    let client = library(isolated(server.uri()));

    client.health_check(CallContext::new()).await.unwrap();
    client.health_check(CallContext::new()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let traces: Vec<u128> = requests
        .iter()
        .map(|r| {
            SpanContext::from_traceparent(r.headers["traceparent"].to_str().unwrap())
                .unwrap()
                .trace_id()
        })
        .collect();
    assert_ne!(traces[0], traces[1]);
}

#[tokio::test]
async fn logger_sees_one_record_per_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    let records = Arc::new(Mutex::new(Vec::<AttemptRecord>::new()));
    let sink = Arc::clone(&records);
    let client = library(
        isolated(server.uri())
            .retry_policy(CountRetryPolicy::new(1))
            .logger(move |record: &AttemptRecord| sink.lock().unwrap().push(record.clone())),
    );

    let input = GetBookByIdInput {
        book_id: 4,
        ..Default::default()
    };
    client.get_book_by_id(CallContext::new(), &input).await.unwrap_err();

    let records = records.lock().unwrap();
    assert_eq!(records.len(), 2);
    for record in records.iter() {
        assert_eq!(record.backend, "library");
        assert_eq!(record.operation, "getBookByID");
        assert_eq!(record.method, http::Method::GET);
        assert!(record.uri.ends_with("/v1/books/4"), "{}", record.uri);
        assert_eq!(record.outcome, AttemptOutcome::Status(http::StatusCode::BAD_GATEWAY));
        assert_eq!(record.level(), tracing::Level::ERROR);
    }
}

#[tokio::test]
async fn replaced_logger_takes_effect() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "ok"})))
        .mount(&server)
        .await;
    let client = library(isolated(server.uri()));

    let count = Arc::new(Mutex::new(0));
    let c = Arc::clone(&count);
    client.set_logger(move |_: &AttemptRecord| *c.lock().unwrap() += 1);
    client.health_check(CallContext::new()).await.unwrap();

    assert_eq!(*count.lock().unwrap(), 1);
}
