use super::{call, enforcing, settings, Backend};
use opchain_circuitbreaker::{CircuitBreakerError, CircuitState};
use std::time::Duration;
use tower::{Layer, Service, ServiceExt};

#[tokio::test]
async fn stays_closed_below_request_volume() {
    let layer = enforcing("library-volume", settings().with_request_volume_threshold(10));
    let backend = Backend::new(500);
    let mut service = layer.layer(backend.clone());

    for _ in 0..9 {
        service.ready().await.unwrap().call(call()).await.unwrap();
    }

    assert_eq!(layer.handle().state(), CircuitState::Closed);
    assert_eq!(backend.calls(), 9);
}

#[tokio::test]
async fn opens_at_error_percentage() {
    let layer = enforcing("library-percent", settings());
    let backend = Backend::new(200);
    let mut service = layer.layer(backend.clone());

    for status in [200, 500, 200, 503] {
        backend.set_status(status);
        service.ready().await.unwrap().call(call()).await.unwrap();
    }
    assert_eq!(layer.handle().state(), CircuitState::Open);

    let err = service.ready().await.unwrap().call(call()).await.unwrap_err();
    assert!(matches!(err, CircuitBreakerError::OpenCircuit { ref name } if name == "library-percent"));
    assert_eq!(backend.calls(), 4);
}

#[tokio::test]
async fn stays_closed_under_error_percentage() {
    let layer = enforcing("library-healthy", settings());
    let backend = Backend::new(200);
    let mut service = layer.layer(backend.clone());

    for status in [200, 500, 200, 200, 404] {
        backend.set_status(status);
        service.ready().await.unwrap().call(call()).await.unwrap();
    }

    let metrics = layer.handle().metrics().await;
    assert_eq!(metrics.state, CircuitState::Closed);
    assert_eq!(metrics.total_calls, 5);
    assert_eq!(metrics.error_count, 1);
}

#[tokio::test]
async fn client_errors_are_not_failures() {
    let layer = enforcing("library-4xx", settings());
    let backend = Backend::new(404);
    let mut service = layer.layer(backend.clone());

    for _ in 0..8 {
        service.ready().await.unwrap().call(call()).await.unwrap();
    }

    assert_eq!(layer.handle().state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn rolling_window_forgets_old_calls() {
    let layer = enforcing(
        "library-window",
        settings().with_rolling_window(Duration::from_secs(1)),
    );
    let backend = Backend::new(500);
    let mut service = layer.layer(backend.clone());

    for _ in 0..3 {
        service.ready().await.unwrap().call(call()).await.unwrap();
    }
    tokio::time::advance(Duration::from_secs(2)).await;
    service.ready().await.unwrap().call(call()).await.unwrap();

    let metrics = layer.handle().metrics().await;
    assert_eq!(metrics.state, CircuitState::Closed);
    assert_eq!(metrics.total_calls, 1);
}
