use super::{call, enforcing, settings, Backend};
use opchain_circuitbreaker::{CircuitBreakerError, CircuitState};
use std::time::Duration;
use tower::{Layer, Service, ServiceExt};

#[tokio::test(start_paused = true)]
async fn successful_trial_closes_the_circuit() {
    let layer = enforcing("library-trial-ok", settings());
    let backend = Backend::new(500);
    let mut service = layer.layer(backend.clone());

    for _ in 0..4 {
        service.ready().await.unwrap().call(call()).await.unwrap();
    }
    assert!(layer.handle().is_open());

    tokio::time::advance(Duration::from_millis(999)).await;
    assert!(service.ready().await.unwrap().call(call()).await.is_err());

    tokio::time::advance(Duration::from_millis(2)).await;
    backend.set_status(200);
    let response = service.ready().await.unwrap().call(call()).await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(layer.handle().state(), CircuitState::Closed);
    assert_eq!(backend.calls(), 5);
}

#[tokio::test(start_paused = true)]
async fn failed_trial_reopens_for_another_window() {
    let layer = enforcing("library-trial-fail", settings());
    let backend = Backend::new(500);
    let mut service = layer.layer(backend.clone());

    for _ in 0..4 {
        service.ready().await.unwrap().call(call()).await.unwrap();
    }
    tokio::time::advance(Duration::from_secs(1)).await;

    service.ready().await.unwrap().call(call()).await.unwrap();
    assert_eq!(layer.handle().state(), CircuitState::Open);

    tokio::time::advance(Duration::from_millis(500)).await;
    let err = service.ready().await.unwrap().call(call()).await.unwrap_err();
    assert!(err.is_circuit_open());
    assert_eq!(backend.calls(), 5);
}

#[tokio::test(start_paused = true)]
async fn only_one_trial_at_a_time() {
    let layer = enforcing("library-one-trial", settings());
    let backend = Backend::new(500).with_latency(Duration::from_millis(100));
    let service = layer.layer(backend.clone());

    for _ in 0..4 {
        service.clone().oneshot(call()).await.unwrap();
    }
    tokio::time::advance(Duration::from_secs(1)).await;
    backend.set_status(200);

    let trial = tokio::spawn(service.clone().oneshot(call()));
    tokio::task::yield_now().await;
    assert_eq!(layer.handle().state(), CircuitState::HalfOpen);

    let err = service.clone().oneshot(call()).await.unwrap_err();
    assert!(matches!(err, CircuitBreakerError::OpenCircuit { .. }));

    trial.await.unwrap().unwrap();
    assert_eq!(layer.handle().state(), CircuitState::Closed);
    assert_eq!(backend.calls(), 5);
}
