use super::common::TestServer;
use library_client::LibraryClient;
use opchain::discovery::DiscoveryError;
use opchain::{CallContext, CircuitRegistry};
use serial_test::serial;
use std::sync::Arc;

const VARS: [&str; 3] = [
    "SERVICE_LIBRARY_DEFAULT_PROTO",
    "SERVICE_LIBRARY_DEFAULT_HOST",
    "SERVICE_LIBRARY_DEFAULT_PORT",
];

fn clear() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[tokio::test]
#[serial]
async fn discovered_client_reaches_the_service() {
    let server = TestServer::start().await;
    let port = server.url.rsplit(':').next().unwrap().to_string();
    clear();
    std::env::set_var("SERVICE_LIBRARY_DEFAULT_HOST", "127.0.0.1");
    std::env::set_var("SERVICE_LIBRARY_DEFAULT_PORT", &port);

    let client = LibraryClient::discover("default")
        .unwrap()
        .circuit_registry(Arc::new(CircuitRegistry::new()))
        .without_telemetry()
        .build()
        .map(LibraryClient::from_client)
        .unwrap();
    clear();

    assert_eq!(client.client().base_url().as_str(), format!("http://127.0.0.1:{port}/"));
    client.health_check(CallContext::new()).await.unwrap();
}

#[test]
#[serial]
fn missing_port_is_reported_by_name() {
    clear();
    std::env::set_var("SERVICE_LIBRARY_DEFAULT_HOST", "library.internal");

    let err = LibraryClient::discover("default").unwrap_err();
    clear();

    assert_eq!(
        err,
        DiscoveryError::MissingVariable("SERVICE_LIBRARY_DEFAULT_PORT".to_string())
    );
}

#[test]
#[serial]
fn explicit_proto_is_used() {
    clear();
    std::env::set_var("SERVICE_LIBRARY_DEFAULT_PROTO", "https");
    std::env::set_var("SERVICE_LIBRARY_DEFAULT_HOST", "library.internal");
    std::env::set_var("SERVICE_LIBRARY_DEFAULT_PORT", "8443");

    let url = opchain::discovery::discover("library", "default").unwrap();
    clear();

    assert_eq!(url.as_str(), "https://library.internal:8443/");
}
