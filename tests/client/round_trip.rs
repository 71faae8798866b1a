use super::common::TestServer;
use super::{isolated, library};
use library_client::errors::{CreateBookError, DeleteBookError, GetBookByIdError, NotFound};
use library_client::models::{Book, GetBookByIdInput, Genre};
use opchain::{CallContext, CallError};

fn dune() -> Book {
    Book {
        name: Some("Dune".into()),
        author: Some("Frank Herbert".into()),
        genre: Some(Genre::Fiction),
        available: Some(true),
        pages: Some(412),
        rating: Some(4.5),
        ..Default::default()
    }
}

#[tokio::test]
async fn create_then_get() {
    let server = TestServer::start().await;
    let client = library(isolated(&server.url));

    let created = client.create_book(CallContext::new(), &dune()).await.unwrap();
    let id = created.id.expect("server assigns an id");

    let fetched = client
        .get_book_by_id(CallContext::new(), &GetBookByIdInput { book_id: id, ..Default::default() })
        .await
        .unwrap();

    assert_eq!(fetched, Book { id: Some(id), ..dune() });
}

#[tokio::test]
async fn missing_book_is_a_typed_error() {
    let server = TestServer::start().await;
    let client = library(isolated(&server.url));

    let err = client
        .get_book_by_id(CallContext::new(), &GetBookByIdInput { book_id: 99, ..Default::default() })
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "no book with id 99");
    match err {
        CallError::Api(GetBookByIdError::NotFound(NotFound { message })) => {
            assert_eq!(message.as_deref(), Some("no book with id 99"));
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn bad_request_on_create() {
    let server = TestServer::start().await;
    let client = library(isolated(&server.url));

    let err = client.create_book(CallContext::new(), &Book::default()).await.unwrap_err();

    assert!(matches!(err.api(), Some(CreateBookError::BadRequest(_))));
}

#[tokio::test]
async fn delete_then_get_and_delete_again() {
    let server = TestServer::start().await;
    let client = library(isolated(&server.url));
    let id = client.create_book(CallContext::new(), &dune()).await.unwrap().id.unwrap();

    client.delete_book(CallContext::new(), id).await.unwrap();

    let err = client
        .get_book_by_id(CallContext::new(), &GetBookByIdInput { book_id: id, ..Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(err.api(), Some(GetBookByIdError::NotFound(_))));

    let err = client.delete_book(CallContext::new(), id).await.unwrap_err();
    assert!(matches!(err.into_api(), Some(DeleteBookError::NotFound(_))));
}

#[tokio::test]
async fn health_check() {
    let server = TestServer::start().await;
    let client = library(isolated(&server.url));

    let health = client.health_check(CallContext::new()).await.unwrap();

    assert_eq!(health.status.as_deref(), Some("ok"));
}

#[tokio::test]
async fn unreachable_backend_is_an_internal_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let client = library(isolated(url));

    let err = client.health_check(CallContext::new()).await.unwrap_err();

    assert!(matches!(err, CallError::Internal(_)));
    assert!(err.api().is_none());
}
