use super::common::TestServer;
use super::{isolated, library};
use futures::TryStreamExt;
use library_client::models::{Book, GetBooksInput};
use library_client::LibraryClient;
use opchain::CallContext;
use std::sync::atomic::Ordering;

async fn seed(client: &LibraryClient, authors: &[&str]) {
    for (i, author) in authors.iter().enumerate() {
        let book = Book {
            name: Some(format!("book {i}")),
            author: Some(author.to_string()),
            ..Default::default()
        };
        client.create_book(CallContext::new(), &book).await.unwrap();
    }
}

fn first_page_of_two() -> GetBooksInput {
    GetBooksInput {
        limit: Some(2),
        ..Default::default()
    }
}

#[tokio::test]
async fn iterates_across_pages() {
    let server = TestServer::start().await;
    let client = library(isolated(&server.url));
    seed(&client, &["le guin", "banks", "jemisin"]).await;

    let mut pages = client.get_books_iter(CallContext::new(), &first_page_of_two());
    let mut ids = Vec::new();
    while let Some(book) = pages.next().await.unwrap() {
        ids.push(book.id.unwrap());
    }

    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(server.state.list_requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn exhausted_iterator_stays_exhausted() {
    let server = TestServer::start().await;
    let client = library(isolated(&server.url));
    seed(&client, &["banks"]).await;

    let mut pages = client.get_books_iter(CallContext::new(), &first_page_of_two());
    assert!(pages.next().await.unwrap().is_some());
    assert!(pages.next().await.unwrap().is_none());
    assert!(pages.next().await.unwrap().is_none());
    assert_eq!(server.state.list_requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stream_yields_every_item() {
    let server = TestServer::start().await;
    let client = library(isolated(&server.url));
    seed(&client, &["le guin", "banks", "jemisin", "okorafor", "chiang"]).await;

    let books: Vec<Book> = client
        .get_books_stream(CallContext::new(), &first_page_of_two())
        .try_collect()
        .await
        .unwrap();

    let authors: Vec<_> = books.iter().filter_map(|b| b.author.as_deref()).collect();
    assert_eq!(authors, vec!["le guin", "banks", "jemisin", "okorafor", "chiang"]);
    assert_eq!(server.state.list_requests.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn single_page_listing_with_filters() {
    let server = TestServer::start().await;
    let client = library(isolated(&server.url));
    seed(&client, &["le guin", "banks", "le guin"]).await;

    let books = client
        .get_books(
            CallContext::new(),
            &GetBooksInput {
                authors: vec!["le guin".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(books.len(), 2);
    assert!(books.iter().all(|b| b.author.as_deref() == Some("le guin")));
}
