use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use library_client::models::Book;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Default)]
pub struct Library {
    books: Mutex<Vec<Book>>,
    next_id: AtomicUsize,
    pub list_requests: AtomicUsize,
}

/// A running in-process library service.
pub struct TestServer {
    pub url: String,
    pub state: Arc<Library>,
}

impl TestServer {
    pub async fn start() -> Self {
        let state = Arc::new(Library::default());
        let app = Router::new()
            .route("/v1/health/check", get(health))
            .route("/v1/books", get(list_books).post(create_book))
            .route("/v1/books/{book_id}", get(get_book).delete(delete_book))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}"),
            state,
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

async fn create_book(State(library): State<Arc<Library>>, Json(mut book): Json<Book>) -> Response {
    if book.name.is_none() {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "name is required"}))).into_response();
    }
    let id = library.next_id.fetch_add(1, Ordering::SeqCst) as i64 + 1;
    book.id = Some(id);
    library.books.lock().unwrap().push(book.clone());
    Json(book).into_response()
}

async fn get_book(State(library): State<Arc<Library>>, Path(book_id): Path<i64>) -> Response {
    let books = library.books.lock().unwrap();
    match books.iter().find(|b| b.id == Some(book_id)) {
        Some(book) => Json(book.clone()).into_response(),
        None => not_found(book_id),
    }
}

async fn delete_book(State(library): State<Arc<Library>>, Path(book_id): Path<i64>) -> Response {
    let mut books = library.books.lock().unwrap();
    let before = books.len();
    books.retain(|b| b.id != Some(book_id));
    if books.len() == before {
        return not_found(book_id);
    }
    StatusCode::OK.into_response()
}

/// Lists books ordered by id, `limit` per page, with the next page's path
/// in `X-Next-Page-Path`.
async fn list_books(State(library): State<Arc<Library>>, Query(query): Query<HashMap<String, String>>) -> Response {
    library.list_requests.fetch_add(1, Ordering::SeqCst);
    let limit: usize = query.get("limit").and_then(|l| l.parse().ok()).unwrap_or(100);
    let after: i64 = query.get("starting_after").and_then(|s| s.parse().ok()).unwrap_or(0);
    let authors: Vec<&str> = query
        .get("authors")
        .map(|a| a.split(',').collect())
        .unwrap_or_default();

    let books = library.books.lock().unwrap();
    let matching: Vec<Book> = books
        .iter()
        .filter(|b| b.id.unwrap_or(0) > after)
        .filter(|b| authors.is_empty() || b.author.as_deref().is_some_and(|a| authors.contains(&a)))
        .cloned()
        .collect();
    let page: Vec<Book> = matching.iter().take(limit).cloned().collect();

    let mut headers = HeaderMap::new();
    if matching.len() > page.len() {
        if let Some(last) = page.last().and_then(|b| b.id) {
            let next = format!("/v1/books?limit={limit}&starting_after={last}");
            headers.insert("x-next-page-path", HeaderValue::from_str(&next).unwrap());
        }
    }
    (headers, Json(page)).into_response()
}

fn not_found(book_id: i64) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"message": format!("no book with id {book_id}")})),
    )
        .into_response()
}
