//! Wire models of the library service.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Book {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<Genre>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Genre {
    Fiction,
    NonFiction,
    Poetry,
}

/// Query of [`LibraryClient::get_books`](crate::LibraryClient::get_books).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GetBooksInput {
    pub authors: Vec<String>,
    pub available: Option<bool>,
    pub min_pages: Option<i32>,
    pub max_rating: Option<f64>,
    pub limit: Option<i32>,
    pub starting_after: Option<i64>,
    pub authorization: Option<String>,
}

/// Input of [`LibraryClient::get_book_by_id`](crate::LibraryClient::get_book_by_id).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GetBookByIdInput {
    pub book_id: i64,
    pub authorization: Option<String>,
}

/// Reply of the health check.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Health {
    #[serde(default)]
    pub status: Option<String>,
}
