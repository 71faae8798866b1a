//! Status-code dispatch of responses into typed results.
//!
//! Each operation owns one [`Responses`] table mapping the status codes it
//! declares to a decoder. Success codes produce the operation's output type;
//! error codes produce its error enum, returned as [`CallError::Api`]. Any
//! other code becomes an [`UnknownResponse`] carrying the raw body.

use crate::error::{CallError, InternalError, UnknownResponse};
use http::StatusCode;
use serde::de::DeserializeOwned;
use std::fmt;

type Decoder<T, E> = Box<dyn Fn(&[u8]) -> Result<Result<T, E>, serde_json::Error> + Send + Sync>;

/// Status-code table of one operation.
///
/// ```rust
/// use opchain::Responses;
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize, PartialEq)]
/// struct Book { id: i64 }
///
/// #[derive(Debug, Deserialize)]
/// struct NotFound { message: Option<String> }
///
/// let responses: Responses<Book, NotFound> = Responses::new()
///     .ok::<Book>(200, |book| book)
///     .err::<NotFound>(404, |e| e);
///
/// let book = responses.dispatch(http::StatusCode::OK, br#"{"id": 3}"#).unwrap();
/// assert_eq!(book, Book { id: 3 });
/// assert!(responses.dispatch(http::StatusCode::NOT_FOUND, b"").unwrap_err().api().is_some());
/// ```
pub struct Responses<T, E> {
    arms: Vec<(StatusCode, Decoder<T, E>)>,
}

impl<T, E> Default for Responses<T, E> {
    fn default() -> Self {
        Self { arms: Vec::new() }
    }
}

impl<T: 'static, E: 'static> Responses<T, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a success status whose body decodes as `B`.
    ///
    /// # Panics
    ///
    /// Panics if `status` is not a valid status code.
    pub fn ok<B>(self, status: u16, map: impl Fn(B) -> T + Send + Sync + 'static) -> Self
    where
        B: DeserializeOwned + 'static,
    {
        self.arm(status, move |body| decode::<B>(body).map(|b| Ok(map(b))))
    }

    /// Declares an error status whose body decodes as `B`.
    ///
    /// # Panics
    ///
    /// Panics if `status` is not a valid status code.
    pub fn err<B>(self, status: u16, map: impl Fn(B) -> E + Send + Sync + 'static) -> Self
    where
        B: DeserializeOwned + 'static,
    {
        self.arm(status, move |body| decode::<B>(body).map(|b| Err(map(b))))
    }

    /// Declares a success status whose body is ignored.
    pub fn empty(self, status: u16, value: impl Fn() -> T + Send + Sync + 'static) -> Self {
        self.arm(status, move |_| Ok(Ok(value())))
    }

    fn arm(
        mut self,
        status: u16,
        decoder: impl Fn(&[u8]) -> Result<Result<T, E>, serde_json::Error> + Send + Sync + 'static,
    ) -> Self {
        let status = StatusCode::from_u16(status)
            .unwrap_or_else(|_| panic!("invalid status code {status} in response table"));
        self.arms.push((status, Box::new(decoder)));
        self
    }
}

impl<T, E> Responses<T, E> {
    /// Returns true if `status` is declared.
    pub fn declares(&self, status: StatusCode) -> bool {
        self.arms.iter().any(|(s, _)| *s == status)
    }

    /// Maps one response to the operation's outcome.
    pub fn dispatch(&self, status: StatusCode, body: &[u8]) -> Result<T, CallError<E>> {
        let Some((_, decoder)) = self.arms.iter().find(|(s, _)| *s == status) else {
            return Err(CallError::UnknownResponse(UnknownResponse {
                status: status.as_u16(),
                body: String::from_utf8_lossy(body).into_owned(),
            }));
        };

        match decoder(body) {
            Ok(outcome) => outcome.map_err(CallError::Api),
            Err(source) => Err(CallError::Internal(InternalError::Decode {
                status: status.as_u16(),
                source,
            })),
        }
    }
}

impl<T, E> fmt::Debug for Responses<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.arms.iter().map(|(s, _)| s.as_u16()))
            .finish()
    }
}

/// Decodes a JSON body. A blank body decodes as `{}`, then as `null`, so
/// types without required fields accept it.
fn decode<B: DeserializeOwned>(body: &[u8]) -> Result<B, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return serde_json::from_slice(b"{}").or_else(|first| serde_json::from_slice(b"null").map_err(|_| first));
    }
    serde_json::from_slice(body)
}
